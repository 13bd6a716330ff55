//! Standard fare error handling.
//!
//! Only startup errors are allowed to kill the process; everything the
//! loop hits at runtime degrades to "use what we had last time".

pub use failure::Error;
use failure_derive::Fail;
use serde_json::Error as JsonError;
use std::io::Error as IoError;
use tvl_util::impl_from_for_error;

/// Error from the render driver. One of these skips the current cycle;
/// the previous image stays on the panel.
#[derive(Fail, Debug)]
pub enum RenderError {
    /// Couldn't write the view model out.
    #[fail(display = "io: {}", _0)]
    Io(IoError),
    /// Couldn't serialize the view model.
    #[fail(display = "json: {}", _0)]
    Json(JsonError),
    /// The external render command failed.
    #[fail(display = "render command exited with status {}", _0)]
    CommandFailed(i32),
    /// The external render command never got to exit.
    #[fail(display = "render command killed by a signal")]
    CommandKilled,
}

pub type RenderResult<T, E = RenderError> = ::std::result::Result<T, E>;
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

impl_from_for_error!(RenderError,
                     IoError => Io,
                     JsonError => Json);
