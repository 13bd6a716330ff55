//! Standard fare error handling.
//!
//! One error type for all four feeds, so the scheduler can apply one
//! "keep the last good value" policy instead of four bespoke ones.

pub use failure::Error;
use failure_derive::Fail;
use serde_json::Error as JsonError;
use tvl_util::impl_from_for_error;
use tvl_util::http::HttpError;

/// Error that could occur while fetching one feed.
///
/// A `FetchError` only ever condemns the feed it came from.
#[derive(Fail, Debug)]
pub enum FetchError {
    /// HTTP-level failure (network, auth, remote error response).
    #[fail(display = "http: {}", _0)]
    Http(HttpError),
    /// JSON that didn't deserialize.
    #[fail(display = "json: {}", _0)]
    Json(JsonError),
    /// The response parsed, but a field we need wasn't there.
    #[fail(display = "feed response missing {}", _0)]
    MissingField(&'static str),
}

pub type FeedResult<T, E = FetchError> = ::std::result::Result<T, E>;
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

impl_from_for_error!(FetchError,
                     HttpError => Http,
                     JsonError => Json);
