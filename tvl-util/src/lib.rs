//! Utility functions for all tavla crates.
//!
//! Currently contains:
//!
//! - random macros
//! - logging
//! - config

use config as cfg;
use serde::de::DeserializeOwned;
use log::*;

pub mod http;
pub mod time;

#[macro_export]
macro_rules! crate_name {
    () => {module_path!().split("::").next().unwrap()}
}

#[macro_export]
macro_rules! impl_from_for_error {
    ($error:ident, $($orig:ident => $var:ident),*) => {
        $(
            impl From<$orig> for $error {
                fn from(err: $orig) -> $error {
                    $error::$var(err)
                }
            }
         )*
    }
}

/// Makes a user-agent string identifying the invoking crate, for the
/// benefit of the API operators on the other end.
#[macro_export]
macro_rules! user_agent {
    () => {
        format!("tavla/{} ({})", env!("CARGO_PKG_VERSION"), $crate::crate_name!())
    }
}

/// Extension trait for populating crate configuration structs.
///
/// If a struct used for config implements `Deserialize`, this trait can be
/// used to populate it with values from `[crate name].toml` in the current
/// directory, and from `TVL_*` environment variables (which win over the
/// file).
pub trait ConfigExt: DeserializeOwned {
    fn crate_name() -> &'static str;
    fn load() -> Result<Self, failure::Error> {
        let cn = Self::crate_name();
        info!("loading tavla config for crate {}", cn);
        let mut settings = cfg::Config::default();
        if let Err(e) = settings.merge(cfg::File::with_name(cn)) {
            warn!("no config file loaded: {}", e);
            settings = cfg::Config::default();
        }
        let mut with_env = settings.clone();
        match with_env.merge(cfg::Environment::with_prefix("TVL")) {
            Ok(_) => settings = with_env,
            Err(e) => warn!("ignoring environment config: {}", e),
        }
        let ret = settings.try_into()?;
        Ok(ret)
    }
}

/// Initialize logging.
///
/// The dashboard logs how long each fetch takes, so the format carries a
/// timestamp.
pub fn setup_logging() -> Result<(), failure::Error> {
    fern::Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!("[{} {} {}] {}",
                                    chrono::Local::now().format("%H:%M:%S"),
                                    record.target(),
                                    record.level(),
                                    msg))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
