//! Configuration, paths, and logging setup shared by the auth relay crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_LOG_LEVEL, DEFAULT_OFFSCREEN_DOCUMENT_PATH, DEFAULT_PROVIDER_TIMEOUT_SECS,
    DEFAULT_PROVIDER_URL, DEFAULT_REPLY_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
