//! Logging setup shared by the auth relay crates.
//!
//! Binaries call [`init_with_config`] once at startup and then use the
//! `tracing` macros. Events go to a JSONL file (by default
//! `~/.auth-relay/logs/dev.jsonl`) and, when asked, to stderr in compact
//! form. `RUST_LOG` overrides the configured level.
//!
//! ```rust,ignore
//! let path = observability::init_with_config(observability::LogConfig {
//!     service_name: "auth-relay".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! })?;
//! tracing::info!(log_path = %path.display(), "ready");
//! ```

mod writer;

use std::io;
use std::path::PathBuf;

pub use writer::LogFile;

/// Logging options.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Recorded in the first event of the process.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `auth_relay=debug`.
    pub default_level: String,
    /// Log file; `None` selects the default location.
    pub log_path: Option<PathBuf>,
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            default_level: "info".to_string(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging. Fails only when the log file cannot be opened.
pub fn init_with_config(config: LogConfig) -> io::Result<PathBuf> {
    writer::install(&config)
}
