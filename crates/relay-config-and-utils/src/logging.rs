//! Logging initialization for the relay.
//!
//! Thin wrapper over the observability crate. Every relay process writes
//! structured JSONL to `<base>/logs/dev.jsonl`.

use crate::{CoreResult, Paths};
use observability::LogConfig;

/// Initialize the logging system.
///
/// - Structured JSONL output to the central log file under `paths`
/// - Log level from RUST_LOG env var or the provided default
/// - Compact stderr output when `also_stderr` is set
///
/// # Example
///
/// ```ignore
/// init_logging(&paths, "info", true)?;
/// tracing::info!("relay started");
/// ```
pub fn init_logging(paths: &Paths, level: &str, also_stderr: bool) -> CoreResult<()> {
    observability::init_with_config(LogConfig {
        service_name: "auth-relay".into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr,
    })?;
    Ok(())
}
