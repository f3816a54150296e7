//! Application wiring and commands.

mod commands;
mod runtime;

pub use commands::{check_status, sign_in, sign_out};
pub use runtime::RelayRuntime;
