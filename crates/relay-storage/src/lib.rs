//! Key/value storage for the relay.
//!
//! Backends implement [`KeyValueStorage`]:
//! - **MemoryStorage**: process-local map, for tests and ephemeral runs
//! - **FileStorage**: JSON object persisted to a single file
//!
//! [`SessionStore`] layers the persisted-session API on top.

mod file;
mod keys;
mod memory;
mod session;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use session::SessionStore;
pub use traits::KeyValueStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend could not complete the operation
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
