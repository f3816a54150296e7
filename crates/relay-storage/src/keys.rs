//! Storage key constants.

/// Storage keys used by the relay
pub struct StorageKeys;

impl StorageKeys {
    /// Signed-in identity (JSON)
    pub const USER: &'static str = "user";
}
