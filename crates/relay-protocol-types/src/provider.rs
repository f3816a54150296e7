//! Messages exchanged with the embedded provider page.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command posted to the provider page, e.g. `{ "initAuth": true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCommand {
    pub init_auth: bool,
}

impl ProviderCommand {
    /// The signal that starts the provider's sign-in flow.
    pub fn init_auth() -> Self {
        Self { init_auth: true }
    }
}

/// Parse a raw provider message and extract its `user` field.
///
/// The message must be a JSON string; a missing `user` field yields
/// `Value::Null`, leaving identity validation to the receiver of the reply.
pub fn parse_provider_payload(data: &str) -> Result<Value, serde_json::Error> {
    let parsed: Value = serde_json::from_str(data)?;
    Ok(parsed.get("user").cloned().unwrap_or(Value::Null))
}
