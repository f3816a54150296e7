//! The signed-in principal returned by the authentication provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque record representing a signed-in principal.
///
/// Only `id` is required; any other provider fields are kept verbatim in
/// `attributes` so that persisting and reloading yields an equal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable principal identifier (`uid` from the provider is accepted).
    #[serde(alias = "uid")]
    pub id: String,
    /// Human-readable label (`displayName` from the provider is accepted).
    #[serde(default, alias = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    /// Email address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Remaining provider fields.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Identity {
    /// Create an identity with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_label: None,
            email: None,
            attributes: Map::new(),
        }
    }

    /// Builder-style email setter.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder-style display label setter.
    pub fn with_display_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = Some(label.into());
        self
    }

    /// Label to show for this principal: display label, then email, then id.
    pub fn label(&self) -> &str {
        self.display_label
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }

    /// Parse an identity out of an arbitrary JSON value.
    ///
    /// Fails rather than producing a partially populated identity.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
