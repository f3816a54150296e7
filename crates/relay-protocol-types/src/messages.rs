//! Runtime messages between extension contexts.
//!
//! Mirrors the extension runtime's `{ action, ... }` message shape.

use crate::Identity;
use serde::{Deserialize, Serialize};

/// Context a relay message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextTarget {
    Offscreen,
}

/// Message carried on the runtime bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    /// Popup → background: start a sign-in.
    SignIn,
    /// Popup → background: forget the signed-in identity.
    SignOut,
    /// Background → host: drive the provider flow and return the raw identity.
    GetAuth { target: ContextTarget },
}

impl RuntimeMessage {
    /// The relay request sent to the offscreen host.
    pub fn get_auth() -> Self {
        RuntimeMessage::GetAuth {
            target: ContextTarget::Offscreen,
        }
    }

    /// Returns true for popup intents handled by the background coordinator.
    pub fn is_intent(&self) -> bool {
        matches!(self, RuntimeMessage::SignIn | RuntimeMessage::SignOut)
    }

    /// Returns true if this is a `getAuth` request addressed to `target`.
    pub fn is_get_auth_for(&self, target: ContextTarget) -> bool {
        matches!(self, RuntimeMessage::GetAuth { target: t } if *t == target)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Reply to a popup intent: `{ user }`, `{ error }`, or `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntentReply {
    User { user: Identity },
    Error { error: String },
    Empty {},
}

impl IntentReply {
    /// A successful sign-in reply.
    pub fn user(user: Identity) -> Self {
        IntentReply::User { user }
    }

    /// A failed sign-in reply carrying the failure reason.
    pub fn error(message: impl Into<String>) -> Self {
        IntentReply::Error {
            error: message.into(),
        }
    }

    /// The sign-out acknowledgement.
    pub fn empty() -> Self {
        IntentReply::Empty {}
    }

    /// Signed-in identity, if this reply carries one.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            IntentReply::User { user } => Some(user),
            _ => None,
        }
    }

    /// Failure reason, if this reply carries one.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            IntentReply::Error { error } => Some(error),
            _ => None,
        }
    }
}
