//! Relay error types.

use relay_channel::ChannelError;
use relay_config_and_utils::CoreError;
use std::time::Duration;
use thiserror::Error;

/// Relay error type.
#[derive(Error, Debug)]
pub enum AuthRelayError {
    /// The ephemeral host could not be created
    #[error("Host creation failed: {0}")]
    HostCreationFailed(String),

    /// The channel refused or dropped the request
    #[error("Transport rejected: {0}")]
    TransportRejected(#[from] ChannelError),

    /// The reply was not a valid identity
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Writing the identity failed (never fails a sign-in)
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// No reply arrived in time
    #[error("No reply within {}s", .0.as_secs())]
    Timeout(Duration),

    /// The coordinator answered a sign-in with an error
    #[error("Sign-in rejected: {0}")]
    SignInRejected(String),

    /// Invalid transition of the relay FSM
    #[error("Invalid relay state transition: {0}")]
    InvalidStateTransition(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] CoreError),
}

impl AuthRelayError {
    /// The underlying failure message, without the variant prefix.
    ///
    /// This is what crosses the wire as `{ error }`, so a provisioner
    /// failing with "quota exceeded" yields exactly that string.
    pub fn reason(&self) -> String {
        match self {
            AuthRelayError::HostCreationFailed(reason)
            | AuthRelayError::PersistenceFailed(reason)
            | AuthRelayError::SignInRejected(reason)
            | AuthRelayError::InvalidStateTransition(reason) => reason.clone(),
            AuthRelayError::TransportRejected(e) => e.to_string(),
            AuthRelayError::MalformedPayload(e) => e.to_string(),
            AuthRelayError::Config(e) => e.to_string(),
            AuthRelayError::Timeout(_) => self.to_string(),
        }
    }
}

/// Result type for relay operations.
pub type AuthRelayResult<T> = Result<T, AuthRelayError>;
