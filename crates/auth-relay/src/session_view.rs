//! Popup presentation layer.
//!
//! Reads the persisted identity, dispatches intents to the background
//! coordinator and renders a small view model.

use crate::{AuthRelayError, AuthRelayResult, RelayBus};
use relay_channel::ContextKind;
use relay_protocol_types::{Identity, IntentReply, RuntimeMessage};
use relay_storage::SessionStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the popup shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionViewModel {
    pub signed_in: bool,
    pub status_text: String,
    pub show_sign_in: bool,
    pub show_sign_out: bool,
}

impl SessionViewModel {
    pub fn signed_in(identity: &Identity) -> Self {
        Self {
            signed_in: true,
            status_text: format!("Signed in as: {}", identity.label()),
            show_sign_in: false,
            show_sign_out: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            signed_in: false,
            status_text: "Not signed in".to_string(),
            show_sign_in: true,
            show_sign_out: false,
        }
    }
}

pub struct SessionView {
    bus: RelayBus,
    session: Arc<SessionStore>,
    model: SessionViewModel,
}

impl SessionView {
    pub fn new(bus: RelayBus, session: Arc<SessionStore>) -> Self {
        Self {
            bus,
            session,
            model: SessionViewModel::signed_out(),
        }
    }

    pub fn model(&self) -> &SessionViewModel {
        &self.model
    }

    /// Render from the persisted identity. Unreadable storage renders as
    /// signed out.
    pub fn load(&mut self) -> &SessionViewModel {
        self.model = match self.session.load() {
            Ok(Some(identity)) => SessionViewModel::signed_in(&identity),
            Ok(None) => SessionViewModel::signed_out(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                SessionViewModel::signed_out()
            }
        };
        &self.model
    }

    /// Send a `signIn` intent. Re-renders only when the reply carries a user.
    pub async fn sign_in(&mut self) -> AuthRelayResult<&SessionViewModel> {
        let reply = self
            .bus
            .request(ContextKind::Popup, RuntimeMessage::SignIn)
            .await?;
        let reply: IntentReply = serde_json::from_value(reply)?;

        if let Some(identity) = reply.identity() {
            self.model = SessionViewModel::signed_in(identity);
            return Ok(&self.model);
        }

        let reason = reply.error_message().unwrap_or("empty reply").to_string();
        warn!(reason = %reason, "Sign-in failed");
        Err(AuthRelayError::SignInRejected(reason))
    }

    /// Send a `signOut` intent and render the signed-out state.
    pub async fn sign_out(&mut self) -> &SessionViewModel {
        if let Err(e) = self
            .bus
            .request(ContextKind::Popup, RuntimeMessage::SignOut)
            .await
        {
            debug!(error = %e, "Sign-out intent not acknowledged");
        }
        self.model = SessionViewModel::signed_out();
        &self.model
    }
}
