//! Host side of the relay, running inside the offscreen document.
//!
//! On each `getAuth` request the bridge listens on its frame window for one
//! provider payload, kicks off the provider flow and answers with the raw
//! `user` value once a parseable payload arrives.

use crate::RelayBus;
use parking_lot::Mutex;
use relay_channel::{
    ContextKind, FrameWindow, ListenerControl, ListenerRegistration, ProviderFrame, Responder,
};
use relay_protocol_types::{parse_provider_payload, ContextTarget, ProviderCommand};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type PendingReply = Arc<Mutex<Option<Responder<Value>>>>;

pub struct HostBridge {
    window: FrameWindow,
    frame: Arc<dyn ProviderFrame>,
    provider_origin: String,
    provider_timeout: Option<Duration>,
}

impl HostBridge {
    pub fn new(
        window: FrameWindow,
        frame: Arc<dyn ProviderFrame>,
        provider_origin: impl Into<String>,
    ) -> Self {
        Self {
            window,
            frame,
            provider_origin: provider_origin.into(),
            provider_timeout: None,
        }
    }

    /// Give up on the provider after `timeout`, closing the reply port.
    pub fn with_provider_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Listen for `getAuth` requests addressed to the offscreen host.
    pub fn attach(self: Arc<Self>, bus: &RelayBus) -> ListenerRegistration {
        bus.on_message(
            ContextKind::Offscreen,
            |message| message.is_get_auth_for(ContextTarget::Offscreen),
            move |_, responder| self.handle_get_auth(responder),
        )
    }

    fn handle_get_auth(&self, responder: Responder<Value>) {
        let pending: PendingReply = Arc::new(Mutex::new(Some(responder)));

        let registration = Arc::new(self.window.add_message_listener({
            let pending = pending.clone();
            move |data| match parse_provider_payload(data) {
                Ok(user) => {
                    if let Some(responder) = pending.lock().take() {
                        if let Err(e) = responder.respond(user) {
                            debug!(error = %e, "Provider result not delivered");
                        }
                    }
                    ListenerControl::Remove
                }
                Err(e) => {
                    // Unparseable messages are not ours; keep waiting.
                    warn!(error = %e, "Ignoring unparseable provider message");
                    ListenerControl::Keep
                }
            }
        }));

        let command = ProviderCommand::init_auth();
        if let Err(e) = self.frame.post_message(&command, &self.provider_origin) {
            warn!(error = %e, "Failed to start provider flow");
            registration.revoke();
            pending.lock().take();
            return;
        }
        info!(origin = %self.provider_origin, "Provider flow started");

        if let Some(limit) = self.provider_timeout {
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                if registration.revoke() {
                    warn!(timeout_secs = limit.as_secs(), "Provider did not answer in time");
                    pending.lock().take();
                }
            });
        }
    }
}
