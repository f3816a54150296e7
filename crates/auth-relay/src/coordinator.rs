//! Background-resident orchestrator of the sign-in relay.
//!
//! Owns the host lifecycle, forwards `getAuth` to the offscreen host,
//! correlates the single expected reply and persists or clears the
//! identity. Each sign-in drives its own [`RelayMachine`].

use crate::{
    AuthRelayError, AuthRelayResult, EphemeralHostManager, RelayMachine, RelayMachineInput,
};
use parking_lot::Mutex;
use relay_channel::{ContextKind, ListenerRegistration, MessageBus};
use relay_protocol_types::{Identity, IntentReply, RuntimeMessage};
use relay_storage::SessionStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The runtime bus shared by all contexts. Replies are raw JSON.
pub type RelayBus = MessageBus<RuntimeMessage, Value>;

/// Callback notified when persisting a signed-in identity fails.
pub type PersistenceObserver = Arc<dyn Fn(&AuthRelayError) + Send + Sync>;

/// A popup intent serviced by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayRequest {
    SignIn,
    SignOut,
}

impl RelayRequest {
    /// Map a runtime message to the intent it carries, if any.
    pub fn from_message(message: &RuntimeMessage) -> Option<Self> {
        match message {
            RuntimeMessage::SignIn => Some(RelayRequest::SignIn),
            RuntimeMessage::SignOut => Some(RelayRequest::SignOut),
            RuntimeMessage::GetAuth { .. } => None,
        }
    }
}

pub struct AuthRelayCoordinator {
    bus: RelayBus,
    host: EphemeralHostManager,
    session: Arc<SessionStore>,
    reply_timeout: Option<Duration>,
    persistence_observer: Mutex<Option<PersistenceObserver>>,
}

impl AuthRelayCoordinator {
    pub fn new(bus: RelayBus, host: EphemeralHostManager, session: Arc<SessionStore>) -> Self {
        Self {
            bus,
            host,
            session,
            reply_timeout: None,
            persistence_observer: Mutex::new(None),
        }
    }

    /// Bound the wait for the host's reply. `None` waits indefinitely.
    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn set_persistence_observer(&self, observer: PersistenceObserver) {
        *self.persistence_observer.lock() = Some(observer);
    }

    pub fn host(&self) -> &EphemeralHostManager {
        &self.host
    }

    /// Register as the background listener for popup intents.
    ///
    /// Every intent is answered with an [`IntentReply`] from its own task.
    pub fn attach(self: &Arc<Self>) -> ListenerRegistration {
        let coordinator = Arc::clone(self);
        self.bus.on_message(
            ContextKind::Background,
            RuntimeMessage::is_intent,
            move |message, responder| {
                let Some(request) = RelayRequest::from_message(&message) else {
                    return;
                };
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    let reply = coordinator.handle(request).await;
                    match serde_json::to_value(&reply) {
                        Ok(value) => {
                            if let Err(e) = responder.respond(value) {
                                debug!(?request, error = %e, "Intent reply not delivered");
                            }
                        }
                        Err(e) => error!(?request, error = %e, "Failed to encode intent reply"),
                    }
                });
            },
        )
    }

    /// Service one intent and build its wire reply.
    pub async fn handle(&self, request: RelayRequest) -> IntentReply {
        match request {
            RelayRequest::SignIn => match self.sign_in().await {
                Ok(identity) => IntentReply::user(identity),
                Err(e) => IntentReply::error(e.reason()),
            },
            RelayRequest::SignOut => {
                self.sign_out().await;
                IntentReply::empty()
            }
        }
    }

    /// Drive one sign-in to its terminal outcome.
    pub async fn sign_in(&self) -> AuthRelayResult<Identity> {
        let mut machine = RelayMachine::new();
        transition(&mut machine, RelayMachineInput::SignInRequested)?;

        if let Err(e) = self.host.ensure_host().await {
            return fail(&mut machine, RelayMachineInput::HostFailed, e);
        }
        transition(&mut machine, RelayMachineInput::HostReady)?;

        let identity = match self.request_identity().await {
            Ok(identity) => identity,
            Err(e) => return fail(&mut machine, RelayMachineInput::RequestFailed, e),
        };
        transition(&mut machine, RelayMachineInput::ReplyReceived)?;

        self.persist(&identity).await;
        transition(&mut machine, RelayMachineInput::Persisted)?;

        info!(user_id = %identity.id, "Signed in");
        Ok(identity)
    }

    /// Clear the persisted identity. Storage errors are logged only.
    pub async fn sign_out(&self) {
        let session = self.session.clone();
        match tokio::task::spawn_blocking(move || session.clear()).await {
            Ok(Ok(removed)) => info!(removed, "Signed out"),
            Ok(Err(e)) => warn!(error = %e, "Failed to clear session"),
            Err(e) => warn!(error = %e, "Session clear task failed"),
        }
    }

    async fn request_identity(&self) -> AuthRelayResult<Identity> {
        let request = self
            .bus
            .request(ContextKind::Background, RuntimeMessage::get_auth());

        let reply = match self.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| AuthRelayError::Timeout(limit))??,
            None => request.await?,
        };

        debug!("Received getAuth reply");
        Ok(Identity::from_value(reply)?)
    }

    async fn persist(&self, identity: &Identity) {
        let session = self.session.clone();
        let owned = identity.clone();
        let result = match tokio::task::spawn_blocking(move || session.persist(&owned)).await {
            Ok(result) => result.map_err(|e| AuthRelayError::PersistenceFailed(e.to_string())),
            Err(e) => Err(AuthRelayError::PersistenceFailed(e.to_string())),
        };

        if let Err(e) = result {
            warn!(user_id = %identity.id, error = %e, "Failed to persist identity");
            let observer = self.persistence_observer.lock().clone();
            if let Some(observer) = observer {
                observer(&e);
            }
        }
    }
}

fn transition(machine: &mut RelayMachine, input: RelayMachineInput) -> AuthRelayResult<()> {
    machine.consume(&input).map(|_| ()).map_err(|_| {
        AuthRelayError::InvalidStateTransition(format!(
            "{:?} from {:?}",
            input,
            machine.state()
        ))
    })
}

fn fail<T>(
    machine: &mut RelayMachine,
    input: RelayMachineInput,
    err: AuthRelayError,
) -> AuthRelayResult<T> {
    transition(machine, input)?;
    warn!(error = %err, "Sign-in failed");
    transition(machine, RelayMachineInput::Reported)?;
    Err(err)
}
