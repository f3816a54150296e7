//! In-process wiring of the background, offscreen and popup contexts.

use crate::provider::ScriptedProviderFrames;
use auth_relay::{
    AuthRelayCoordinator, AuthRelayError, AuthRelayResult, EphemeralHostManager,
    OffscreenDocumentProvisioner, OffscreenSettings, PersistenceObserver, RelayBus, SessionView,
    EXTENSION_ORIGIN,
};
use relay_channel::{ContextHandle, ContextKind, ContextRegistry, ListenerRegistration};
use relay_config_and_utils::Config;
use relay_storage::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// All contexts of one relay process.
pub struct RelayRuntime {
    bus: RelayBus,
    registry: ContextRegistry,
    provisioner: Arc<OffscreenDocumentProvisioner>,
    coordinator: Arc<AuthRelayCoordinator>,
    session: Arc<SessionStore>,
    intents: ListenerRegistration,
    _background: ContextHandle,
}

impl RelayRuntime {
    /// Start the background context and attach the coordinator.
    pub fn start(
        config: &Config,
        session: SessionStore,
        identity_file: Option<PathBuf>,
    ) -> AuthRelayResult<Self> {
        let bus = RelayBus::new();
        let registry = ContextRegistry::new();
        let background =
            registry.open(ContextKind::Background, format!("{EXTENSION_ORIGIN}/background.js"));

        let settings = OffscreenSettings::from_config(config)?;
        let frames = Arc::new(ScriptedProviderFrames::new(
            settings.provider_origin.clone(),
            identity_file,
        ));
        let provisioner = Arc::new(OffscreenDocumentProvisioner::new(
            registry.clone(),
            bus.clone(),
            frames,
            settings,
        ));

        let session = Arc::new(session);
        let coordinator = Arc::new(
            AuthRelayCoordinator::new(
                bus.clone(),
                EphemeralHostManager::new(provisioner.clone()),
                session.clone(),
            )
            .with_reply_timeout(config.reply_timeout()),
        );
        let observer: PersistenceObserver = Arc::new(|e: &AuthRelayError| {
            eprintln!("Warning: signed in, but the session could not be saved: {}", e.reason());
        });
        coordinator.set_persistence_observer(observer);
        let intents = coordinator.attach();

        info!(
            provider_url = %config.provider_url,
            reply_timeout_secs = ?config.reply_timeout_secs,
            "Relay runtime started"
        );

        Ok(Self {
            bus,
            registry,
            provisioner,
            coordinator,
            session,
            intents,
            _background: background,
        })
    }

    /// Open a popup context with its view.
    pub fn open_popup(&self) -> (ContextHandle, SessionView) {
        let popup = self
            .registry
            .open(ContextKind::Popup, format!("{EXTENSION_ORIGIN}/popup.html"));
        (popup, SessionView::new(self.bus.clone(), self.session.clone()))
    }

    /// Close the offscreen host and detach the coordinator.
    pub async fn shutdown(self) {
        if self.provisioner.close_document() {
            info!("Offscreen host closed");
        }
        if !self.intents.revoke() {
            warn!("Intent listener was already detached");
        }
        info!(
            host = ?self.coordinator.host().refresh().await,
            open_contexts = self.registry.match_all().len(),
            "Relay runtime stopped"
        );
    }
}
