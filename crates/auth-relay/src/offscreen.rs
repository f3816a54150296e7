//! In-process offscreen document provisioner.
//!
//! Creating the host opens an offscreen context, embeds the provider page
//! in a frame window and attaches a [`HostBridge`] to the runtime bus.

use crate::{AuthRelayError, AuthRelayResult, HostBridge, HostProvisioner, RelayBus};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_channel::{
    ContextHandle, ContextKind, ContextRegistry, FrameWindow, ListenerRegistration, ProviderFrame,
};
use relay_config_and_utils::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Origin of the relay's own documents.
pub const EXTENSION_ORIGIN: &str = "chrome-extension://auth-relay";

/// Why the offscreen document exists, recorded when it is opened.
pub const OFFSCREEN_REASON: &str = "DOM_SCRAPING";
pub const OFFSCREEN_JUSTIFICATION: &str = "Firebase Authentication";

/// Embeds the provider page into a host document's window.
pub trait ProviderFrameFactory: Send + Sync {
    fn embed(&self, window: &FrameWindow, src: &str) -> AuthRelayResult<Arc<dyn ProviderFrame>>;
}

/// Settings for the offscreen document, derived from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffscreenSettings {
    pub document_path: String,
    pub provider_url: String,
    pub provider_origin: String,
    pub provider_timeout: Option<Duration>,
    pub reason: String,
    pub justification: String,
}

impl OffscreenSettings {
    pub fn from_config(config: &Config) -> AuthRelayResult<Self> {
        Ok(Self {
            document_path: config.offscreen_document_path.clone(),
            provider_url: config.provider_url()?.to_string(),
            provider_origin: config.provider_origin()?,
            provider_timeout: config.provider_timeout(),
            reason: OFFSCREEN_REASON.to_string(),
            justification: OFFSCREEN_JUSTIFICATION.to_string(),
        })
    }

    fn document_url(&self) -> String {
        format!(
            "{}/{}",
            EXTENSION_ORIGIN,
            self.document_path.trim_start_matches('/')
        )
    }
}

struct OffscreenDocument {
    registration: ListenerRegistration,
    _context: ContextHandle,
}

pub struct OffscreenDocumentProvisioner {
    registry: ContextRegistry,
    bus: RelayBus,
    frames: Arc<dyn ProviderFrameFactory>,
    settings: OffscreenSettings,
    document: Mutex<Option<OffscreenDocument>>,
}

impl OffscreenDocumentProvisioner {
    pub fn new(
        registry: ContextRegistry,
        bus: RelayBus,
        frames: Arc<dyn ProviderFrameFactory>,
        settings: OffscreenSettings,
    ) -> Self {
        Self {
            registry,
            bus,
            frames,
            settings,
            document: Mutex::new(None),
        }
    }

    /// Tear the host down. Returns false if none was open.
    pub fn close_document(&self) -> bool {
        match self.document.lock().take() {
            Some(document) => {
                document.registration.revoke();
                info!(path = %self.settings.document_path, "Closed offscreen document");
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl HostProvisioner for OffscreenDocumentProvisioner {
    async fn has_host(&self) -> bool {
        self.registry.has_url_suffix(&self.settings.document_path)
    }

    async fn create_host(&self) -> AuthRelayResult<()> {
        let mut document = self.document.lock();
        if document.is_some() {
            return Err(AuthRelayError::HostCreationFailed(
                "Only a single offscreen document may be created.".to_string(),
            ));
        }

        let window = FrameWindow::new();
        let frame = self.frames.embed(&window, &self.settings.provider_url)?;
        let bridge = HostBridge::new(window, frame, self.settings.provider_origin.clone())
            .with_provider_timeout(self.settings.provider_timeout);
        let registration = Arc::new(bridge).attach(&self.bus);

        let url = self.settings.document_url();
        info!(
            url = %url,
            reason = %self.settings.reason,
            justification = %self.settings.justification,
            "Opened offscreen document"
        );
        debug!(provider = %self.settings.provider_url, "Provider frame embedded");
        let context = self.registry.open(ContextKind::Offscreen, url);

        *document = Some(OffscreenDocument {
            registration,
            _context: context,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_channel::ChannelResult;
    use relay_protocol_types::ProviderCommand;

    struct SilentFrame;

    impl ProviderFrame for SilentFrame {
        fn origin(&self) -> &str {
            "https://auth.example.com"
        }

        fn deliver(&self, _command: &ProviderCommand) -> ChannelResult<()> {
            Ok(())
        }
    }

    struct SilentFrames;

    impl ProviderFrameFactory for SilentFrames {
        fn embed(
            &self,
            _window: &FrameWindow,
            _src: &str,
        ) -> AuthRelayResult<Arc<dyn ProviderFrame>> {
            Ok(Arc::new(SilentFrame))
        }
    }

    fn settings() -> OffscreenSettings {
        OffscreenSettings {
            document_path: "offscreen.html".to_string(),
            provider_url: "https://auth.example.com/".to_string(),
            provider_origin: "https://auth.example.com".to_string(),
            provider_timeout: None,
            reason: OFFSCREEN_REASON.to_string(),
            justification: "test".to_string(),
        }
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            provider_url: "https://auth.example.com/login?x=1".to_string(),
            ..Config::default()
        };
        let settings = OffscreenSettings::from_config(&config).unwrap();
        assert_eq!(settings.provider_origin, "https://auth.example.com");
        assert_eq!(settings.document_path, "offscreen.html");
        assert_eq!(settings.reason, "DOM_SCRAPING");
        assert_eq!(settings.justification, "Firebase Authentication");
        assert_eq!(
            settings.document_url(),
            "chrome-extension://auth-relay/offscreen.html"
        );
    }

    #[tokio::test]
    async fn test_create_then_close() {
        let registry = ContextRegistry::new();
        let bus = RelayBus::new();
        let provisioner = OffscreenDocumentProvisioner::new(
            registry.clone(),
            bus.clone(),
            Arc::new(SilentFrames),
            settings(),
        );

        assert!(!provisioner.has_host().await);
        provisioner.create_host().await.unwrap();
        assert!(provisioner.has_host().await);
        assert_eq!(bus.listener_count(), 1);
        assert_eq!(registry.match_all()[0].kind, ContextKind::Offscreen);

        assert!(provisioner.close_document());
        assert!(!provisioner.has_host().await);
        assert_eq!(bus.listener_count(), 0);
        assert!(!provisioner.close_document());
    }

    #[tokio::test]
    async fn test_refuses_second_document() {
        let provisioner = OffscreenDocumentProvisioner::new(
            ContextRegistry::new(),
            RelayBus::new(),
            Arc::new(SilentFrames),
            settings(),
        );
        provisioner.create_host().await.unwrap();

        let err = provisioner.create_host().await.unwrap_err();
        assert_eq!(err.reason(), "Only a single offscreen document may be created.");
    }
}
