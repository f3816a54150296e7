//! Integration tests for auth-relay.
//!
//! These tests drive the whole relay in one process: popup view, background
//! coordinator, offscreen document provisioner and a scripted provider page.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use auth_relay::{
    AuthRelayCoordinator, AuthRelayError, AuthRelayResult, EphemeralHostManager, HostProvisioner,
    HostState, OffscreenDocumentProvisioner, OffscreenSettings, ProviderFrameFactory, RelayBus,
    SessionView, OFFSCREEN_JUSTIFICATION, OFFSCREEN_REASON,
};
use futures_util::future::join_all;
use parking_lot::Mutex;
use relay_channel::{
    ChannelResult, ContextRegistry, FrameWindow, ListenerRegistration, ProviderFrame,
};
use relay_protocol_types::{Identity, ProviderCommand};
use relay_storage::{FileStorage, MemoryStorage, SessionStore};

const PROVIDER_ORIGIN: &str = "https://auth.example.com";

/// Provider page that answers every `initAuth` with one fixed payload.
struct ScriptedFrame {
    window: FrameWindow,
    payload: String,
    posts: Arc<AtomicUsize>,
}

impl ProviderFrame for ScriptedFrame {
    fn origin(&self) -> &str {
        PROVIDER_ORIGIN
    }

    fn deliver(&self, _command: &ProviderCommand) -> ChannelResult<()> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        let window = self.window.clone();
        let payload = self.payload.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            window.dispatch_message(&payload);
        });
        Ok(())
    }
}

#[derive(Default)]
struct ScriptedFrames {
    payload: Mutex<String>,
    fail_with: Mutex<Option<String>>,
    embeds: AtomicUsize,
    posts: Arc<AtomicUsize>,
}

impl ProviderFrameFactory for ScriptedFrames {
    fn embed(&self, window: &FrameWindow, _src: &str) -> AuthRelayResult<Arc<dyn ProviderFrame>> {
        if let Some(reason) = self.fail_with.lock().clone() {
            return Err(AuthRelayError::HostCreationFailed(reason));
        }
        self.embeds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedFrame {
            window: window.clone(),
            payload: self.payload.lock().clone(),
            posts: self.posts.clone(),
        }))
    }
}

/// Hands control back to the scheduler mid-creation, the way opening a
/// real document does, so concurrent sign-ins overlap the attempt.
struct YieldingProvisioner {
    inner: Arc<OffscreenDocumentProvisioner>,
    creations: AtomicUsize,
}

#[async_trait]
impl HostProvisioner for YieldingProvisioner {
    async fn has_host(&self) -> bool {
        self.inner.has_host().await
    }

    async fn create_host(&self) -> AuthRelayResult<()> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        self.inner.create_host().await
    }
}

struct Harness {
    bus: RelayBus,
    frames: Arc<ScriptedFrames>,
    provisioner: Arc<OffscreenDocumentProvisioner>,
    host: Arc<YieldingProvisioner>,
    coordinator: Arc<AuthRelayCoordinator>,
    session: Arc<SessionStore>,
    _intents: ListenerRegistration,
}

impl Harness {
    fn new(payload: &str) -> Self {
        Self::with_session(payload, SessionStore::new(Box::new(MemoryStorage::new())))
    }

    fn with_session(payload: &str, session: SessionStore) -> Self {
        let bus = RelayBus::new();
        let frames = Arc::new(ScriptedFrames::default());
        *frames.payload.lock() = payload.to_string();

        let settings = OffscreenSettings {
            document_path: "offscreen.html".to_string(),
            provider_url: format!("{PROVIDER_ORIGIN}/"),
            provider_origin: PROVIDER_ORIGIN.to_string(),
            provider_timeout: None,
            reason: OFFSCREEN_REASON.to_string(),
            justification: OFFSCREEN_JUSTIFICATION.to_string(),
        };
        let provisioner = Arc::new(OffscreenDocumentProvisioner::new(
            ContextRegistry::new(),
            bus.clone(),
            frames.clone(),
            settings,
        ));
        let host = Arc::new(YieldingProvisioner {
            inner: provisioner.clone(),
            creations: AtomicUsize::new(0),
        });
        let session = Arc::new(session);
        let coordinator = Arc::new(AuthRelayCoordinator::new(
            bus.clone(),
            EphemeralHostManager::new(host.clone()),
            session.clone(),
        ));
        let intents = coordinator.attach();

        Self {
            bus,
            frames,
            provisioner,
            host,
            coordinator,
            session,
            _intents: intents,
        }
    }

    fn view(&self) -> SessionView {
        SessionView::new(self.bus.clone(), self.session.clone())
    }

    fn embeds(&self) -> usize {
        self.frames.embeds.load(Ordering::SeqCst)
    }

    fn posts(&self) -> usize {
        self.frames.posts.load(Ordering::SeqCst)
    }

    fn creations(&self) -> usize {
        self.host.creations.load(Ordering::SeqCst)
    }
}

const ADA: &str = r#"{"user":{"uid":"u-1","email":"ada@example.com","displayName":"Ada"}}"#;

#[tokio::test]
async fn test_sign_in_from_popup_persists_identity() {
    let harness = Harness::new(ADA);
    let mut view = harness.view();
    assert!(!view.load().signed_in);

    let model = view.sign_in().await.unwrap().clone();
    assert!(model.signed_in);
    assert_eq!(model.status_text, "Signed in as: Ada");

    let stored = harness.session.load().unwrap().unwrap();
    assert_eq!(stored.id, "u-1");
    assert_eq!(stored.email.as_deref(), Some("ada@example.com"));
    assert_eq!(view.load().status_text, "Signed in as: Ada");
}

#[tokio::test]
async fn test_back_to_back_sign_ins_reuse_host() {
    let harness = Harness::new(ADA);

    harness.coordinator.sign_in().await.unwrap();
    harness.coordinator.sign_in().await.unwrap();

    assert_eq!(harness.embeds(), 1);
    assert_eq!(harness.posts(), 2);
    assert_eq!(harness.coordinator.host().state(), HostState::Ready);
}

#[tokio::test]
async fn test_concurrent_sign_ins_create_one_host() {
    let harness = Harness::new(ADA);

    let sign_ins = (0..5).map(|_| {
        let coordinator = harness.coordinator.clone();
        tokio::spawn(async move { coordinator.sign_in().await })
    });
    for result in join_all(sign_ins).await {
        assert_eq!(result.unwrap().unwrap().id, "u-1");
    }

    assert_eq!(harness.creations(), 1);
    assert_eq!(harness.embeds(), 1);
    assert_eq!(harness.posts(), 5);
}

#[tokio::test]
async fn test_malformed_identity_leaves_session_unchanged() {
    let harness = Harness::new(r#"{"user":{"email":"no-id@example.com"}}"#);
    let previous = Identity::new("u-0");
    harness.session.persist(&previous).unwrap();

    let result = harness.coordinator.sign_in().await;
    assert!(matches!(result, Err(AuthRelayError::MalformedPayload(_))));
    assert_eq!(harness.session.load().unwrap(), Some(previous));
}

#[tokio::test]
async fn test_host_quota_error_reaches_popup_verbatim() {
    let harness = Harness::new(ADA);
    *harness.frames.fail_with.lock() = Some("quota exceeded".to_string());
    let mut view = harness.view();

    let err = view.sign_in().await.unwrap_err();
    assert!(matches!(&err, AuthRelayError::SignInRejected(reason) if reason == "quota exceeded"));
    assert_eq!(harness.session.load().unwrap(), None);
    assert_eq!(harness.coordinator.host().state(), HostState::Absent);
}

#[tokio::test]
async fn test_sign_out_clears_and_is_idempotent() {
    let harness = Harness::new(ADA);
    let mut view = harness.view();
    view.sign_in().await.unwrap();

    assert!(!view.sign_out().await.signed_in);
    assert!(!view.sign_out().await.signed_in);
    assert_eq!(harness.session.load().unwrap(), None);
}

#[tokio::test]
async fn test_closed_host_is_recreated() {
    let harness = Harness::new(ADA);
    harness.coordinator.sign_in().await.unwrap();

    assert!(harness.provisioner.close_document());
    assert_eq!(harness.coordinator.host().state(), HostState::Ready);
    assert_eq!(harness.coordinator.host().refresh().await, HostState::Absent);

    harness.coordinator.sign_in().await.unwrap();
    assert_eq!(harness.embeds(), 2);
    assert_eq!(harness.creations(), 2);
}

#[tokio::test]
async fn test_file_backed_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let harness = Harness::with_session(
        ADA,
        SessionStore::new(Box::new(FileStorage::open(&path).unwrap())),
    );
    let identity = harness.coordinator.sign_in().await.unwrap();
    drop(harness);

    let reopened = SessionStore::new(Box::new(FileStorage::open(&path).unwrap()));
    assert_eq!(reopened.load().unwrap(), Some(identity));
}
