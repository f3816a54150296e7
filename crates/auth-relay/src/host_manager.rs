//! Single-flight provisioning of the ephemeral authentication host.
//!
//! At most one host exists at a time. Callers that race while a creation
//! attempt is in flight all await that same attempt and observe the same
//! outcome; a failed attempt is forgotten so the next call retries.

use crate::{AuthRelayError, AuthRelayResult};
use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Creates and inspects the hidden host document.
#[async_trait]
pub trait HostProvisioner: Send + Sync {
    /// Returns true if a live host context exists.
    async fn has_host(&self) -> bool;

    /// Create the host. Must not be called while another creation runs.
    async fn create_host(&self) -> AuthRelayResult<()>;
}

type CreationAttempt = Shared<BoxFuture<'static, Result<(), String>>>;

enum HostHandle {
    Absent,
    Pending(CreationAttempt),
    Ready,
}

impl HostHandle {
    fn summary(&self) -> HostState {
        match self {
            HostHandle::Absent => HostState::Absent,
            HostHandle::Pending(_) => HostState::Pending,
            HostHandle::Ready => HostState::Ready,
        }
    }
}

/// Externally visible summary of the host handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Absent,
    Pending,
    Ready,
}

/// Guarantees a single live host, created lazily.
pub struct EphemeralHostManager {
    provisioner: Arc<dyn HostProvisioner>,
    handle: Arc<Mutex<HostHandle>>,
}

impl EphemeralHostManager {
    pub fn new(provisioner: Arc<dyn HostProvisioner>) -> Self {
        Self {
            provisioner,
            handle: Arc::new(Mutex::new(HostHandle::Absent)),
        }
    }

    /// Suspend until a host is confirmed ready.
    ///
    /// Returns immediately when one already exists. Otherwise joins the
    /// in-flight creation attempt, or starts one.
    pub async fn ensure_host(&self) -> AuthRelayResult<()> {
        if self.provisioner.has_host().await {
            let mut handle = self.handle.lock();
            if matches!(*handle, HostHandle::Absent) {
                *handle = HostHandle::Ready;
            }
            return Ok(());
        }

        let attempt = {
            let mut handle = self.handle.lock();
            match &*handle {
                HostHandle::Pending(attempt) => {
                    debug!("Joining in-flight host creation");
                    attempt.clone()
                }
                HostHandle::Absent | HostHandle::Ready => {
                    let attempt = self.start_attempt();
                    *handle = HostHandle::Pending(attempt.clone());
                    attempt
                }
            }
        };

        attempt.await.map_err(AuthRelayError::HostCreationFailed)
    }

    /// Last observed handle state.
    ///
    /// A host torn down outside the manager still reads `Ready` until
    /// [`refresh`](Self::refresh) or the next [`ensure_host`](Self::ensure_host).
    pub fn state(&self) -> HostState {
        self.handle.lock().summary()
    }

    /// Re-check the provisioner and reconcile the handle with it.
    pub async fn refresh(&self) -> HostState {
        let exists = self.provisioner.has_host().await;
        let mut handle = self.handle.lock();
        match (&*handle, exists) {
            (HostHandle::Ready, false) => {
                debug!("Host went away");
                *handle = HostHandle::Absent;
            }
            (HostHandle::Absent, true) => *handle = HostHandle::Ready,
            _ => {}
        }
        handle.summary()
    }

    fn start_attempt(&self) -> CreationAttempt {
        let provisioner = self.provisioner.clone();
        let handle: Weak<Mutex<HostHandle>> = Arc::downgrade(&self.handle);

        async move {
            // A caller may have lost the race against an attempt that just
            // finished; the host it created is reused.
            let result = if provisioner.has_host().await {
                Ok(())
            } else {
                info!("Creating offscreen host");
                provisioner.create_host().await.map_err(|e| e.reason())
            };

            match &result {
                Ok(()) => info!("Offscreen host ready"),
                Err(reason) => warn!(reason = %reason, "Offscreen host creation failed"),
            }

            if let Some(handle) = handle.upgrade() {
                *handle.lock() = match result {
                    Ok(()) => HostHandle::Ready,
                    Err(_) => HostHandle::Absent,
                };
            }
            result
        }
        .boxed()
        .shared()
    }
}
