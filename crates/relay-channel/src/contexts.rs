//! Registry of live execution contexts.
//!
//! The equivalent of asking the runtime which documents are currently
//! open. A context stays listed for as long as its [`ContextHandle`] lives.

use crate::ContextKind;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// A live execution context as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub id: u64,
    pub kind: ContextKind,
    pub url: String,
}

#[derive(Default)]
struct RegistryInner {
    contexts: Mutex<BTreeMap<u64, ContextInfo>>,
    next_id: AtomicU64,
}

/// Shared registry of open contexts.
#[derive(Clone, Default)]
pub struct ContextRegistry {
    inner: Arc<RegistryInner>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened context. It is listed until the handle drops.
    pub fn open(&self, kind: ContextKind, url: impl Into<String>) -> ContextHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let info = ContextInfo {
            id,
            kind,
            url: url.into(),
        };
        debug!(context_id = id, kind = %kind, url = %info.url, "Context opened");
        self.inner.contexts.lock().insert(id, info);

        ContextHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// All contexts currently open, in opening order.
    pub fn match_all(&self) -> Vec<ContextInfo> {
        self.inner.contexts.lock().values().cloned().collect()
    }

    /// Returns true if an open context's URL ends with `suffix`.
    pub fn has_url_suffix(&self, suffix: &str) -> bool {
        self.inner
            .contexts
            .lock()
            .values()
            .any(|c| c.url.ends_with(suffix))
    }
}

/// Lifetime of one open context.
#[derive(Debug)]
pub struct ContextHandle {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl ContextHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.contexts.lock().remove(&self.id);
            debug!(context_id = self.id, "Context closed");
        }
    }
}
