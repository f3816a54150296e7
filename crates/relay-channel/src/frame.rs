//! Embedded-frame messaging between the host document and the provider page.
//!
//! [`FrameWindow`] is the host document's message event target: the
//! provider page posts raw string payloads into it. [`ProviderFrame`] is the
//! other direction: the host posts commands to the embedded page.

use crate::{ChannelResult, ListenerRegistration};
use parking_lot::Mutex;
use relay_protocol_types::ProviderCommand;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// What a window listener wants after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerControl {
    /// Stay registered for further messages.
    Keep,
    /// Deregister now; later messages are not seen.
    Remove,
}

type WindowListener = Arc<dyn Fn(&str) -> ListenerControl + Send + Sync>;

#[derive(Default)]
struct WindowInner {
    listeners: Mutex<Vec<(u64, WindowListener)>>,
    next_id: AtomicU64,
}

impl WindowInner {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.listeners.lock().iter().any(|(listener_id, _)| *listener_id == id)
    }
}

/// Message event target of the host document.
#[derive(Clone, Default)]
pub struct FrameWindow {
    inner: Arc<WindowInner>,
}

impl FrameWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `message` listener.
    ///
    /// The listener is removed when it returns [`ListenerControl::Remove`]
    /// or when the returned registration is revoked, whichever is first.
    pub fn add_message_listener<F>(&self, listener: F) -> ListenerRegistration
    where
        F: Fn(&str) -> ListenerControl + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        trace!(listener_id = id, "Added window message listener");

        let inner: Weak<WindowInner> = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || match inner.upgrade() {
            Some(inner) => inner.remove(id),
            None => false,
        })
    }

    /// Deliver a message event to every registered listener.
    ///
    /// Returns how many listeners saw it. A listener removed by an earlier
    /// listener during the same dispatch is skipped.
    pub fn dispatch_message(&self, data: &str) -> usize {
        let snapshot: Vec<(u64, WindowListener)> = self.inner.listeners.lock().clone();
        let mut delivered = 0;

        for (id, listener) in snapshot {
            if !self.inner.contains(id) {
                continue;
            }
            delivered += 1;
            if listener(data) == ListenerControl::Remove {
                self.inner.remove(id);
                trace!(listener_id = id, "Window listener removed itself");
            }
        }

        if delivered == 0 {
            debug!("Window message had no listeners");
        }
        delivered
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

/// The provider page embedded in the host document.
pub trait ProviderFrame: Send + Sync {
    /// Origin of the page currently loaded in the frame.
    fn origin(&self) -> &str;

    /// Hand `command` to the page. Called only when the origin matched.
    fn deliver(&self, command: &ProviderCommand) -> ChannelResult<()>;

    /// Post `command` to the frame.
    ///
    /// A `target_origin` that does not match the loaded page drops the
    /// message silently, as a browser would. `"*"` matches any origin.
    fn post_message(&self, command: &ProviderCommand, target_origin: &str) -> ChannelResult<()> {
        if target_origin != "*" && target_origin != self.origin() {
            debug!(
                target_origin = %target_origin,
                frame_origin = %self.origin(),
                "Dropped message for mismatched origin"
            );
            return Ok(());
        }
        self.deliver(command)
    }
}
