//! Revocable listener registrations.

use parking_lot::Mutex;
use std::fmt;

type RevokeFn = Box<dyn FnOnce() -> bool + Send>;

/// Token for a registered listener.
///
/// Revocation runs at most once no matter how many paths race to it
/// (first matching message, a timeout, teardown). Dropping the token does
/// not revoke; the listener stays registered until revoked or it removes
/// itself.
#[must_use = "a listener registration must be kept to revoke the listener later"]
pub struct ListenerRegistration {
    revoke: Mutex<Option<RevokeFn>>,
}

impl ListenerRegistration {
    /// Wrap a revocation action. The action reports whether it actually
    /// removed a live listener.
    pub fn new<F>(revoke: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        Self {
            revoke: Mutex::new(Some(Box::new(revoke))),
        }
    }

    /// Revoke the listener.
    ///
    /// Returns true only for the call that removed a still-registered
    /// listener. Later calls, or a listener that already removed itself,
    /// return false.
    pub fn revoke(&self) -> bool {
        let revoke = self.revoke.lock().take();
        match revoke {
            Some(revoke) => revoke(),
            None => false,
        }
    }

    /// Returns true until `revoke` has been called.
    pub fn is_pending(&self) -> bool {
        self.revoke.lock().is_some()
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_revoke_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registration = ListenerRegistration::new({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        assert!(registration.is_pending());
        assert!(registration.revoke());
        assert!(!registration.revoke());
        assert!(!registration.is_pending());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_revoke_reports_already_removed_listener() {
        let registration = ListenerRegistration::new(|| false);
        assert!(!registration.revoke());
    }
}
