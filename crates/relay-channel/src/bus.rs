//! Runtime message bus between execution contexts.
//!
//! ## Delivery
//!
//! A request is offered to every listener in another context whose
//! predicate accepts it. Each accepting listener gets its own
//! [`Responder`] for the same request; the first answer wins.
//!
//! 1. Listener keeps its responder (moves it into a task): the reply is
//!    awaited, "I will answer later"
//! 2. Listener drops its responder: it declined to answer
//! 3. All responders dropped unanswered: the sender gets `PortClosed`
//!
//! Every listener runs on its own task, so a slow handler never stalls the
//! sender or other contexts.

use crate::{ChannelError, ChannelResult, ListenerRegistration};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// Execution context a listener lives in or a message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Persistent coordinator.
    Background,
    /// Hidden document hosting the provider flow.
    Offscreen,
    /// User-facing popup.
    Popup,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::Background => "background",
            ContextKind::Offscreen => "offscreen",
            ContextKind::Popup => "popup",
        };
        f.write_str(name)
    }
}

struct ReplySlot<R> {
    tx: Mutex<Option<oneshot::Sender<R>>>,
}

/// One-shot handle for answering a single request.
///
/// Several handles may exist for one request (one per accepting listener);
/// only the first `respond` is delivered. Dropping every handle without
/// answering closes the port.
pub struct Responder<R> {
    slot: Arc<ReplySlot<R>>,
}

impl<R> Responder<R> {
    /// Answer the request.
    ///
    /// Fails with `AlreadyAnswered` if another handle answered first, or
    /// `RequesterGone` if the sender stopped waiting.
    pub fn respond(self, reply: R) -> ChannelResult<()> {
        let tx = self
            .slot
            .tx
            .lock()
            .take()
            .ok_or(ChannelError::AlreadyAnswered)?;
        tx.send(reply).map_err(|_| ChannelError::RequesterGone)
    }

    /// Returns true once any handle of this request has answered.
    pub fn is_answered(&self) -> bool {
        self.slot.tx.lock().is_none()
    }
}

impl<R> fmt::Debug for Responder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("answered", &self.is_answered())
            .finish()
    }
}

struct Envelope<M, R> {
    message: M,
    responder: Responder<R>,
}

type Predicate<M> = Box<dyn Fn(&M) -> bool + Send + Sync>;

struct Listener<M, R> {
    id: u64,
    context: ContextKind,
    predicate: Predicate<M>,
    queue: mpsc::UnboundedSender<Envelope<M, R>>,
}

struct BusInner<M, R> {
    listeners: RwLock<Vec<Arc<Listener<M, R>>>>,
    next_id: AtomicU64,
}

impl<M, R> BusInner<M, R> {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }
}

/// Extension-style runtime messaging shared by all contexts.
pub struct MessageBus<M, R> {
    inner: Arc<BusInner<M, R>>,
}

impl<M, R> Clone for MessageBus<M, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M, R> Default for MessageBus<M, R>
where
    M: Clone + fmt::Debug + Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, R> MessageBus<M, R>
where
    M: Clone + fmt::Debug + Send + 'static,
    R: Send + 'static,
{
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener for messages accepted by `predicate`.
    ///
    /// The handler runs on a dedicated task for `context`. Must be called
    /// from within a tokio runtime.
    pub fn on_message<P, H>(
        &self,
        context: ContextKind,
        predicate: P,
        handler: H,
    ) -> ListenerRegistration
    where
        P: Fn(&M) -> bool + Send + Sync + 'static,
        H: Fn(M, Responder<R>) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (queue, mut rx) = mpsc::unbounded_channel::<Envelope<M, R>>();

        self.inner.listeners.write().push(Arc::new(Listener {
            id,
            context,
            predicate: Box::new(predicate),
            queue,
        }));

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                handler(envelope.message, envelope.responder);
            }
            trace!(listener_id = id, context = %context, "Listener loop stopped");
        });

        debug!(listener_id = id, context = %context, "Registered runtime listener");

        let inner: Weak<BusInner<M, R>> = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || match inner.upgrade() {
            Some(inner) => inner.remove(id),
            None => false,
        })
    }

    /// Send `message` to any listener outside `from` and await the reply.
    pub async fn request(&self, from: ContextKind, message: M) -> ChannelResult<R> {
        self.dispatch(from, None, message).await
    }

    /// Send `message` only to listeners of `target` and await the reply.
    pub async fn send(
        &self,
        from: ContextKind,
        target: ContextKind,
        message: M,
    ) -> ChannelResult<R> {
        self.dispatch(from, Some(target), message).await
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    async fn dispatch(
        &self,
        from: ContextKind,
        target: Option<ContextKind>,
        message: M,
    ) -> ChannelResult<R> {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(ReplySlot {
            tx: Mutex::new(Some(tx)),
        });

        let receivers: Vec<Arc<Listener<M, R>>> = self
            .inner
            .listeners
            .read()
            .iter()
            .filter(|l| l.context != from)
            .filter(|l| target.map_or(true, |t| l.context == t))
            .filter(|l| (l.predicate)(&message))
            .cloned()
            .collect();

        let mut delivered = 0usize;
        for listener in receivers {
            let envelope = Envelope {
                message: message.clone(),
                responder: Responder { slot: slot.clone() },
            };
            if listener.queue.send(envelope).is_ok() {
                delivered += 1;
            }
        }
        drop(slot);

        if delivered == 0 {
            debug!(from = %from, ?message, "No receiver for runtime message");
            return Err(ChannelError::NoReceiver);
        }

        trace!(from = %from, receivers = delivered, ?message, "Dispatched runtime message");
        rx.await.map_err(|_| ChannelError::PortClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    type TestBus = MessageBus<String, String>;

    #[tokio::test]
    async fn test_request_gets_inline_reply() {
        let bus = TestBus::new();
        let _registration = bus.on_message(
            ContextKind::Background,
            |m| m == "ping",
            |_, responder| {
                responder.respond("pong".to_string()).unwrap();
            },
        );

        let reply = bus.request(ContextKind::Popup, "ping".to_string()).await;
        assert_eq!(reply, Ok("pong".to_string()));
    }

    #[tokio::test]
    async fn test_deferred_reply_is_delivered() {
        let bus = TestBus::new();
        let _registration = bus.on_message(
            ContextKind::Offscreen,
            |_| true,
            |message, responder| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    let _ = responder.respond(format!("late {message}"));
                });
            },
        );

        let reply = bus.request(ContextKind::Background, "hello".to_string()).await;
        assert_eq!(reply, Ok("late hello".to_string()));
    }

    #[tokio::test]
    async fn test_no_matching_listener_is_rejected() {
        let bus = TestBus::new();
        let _registration = bus.on_message(ContextKind::Background, |m| m == "a", |_, _| {});

        let reply = bus.request(ContextKind::Popup, "b".to_string()).await;
        assert_eq!(reply, Err(ChannelError::NoReceiver));
    }

    #[tokio::test]
    async fn test_sender_context_does_not_receive_own_message() {
        let bus = TestBus::new();
        let _registration = bus.on_message(
            ContextKind::Background,
            |_| true,
            |_, responder| {
                let _ = responder.respond("self".to_string());
            },
        );

        let reply = bus.request(ContextKind::Background, "x".to_string()).await;
        assert_eq!(reply, Err(ChannelError::NoReceiver));
    }

    #[tokio::test]
    async fn test_dropped_responder_closes_port() {
        let bus = TestBus::new();
        let _registration = bus.on_message(ContextKind::Offscreen, |_| true, |_, responder| {
            drop(responder);
        });

        let reply = bus.request(ContextKind::Background, "x".to_string()).await;
        assert_eq!(reply, Err(ChannelError::PortClosed));
    }

    #[tokio::test]
    async fn test_second_answer_is_rejected_and_not_delivered() {
        let bus = TestBus::new();
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let outcomes = outcomes.clone();
            let _registration =
                bus.on_message(ContextKind::Offscreen, |_| true, move |_, responder| {
                    let outcomes = outcomes.clone();
                    tokio::spawn(async move {
                        if label == "second" {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                        }
                        let result = responder.respond(label.to_string());
                        outcomes.lock().push((label, result));
                    });
                });
        }

        let reply = bus.request(ContextKind::Background, "x".to_string()).await;
        assert_eq!(reply, Ok("first".to_string()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let outcomes = outcomes.lock();
        assert!(outcomes.contains(&("first", Ok(()))));
        assert!(outcomes.contains(&("second", Err(ChannelError::AlreadyAnswered))));
    }

    #[tokio::test]
    async fn test_send_targets_one_context() {
        let bus = TestBus::new();
        let _popup = bus.on_message(ContextKind::Popup, |_| true, |_, responder| {
            let _ = responder.respond("popup".to_string());
        });
        let _offscreen = bus.on_message(ContextKind::Offscreen, |_| true, |_, responder| {
            let _ = responder.respond("offscreen".to_string());
        });

        let reply = bus
            .send(ContextKind::Background, ContextKind::Offscreen, "x".to_string())
            .await;
        assert_eq!(reply, Ok("offscreen".to_string()));
    }

    #[tokio::test]
    async fn test_revoked_listener_stops_receiving() {
        let bus = TestBus::new();
        let registration = bus.on_message(ContextKind::Offscreen, |_| true, |_, responder| {
            let _ = responder.respond("ok".to_string());
        });
        assert_eq!(bus.listener_count(), 1);

        assert!(registration.revoke());
        assert!(!registration.revoke());
        assert_eq!(bus.listener_count(), 0);

        let reply = bus.request(ContextKind::Background, "x".to_string()).await;
        assert_eq!(reply, Err(ChannelError::NoReceiver));
    }

    #[tokio::test]
    async fn test_each_request_is_correlated_with_its_own_reply() {
        let bus = TestBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let _registration = bus.on_message(ContextKind::Offscreen, |_| true, {
            let seen = seen.clone();
            move |message: String, responder| {
                seen.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    // Answer in reverse submission order.
                    let n: u64 = message.parse().unwrap();
                    tokio::time::sleep(Duration::from_millis(50 - n * 10)).await;
                    let _ = responder.respond(format!("reply-{message}"));
                });
            }
        });

        let requests = (0..5).map(|n| bus.request(ContextKind::Background, n.to_string()));
        let replies = join_all(requests).await;

        for (n, reply) in replies.into_iter().enumerate() {
            assert_eq!(reply, Ok(format!("reply-{n}")));
        }
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_late_answer_after_requester_gone() {
        let bus = TestBus::new();
        let (result_tx, result_rx) = oneshot::channel();
        let result_tx = Arc::new(Mutex::new(Some(result_tx)));
        let _registration = bus.on_message(ContextKind::Offscreen, |_| true, move |_, responder| {
            let result_tx = result_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let result = responder.respond("late".to_string());
                if let Some(tx) = result_tx.lock().take() {
                    let _ = tx.send(result);
                }
            });
        });

        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            bus.request(ContextKind::Background, "x".to_string()),
        )
        .await;
        assert!(timed_out.is_err());

        assert_eq!(result_rx.await.unwrap(), Err(ChannelError::RequesterGone));
    }
}
