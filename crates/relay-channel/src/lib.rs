//! Cross-context messaging.
//!
//! This crate provides:
//! - A runtime message bus with one-shot, correlated replies
//! - Registry of live execution contexts
//! - Embedded-frame messaging towards the provider page
//!
//! Contexts share nothing but these channels. A request is matched with
//! exactly one reply through its [`Responder`], or fails with a
//! [`ChannelError`] once every responder is gone.

mod bus;
mod contexts;
mod error;
mod frame;
mod registration;

pub use bus::{ContextKind, MessageBus, Responder};
pub use contexts::{ContextHandle, ContextInfo, ContextRegistry};
pub use error::{ChannelError, ChannelResult};
pub use frame::{FrameWindow, ListenerControl, ProviderFrame};
pub use registration::ListenerRegistration;
