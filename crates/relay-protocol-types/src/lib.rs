//! Wire types shared by the background, offscreen, and popup contexts.
//!
//! Every message crossing a context boundary is plain JSON: live error
//! objects never cross, only tagged values.

mod identity;
mod messages;
mod provider;

pub use identity::Identity;
pub use messages::{ContextTarget, IntentReply, RuntimeMessage};
pub use provider::{parse_provider_payload, ProviderCommand};
