//! Authentication relay between the background coordinator, the offscreen
//! host and the popup.
//!
//! This crate provides:
//! - Single-flight provisioning of the ephemeral host ([`EphemeralHostManager`])
//! - The background orchestrator ([`AuthRelayCoordinator`])
//! - The host side of the relay that drives the provider page ([`HostBridge`])
//! - An in-process offscreen document provisioner
//! - The popup presentation layer ([`SessionView`])

mod coordinator;
mod error;
mod host_bridge;
mod host_manager;
mod offscreen;
mod relay_fsm;
mod session_view;

pub use coordinator::{AuthRelayCoordinator, PersistenceObserver, RelayBus, RelayRequest};
pub use error::{AuthRelayError, AuthRelayResult};
pub use host_bridge::HostBridge;
pub use host_manager::{EphemeralHostManager, HostProvisioner, HostState};
pub use offscreen::{
    OffscreenDocumentProvisioner, OffscreenSettings, ProviderFrameFactory, EXTENSION_ORIGIN,
    OFFSCREEN_JUSTIFICATION, OFFSCREEN_REASON,
};
pub use relay_fsm::{RelayMachine, RelayMachineInput, RelayMachineState};
pub use session_view::{SessionView, SessionViewModel};
