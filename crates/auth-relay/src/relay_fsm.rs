//! Per-intent sign-in state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌──────────────┐
//! │     Idle     │ (initial)
//! └──────┬───────┘
//!        │ SignInRequested
//!        ▼
//! ┌──────────────┐  HostFailed
//! │ HostEnsuring │ ─────────────────────┐
//! └──────┬───────┘                      │
//!        │ HostReady                    │
//!        ▼                              ▼
//! ┌──────────────┐  RequestFailed ┌──────────────┐
//! │  Requesting  │ ─────────────► │    Failed    │
//! └──────┬───────┘                └──────┬───────┘
//!        │ ReplyReceived                 │ Reported
//!        ▼                               ▼
//! ┌──────────────┐                     Idle
//! │  Persisting  │
//! └──────┬───────┘
//!        │ Persisted
//!        ▼
//!      Idle
//! ```

use rust_fsm::*;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub relay_machine(Idle)

    Idle => {
        SignInRequested => HostEnsuring
    },
    HostEnsuring => {
        HostReady => Requesting,
        HostFailed => Failed
    },
    Requesting => {
        ReplyReceived => Persisting,
        RequestFailed => Failed
    },
    Persisting => {
        // Persistence errors are reported, not fatal
        Persisted => Idle
    },
    Failed => {
        Reported => Idle
    }
}

pub use relay_machine::Input as RelayMachineInput;
pub use relay_machine::State as RelayMachineState;
pub use relay_machine::StateMachine as RelayMachine;
