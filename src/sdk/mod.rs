//! Capability provider integration.
//!
//! - `provider` defines the contract of the external recording engine
//! - `lifecycle` owns init/shutdown/reinit of the provider session
//! - `commands` is the request surface shared by every client transport
//! - `simulated` is an in-process engine for local runs and tests

pub mod commands;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod simulated;

pub use commands::{CommandReply, SdkRequest, SdkService, StatusReport};
pub use error::SdkError;
pub use lifecycle::{
    InitOutcome, LifecycleController, LifecycleState, ReconfigureOutcome, RuntimeSnapshot,
    ShutdownOutcome,
};
pub use provider::{CapabilityProvider, EventHandler, InitParams, Permission};
pub use simulated::{ProviderCall, SimulatedProvider};
