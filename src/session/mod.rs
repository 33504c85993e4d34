//! Per-stream lifecycle
//!
//! - [`LifecycleState`]: ordered states from `Init` to `Disconnected`
//! - [`transition`]: pure transition table driving those states
//! - [`PublishingClient`]: identity of the peer that published the source stream

pub mod context;
pub mod state;
pub mod transition;

pub use context::PublishingClient;
pub use state::LifecycleState;
pub use transition::{Action, Facts, LifecycleEvent, Step, Teardown};
