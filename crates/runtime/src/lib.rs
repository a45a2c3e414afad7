//! Async host for the replication authority.
//!
//! Runs the authority on a single worker task so every request is applied in
//! arrival order, fans its output out over a topic-based event bus, and gives
//! clients replica sessions that recover from gaps with full snapshots.
pub mod abilities;
pub mod api;
pub mod events;
pub mod replica;
pub mod runtime;

mod workers;

pub use abilities::BusAbilitySink;
pub use api::{
    AgentContext, AgentProvider, AuthorityHandle, Result, RuntimeError, ScavengerAgent,
    ScriptedAgent,
};
pub use events::{AbilityEvent, Event, EventBus, Topic};
pub use replica::{ReplicaSession, SyncStatus};
pub use runtime::{AgentStep, Runtime, RuntimeBuilder, RuntimeConfig};
pub use workers::{AuthorityMetrics, MetricsSnapshot};
