//! Topic-based event bus for authority output.
//!
//! The authority worker publishes every drained delta, effect and interaction
//! change to its topic; replicas, presentation layers and ability systems
//! subscribe only to what they consume.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::AbilityEvent;
