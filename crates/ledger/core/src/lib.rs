//! Deterministic tag-stack ledger and inventory rules.
//!
//! `ledger-core` holds the canonical state machine for item ownership: tag
//! counters, the item catalog, inventory containers, ability-grant bindings,
//! claim-guarded interactions, spawners and the replication protocol. It does
//! no I/O and no logging. All authoritative mutation flows through
//! [`ReplicationAuthority`]; clients mirror containers with
//! [`ContainerReplica`].
pub mod authority;
pub mod catalog;
pub mod config;
pub mod delta;
pub mod error;
pub mod grants;
pub mod ids;
pub mod interaction;
pub mod inventory;
pub mod observer;
pub mod replica;
pub mod spawn;
pub mod stack;
pub mod tag;

pub use authority::{
    EffectEvent, MutationOutcome, MutationRequest, Outbox, ReplicationAuthority, Requester,
    SpawnFailure, TickReport,
};
pub use catalog::{ItemCatalog, ItemDefinition};
pub use config::LedgerConfig;
pub use delta::{DeltaLog, DeltaOp, ReplicationDelta};
pub use error::{ErrorSeverity, LedgerError, Result};
pub use grants::{AbilityGrantBinding, AbilitySink, GrantHandle};
pub use ids::{
    AbilityId, ActorId, ContainerId, InstanceAllocator, InstanceId, InteractableId, SpawnerId,
    TemplateId, Tick,
};
pub use interaction::{
    Interactable, InteractionClaim, InteractionEvent, InteractionPhase, InteractionSystem,
    PhaseKind, ReservationRegistry,
};
pub use inventory::{
    CapacityLimit, ContainerChange, ContainerPolicy, ContainerQuery, InventoryContainer,
    ItemInstance, SlotChange,
};
pub use observer::{ContainerMutation, MutationObserver, ObserverRegistry};
pub use replica::{ApplyOutcome, ContainerReplica, ContainerSnapshot};
pub use spawn::{SpawnDevice, SpawnOrder, SpawnerConfig};
pub use stack::{TagDelta, TagStack, TagStackChange, TagStackLedger};
pub use tag::Tag;
