use crate::delta::ReplicationDelta;
use crate::error::LedgerError;
use crate::ids::{ActorId, ContainerId, InteractableId, SpawnerId, TemplateId, Tick};
use crate::interaction::{InteractionClaim, InteractionEvent};

/// Fire-and-forget notification for presentation layers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectEvent {
    ItemPickedUp {
        actor: ActorId,
        interactable: InteractableId,
        container: ContainerId,
        template: TemplateId,
        quantity: u32,
    },
    ItemUsed {
        actor: Option<ActorId>,
        container: ContainerId,
        template: TemplateId,
    },
    ItemDropped {
        actor: Option<ActorId>,
        interactable: InteractableId,
        container: ContainerId,
        template: TemplateId,
        quantity: u32,
    },
}

/// Everything the authority produced since the last drain, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outbox {
    pub deltas: Vec<ReplicationDelta>,
    pub effects: Vec<EffectEvent>,
    pub interactions: Vec<InteractionEvent>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty() && self.effects.is_empty() && self.interactions.is_empty()
    }
}

/// A spawner activation that was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnFailure {
    pub spawner: SpawnerId,
    pub target: ContainerId,
    pub error: LedgerError,
}

/// Result of advancing the authority clock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub now: Tick,
    pub expired: Vec<InteractionClaim>,
    pub spawned: Vec<(SpawnerId, ContainerId, u32)>,
    pub spawn_failures: Vec<SpawnFailure>,
}
