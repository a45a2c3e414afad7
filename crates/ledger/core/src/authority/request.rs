use std::collections::BTreeSet;

use crate::ids::{ActorId, ContainerId, InstanceId, InteractableId, TemplateId};
use crate::interaction::InteractionClaim;
use crate::tag::Tag;

/// Who is asking the authority to mutate state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Requester {
    /// Game logic running on the authority itself.
    Server,
    Actor(ActorId),
}

impl Requester {
    pub fn actor(&self) -> Option<ActorId> {
        match self {
            Self::Server => None,
            Self::Actor(actor) => Some(*actor),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum MutationRequest {
    Add {
        container: ContainerId,
        template: TemplateId,
        quantity: u32,
        instance_tags: BTreeSet<Tag>,
    },
    Remove {
        container: ContainerId,
        instance: InstanceId,
        quantity: u32,
    },
    Consume {
        container: ContainerId,
        template: TemplateId,
        quantity: u32,
    },
    /// Spends one unit of `instance`.
    Use {
        container: ContainerId,
        instance: InstanceId,
    },
    Transfer {
        source: ContainerId,
        target: ContainerId,
        instance: InstanceId,
        quantity: u32,
    },
    Claim {
        interactable: InteractableId,
    },
    Release {
        interactable: InteractableId,
    },
    /// Takes items out of a claimed interactable into `target`.
    ///
    /// `instance` defaults to the first slot of the interactable's container
    /// and `quantity` to that slot's whole stack.
    Interact {
        interactable: InteractableId,
        target: ContainerId,
        instance: Option<InstanceId>,
        quantity: Option<u32>,
    },
    /// Moves items into a new world pickup.
    Drop {
        container: ContainerId,
        instance: InstanceId,
        quantity: u32,
    },
}

impl MutationRequest {
    pub fn add(container: ContainerId, template: impl Into<TemplateId>, quantity: u32) -> Self {
        Self::Add {
            container,
            template: template.into(),
            quantity,
            instance_tags: BTreeSet::new(),
        }
    }

    pub fn pickup(interactable: InteractableId, target: ContainerId) -> Self {
        Self::Interact {
            interactable,
            target,
            instance: None,
            quantity: None,
        }
    }

    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Container the request primarily addresses, if any.
    pub fn container(&self) -> Option<ContainerId> {
        match self {
            Self::Add { container, .. }
            | Self::Remove { container, .. }
            | Self::Consume { container, .. }
            | Self::Use { container, .. }
            | Self::Drop { container, .. } => Some(*container),
            Self::Transfer { source, .. } => Some(*source),
            Self::Interact { target, .. } => Some(*target),
            Self::Claim { .. } | Self::Release { .. } => None,
        }
    }
}

/// Value returned by a successful request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MutationOutcome {
    /// Instances created or topped up by an add.
    Added(Vec<InstanceId>),
    /// Units removed, consumed or used.
    Removed(u32),
    Transferred {
        quantity: u32,
        /// Target instances that received the units.
        instances: Vec<InstanceId>,
    },
    Claimed(InteractionClaim),
    Released,
    Dropped {
        container: ContainerId,
        interactable: InteractableId,
    },
}
