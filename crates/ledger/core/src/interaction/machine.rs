use crate::error::{LedgerError, Result};
use crate::ids::{ActorId, ContainerId, InteractableId, Tick};

/// Discriminant of [`InteractionPhase`], used in errors and events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum PhaseKind {
    Idle,
    Claimed,
    Transferring,
    Released,
    Expired,
}

/// Lifecycle of one interactable.
///
/// ```text
/// Idle -> Claimed -> Transferring -> Released -> Idle
///            |  \------------------> Released -> Idle   (voluntary release)
///            \--> Expired -> Idle                       (timeout)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractionPhase {
    Idle,
    Claimed { actor: ActorId, expiry: Tick },
    Transferring { actor: ActorId },
    Released { actor: ActorId },
    Expired { actor: ActorId },
}

impl InteractionPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Idle => PhaseKind::Idle,
            Self::Claimed { .. } => PhaseKind::Claimed,
            Self::Transferring { .. } => PhaseKind::Transferring,
            Self::Released { .. } => PhaseKind::Released,
            Self::Expired { .. } => PhaseKind::Expired,
        }
    }

    pub fn actor(&self) -> Option<ActorId> {
        match *self {
            Self::Idle => None,
            Self::Claimed { actor, .. }
            | Self::Transferring { actor }
            | Self::Released { actor }
            | Self::Expired { actor } => Some(actor),
        }
    }
}

/// Observable phase change of an interactable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionEvent {
    pub interactable: InteractableId,
    pub actor: Option<ActorId>,
    pub from: PhaseKind,
    pub to: PhaseKind,
}

/// World-placed object whose contents live in `source`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interactable {
    id: InteractableId,
    source: ContainerId,
    phase: InteractionPhase,
}

impl Interactable {
    pub fn new(id: InteractableId, source: ContainerId) -> Self {
        Self {
            id,
            source,
            phase: InteractionPhase::Idle,
        }
    }

    pub fn id(&self) -> InteractableId {
        self.id
    }

    pub fn source(&self) -> ContainerId {
        self.source
    }

    pub fn phase(&self) -> InteractionPhase {
        self.phase
    }

    fn transition(&mut self, to: InteractionPhase) -> InteractionEvent {
        let event = InteractionEvent {
            interactable: self.id,
            actor: to.actor().or(self.phase.actor()),
            from: self.phase.kind(),
            to: to.kind(),
        };
        self.phase = to;
        event
    }

    fn reject(&self, event: &'static str) -> LedgerError {
        LedgerError::InvalidTransition {
            interactable: self.id,
            from: self.phase.kind(),
            event,
        }
    }

    /// `Idle -> Claimed`, or a renewal by the current claimant.
    pub fn claim(&mut self, actor: ActorId, expiry: Tick) -> Result<InteractionEvent> {
        match self.phase {
            InteractionPhase::Idle => {
                Ok(self.transition(InteractionPhase::Claimed { actor, expiry }))
            }
            InteractionPhase::Claimed { actor: holder, .. } if holder == actor => {
                Ok(self.transition(InteractionPhase::Claimed { actor, expiry }))
            }
            _ => Err(self.reject("claim")),
        }
    }

    /// `Claimed -> Transferring`.
    pub fn begin_transfer(&mut self, actor: ActorId) -> Result<InteractionEvent> {
        match self.phase {
            InteractionPhase::Claimed { actor: holder, .. } if holder == actor => {
                Ok(self.transition(InteractionPhase::Transferring { actor }))
            }
            _ => Err(self.reject("transfer")),
        }
    }

    /// `Transferring -> Released`, whatever the transfer's result was.
    pub fn finish_transfer(&mut self) -> Result<InteractionEvent> {
        match self.phase {
            InteractionPhase::Transferring { actor } => {
                Ok(self.transition(InteractionPhase::Released { actor }))
            }
            _ => Err(self.reject("finish transfer")),
        }
    }

    /// `Claimed -> Released` at the claimant's request.
    pub fn release(&mut self, actor: ActorId) -> Result<InteractionEvent> {
        match self.phase {
            InteractionPhase::Claimed { actor: holder, .. } if holder == actor => {
                Ok(self.transition(InteractionPhase::Released { actor }))
            }
            _ => Err(self.reject("release")),
        }
    }

    /// `Claimed -> Expired`.
    pub fn expire(&mut self) -> Result<InteractionEvent> {
        match self.phase {
            InteractionPhase::Claimed { actor, .. } => {
                Ok(self.transition(InteractionPhase::Expired { actor }))
            }
            _ => Err(self.reject("expire")),
        }
    }

    /// `Released | Expired -> Idle`.
    pub fn recycle(&mut self) -> Result<InteractionEvent> {
        match self.phase {
            InteractionPhase::Released { .. } | InteractionPhase::Expired { .. } => {
                Ok(self.transition(InteractionPhase::Idle))
            }
            _ => Err(self.reject("recycle")),
        }
    }
}
