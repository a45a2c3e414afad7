//! Replication deltas and the per-container outbound log.
//!
//! A [`ReplicationDelta`] describes one committed container mutation with
//! enough detail (post-mutation slot states and ledger deltas) for a client
//! replica to reproduce the authority's state exactly.
mod log;
#[cfg(feature = "serde")]
mod wire;

pub use log::DeltaLog;

use crate::ids::{ContainerId, TemplateId};
use crate::inventory::{ContainerChange, SlotChange};
use crate::stack::TagDelta;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeltaOp {
    Add,
    Remove,
    Transfer,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplicationDelta {
    /// Strictly increasing per container, starting at 1.
    pub sequence: u64,
    pub container: ContainerId,
    pub op: DeltaOp,
    pub template_id: TemplateId,
    pub quantity: u32,
    /// Signed ledger changes, in tag order.
    pub tag_deltas: Vec<TagDelta>,
    pub slots: Vec<SlotChange>,
    /// Other side of a transfer.
    pub peer: Option<ContainerId>,
}

impl ReplicationDelta {
    pub(crate) fn from_change(
        sequence: u64,
        container: ContainerId,
        op: DeltaOp,
        change: &ContainerChange,
        peer: Option<ContainerId>,
    ) -> Self {
        Self {
            sequence,
            container,
            op,
            template_id: change.template_id.clone(),
            quantity: change.quantity,
            tag_deltas: change.tag_deltas.clone(),
            slots: change.slots.clone(),
            peer,
        }
    }
}
