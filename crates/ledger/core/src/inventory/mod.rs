//! Item containers built on top of the tag-stack ledger.
//!
//! An [`InventoryContainer`] owns its item instances exclusively and keeps a
//! [`crate::TagStackLedger`] in lockstep with them: for every definition tag T,
//! the ledger count of T equals the summed stack counts of instances whose
//! definition carries T. Every operation validates first and commits second,
//! so a failed call leaves both the instances and the ledger untouched.
mod container;
mod instance;
mod policy;

pub use container::{
    ContainerChange, ContainerCheckpoint, ContainerQuery, InventoryContainer, TransferOutcome,
    transfer,
};
pub use instance::{ItemInstance, SlotChange};
pub use policy::{CapacityLimit, ContainerPolicy, ContainerUsage};
