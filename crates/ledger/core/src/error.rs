//! Error taxonomy for ledger-core.
//!
//! Every container-level operation is all-or-nothing: when one of these errors
//! is returned, no state visible to observers or replicas has changed.
//!
//! # Design Principles
//!
//! - **Severity Classification**: errors are grouped by recoverability so the
//!   runtime can pick a log level and the UI can decide what to surface
//! - **Stable Codes**: [`LedgerError::error_code`] never changes between releases
//!   and is safe to use in metrics and client-side localisation tables
//! - **Resync Signalling**: replica-side failures advertise themselves through
//!   [`LedgerError::requires_resync`] instead of being retried with stale state

use crate::ids::{ActorId, ContainerId, InstanceId, InteractableId, SpawnerId, TemplateId, Tick};
use crate::interaction::PhaseKind;
use crate::inventory::CapacityLimit;

pub type Result<T> = core::result::Result<T, LedgerError>;

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Expected gameplay condition; the caller may retry or pick another action.
    ///
    /// Examples: inventory full, not enough items, interactable already claimed
    Recoverable,

    /// Invalid input that should not be retried unchanged.
    ///
    /// Examples: unknown template, unauthorized request, zero quantity
    Validation,

    /// Unexpected inconsistency between two views of the same state.
    Internal,

    /// Unrecoverable configuration problem.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Errors raised by the ledger, catalog, containers, interactions and replicas.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("unknown item template '{0}'")]
    UnknownTemplate(TemplateId),

    #[error("item template '{0}' is already registered")]
    DuplicateTemplate(TemplateId),

    #[error("item catalog is sealed")]
    CatalogSealed,

    #[error("item catalog must be sealed before it is shared")]
    CatalogNotSealed,

    #[error("invalid definition for '{template}': {reason}")]
    InvalidDefinition {
        template: TemplateId,
        reason: &'static str,
    },

    #[error("{container} rejected the addition: {limit}")]
    CapacityExceeded {
        container: ContainerId,
        limit: CapacityLimit,
    },

    #[error("{instance} is not held by {container}")]
    UnknownInstance {
        container: ContainerId,
        instance: InstanceId,
    },

    #[error("insufficient stack: requested {requested}, available {available}")]
    InsufficientStack { requested: u64, available: u64 },

    #[error("stack count overflow")]
    CountOverflow,

    #[error("invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    #[error("unknown {0}")]
    UnknownContainer(ContainerId),

    #[error("unknown {0}")]
    UnknownInteractable(InteractableId),

    #[error("unknown {0}")]
    UnknownSpawner(SpawnerId),

    #[error("request not permitted: {reason}")]
    Unauthorized { reason: &'static str },

    #[error("{interactable} is already claimed by {holder}")]
    AlreadyClaimed {
        interactable: InteractableId,
        holder: ActorId,
    },

    #[error("claim on {interactable} expired at tick {expired_at}")]
    ClaimExpired {
        interactable: InteractableId,
        expired_at: Tick,
    },

    #[error("{actor} does not hold a claim on {interactable}")]
    NotClaimant {
        interactable: InteractableId,
        actor: ActorId,
    },

    #[error("{interactable} cannot {event} while {from}")]
    InvalidTransition {
        interactable: InteractableId,
        from: PhaseKind,
        event: &'static str,
    },

    #[error("cannot transfer from {0} into itself")]
    SelfTransfer(ContainerId),

    #[error("sequence gap on {container}: expected {expected}, received {received}")]
    SequenceGap {
        container: ContainerId,
        expected: u64,
        received: u64,
    },

    #[error("replica of {container} diverged: {reason}")]
    ReplicaDiverged {
        container: ContainerId,
        reason: String,
    },

    #[error("wire codec error: {0}")]
    Codec(String),
}

impl LedgerError {
    pub fn severity(&self) -> ErrorSeverity {
        use LedgerError::*;
        match self {
            // User-facing gameplay conditions ("inventory full", "already taken")
            CapacityExceeded { .. }
            | InsufficientStack { .. }
            | AlreadyClaimed { .. }
            | ClaimExpired { .. }
            | SequenceGap { .. } => ErrorSeverity::Recoverable,

            UnknownTemplate(_)
            | DuplicateTemplate(_)
            | CatalogSealed
            | InvalidDefinition { .. }
            | UnknownInstance { .. }
            | CountOverflow
            | InvalidTag { .. }
            | InvalidQuantity
            | UnknownContainer(_)
            | UnknownInteractable(_)
            | UnknownSpawner(_)
            | Unauthorized { .. }
            | NotClaimant { .. }
            | InvalidTransition { .. }
            | SelfTransfer(_) => ErrorSeverity::Validation,

            ReplicaDiverged { .. } | Codec(_) => ErrorSeverity::Internal,

            CatalogNotSealed => ErrorSeverity::Fatal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        use LedgerError::*;
        match self {
            UnknownTemplate(_) => "LEDGER_UNKNOWN_TEMPLATE",
            DuplicateTemplate(_) => "LEDGER_DUPLICATE_TEMPLATE",
            CatalogSealed => "LEDGER_CATALOG_SEALED",
            CatalogNotSealed => "LEDGER_CATALOG_NOT_SEALED",
            InvalidDefinition { .. } => "LEDGER_INVALID_DEFINITION",
            CapacityExceeded { .. } => "LEDGER_CAPACITY_EXCEEDED",
            UnknownInstance { .. } => "LEDGER_UNKNOWN_INSTANCE",
            InsufficientStack { .. } => "LEDGER_INSUFFICIENT_STACK",
            CountOverflow => "LEDGER_COUNT_OVERFLOW",
            InvalidTag { .. } => "LEDGER_INVALID_TAG",
            InvalidQuantity => "LEDGER_INVALID_QUANTITY",
            UnknownContainer(_) => "LEDGER_UNKNOWN_CONTAINER",
            UnknownInteractable(_) => "LEDGER_UNKNOWN_INTERACTABLE",
            UnknownSpawner(_) => "LEDGER_UNKNOWN_SPAWNER",
            Unauthorized { .. } => "LEDGER_UNAUTHORIZED",
            AlreadyClaimed { .. } => "LEDGER_ALREADY_CLAIMED",
            ClaimExpired { .. } => "LEDGER_CLAIM_EXPIRED",
            NotClaimant { .. } => "LEDGER_NOT_CLAIMANT",
            InvalidTransition { .. } => "LEDGER_INVALID_TRANSITION",
            SelfTransfer(_) => "LEDGER_SELF_TRANSFER",
            SequenceGap { .. } => "LEDGER_SEQUENCE_GAP",
            ReplicaDiverged { .. } => "LEDGER_REPLICA_DIVERGED",
            Codec(_) => "LEDGER_CODEC",
        }
    }

    /// True when the only correct recovery is a full snapshot refetch.
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            LedgerError::SequenceGap { .. } | LedgerError::ReplicaDiverged { .. }
        )
    }
}
