//! Unified error types surfaced by the runtime API.
//!
//! Wraps ledger rejections and worker coordination failures so clients can
//! bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use ledger_core::{ActorId, ErrorSeverity, LedgerError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("authority worker command channel closed")]
    CommandChannelClosed,

    #[error("authority worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("runtime worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("event bus closed")]
    EventBusClosed,

    #[error("runtime requires an item catalog before building")]
    MissingCatalog,

    #[error("agent provider for {actor} failed: {reason}")]
    Agent { actor: ActorId, reason: String },
}

impl RuntimeError {
    /// Ledger rejections carry their own severity; everything else is a
    /// broken runtime.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Ledger(error) => error.severity(),
            Self::Agent { .. } => ErrorSeverity::Validation,
            _ => ErrorSeverity::Fatal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(error) => error.error_code(),
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::EventBusClosed => "RUNTIME_EVENT_BUS_CLOSED",
            Self::MissingCatalog => "RUNTIME_MISSING_CATALOG",
            Self::Agent { .. } => "RUNTIME_AGENT_FAILED",
        }
    }

    pub fn requires_resync(&self) -> bool {
        matches!(self, Self::Ledger(error) if error.requires_resync())
    }

    /// The wrapped ledger rejection, if this is one.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(error) => Some(error),
            _ => None,
        }
    }
}
