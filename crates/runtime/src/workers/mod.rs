//! Worker tasks that back the runtime orchestration.
//!
//! The authority worker serializes every ledger mutation; the clock worker
//! drives claim expiry and spawners at a fixed cadence.

mod authority;
mod clock;
mod metrics;

pub use authority::{AuthorityWorker, Command};
pub use clock::ClockWorker;
pub use metrics::{AuthorityMetrics, MetricsSnapshot};
