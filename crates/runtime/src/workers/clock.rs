//! Periodic clock driver for the authority.
//!
//! Each period advances the authority by one tick, which expires stale claims
//! and lets due spawners fire. Without a clock worker the authority only
//! moves when someone calls [`AuthorityHandle::advance`].

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::api::AuthorityHandle;

pub struct ClockWorker {
    handle: AuthorityHandle,
    period: Duration,
    shutdown_rx: oneshot::Receiver<()>,
}

impl ClockWorker {
    pub fn new(
        handle: AuthorityHandle,
        period: Duration,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            handle,
            period,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!(
            target: "runtime::clock",
            period_ms = self.period.as_millis() as u64,
            "ClockWorker started"
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    debug!(target: "runtime::clock", "Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    match self.handle.advance(1).await {
                        Ok(report) => {
                            trace!(target: "runtime::clock", now = report.now, "Tick");
                            if !report.expired.is_empty() || !report.spawned.is_empty() {
                                debug!(
                                    target: "runtime::clock",
                                    now = report.now,
                                    expired = report.expired.len(),
                                    spawned = report.spawned.len(),
                                    failed = report.spawn_failures.len(),
                                    "Tick produced changes"
                                );
                            }
                        }
                        Err(error) => {
                            debug!(
                                target: "runtime::clock",
                                %error,
                                "Authority unavailable, stopping clock"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(target: "runtime::clock", "ClockWorker stopped");
    }
}
