//! Client-side replica session.
//!
//! A [`ReplicaSession`] mirrors a chosen set of containers from the
//! replication topic. It subscribes before fetching any snapshot so no delta
//! can fall between the two; deltas the snapshot already covers are stale and
//! dropped. A sequence gap, a diverged replica or a lagging subscription
//! triggers a full snapshot refetch, never a partial reconstruction.

use std::collections::BTreeMap;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, info, warn};

use ledger_core::{ApplyOutcome, ContainerId, ContainerReplica, LedgerError, ReplicationDelta};

use crate::api::{AuthorityHandle, Result, RuntimeError};
use crate::events::{Event, Topic};

/// What happened to one incoming delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Applied,
    /// Already covered by the replica's sequence.
    Stale,
    /// The replica was rebuilt from a fresh snapshot.
    Resynced,
    /// Addressed to a container this session does not mirror.
    Untracked,
}

pub struct ReplicaSession {
    handle: AuthorityHandle,
    deltas: broadcast::Receiver<Event>,
    replicas: BTreeMap<ContainerId, ContainerReplica>,
    resyncs: u64,
}

impl ReplicaSession {
    pub fn new(handle: AuthorityHandle) -> Self {
        let deltas = handle.subscribe(Topic::Replication);
        Self {
            handle,
            deltas,
            replicas: BTreeMap::new(),
            resyncs: 0,
        }
    }

    /// Start mirroring `container` from a fresh snapshot.
    pub async fn track(&mut self, container: ContainerId) -> Result<&ContainerReplica> {
        let snapshot = self.handle.snapshot(container).await?;
        debug!(
            target: "runtime::replica",
            container = %container,
            sequence = snapshot.sequence,
            "Tracking container"
        );
        let replica = ContainerReplica::from_snapshot(snapshot);
        self.replicas.insert(container, replica);
        Ok(&self.replicas[&container])
    }

    pub fn untrack(&mut self, container: ContainerId) -> Option<ContainerReplica> {
        self.replicas.remove(&container)
    }

    pub fn replica(&self, container: ContainerId) -> Option<&ContainerReplica> {
        self.replicas.get(&container)
    }

    pub fn tracked(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.replicas.keys().copied()
    }

    /// Number of snapshot refetches performed after tracking began.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// Apply one delta, resynchronizing if it does not fit.
    ///
    /// Exposed so deltas can also arrive through another transport.
    pub async fn ingest(&mut self, delta: &ReplicationDelta) -> Result<SyncStatus> {
        let container = delta.container;
        let outcome = match self.replicas.get_mut(&container) {
            Some(replica) => replica.apply(delta),
            None => return Ok(SyncStatus::Untracked),
        };

        match outcome {
            Ok(ApplyOutcome::Applied) => Ok(SyncStatus::Applied),
            Ok(ApplyOutcome::Stale) => Ok(SyncStatus::Stale),
            Err(error @ LedgerError::SequenceGap { .. }) => {
                debug!(
                    target: "runtime::replica",
                    container = %container,
                    %error,
                    "Sequence gap, requesting snapshot"
                );
                self.resync(container).await?;
                Ok(SyncStatus::Resynced)
            }
            Err(error) if error.requires_resync() => {
                warn!(
                    target: "runtime::replica",
                    container = %container,
                    error_code = error.error_code(),
                    %error,
                    "Replica diverged, requesting snapshot"
                );
                self.resync(container).await?;
                Ok(SyncStatus::Resynced)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Apply every delta already waiting on the bus. Returns how many were
    /// applied incrementally.
    pub async fn sync(&mut self) -> Result<usize> {
        let mut applied = 0;
        loop {
            match self.deltas.try_recv() {
                Ok(Event::Delta(delta)) => {
                    if self.ingest(&delta).await? == SyncStatus::Applied {
                        applied += 1;
                    }
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => self.recover_from_lag(skipped).await?,
                Err(TryRecvError::Closed) => return Err(RuntimeError::EventBusClosed),
            }
        }
        Ok(applied)
    }

    /// Wait for the next delta that changes a tracked container.
    pub async fn next(&mut self) -> Result<ContainerId> {
        loop {
            match self.deltas.recv().await {
                Ok(Event::Delta(delta)) => match self.ingest(&delta).await? {
                    SyncStatus::Applied | SyncStatus::Resynced => return Ok(delta.container),
                    SyncStatus::Stale | SyncStatus::Untracked => {}
                },
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.recover_from_lag(skipped).await?,
                Err(RecvError::Closed) => return Err(RuntimeError::EventBusClosed),
            }
        }
    }

    /// Replace a replica with the authority's current snapshot.
    ///
    /// A container that no longer exists is dropped from the session.
    pub async fn resync(&mut self, container: ContainerId) -> Result<()> {
        let snapshot = match self.handle.resync_snapshot(container).await {
            Ok(snapshot) => snapshot,
            Err(RuntimeError::Ledger(LedgerError::UnknownContainer(_))) => {
                info!(
                    target: "runtime::replica",
                    container = %container,
                    "Container gone, untracking"
                );
                self.replicas.remove(&container);
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        let sequence = snapshot.sequence;
        match self.replicas.get_mut(&container) {
            Some(replica) => replica.resync(snapshot)?,
            None => {
                self.replicas
                    .insert(container, ContainerReplica::from_snapshot(snapshot));
            }
        }
        self.resyncs += 1;
        debug!(
            target: "runtime::replica",
            container = %container,
            sequence,
            "Replica resynchronized"
        );
        Ok(())
    }

    async fn recover_from_lag(&mut self, skipped: u64) -> Result<()> {
        warn!(
            target: "runtime::replica",
            skipped,
            tracked = self.replicas.len(),
            "Replication subscription lagged, resynchronizing all replicas"
        );
        let containers: Vec<ContainerId> = self.replicas.keys().copied().collect();
        for container in containers {
            self.resync(container).await?;
        }
        Ok(())
    }
}
