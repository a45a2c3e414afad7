use super::{DeltaOp, ReplicationDelta};
use crate::ids::ContainerId;
use crate::inventory::ContainerChange;

/// Append-only delta log of one container.
#[derive(Clone, Debug)]
pub struct DeltaLog {
    container: ContainerId,
    entries: Vec<ReplicationDelta>,
}

impl DeltaLog {
    pub fn new(container: ContainerId) -> Self {
        Self {
            container,
            entries: Vec::new(),
        }
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Sequence number of the newest entry, 0 when empty.
    pub fn last_sequence(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Assigns the next sequence number to `change` and appends it.
    pub fn append(
        &mut self,
        op: DeltaOp,
        change: &ContainerChange,
        peer: Option<ContainerId>,
    ) -> &ReplicationDelta {
        let sequence = self.last_sequence() + 1;
        self.entries.push(ReplicationDelta::from_change(
            sequence,
            self.container,
            op,
            change,
            peer,
        ));
        &self.entries[self.entries.len() - 1]
    }

    /// Entries with a sequence number greater than `after`.
    pub fn since(&self, after: u64) -> &[ReplicationDelta] {
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn entries(&self) -> &[ReplicationDelta] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TemplateId;

    fn change(quantity: u32) -> ContainerChange {
        ContainerChange {
            template_id: TemplateId::from("Wood"),
            quantity,
            slots: Vec::new(),
            tag_deltas: Vec::new(),
            introduced: false,
            eliminated: false,
        }
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let mut log = DeltaLog::new(ContainerId(5));
        assert_eq!(log.append(DeltaOp::Add, &change(3), None).sequence, 1);
        assert_eq!(log.append(DeltaOp::Remove, &change(1), None).sequence, 2);
        let transfer = log.append(DeltaOp::Transfer, &change(2), Some(ContainerId(6)));
        assert_eq!(transfer.sequence, 3);
        assert_eq!(transfer.peer, Some(ContainerId(6)));

        let tail: Vec<u64> = log.since(1).iter().map(|delta| delta.sequence).collect();
        assert_eq!(tail, vec![2, 3]);
        assert!(log.since(3).is_empty());
        assert!(log.since(99).is_empty());
    }
}
