//! Binary wire encoding for replication deltas.
use super::ReplicationDelta;
use crate::error::{LedgerError, Result};

impl ReplicationDelta {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|err| LedgerError::Codec(err.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|err| LedgerError::Codec(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::delta::DeltaOp;
    use crate::ids::{ContainerId, InstanceId, TemplateId};
    use crate::inventory::SlotChange;
    use crate::stack::TagDelta;
    use crate::tag::Tag;

    #[test]
    fn transfer_delta_survives_the_wire() {
        let delta = ReplicationDelta {
            sequence: 12,
            container: ContainerId(3),
            op: DeltaOp::Transfer,
            template_id: TemplateId::from("Wood"),
            quantity: 4,
            tag_deltas: vec![TagDelta::new(Tag::new("Item.Resource.Wood").unwrap(), -4)],
            slots: vec![SlotChange {
                instance: InstanceId(9),
                template_id: TemplateId::from("Wood"),
                stack_count: 0,
                instance_tags: BTreeSet::new(),
            }],
            peer: Some(ContainerId(8)),
        };

        let bytes = delta.encode().unwrap();
        assert_eq!(ReplicationDelta::decode(&bytes).unwrap(), delta);
    }

    #[test]
    fn malformed_tags_are_rejected_on_decode() {
        let bytes = bincode::serialize(&String::from("Item..Wood")).unwrap();
        let err = bincode::deserialize::<Tag>(&bytes).unwrap_err();
        assert!(err.to_string().contains("empty segment"));
        assert!(matches!(
            ReplicationDelta::decode(&[1, 2, 3]),
            Err(LedgerError::Codec(_))
        ));
    }
}
