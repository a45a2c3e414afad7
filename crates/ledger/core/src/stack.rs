//! Tag-keyed counters.
//!
//! [`TagStackLedger`] maps tags to non-negative counts. Every mutation is
//! expressed as a [`TagDelta`] so the same change can be replayed on a replica
//! or negated for rollback. Removals never clamp: asking for more than is
//! present fails with [`LedgerError::InsufficientStack`] and leaves the ledger
//! untouched.
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Write as _;

use crate::error::{LedgerError, Result};
use crate::tag::{self, Tag};

/// One tag and its current count.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagStack {
    pub tag: Tag,
    pub count: u64,
}

/// Signed change to a single tag's count.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagDelta {
    pub tag: Tag,
    pub delta: i64,
}

impl TagDelta {
    pub fn new(tag: Tag, delta: i64) -> Self {
        Self { tag, delta }
    }

    pub fn negated(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            delta: -self.delta,
        }
    }
}

/// Old and new count of a tag after a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagStackChange {
    pub tag: Tag,
    pub old_count: u64,
    pub new_count: u64,
}

impl TagStackChange {
    pub fn delta(&self) -> i64 {
        self.new_count as i64 - self.old_count as i64
    }
}

/// Replicated mapping from tag to count. Tags with a zero count are not stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagStackLedger {
    stacks: BTreeMap<Tag, u64>,
}

impl TagStackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tag(&mut self, tag: &Tag, n: u64) -> Result<TagStackChange> {
        if n == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        let old_count = self.count(tag);
        let new_count = old_count.checked_add(n).ok_or(LedgerError::CountOverflow)?;
        self.stacks.insert(tag.clone(), new_count);
        Ok(TagStackChange {
            tag: tag.clone(),
            old_count,
            new_count,
        })
    }

    pub fn remove_tag(&mut self, tag: &Tag, n: u64) -> Result<TagStackChange> {
        if n == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        let old_count = self.count(tag);
        if n > old_count {
            return Err(LedgerError::InsufficientStack {
                requested: n,
                available: old_count,
            });
        }
        let new_count = old_count - n;
        if new_count == 0 {
            self.stacks.remove(tag);
        } else {
            self.stacks.insert(tag.clone(), new_count);
        }
        Ok(TagStackChange {
            tag: tag.clone(),
            old_count,
            new_count,
        })
    }

    /// Sets an absolute count; zero removes the tag.
    pub fn set_count(&mut self, tag: &Tag, n: u64) -> TagStackChange {
        let old_count = if n == 0 {
            self.stacks.remove(tag).unwrap_or(0)
        } else {
            self.stacks.insert(tag.clone(), n).unwrap_or(0)
        };
        TagStackChange {
            tag: tag.clone(),
            old_count,
            new_count: n,
        }
    }

    pub fn count(&self, tag: &Tag) -> u64 {
        self.stacks.get(tag).copied().unwrap_or(0)
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.stacks.contains_key(tag)
    }

    /// Every stored tag equal to or descending from `prefix`, in tag order.
    pub fn query(&self, prefix: &Tag) -> Vec<TagStack> {
        tag::subtree(&self.stacks, prefix)
            .map(|(tag, count)| TagStack {
                tag: tag.clone(),
                count: *count,
            })
            .collect()
    }

    /// Sum of counts over the subtree rooted at `prefix`.
    pub fn total(&self, prefix: &Tag) -> u64 {
        tag::subtree(&self.stacks, prefix)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn stacks(&self) -> impl Iterator<Item = TagStack> + '_ {
        self.stacks.iter().map(|(tag, count)| TagStack {
            tag: tag.clone(),
            count: *count,
        })
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Applies a batch of deltas atomically.
    ///
    /// The whole batch is checked against the current counts first (repeated
    /// tags are accumulated), so either every delta lands or none does.
    pub fn apply(&mut self, deltas: &[TagDelta]) -> Result<Vec<TagStackChange>> {
        let mut projected: BTreeMap<&Tag, (u64, i128)> = BTreeMap::new();
        for delta in deltas {
            let entry = projected
                .entry(&delta.tag)
                .or_insert_with(|| (self.count(&delta.tag), 0));
            entry.1 += i128::from(delta.delta);
        }

        for (old, net) in projected.values() {
            let new = i128::from(*old) + net;
            if new < 0 {
                return Err(LedgerError::InsufficientStack {
                    requested: net.unsigned_abs() as u64,
                    available: *old,
                });
            }
            if new > i128::from(u64::MAX) {
                return Err(LedgerError::CountOverflow);
            }
        }

        let changes = projected
            .into_iter()
            .filter(|(_, (_, net))| *net != 0)
            .map(|(tag, (old_count, net))| {
                let new_count = (i128::from(old_count) + net) as u64;
                (tag.clone(), old_count, new_count)
            })
            .collect::<Vec<_>>();

        Ok(changes
            .into_iter()
            .map(|(tag, old_count, new_count)| {
                match self.stacks.entry(tag.clone()) {
                    Entry::Occupied(mut slot) if new_count > 0 => {
                        slot.insert(new_count);
                    }
                    Entry::Occupied(slot) => {
                        slot.remove();
                    }
                    Entry::Vacant(slot) if new_count > 0 => {
                        slot.insert(new_count);
                    }
                    Entry::Vacant(_) => {}
                }
                TagStackChange {
                    tag,
                    old_count,
                    new_count,
                }
            })
            .collect())
    }

    /// Undoes a batch previously accepted by [`Self::apply`].
    pub fn revert(&mut self, deltas: &[TagDelta]) -> Result<Vec<TagStackChange>> {
        let negated: Vec<TagDelta> = deltas.iter().rev().map(TagDelta::negated).collect();
        self.apply(&negated)
    }

    /// `Tag xN` per line, for the debug overlay.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        for (tag, count) in &self.stacks {
            let _ = writeln!(out, "{tag} x{count}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(raw: &str) -> Tag {
        Tag::new(raw).unwrap()
    }

    #[test]
    fn add_and_remove_track_counts() {
        let wood = tag("Item.Resource.Wood");
        let mut ledger = TagStackLedger::new();

        let change = ledger.add_tag(&wood, 5).unwrap();
        assert_eq!((change.old_count, change.new_count), (0, 5));
        assert_eq!(change.delta(), 5);

        ledger.remove_tag(&wood, 3).unwrap();
        assert_eq!(ledger.count(&wood), 2);

        ledger.remove_tag(&wood, 2).unwrap();
        assert!(!ledger.contains(&wood));
        assert!(ledger.is_empty());
    }

    #[test]
    fn underflow_is_rejected_without_mutation() {
        let wood = tag("Item.Resource.Wood");
        let mut ledger = TagStackLedger::new();
        ledger.add_tag(&wood, 2).unwrap();

        let err = ledger.remove_tag(&wood, 5).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStack {
                requested: 5,
                available: 2
            }
        );
        assert_eq!(ledger.count(&wood), 2);
        assert_eq!(ledger.add_tag(&wood, 0), Err(LedgerError::InvalidQuantity));
    }

    #[test]
    fn prefix_query_lists_and_sums() {
        let mut ledger = TagStackLedger::new();
        ledger.add_tag(&tag("Item.Resource.Wood"), 4).unwrap();
        ledger.add_tag(&tag("Item.Resource.Stone"), 6).unwrap();
        ledger.add_tag(&tag("Item.Weapon.Sword"), 1).unwrap();

        let resources = ledger.query(&tag("Item.Resource"));
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].tag, tag("Item.Resource.Stone"));
        assert_eq!(ledger.total(&tag("Item.Resource")), 10);
        assert_eq!(ledger.total(&tag("Item")), 11);
        assert_eq!(ledger.total(&tag("Ability")), 0);
    }

    #[test]
    fn batch_apply_is_all_or_nothing() {
        let wood = tag("Item.Resource.Wood");
        let stone = tag("Item.Resource.Stone");
        let mut ledger = TagStackLedger::new();
        ledger.add_tag(&wood, 3).unwrap();

        let batch = vec![TagDelta::new(wood.clone(), -1), TagDelta::new(stone.clone(), -1)];
        assert!(ledger.apply(&batch).is_err());
        assert_eq!(ledger.count(&wood), 3);

        let batch = vec![
            TagDelta::new(wood.clone(), -3),
            TagDelta::new(stone.clone(), 2),
        ];
        let changes = ledger.apply(&batch).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(!ledger.contains(&wood));
        assert_eq!(ledger.count(&stone), 2);

        ledger.revert(&batch).unwrap();
        assert_eq!(ledger.count(&wood), 3);
        assert_eq!(ledger.count(&stone), 0);
    }

    #[test]
    fn set_count_and_debug_string() {
        let wood = tag("Item.Resource.Wood");
        let mut ledger = TagStackLedger::new();

        let change = ledger.set_count(&wood, 7);
        assert_eq!(change.delta(), 7);
        assert_eq!(ledger.debug_string(), "Item.Resource.Wood x7\n");

        let change = ledger.set_count(&wood, 0);
        assert_eq!((change.old_count, change.new_count), (7, 0));
        assert!(ledger.is_empty());
    }
}
