//! Hierarchical dotted tags (`Item.Resource.Wood`).
//!
//! Tags are validated on construction so that every stored tag has non-empty
//! segments made of `[A-Za-z0-9_]`. Every allowed character sorts above `.`,
//! which keeps a tag's descendants contiguous right after it in any ordered
//! index. [`subtree`] relies on that to answer prefix queries with one range
//! scan instead of a full pass over the key set.
use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::{LedgerError, Result};

pub const SEPARATOR: char = '.';

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Tag(String);

impl Tag {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Direct parent (`Item.Resource` for `Item.Resource.Wood`), `None` at the root.
    pub fn parent(&self) -> Option<Tag> {
        self.0
            .rfind(SEPARATOR)
            .map(|index| Tag(self.0[..index].to_owned()))
    }

    pub fn matches_exact(&self, other: &Tag) -> bool {
        self == other
    }

    /// True if `self` is strictly below `ancestor` in the hierarchy.
    pub fn is_descendant_of(&self, ancestor: &Tag) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(ancestor.as_str())
            && self.0[ancestor.0.len()..].starts_with(SEPARATOR)
    }

    /// Exact match or descendant: `Item.Resource.Wood` matches `Item.Resource`.
    pub fn matches(&self, prefix: &Tag) -> bool {
        self == prefix || self.is_descendant_of(prefix)
    }
}

fn validate(raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(LedgerError::InvalidTag {
            tag: raw.to_owned(),
            reason: "tag is empty",
        });
    }
    for segment in raw.split(SEPARATOR) {
        if segment.is_empty() {
            return Err(LedgerError::InvalidTag {
                tag: raw.to_owned(),
                reason: "empty segment",
            });
        }
        if !segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(LedgerError::InvalidTag {
                tag: raw.to_owned(),
                reason: "segments may only contain [A-Za-z0-9_]",
            });
        }
    }
    Ok(())
}

impl FromStr for Tag {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Tag::new(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Tag::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.0)
    }
}

/// Entries of `index` whose key is `prefix` or one of its descendants.
///
/// O(log n + k): seeks to `prefix` and stops at the first key outside the subtree.
pub fn subtree<'a, V>(
    index: &'a BTreeMap<Tag, V>,
    prefix: &'a Tag,
) -> impl Iterator<Item = (&'a Tag, &'a V)> + 'a {
    index
        .range((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(tag, _)| tag.matches(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(raw: &str) -> Tag {
        Tag::new(raw).unwrap()
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(Tag::new("").is_err());
        assert!(Tag::new("Item..Wood").is_err());
        assert!(Tag::new("Item.Wood.").is_err());
        assert!(Tag::new("Item.Wo-od").is_err());
        assert!(Tag::new("Item.Resource_2.Wood").is_ok());
    }

    #[test]
    fn hierarchy_matching() {
        let wood = tag("Item.Resource.Wood");
        let resource = tag("Item.Resource");

        assert!(wood.is_descendant_of(&resource));
        assert!(wood.matches(&resource));
        assert!(resource.matches(&resource));
        assert!(!resource.is_descendant_of(&resource));
        assert!(!tag("Item.ResourceX").matches(&resource));
        assert_eq!(wood.parent(), Some(resource));
        assert_eq!(tag("Item").parent(), None);
        assert_eq!(wood.depth(), 3);
    }

    #[test]
    fn subtree_stops_at_sibling_prefixes() {
        let mut index = BTreeMap::new();
        for (raw, n) in [
            ("Item.Resource", 1),
            ("Item.Resource.Stone", 2),
            ("Item.Resource.Wood", 3),
            ("Item.Resource2", 4),
            ("Item.ResourceX.Wood", 5),
            ("Item.Rare", 6),
        ] {
            index.insert(tag(raw), n);
        }

        let prefix = tag("Item.Resource");
        let hits: Vec<i32> = subtree(&index, &prefix).map(|(_, n)| *n).collect();
        assert_eq!(hits, vec![1, 2, 3]);

        let missing = tag("Item.Resource.Iron");
        assert_eq!(subtree(&index, &missing).count(), 0);
    }
}
