//! Hierarchical keys.
//!
//! An hkey identifies a row's position in its group: one segment per level
//! from the root, each holding the table's ordinal followed by its primary
//! key values. Ordering hkeys segment by segment gives the storage order, with
//! a parent sorting directly before its descendants.

use std::fmt;

use arbor_types::ScalarValue;
use serde::{Deserialize, Serialize};

use crate::errors::{ExecutionError, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HKeySegment {
    pub ordinal: u32,
    pub values: Vec<ScalarValue>,
}

impl HKeySegment {
    pub fn new(ordinal: u32, values: impl IntoIterator<Item = ScalarValue>) -> Self {
        HKeySegment {
            ordinal,
            values: values.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HKey {
    segments: Vec<HKeySegment>,
}

impl HKey {
    pub fn new(segments: impl IntoIterator<Item = HKeySegment>) -> Self {
        HKey {
            segments: segments.into_iter().collect(),
        }
    }

    /// Key of a root row.
    pub fn root(ordinal: u32, values: impl IntoIterator<Item = ScalarValue>) -> Self {
        HKey::new([HKeySegment::new(ordinal, values)])
    }

    /// Key of a child row under this one.
    pub fn child(&self, ordinal: u32, values: impl IntoIterator<Item = ScalarValue>) -> Self {
        let mut key = self.clone();
        key.segments.push(HKeySegment::new(ordinal, values));
        key
    }

    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Depth of the table this key belongs to. Errors on an empty key.
    pub fn depth(&self) -> Result<u32> {
        match self.segments.len() {
            0 => Err(ExecutionError::MalformedHKey("empty hkey".to_string())),
            n => Ok((n - 1) as u32),
        }
    }

    /// Project this key onto the ancestor at `depth`.
    pub fn ancestor(&self, depth: u32) -> Result<HKey> {
        let len = depth as usize + 1;
        if len > self.segments.len() {
            return Err(ExecutionError::MalformedHKey(format!(
                "{self} has no ancestor at depth {depth}"
            )));
        }
        Ok(HKey {
            segments: self.segments[..len].to_vec(),
        })
    }

    /// Append an ordinal-only segment. The result sorts directly before every
    /// row of that table under this key.
    pub fn extend_with_ordinal(&mut self, ordinal: u32) {
        self.segments.push(HKeySegment::new(ordinal, []));
    }

    /// If `other` equals this key or lies in the subtree under it.
    ///
    /// The last segment may be partial. With no values it matches any
    /// segment carrying the same ordinal.
    pub fn is_prefix_of(&self, other: &HKey) -> bool {
        let Some((last, init)) = self.segments.split_last() else {
            return true;
        };
        if other.segments.len() < self.segments.len() {
            return false;
        }
        if other.segments[..init.len()] != *init {
            return false;
        }
        let candidate = &other.segments[init.len()];
        candidate.ordinal == last.ordinal && candidate.values.starts_with(&last.values)
    }
}

impl fmt::Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, seg) in self.segments.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "({}", seg.ordinal)?;
            for value in &seg.values {
                write!(f, ",{value}")?;
            }
            write!(f, ")")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> ScalarValue {
        ScalarValue::Int64(v)
    }

    #[test]
    fn parent_sorts_before_children() {
        let parent = HKey::root(1, [int(10)]);
        let child_a = parent.child(2, [int(1)]);
        let child_b = parent.child(3, [int(1)]);
        let next_parent = HKey::root(1, [int(11)]);

        let mut keys = vec![next_parent.clone(), child_b.clone(), parent.clone(), child_a.clone()];
        keys.sort();
        assert_eq!(vec![parent, child_a, child_b, next_parent], keys);
    }

    #[test]
    fn ancestor_projection() {
        let key = HKey::root(1, [int(10)]).child(2, [int(5)]).child(4, [int(7)]);
        assert_eq!(HKey::root(1, [int(10)]), key.ancestor(0).unwrap());
        assert_eq!(2, key.depth().unwrap());
        key.ancestor(3).unwrap_err();
    }

    #[test]
    fn ordinal_extension_is_prefix_of_branch() {
        let parent = HKey::root(1, [int(10)]);
        let mut branch = parent.clone();
        branch.extend_with_ordinal(2);

        let in_branch = parent.child(2, [int(1)]).child(5, [int(3)]);
        let sibling = parent.child(3, [int(1)]);

        assert!(branch.is_prefix_of(&in_branch));
        assert!(!branch.is_prefix_of(&sibling));
        assert!(!branch.is_prefix_of(&parent));
        assert!(branch > parent);
        assert!(branch < in_branch);
    }

    #[test]
    fn display() {
        let key = HKey::root(1, [int(10)]).child(2, [ScalarValue::from("a")]);
        assert_eq!("{(1,10),(2,a)}", key.to_string());
    }
}
