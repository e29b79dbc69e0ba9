//! Utility types.

use crate::grammar::TerminalID;
use std::{cmp::Ordering, fmt, hash::Hash};

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A set of terminal symbols, iterated in ascending order of `TerminalID`.
#[derive(Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    /// Add all elements of `other`, and return whether this set has been changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let len = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != len
    }
    pub fn is_subset(&self, other: &Self) -> bool {
        self.inner.is_subset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner.iter().map(|raw| {
            // every element has been inserted from a `TerminalID`.
            TerminalID::from_raw(raw as u16)
        })
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

impl Extend<TerminalID> for TerminalSet {
    fn extend<I: IntoIterator<Item = TerminalID>>(&mut self, iter: I) {
        for t in iter {
            self.insert(t);
        }
    }
}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// The comparisons below only look at the elements, so that the capacity of
// the underlying bit vector never affects the identity of item sets.

impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for TerminalSet {}

impl PartialOrd for TerminalSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TerminalSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl Hash for TerminalSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for t in self.iter() {
            t.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_set_identity_ignores_capacity() {
        let mut a = TerminalSet::default();
        a.insert(TerminalID::from_raw(40));
        a.insert(TerminalID::from_raw(2));

        let b: TerminalSet = [TerminalID::from_raw(2), TerminalID::from_raw(40)]
            .into_iter()
            .collect();
        let mut c = TerminalSet::default();
        c.insert(TerminalID::from_raw(200));

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = Set::default();
        set.insert(a.clone());
        assert!(set.contains(&b));
    }

    #[test]
    fn union_reports_changes() {
        let mut a: TerminalSet = [TerminalID::from_raw(1)].into_iter().collect();
        let b: TerminalSet = [TerminalID::from_raw(1), TerminalID::from_raw(3)]
            .into_iter()
            .collect();
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), b.iter().collect::<Vec<_>>());
        assert!(b.is_subset(&a));
    }
}
