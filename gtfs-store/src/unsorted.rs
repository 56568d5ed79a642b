use crate::grouped::{sort_group, GroupedStore, ParentKey, Sequenced, StoreStats};
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Store keeping one open buffer per parent until seal
///
/// It uses more memory than [crate::PackedStore] but does not care about the order of the input.
pub struct UnsortedStore<K: ParentKey, C> {
    groups: FxHashMap<K, Vec<C>>,
    stats: StoreStats,
    sealed: bool,
}

impl<K: ParentKey, C> Default for UnsortedStore<K, C> {
    fn default() -> Self {
        Self {
            groups: FxHashMap::default(),
            stats: StoreStats::default(),
            sealed: false,
        }
    }
}

impl<K: ParentKey, C: Sequenced + Clone> UnsortedStore<K, C> {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes over groups of children, appended after the children already there
    pub(crate) fn absorb(&mut self, groups: Vec<(K, Vec<C>)>) {
        for (parent, children) in groups {
            self.stats.children += children.len();
            self.groups.entry(parent).or_default().extend(children);
        }
    }

    /// Keeps the history of the packed layout it replaces
    pub(crate) fn inherit(&mut self, previous: &StoreStats) {
        self.stats.forced_flushes = previous.forced_flushes;
        self.stats.late_recurrences = previous.late_recurrences;
        self.stats.migrated = true;
    }
}

impl<K: ParentKey, C: Sequenced + Clone> GroupedStore<K, C> for UnsortedStore<K, C> {
    fn append(&mut self, parent: K, child: C) {
        if self.sealed {
            log::error!("child appended to a sealed unsorted store, ignored");
            return;
        }
        self.stats.children += 1;
        self.groups.entry(parent).or_default().push(child);
    }

    fn seal(&mut self) {
        if self.sealed {
            return;
        }
        let mut duplicates = 0;
        for children in self.groups.values_mut() {
            if sort_group(children) {
                duplicates += 1;
            }
            children.shrink_to_fit();
        }
        self.stats.parents = self.groups.len();
        self.stats.duplicate_sequences = duplicates;
        self.sealed = true;
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn children_of(&self, parent: &K) -> Cow<'_, [C]> {
        if !self.sealed {
            return Cow::Borrowed(&[]);
        }
        match self.groups.get(parent) {
            Some(children) => Cow::Borrowed(children.as_slice()),
            None => Cow::Borrowed(&[]),
        }
    }

    fn parent_keys(&self) -> Vec<K> {
        self.groups.keys().cloned().collect()
    }

    fn count(&self) -> usize {
        self.stats.children
    }

    fn stats(&self) -> &StoreStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouped::fixtures::*;

    #[test]
    fn sorts_each_group() {
        let mut store = UnsortedStore::<String, Child>::new();
        feed(&mut store, &[("A", Some(3)), ("B", Some(1)), ("A", Some(1)), ("A", Some(2))]);
        assert!(seqs(&store, "A").is_empty());
        store.seal();
        assert_eq!(vec![Some(1), Some(2), Some(3)], seqs(&store, "A"));
        assert_eq!(vec![Some(1)], seqs(&store, "B"));
        assert_eq!(2, store.stats().parents);
    }

    #[test]
    fn seal_is_idempotent() {
        let mut store = UnsortedStore::<String, Child>::new();
        feed(&mut store, &[("A", Some(2)), ("A", Some(2)), ("A", Some(1))]);
        store.seal();
        let first: Vec<Child> = store.children_of(&"A".to_string()).into_owned();
        store.seal();
        assert_eq!(first, store.children_of(&"A".to_string()).into_owned());
        assert_eq!(vec![2, 0, 1], first.iter().map(|c| c.rank).collect::<Vec<_>>());
        assert_eq!(1, store.stats().duplicate_sequences);
    }
}
