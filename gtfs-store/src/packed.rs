use crate::grouped::{sort_group, GroupedStore, Packable, ParentKey, StoreStats};
use lru::LruCache;
use rustc_hash::{FxHashMap, FxHashSet};
use std::borrow::Cow;
use std::num::NonZeroUsize;

/// Store for children mostly grouped by parent
///
/// A window of at most `max_interleaving` parents is kept open. When a new parent comes in and
/// the window is full, the parent that received a child the longest time ago is sorted and
/// packed. If children of a packed parent come in later, they are kept aside and merged at seal.
pub struct PackedStore<K: ParentKey, C: Packable<K>> {
    window: LruCache<K, Vec<C>>,
    packed: FxHashMap<K, C::Block>,
    late: FxHashMap<K, Vec<C>>,
    duplicated: FxHashSet<K>,
    stats: StoreStats,
    sealed: bool,
}

impl<K: ParentKey, C: Packable<K>> PackedStore<K, C> {
    /// Creates a store keeping at most `max_interleaving` open parents (at least one)
    pub fn new(max_interleaving: usize) -> Self {
        let capacity = NonZeroUsize::new(max_interleaving).unwrap_or(NonZeroUsize::MIN);
        Self {
            window: LruCache::new(capacity),
            packed: FxHashMap::default(),
            late: FxHashMap::default(),
            duplicated: FxHashSet::default(),
            stats: StoreStats::default(),
            sealed: false,
        }
    }

    fn flush(&mut self, parent: K, mut children: Vec<C>) {
        if sort_group(&mut children) {
            self.duplicated.insert(parent.clone());
        }
        self.packed.insert(parent, C::pack(&children));
    }

    /// Empties the store, group by group, to migrate to the unsorted layout
    ///
    /// A packed parent gives its packed children first, then its late ones, so that a stable
    /// sort keeps equal sequences in arrival order.
    pub(crate) fn drain_groups(&mut self) -> Vec<(K, Vec<C>)> {
        let mut groups = Vec::with_capacity(self.packed.len() + self.window.len());
        for (parent, block) in self.packed.drain() {
            let mut children = C::unpack(&parent, &block);
            if let Some(late) = self.late.remove(&parent) {
                children.extend(late);
            }
            groups.push((parent, children));
        }
        while let Some((parent, children)) = self.window.pop_lru() {
            groups.push((parent, children));
        }
        self.duplicated.clear();
        self.stats.children = 0;
        groups
    }
}

impl<K: ParentKey, C: Packable<K>> GroupedStore<K, C> for PackedStore<K, C> {
    fn append(&mut self, parent: K, child: C) {
        if self.sealed {
            log::error!("child appended to a sealed packed store, ignored");
            return;
        }
        self.stats.children += 1;
        if let Some(buffer) = self.window.get_mut(&parent) {
            buffer.push(child);
            return;
        }
        if self.packed.contains_key(&parent) {
            let late = self.late.entry(parent).or_default();
            if late.is_empty() {
                self.stats.late_recurrences += 1;
            }
            late.push(child);
            return;
        }
        if let Some((evicted, children)) = self.window.push(parent, vec![child]) {
            self.stats.forced_flushes += 1;
            self.flush(evicted, children);
        }
    }

    fn seal(&mut self) {
        if self.sealed {
            return;
        }
        while let Some((parent, children)) = self.window.pop_lru() {
            self.flush(parent, children);
        }
        for (parent, late) in std::mem::take(&mut self.late) {
            if let Some(block) = self.packed.get_mut(&parent) {
                let mut children = C::unpack(&parent, block);
                children.extend(late);
                if sort_group(&mut children) {
                    self.duplicated.insert(parent.clone());
                }
                *block = C::pack(&children);
                self.stats.merges += 1;
            }
        }
        self.stats.parents = self.packed.len();
        self.stats.duplicate_sequences = self.duplicated.len();
        self.stats.packed_bytes = self.packed.values().map(C::block_bytes).sum();
        self.sealed = true;
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn children_of(&self, parent: &K) -> Cow<'_, [C]> {
        if !self.sealed {
            return Cow::Borrowed(&[]);
        }
        match self.packed.get(parent) {
            Some(block) => Cow::Owned(C::unpack(parent, block)),
            None => Cow::Borrowed(&[]),
        }
    }

    fn parent_keys(&self) -> Vec<K> {
        self.packed.keys().cloned().collect()
    }

    fn count(&self) -> usize {
        self.stats.children
    }

    fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
