//! Parent → ordered children stores
//!
//! Rows of `stop_times.txt` and `shapes.txt` should be grouped by parent and sorted by sequence,
//! but nothing enforces it. The stores below accept them in any order and give, once sealed,
//! the children of a parent sorted by their own sequence number.
use std::borrow::Cow;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// A child record ordered by its own sequence number
pub trait Sequenced {
    /// Sequence number of the record, `None` if it was missing or invalid
    fn sequence(&self) -> Option<u32>;

    /// Key used to sort the children: a record without sequence goes last
    fn sort_key(&self) -> u32 {
        self.sequence().unwrap_or(u32::MAX)
    }
}

/// A child record that can be stored in a compact struct-of-arrays block
///
/// The parent key is not stored in the block, it is given back when unpacking.
pub trait Packable<K>: Sequenced + Clone {
    /// The compact encoding of a sorted run of children
    type Block: Send + Sync;

    /// Encodes a run of children of the same parent
    fn pack(run: &[Self]) -> Self::Block;

    /// Decodes a block, in the order it was packed
    fn unpack(parent: &K, block: &Self::Block) -> Vec<Self>;

    /// Number of children in the block
    fn block_len(block: &Self::Block) -> usize;

    /// Approximation of the heap memory used by the block
    fn block_bytes(block: &Self::Block) -> usize;
}

/// Keys of the parents: cheap to clone, hashable
pub trait ParentKey: Clone + Eq + Hash + Send + Sync {}

impl<T: Clone + Eq + Hash + Send + Sync> ParentKey for T {}

/// How the children are kept while loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    /// A window of open parents, the others are packed; for sorted input
    Packed,
    /// One open buffer per parent; for any input
    Unsorted,
    /// Starts packed, switches to unsorted if the input is not sorted enough
    #[default]
    Auto,
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "packed" => Ok(StoreMode::Packed),
            "unsorted" => Ok(StoreMode::Unsorted),
            "auto" => Ok(StoreMode::Auto),
            _ => Err(format!(
                "unknown store mode '{}', expected packed, unsorted or auto",
                s
            )),
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            StoreMode::Packed => "packed",
            StoreMode::Unsorted => "unsorted",
            StoreMode::Auto => "auto",
        })
    }
}

/// Settings of one grouped store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Layout of the store
    pub mode: StoreMode,
    /// Number of parents kept open by the packed layout
    pub max_interleaving: usize,
    /// Late recurrences tolerated by the auto mode before switching to the unsorted layout
    pub max_late_recurrences: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            mode: StoreMode::Auto,
            max_interleaving: 100,
            max_late_recurrences: 10,
        }
    }
}

/// What happened in a store, logged at seal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Children appended
    pub children: usize,
    /// Distinct parents, known after seal
    pub parents: usize,
    /// Open buffers packed to make room in the window
    pub forced_flushes: usize,
    /// Parents receiving children after being packed
    pub late_recurrences: usize,
    /// Packed blocks merged with their late children at seal
    pub merges: usize,
    /// Approximate heap size of the packed blocks, after seal
    pub packed_bytes: usize,
    /// Parents having at least two children with the same sequence number
    pub duplicate_sequences: usize,
    /// The auto mode switched to the unsorted layout
    pub migrated: bool,
}

/// Operations shared by the store layouts
pub trait GroupedStore<K, C: Clone> {
    /// Adds a child; never fails, ignored with an error log once sealed
    fn append(&mut self, parent: K, child: C);

    /// Sorts and finalizes every group; idempotent
    fn seal(&mut self);

    /// True once [GroupedStore::seal] was called
    fn is_sealed(&self) -> bool;

    /// Children of a parent sorted by sequence, empty if the parent is unknown or the store not sealed
    fn children_of(&self, parent: &K) -> Cow<'_, [C]>;

    /// Parents having at least one child
    fn parent_keys(&self) -> Vec<K>;

    /// Number of children
    fn count(&self) -> usize;

    /// Statistics of the store
    fn stats(&self) -> &StoreStats;
}

/// Stable sort of a group, returns true if two children share a sequence number
pub(crate) fn sort_group<C: Sequenced>(children: &mut [C]) -> bool {
    children.sort_by_key(Sequenced::sort_key);
    children.windows(2).any(|w| match (w[0].sequence(), w[1].sequence()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A child made of a sequence and an arrival rank, enough to check ordering and ties
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Child {
        pub seq: Option<u32>,
        pub rank: usize,
    }

    impl Sequenced for Child {
        fn sequence(&self) -> Option<u32> {
            self.seq
        }
    }

    pub struct ChildBlock {
        seqs: Vec<u32>,
        ranks: Vec<usize>,
    }

    impl Packable<String> for Child {
        type Block = ChildBlock;

        fn pack(run: &[Self]) -> ChildBlock {
            ChildBlock {
                seqs: run.iter().map(|c| c.seq.unwrap_or(u32::MAX)).collect(),
                ranks: run.iter().map(|c| c.rank).collect(),
            }
        }

        fn unpack(_parent: &String, block: &ChildBlock) -> Vec<Self> {
            block
                .seqs
                .iter()
                .zip(&block.ranks)
                .map(|(&s, &rank)| Child {
                    seq: (s != u32::MAX).then_some(s),
                    rank,
                })
                .collect()
        }

        fn block_len(block: &ChildBlock) -> usize {
            block.seqs.len()
        }

        fn block_bytes(block: &ChildBlock) -> usize {
            block.seqs.capacity() * 4 + block.ranks.capacity() * 8
        }
    }

    /// Deterministic pseudo-random generator for the permutations of the tests
    pub struct Lcg(pub u64);

    impl Lcg {
        pub fn below(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 33) as usize) % bound
        }

        pub fn shuffle<T>(&mut self, items: &mut [T]) {
            for i in (1..items.len()).rev() {
                let j = self.below(i + 1);
                items.swap(i, j);
            }
        }
    }

    /// Appends `(parent, seq)` pairs, the rank being the position in the input
    pub fn feed<S: GroupedStore<String, Child>>(store: &mut S, input: &[(&str, Option<u32>)]) {
        for (rank, (parent, seq)) in input.iter().enumerate() {
            store.append(parent.to_string(), Child { seq: *seq, rank });
        }
    }

    /// Sequences of the children of a parent
    pub fn seqs<S: GroupedStore<String, Child>>(store: &S, parent: &str) -> Vec<Option<u32>> {
        store
            .children_of(&parent.to_string())
            .iter()
            .map(|c| c.seq)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::{PackedStore, SequenceStore, UnsortedStore};

    #[test]
    fn every_layout_behind_the_same_trait() {
        let options = StoreOptions {
            mode: StoreMode::Auto,
            max_interleaving: 1,
            max_late_recurrences: 10,
        };
        let mut stores: Vec<Box<dyn GroupedStore<String, Child>>> = vec![
            Box::new(PackedStore::<String, Child>::new(1)),
            Box::new(UnsortedStore::<String, Child>::new()),
            Box::new(SequenceStore::<String, Child>::new("children", options)),
        ];
        for store in stores.iter_mut() {
            let input = [("A", 3), ("B", 1), ("A", 1), ("A", 2)];
            for (rank, (parent, seq)) in input.iter().enumerate() {
                store.append(parent.to_string(), Child { seq: Some(*seq), rank });
            }
            assert!(store.children_of(&"A".to_string()).is_empty());
            store.seal();
        }
        for store in &stores {
            let children = store.children_of(&"A".to_string()).into_owned();
            let seqs: Vec<_> = children.iter().map(|c| c.seq).collect();
            assert_eq!(vec![Some(1), Some(2), Some(3)], seqs);
            assert_eq!(4, store.count());
            assert!(store.children_of(&"C".to_string()).is_empty());
        }
    }
}
