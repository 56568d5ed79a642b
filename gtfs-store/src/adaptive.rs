use crate::grouped::{GroupedStore, Packable, ParentKey, StoreMode, StoreOptions, StoreStats};
use crate::packed::PackedStore;
use crate::unsorted::UnsortedStore;
use std::borrow::Cow;

enum Layout<K: ParentKey, C: Packable<K>> {
    Packed(PackedStore<K, C>),
    Unsorted(UnsortedStore<K, C>),
}

/// The grouped store used by the DAO, with the layout chosen by [StoreOptions]
///
/// In [StoreMode::Auto] it starts packed and moves everything to the unsorted layout, once and
/// for good, when more than `max_late_recurrences` parents got children after being packed.
pub struct SequenceStore<K: ParentKey, C: Packable<K>> {
    label: &'static str,
    layout: Layout<K, C>,
    options: StoreOptions,
}

impl<K: ParentKey, C: Packable<K>> SequenceStore<K, C> {
    /// Creates a store; `label` only shows up in the logs
    pub fn new(label: &'static str, options: StoreOptions) -> Self {
        let layout = match options.mode {
            StoreMode::Unsorted => Layout::Unsorted(UnsortedStore::new()),
            StoreMode::Packed | StoreMode::Auto => {
                Layout::Packed(PackedStore::new(options.max_interleaving))
            }
        };
        Self {
            label,
            layout,
            options,
        }
    }

    /// True if the children are kept in the packed layout
    pub fn is_packed(&self) -> bool {
        matches!(self.layout, Layout::Packed(_))
    }

    fn should_migrate(&self) -> bool {
        match &self.layout {
            Layout::Packed(packed) => {
                self.options.mode == StoreMode::Auto
                    && packed.stats().late_recurrences > self.options.max_late_recurrences
            }
            Layout::Unsorted(_) => false,
        }
    }

    fn migrate(&mut self) {
        if let Layout::Packed(packed) = &mut self.layout {
            let previous = packed.stats().clone();
            log::info!(
                "{}: {} parents got children after being packed, switching to the unsorted layout",
                self.label,
                previous.late_recurrences
            );
            let mut unsorted = UnsortedStore::new();
            unsorted.absorb(packed.drain_groups());
            unsorted.inherit(&previous);
            self.layout = Layout::Unsorted(unsorted);
        }
    }

    fn store(&self) -> &dyn GroupedStore<K, C> {
        match &self.layout {
            Layout::Packed(packed) => packed,
            Layout::Unsorted(unsorted) => unsorted,
        }
    }

    fn store_mut(&mut self) -> &mut dyn GroupedStore<K, C> {
        match &mut self.layout {
            Layout::Packed(packed) => packed,
            Layout::Unsorted(unsorted) => unsorted,
        }
    }
}

impl<K: ParentKey, C: Packable<K>> GroupedStore<K, C> for SequenceStore<K, C> {
    fn append(&mut self, parent: K, child: C) {
        self.store_mut().append(parent, child);
        if self.should_migrate() {
            self.migrate();
        }
    }

    fn seal(&mut self) {
        if self.is_sealed() {
            return;
        }
        self.store_mut().seal();
        let stats = self.stats();
        log::debug!(
            "{}: {} children in {} groups ({} layout), {} forced flushes, {} late recurrences, {} merges, {} packed bytes, {} groups with duplicated sequences",
            self.label,
            stats.children,
            stats.parents,
            if self.is_packed() { "packed" } else { "unsorted" },
            stats.forced_flushes,
            stats.late_recurrences,
            stats.merges,
            stats.packed_bytes,
            stats.duplicate_sequences
        );
    }

    fn is_sealed(&self) -> bool {
        self.store().is_sealed()
    }

    fn children_of(&self, parent: &K) -> Cow<'_, [C]> {
        self.store().children_of(parent)
    }

    fn parent_keys(&self) -> Vec<K> {
        self.store().parent_keys()
    }

    fn count(&self) -> usize {
        self.store().count()
    }

    fn stats(&self) -> &StoreStats {
        self.store().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouped::fixtures::*;

    fn options(mode: StoreMode, max_interleaving: usize) -> StoreOptions {
        StoreOptions {
            mode,
            max_interleaving,
            max_late_recurrences: 2,
        }
    }

    /// `parents` groups of `children` each, the groups open at the same time
    fn round_robin(parents: usize, children: u32) -> Vec<(String, Option<u32>)> {
        let mut input = Vec::new();
        for seq in (0..children).rev() {
            for p in 0..parents {
                input.push((format!("P{}", p), Some(seq)));
            }
        }
        input
    }

    fn run(options: StoreOptions, input: &[(String, Option<u32>)]) -> SequenceStore<String, Child> {
        let borrowed: Vec<(&str, Option<u32>)> =
            input.iter().map(|(p, s)| (p.as_str(), *s)).collect();
        let mut store = SequenceStore::new("test", options);
        feed(&mut store, &borrowed);
        store.seal();
        store
    }

    #[test]
    fn too_many_open_parents_migrates() {
        let input = round_robin(10, 5);
        let auto = run(options(StoreMode::Auto, 4), &input);
        let unsorted = run(options(StoreMode::Unsorted, 4), &input);
        assert!(!auto.is_packed());
        assert!(auto.stats().migrated);
        assert_eq!(50, auto.count());
        for p in 0..10 {
            let parent = format!("P{}", p);
            assert_eq!(seqs(&unsorted, &parent), seqs(&auto, &parent));
            assert_eq!(vec![Some(0), Some(1), Some(2), Some(3), Some(4)], seqs(&auto, &parent));
        }
    }

    #[test]
    fn few_open_parents_stay_packed() {
        let auto = run(options(StoreMode::Auto, 4), &round_robin(4, 5));
        assert!(auto.is_packed());
        assert!(!auto.stats().migrated);
        assert_eq!(0, auto.stats().late_recurrences);

        // groups one after the other: the window is recycled, nothing comes late
        let mut sorted = Vec::new();
        for p in 0..20 {
            for seq in 0..3 {
                sorted.push((format!("P{}", p), Some(seq)));
            }
        }
        let auto = run(options(StoreMode::Auto, 4), &sorted);
        assert!(auto.is_packed());
        assert_eq!(16, auto.stats().forced_flushes);
    }

    #[test]
    fn packed_mode_never_migrates() {
        let packed = run(options(StoreMode::Packed, 4), &round_robin(10, 5));
        assert!(packed.is_packed());
        assert!(packed.stats().late_recurrences > 2);
        assert_eq!(vec![Some(0), Some(1), Some(2), Some(3), Some(4)], seqs(&packed, "P7"));
    }

    #[test]
    fn layouts_agree_on_shuffled_input() {
        let mut rng = Lcg(42);
        for round in 0..20 {
            let parents = 1 + rng.below(30);
            let mut input: Vec<(String, Option<u32>)> = (0..200)
                .map(|_| {
                    let seq = if rng.below(20) == 0 {
                        None
                    } else {
                        Some(rng.below(50) as u32)
                    };
                    (format!("P{}", rng.below(parents)), seq)
                })
                .collect();
            rng.shuffle(&mut input);
            let window = 1 + rng.below(8);
            let reference = run(options(StoreMode::Unsorted, window), &input);
            for mode in [StoreMode::Packed, StoreMode::Auto] {
                let store = run(options(mode, window), &input);
                let mut keys = store.parent_keys();
                keys.sort();
                let mut expected_keys = reference.parent_keys();
                expected_keys.sort();
                assert_eq!(expected_keys, keys, "round {}", round);
                for parent in &keys {
                    assert_eq!(
                        reference.children_of(parent).into_owned(),
                        store.children_of(parent).into_owned(),
                        "round {} mode {} parent {}",
                        round,
                        mode,
                        parent
                    );
                }
            }
        }
    }
}
