//! Interned identifiers
//!
//! Every natural key of a feed (`stop_id`, `trip_id`…) goes through an [IdCache] owned by the
//! data-access object of the current load. Two equal keys share the same allocation, so cloning
//! an [Id] is a reference-count bump and comparing two of them usually stops at the pointer.
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Identifier of an object of kind `T` (a [crate::Stop], a [crate::Trip]…)
///
/// The kind only exists at compile time: a `Id<Stop>` can not be used to look up a trip.
pub struct Id<T> {
    key: Arc<str>,
    kind: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    fn from_interned(key: Arc<str>) -> Self {
        Self {
            key,
            kind: PhantomData,
        }
    }

    /// Builds an identifier that does not belong to any [IdCache]
    ///
    /// It compares equal to the interned identifier of the same key, only slower.
    /// Mostly useful to query a store with a key read from somewhere else.
    pub fn detached(raw: &str) -> Self {
        Self::from_interned(Arc::from(raw))
    }

    /// The natural key, as it was written in the feed
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// True if both identifiers come from the same interned key
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.key, &other.key)
    }

    /// Re-types the identifier, e.g. a `service_id` read as a calendar id used on a calendar date
    pub fn cast<U>(&self) -> Id<U> {
        Id::from_interned(Arc::clone(&self.key))
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::from_interned(Arc::clone(&self.key))
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.key == other.key
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Id({:?})", &*self.key)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Canonicalizes the natural keys of one load
///
/// There is no eviction: the cache lives as long as the DAO owning it.
/// Interning only needs `&self` and can be done from several threads.
#[derive(Default)]
pub struct IdCache {
    keys: RwLock<FxHashSet<Arc<str>>>,
}

impl IdCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `raw` as an identifier of kind `T`
    ///
    /// An empty key means “no identifier” (an optional foreign key left blank) and gives `None`.
    pub fn intern<T>(&self, raw: &str) -> Option<Id<T>> {
        if raw.is_empty() {
            return None;
        }
        Some(Id::from_interned(self.canonical(raw)))
    }

    fn canonical(&self, raw: &str) -> Arc<str> {
        if let Some(key) = self.keys.read().get(raw) {
            return Arc::clone(key);
        }
        let mut keys = self.keys.write();
        // Another thread may have inserted it between the two locks
        if let Some(key) = keys.get(raw) {
            return Arc::clone(key);
        }
        let key: Arc<str> = Arc::from(raw);
        keys.insert(Arc::clone(&key));
        key
    }

    /// Number of distinct keys interned so far
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// True if nothing was interned yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Stop, Trip};

    #[test]
    fn equal_keys_share_the_same_allocation() {
        let cache = IdCache::new();
        let a: Id<Stop> = cache.intern("stop1").unwrap();
        let b: Id<Stop> = cache.intern("stop1").unwrap();
        let c: Id<Stop> = cache.intern("stop2").unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(2, cache.len());
    }

    #[test]
    fn empty_key_is_no_identifier() {
        let cache = IdCache::new();
        assert_eq!(None, cache.intern::<Trip>(""));
        assert!(cache.is_empty());
    }

    #[test]
    fn detached_ids_compare_by_value() {
        let cache = IdCache::new();
        let interned: Id<Trip> = cache.intern("T1").unwrap();
        let detached = Id::<Trip>::detached("T1");
        assert!(!interned.ptr_eq(&detached));
        assert_eq!(interned, detached);
    }

    #[test]
    fn concurrent_interning_is_canonical() {
        let cache = IdCache::new();
        let ids: Vec<Vec<Id<Stop>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        (0..200)
                            .map(|i| cache.intern(&format!("s{}", i % 50)).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(50, cache.len());
        for thread_ids in &ids[1..] {
            for (a, b) in thread_ids.iter().zip(&ids[0]) {
                assert!(a.ptr_eq(b));
            }
        }
    }
}
