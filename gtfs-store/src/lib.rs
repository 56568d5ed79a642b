//! Storage of a loaded feed
//!
//! Flat tables are plain hash maps. The two big one-to-many tables (`stop_times.txt` by trip,
//! `shapes.txt` by shape) go through a [SequenceStore] that groups and sorts the children while
//! keeping the memory bounded on sorted input.
mod adaptive;
mod calendar;
mod compact;
mod dao;
mod grouped;
mod packed;
mod unsorted;

#[cfg(test)]
mod tests;

pub use adaptive::SequenceStore;
pub use calendar::CalendarIndex;
pub use compact::{ShapePointBlock, StopTimeBlock};
pub use dao::{AppendableDao, DaoOptions, InMemoryDao, IndexedReadOnlyDao, ReadOnlyDao};
pub use grouped::{GroupedStore, Packable, ParentKey, Sequenced, StoreMode, StoreOptions, StoreStats};
pub use packed::PackedStore;
pub use unsorted::UnsortedStore;
