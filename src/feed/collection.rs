//! Ordered, duplicate-free list of loaded records.

use std::collections::HashSet;
use std::sync::Arc;

use crate::source::Record;

/// Insertion-ordered records with unique ids.
///
/// Records sit behind an [`Arc`] so the UI can hold a snapshot while the
/// manager keeps mutating; mutation copies only when a snapshot is alive.
#[derive(Debug, Clone, Default)]
pub struct FeedCollection {
    records: Arc<Vec<Record>>,
    /// Fast lookup to avoid inserting duplicates.
    seen: HashSet<String>,
}

impl FeedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from one page, dropping repeated ids within it.
    pub fn from_page(records: Vec<Record>) -> Self {
        let mut collection = Self::new();
        collection.merge(records);
        collection
    }

    /// Append `incoming` after the existing records, skipping any id that is
    /// already present.  The first-seen copy of a record always wins so
    /// already-rendered rows never move or change underneath the reader.
    ///
    /// Returns how many records were actually added.
    pub fn merge(&mut self, incoming: Vec<Record>) -> usize {
        let fresh: Vec<Record> = incoming
            .into_iter()
            .filter(|record| self.seen.insert(record.id.clone()))
            .collect();

        let added = fresh.len();
        if added > 0 {
            Arc::make_mut(&mut self.records).extend(fresh);
        }
        added
    }

    /// Replace the like count of record `id`.  Returns `false` (and changes
    /// nothing) if no such record is loaded.
    pub fn set_likes(&mut self, id: &str, likes: u64) -> bool {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return false;
        };
        Arc::make_mut(&mut self.records)[index].likes = likes;
        true
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Cheap shared view of the current records.
    pub fn shared(&self) -> Arc<Vec<Record>> {
        Arc::clone(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
