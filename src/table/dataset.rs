use crate::table::Row;
use std::collections::HashSet;

/// Maximum number of rows shown in a preview
pub const PREVIEW_LIMIT: usize = 100;

/// The accumulated, deduplicated sequence of extracted rows across all
/// visited pages.
///
/// Append-only except for duplicate suppression: a row whose full field set
/// has already been seen is dropped, and the earliest-added occurrence keeps
/// its position. The seen set is maintained incrementally so merging a batch
/// never rescans the whole dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
    seen: HashSet<String>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from existing rows, deduplicating as they are added
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut dataset = Self::new();
        dataset.merge(rows);
        dataset
    }

    /// Merge a batch of newly extracted rows, suppressing exact duplicates.
    ///
    /// Returns the number of rows actually added. Zero added rows is the
    /// crawler's signal that pagination has converged.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = Row>) -> usize {
        let mut added = 0;
        for row in batch {
            if self.seen.insert(row.canonical_key()) {
                self.rows.push(row);
                added += 1;
            }
        }
        added
    }

    /// All rows in first-seen order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The authoritative row count
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows have been collected
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `limit` rows, for display. Returns the rows and whether
    /// the dataset was truncated to fit.
    pub fn preview(&self, limit: usize) -> (&[Row], bool) {
        if self.rows.len() > limit {
            (&self.rows[..limit], true)
        } else {
            (&self.rows[..], false)
        }
    }
}
