//! Row and dataset types
//!
//! This module provides the data model for extracted tables:
//! - Row: one extracted table row, an ordered column → value mapping
//! - Dataset: the accumulated, deduplicated sequence of rows across pages

pub mod dataset;
pub mod row;

pub use dataset::Dataset;
pub use row::Row;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_export() {
        let row = Row::from_pairs([("Name", "Ada")]);
        assert_eq!(row.get("Name"), Some("Ada"));
    }

    #[test]
    fn test_dataset_export() {
        let dataset = Dataset::new();
        assert!(dataset.is_empty());
    }
}
