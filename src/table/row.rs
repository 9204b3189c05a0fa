use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One extracted table row: an ordered mapping from column key to cell value.
///
/// Keys keep their extraction order, which defines the column order of the
/// CSV header line. Values are always strings; cells that were empty on the
/// page are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, String>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self { fields: IndexMap::new() }
    }

    /// Build a row from (key, value) pairs, preserving order
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Set a cell value, appending the column if it is new
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Get a cell value by column key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Column keys in extraction order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// (key, value) pairs in extraction order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical string representation used for deduplication.
    ///
    /// Keys are sorted before serialization, so two rows with identical
    /// field sets compare equal even if their key insertion order differs.
    /// Field separators are control characters that cannot appear in cell
    /// text extracted from the DOM.
    pub fn canonical_key(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = self.iter().collect();
        pairs.sort_unstable_by_key(|(k, _)| *k);

        let mut out = String::with_capacity(self.fields.len() * 16);
        for (key, value) in pairs {
            out.push_str(key);
            out.push('\u{1f}');
            out.push_str(value);
            out.push('\u{1e}');
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}
