//! # Records and Row Sources
//!
//! A [`Record`] is one row of substitution data. Adapters in this module turn
//! raw input into records, always preserving input order:
//!
//! | Adapter | Input |
//! |---------|-------|
//! | [`paste`] | newline + comma separated text, query lists |
//! | [`csv`] | quote-aware delimited file content |
//! | [`columns`] | raw cell rows → named fields |
//! | [`feed`] | one query per row, fetched and normalized from a JSON feed |
//!
//! [`RowInput`] bundles pasted or file rows with their column mapping.

pub mod columns;
pub mod csv;
pub mod feed;
pub mod input;
pub mod paste;

pub use columns::ColumnMap;
pub use feed::{FeedClient, FeedSchema, RecordProvider};
pub use input::RowInput;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a placeholder resolves to when its field is absent.
///
/// One policy applies to every field of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Substitute an empty string.
    #[default]
    Empty,
    /// Substitute the literal `N/A`.
    #[serde(alias = "na", alias = "n/a")]
    NotAvailable,
}

impl MissingPolicy {
    pub fn value(self) -> &'static str {
        match self {
            MissingPolicy::Empty => "",
            MissingPolicy::NotAvailable => "N/A",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" | "" => Some(MissingPolicy::Empty),
            "na" | "n/a" | "not_available" => Some(MissingPolicy::NotAvailable),
            _ => None,
        }
    }
}

/// One row of substitution data.
///
/// Field names are case-insensitive: they are stored lowercased and looked up
/// lowercased. `images` is the ordered list `image<N>` slots bind against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "deserialize_fields")]
    fields: HashMap<String, String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Field names arrive in any case; store them the way `insert` does.
fn deserialize_fields<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect())
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insert.
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    /// Builder-style image append.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.images.push(url.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.trim().to_lowercase(), value.into());
    }

    /// Look up a field. Empty values count as absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(&field.trim().to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Nth image (0-based), skipping nothing: gaps are absent slots.
    pub fn image(&self, index: usize) -> Option<&str> {
        self.images
            .get(index)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.images.is_empty()
    }

    /// Iterate fields in name order (for stable display).
    pub fn fields(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort();
        pairs
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k.as_ref(), v);
        }
        record
    }
}
