//! Column mapping: raw cell rows to named record fields.
//!
//! Bindings are 1-based, matching what users see in a spreadsheet:
//!
//! ```
//! use placard::record::ColumnMap;
//!
//! let map = ColumnMap::parse("name=1,price=2,url=3")?;
//! let record = map.record(&["Widget".into(), "10".into(), "http://img".into()]);
//! assert_eq!(record.get("name"), Some("Widget"));
//! assert_eq!(record.image(0), Some("http://img"));
//! # Ok::<(), placard::PlacardError>(())
//! ```
//!
//! Fields named `url`, `image` or `image<N>` are image columns: besides the
//! named field, their value lands in the record's image list (`url`/`image`
//! at slot 1, `image<N>` at slot N), optionally rewritten through a proxy.

use serde::{Deserialize, Serialize};

use super::Record;
use crate::PlacardError;
use crate::net::proxy::ImageRewrite;

/// One field bound to a 1-based column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub field: String,
    pub column: usize,
}

/// Ordered set of column bindings plus image URL rewriting.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    pub bindings: Vec<ColumnBinding>,
    pub rewrite: ImageRewrite,
}

/// Named presets matching the batch panels' column layouts.
const PRESETS: &[(&str, &str)] = &[
    ("products", "name=1,price=2,url=3"),
    ("quotes", "quote_text=1,quote_author=2"),
    ("topics", "topic=1,sub1=2,sub2=3,sub3=4"),
];

/// Image slot (0-based) for an image field name.
pub(crate) fn image_slot(field: &str) -> Option<usize> {
    let lower = field.to_ascii_lowercase();
    match lower.as_str() {
        "url" | "image" => Some(0),
        _ => lower
            .strip_prefix("image")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n - 1),
    }
}

/// Normalize a header cell into a field name: lowercase, spaces to `_`.
fn header_field(cell: &str) -> String {
    cell.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

impl ColumnMap {
    /// Parse `field=column` pairs separated by commas.
    pub fn parse(spec: &str) -> Result<Self, PlacardError> {
        let mut bindings = Vec::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (field, column) = pair.split_once('=').ok_or_else(|| {
                PlacardError::Input(format!("column binding '{}' is not field=column", pair))
            })?;
            let column: usize = column.trim().parse().map_err(|_| {
                PlacardError::Input(format!("column '{}' is not a number", column.trim()))
            })?;
            if column == 0 {
                return Err(PlacardError::Input(format!(
                    "column for '{}' must be 1 or greater",
                    field.trim()
                )));
            }
            bindings.push(ColumnBinding {
                field: field.trim().to_lowercase(),
                column,
            });
        }
        if bindings.is_empty() {
            return Err(PlacardError::Input("no column bindings given".into()));
        }
        Ok(Self {
            bindings,
            rewrite: ImageRewrite::None,
        })
    }

    /// Look up a named preset (`products`, `quotes`, `topics`).
    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, spec)| Self::parse(spec).ok())
    }

    pub fn preset_names() -> Vec<&'static str> {
        PRESETS.iter().map(|(n, _)| *n).collect()
    }

    /// Bind every column of a header row to its normalized name.
    pub fn from_header(header: &[String]) -> Self {
        let bindings = header
            .iter()
            .enumerate()
            .map(|(i, cell)| (i, header_field(cell)))
            .filter(|(_, field)| !field.is_empty())
            .map(|(i, field)| ColumnBinding { field, column: i + 1 })
            .collect();
        Self {
            bindings,
            rewrite: ImageRewrite::None,
        }
    }

    /// Positional fallback: `col1`, `col2`, ... for `width` columns.
    pub fn positional(width: usize) -> Self {
        let bindings = (1..=width)
            .map(|column| ColumnBinding {
                field: format!("col{}", column),
                column,
            })
            .collect();
        Self {
            bindings,
            rewrite: ImageRewrite::None,
        }
    }

    pub fn with_rewrite(mut self, rewrite: ImageRewrite) -> Self {
        self.rewrite = rewrite;
        self
    }

    /// Build a record from one row. Missing or empty cells become absent fields.
    pub fn record(&self, row: &[String]) -> Record {
        let mut record = Record::new();
        let mut images: Vec<String> = Vec::new();

        for binding in &self.bindings {
            let Some(cell) = row.get(binding.column - 1).map(|c| c.trim()) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }

            match image_slot(&binding.field) {
                Some(slot) => {
                    let url = self.rewrite.apply(cell);
                    if images.len() <= slot {
                        images.resize(slot + 1, String::new());
                    }
                    if images[slot].is_empty() {
                        images[slot].clone_from(&url);
                    }
                    record.insert(&binding.field, url);
                }
                None => record.insert(&binding.field, cell),
            }
        }

        record.images = images;
        record
    }

    /// Map every row, preserving order.
    pub fn records(&self, rows: &[Vec<String>]) -> Vec<Record> {
        rows.iter().map(|row| self.record(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::proxy::CorsProxy;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_errors() {
        assert!(ColumnMap::parse("name").is_err());
        assert!(ColumnMap::parse("name=x").is_err());
        assert!(ColumnMap::parse("name=0").is_err());
        assert!(ColumnMap::parse(" , ").is_err());
    }

    #[test]
    fn test_missing_cell_is_absent_field() {
        let map = ColumnMap::preset("products").unwrap();
        let record = map.record(&row(&["Gadget", "20"]));
        assert_eq!(record.get("name"), Some("Gadget"));
        assert!(!record.contains("url"));
        assert!(record.images.is_empty());
    }

    #[test]
    fn test_image_slots() {
        assert_eq!(image_slot("url"), Some(0));
        assert_eq!(image_slot("Image3"), Some(2));
        assert_eq!(image_slot("image0"), None);
        assert_eq!(image_slot("imagery"), None);

        let map = ColumnMap::parse("name=1,image2=3,image1=2").unwrap();
        let record = map.record(&row(&["x", "a.png", "b.png"]));
        assert_eq!(record.images, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_rewrite_applies_to_image_columns_only() {
        let map = ColumnMap::preset("products")
            .unwrap()
            .with_rewrite(ImageRewrite::Cors(CorsProxy::new("https://relay/?url=")));
        let record = map.record(&row(&["Widget", "10", "http://img"]));
        assert_eq!(record.get("name"), Some("Widget"));
        assert_eq!(record.get("url"), Some("https://relay/?url=http%3A%2F%2Fimg"));
        assert_eq!(record.image(0), record.get("url"));
    }

    #[test]
    fn test_from_header() {
        let map = ColumnMap::from_header(&row(&["Product Name", "Price", ""]));
        let record = map.record(&row(&["Widget", "10", "ignored"]));
        assert_eq!(record.get("product_name"), Some("Widget"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_positional() {
        let map = ColumnMap::positional(2);
        let record = map.record(&row(&["a", "b", "c"]));
        assert_eq!(record.fields(), vec![("col1", "a"), ("col2", "b")]);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(ColumnMap::preset("nope").is_none());
        assert_eq!(ColumnMap::preset_names(), vec!["products", "quotes", "topics"]);
    }
}
