//! Raw row input as accepted by the CLI and the HTTP API.

use serde::Deserialize;

use super::{ColumnMap, Record, csv, paste};
use crate::PlacardError;
use crate::net::ImageRewrite;

/// Preset used when neither a header, bindings nor a preset is given.
const DEFAULT_PRESET: &str = "products";

/// Rows plus how to map them onto fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RowInput {
    /// Pasted rows: newline separated, comma split.
    pub text: Option<String>,
    /// Delimited file content: quote-aware comma split.
    pub csv: Option<String>,
    /// `field=column` bindings.
    pub columns: Option<String>,
    /// Named bindings preset.
    pub preset: Option<String>,
    /// First row names the fields.
    pub header: bool,
}

impl RowInput {
    pub fn pasted(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    fn rows(&self) -> Result<Vec<Vec<String>>, PlacardError> {
        match (&self.csv, &self.text) {
            (Some(content), _) => Ok(csv::parse_rows(content)),
            (None, Some(text)) => Ok(paste::parse_rows(text)),
            (None, None) => Err(PlacardError::Input("no rows given".into())),
        }
    }

    fn column_map(&self) -> Result<ColumnMap, PlacardError> {
        if let Some(spec) = &self.columns {
            return ColumnMap::parse(spec);
        }
        let name = self.preset.as_deref().unwrap_or(DEFAULT_PRESET);
        ColumnMap::preset(name).ok_or_else(|| {
            PlacardError::Input(format!(
                "unknown preset '{}' (available: {})",
                name,
                ColumnMap::preset_names().join(", ")
            ))
        })
    }

    /// Parse and map every row, in input order.
    pub fn records(&self, rewrite: ImageRewrite) -> Result<Vec<Record>, PlacardError> {
        let mut rows = self.rows()?;

        let map = if self.header {
            if rows.is_empty() {
                return Ok(Vec::new());
            }
            let header = rows.remove(0);
            ColumnMap::from_header(&header)
        } else {
            self.column_map()?
        };

        Ok(map.with_rewrite(rewrite).records(&rows))
    }
}
