//! Deterministic artifact file names.
//!
//! `<primary>[-<secondary>]-<row>.png`: both parts come from record fields,
//! sanitized to ASCII alphanumerics joined by `-` and truncated. The 1-based
//! row index is always appended, so identical records never collide.

use crate::record::Record;

/// Default cap on each sanitized part.
pub const DEFAULT_MAX_LEN: usize = 50;

/// Stem used when the primary field is absent or sanitizes to nothing.
const FALLBACK_STEM: &str = "row";

/// Which record fields name an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pub primary: String,
    pub secondary: Option<String>,
    pub max_len: usize,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            primary: "name".into(),
            secondary: Some("price".into()),
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

/// Replace runs of non-alphanumerics with one `-`, trim dashes, truncate.
pub fn sanitize(value: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(value.len());
    let mut dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    out.truncate(max_len);
    out.trim_end_matches('-').to_string()
}

impl NamingScheme {
    /// File name for `record` at 1-based `row`.
    pub fn file_name(&self, record: &Record, row: usize) -> String {
        let part = |field: &str| {
            record
                .get(field)
                .map(|v| sanitize(v, self.max_len))
                .filter(|s| !s.is_empty())
        };

        let mut stem = part(&self.primary).unwrap_or_else(|| FALLBACK_STEM.to_string());
        if let Some(secondary) = self.secondary.as_deref().and_then(part) {
            stem.push('-');
            stem.push_str(&secondary);
        }
        format!("{}-{}.png", stem, row)
    }
}
