//! # Template Model
//!
//! A [`Template`] is the reusable design a batch run is based on: a sized
//! canvas with ordered pages, each holding ordered elements (list order is
//! z-order, first element at the bottom).
//!
//! ```
//! use placard::template::Template;
//!
//! let template = Template::from_json(r##"{
//!     "name": "poster",
//!     "width": 1080,
//!     "height": 1080,
//!     "pages": [{
//!         "background": "#ffffff",
//!         "children": [
//!             {"type": "text", "text": "{{name}}", "x": 40, "y": 40, "width": 1000},
//!             {"type": "image", "name": "image1", "x": 40, "y": 200, "width": 600, "height": 600}
//!         ]
//!     }]
//! }"##)?;
//!
//! assert_eq!(template.pages[0].children.len(), 2);
//! # Ok::<(), placard::PlacardError>(())
//! ```
//!
//! Templates are never mutated by a batch run. Rows work on independent
//! copies produced by [`Template::instantiate_page`].

pub mod attrs;
mod clone;
pub mod types;

pub use attrs::{AttributePatch, ElementAttributes, ElementHandle, ElementType};
pub use clone::PageInstance;
pub use types::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::PlacardError;

fn default_canvas_size() -> f32 {
    DEFAULT_CANVAS_SIZE
}

fn default_background() -> String {
    "white".into()
}

/// Element types this crate understands. Anything else is skipped on load.
const SUPPORTED_TYPES: &[&str] = &["text", "image"];

/// Deserialize page children, skipping element types with no counterpart here
/// (figures, SVGs, groups...). The editor exports them freely; they cannot be
/// placeholders, so dropping them keeps a template loadable.
fn deserialize_elements<'de, D>(deserializer: D) -> Result<Vec<Element>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    let mut elements = Vec::with_capacity(values.len());

    for (i, v) in values.into_iter().enumerate() {
        let type_name = v.get("type").and_then(|t| t.as_str()).unwrap_or_default();
        if !SUPPORTED_TYPES.contains(&type_name) {
            tracing::warn!(index = i, r#type = type_name, "skipping unsupported element");
            continue;
        }
        let element: Element = serde_json::from_value(v)
            .map_err(|e| serde::de::Error::custom(format!("children[{}]: {}", i, e)))?;
        elements.push(element);
    }

    Ok(elements)
}

/// One page of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: String,
    /// Page width; falls back to the template width.
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    /// Background color.
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default, deserialize_with = "deserialize_elements")]
    pub children: Vec<Element>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            id: String::new(),
            width: None,
            height: None,
            background: default_background(),
            children: Vec::new(),
        }
    }
}

impl Page {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    /// Append an element on top of the current stack.
    pub fn push(&mut self, element: Element) {
        self.children.push(element);
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.children.iter().find(|el| el.id == id)
    }

    /// Find the first element carrying `name`.
    pub fn element_named(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|el| el.name == name)
    }

    /// Concatenated content of every text element, for token audits.
    pub fn text_content(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter_map(|el| el.as_text().map(|t| t.text.as_str()))
            .collect()
    }
}

/// A reusable design: named, sized, with ordered pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_canvas_size")]
    pub width: f32,
    #[serde(default = "default_canvas_size")]
    pub height: f32,
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: DEFAULT_CANVAS_SIZE,
            height: DEFAULT_CANVAS_SIZE,
            pages: Vec::new(),
        }
    }
}

impl Template {
    /// Create an empty template with the given canvas size.
    pub fn new(name: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            pages: Vec::new(),
        }
    }

    /// Parse a template from the editor's JSON export.
    pub fn from_json(json: &str) -> Result<Self, PlacardError> {
        serde_json::from_str(json)
            .map_err(|e| PlacardError::Template(format!("invalid template JSON: {}", e)))
    }

    /// Read and parse a template file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PlacardError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            PlacardError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn push_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Check that `page_index` can be instantiated.
    pub fn validate_page(&self, page_index: usize) -> Result<&Page, PlacardError> {
        if self.pages.is_empty() {
            return Err(PlacardError::Template("template has no pages".into()));
        }
        self.pages.get(page_index).ok_or_else(|| {
            PlacardError::Template(format!(
                "page {} out of range (template has {} pages)",
                page_index,
                self.pages.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_template() {
        let template = Template::from_json(r#"{"pages": [{}]}"#).unwrap();
        assert_eq!(template.width, DEFAULT_CANVAS_SIZE);
        assert_eq!(template.pages.len(), 1);
        assert_eq!(template.pages[0].background, "white");
        assert!(template.pages[0].children.is_empty());
    }

    #[test]
    fn test_unsupported_children_are_skipped() {
        let json = r#"{"pages": [{"children": [
            {"type": "svg", "src": "x.svg"},
            {"type": "text", "text": "kept"},
            {"type": "figure"}
        ]}]}"#;
        let template = Template::from_json(json).unwrap();
        assert_eq!(template.pages[0].text_content(), vec!["kept"]);
    }

    #[test]
    fn test_bad_child_reports_index() {
        let json = r#"{"pages": [{"children": [{"type": "text", "x": "left"}]}]}"#;
        let err = Template::from_json(json).unwrap_err();
        assert!(err.to_string().contains("children[0]"), "{}", err);
    }

    #[test]
    fn test_validate_page() {
        let mut template = Template::new("t", 100.0, 100.0);
        assert!(matches!(template.validate_page(0), Err(PlacardError::Template(_))));
        template.push_page(Page::new(100.0, 100.0));
        assert!(template.validate_page(0).is_ok());
        assert!(template.validate_page(1).is_err());
    }

    #[test]
    fn test_template_round_trips_through_json() {
        let mut page = Page::new(500.0, 500.0);
        page.push(Element::text("{{name}}").at(10.0, 10.0));
        page.push(Element::image("").named("image1").sized(200.0, 200.0));
        let mut template = Template::new("poster", 500.0, 500.0);
        template.push_page(page);

        let json = serde_json::to_string(&template).unwrap();
        let back = Template::from_json(&json).unwrap();
        assert_eq!(back, template);
    }
}
