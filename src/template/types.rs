//! Element struct types for the template model.
//!
//! All types derive `Serialize + Deserialize` using the editor's camelCase
//! export keys, so a page exported from the design editor loads directly.

use serde::{Deserialize, Serialize};

/// Fallback size for elements that do not declare width/height.
pub const DEFAULT_ELEMENT_SIZE: f32 = 100.0;

/// Fallback canvas size for templates and pages without dimensions.
pub const DEFAULT_CANVAS_SIZE: f32 = 1080.0;

fn default_true() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

fn default_one() -> f32 {
    1.0
}

fn default_font_family() -> String {
    "Roboto".into()
}

fn default_font_size() -> f32 {
    30.0
}

fn default_font_weight() -> String {
    "normal".into()
}

fn default_fill() -> String {
    "#000000".into()
}

// ============================================================================
// ELEMENT
// ============================================================================

/// A positioned element on a page.
///
/// Common attributes live here; variant data lives in [`ElementKind`],
/// flattened so the JSON stays `{"type": "text", "x": 10, "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default)]
    pub id: String,
    /// Free-form tag set in the editor. Image bindings match on it.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// `None` when the source template omitted it; the cloner fills defaults.
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// Variant payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Text(TextElement),
    Image(ImageElement),
}

impl Element {
    /// Create a text element with default styling.
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_kind(ElementKind::Text(TextElement::new(content)))
    }

    /// Create an image element pointing at `src`.
    pub fn image(src: impl Into<String>) -> Self {
        Self::with_kind(ElementKind::Image(ImageElement::new(src)))
    }

    fn with_kind(kind: ElementKind) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            rotation: 0.0,
            opacity: 1.0,
            visible: true,
            kind,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ElementKind::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, ElementKind::Image(_))
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match &self.kind {
            ElementKind::Text(t) => Some(t),
            ElementKind::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageElement> {
        match &self.kind {
            ElementKind::Image(i) => Some(i),
            ElementKind::Text(_) => None,
        }
    }

    /// Width with the documented default applied.
    pub fn resolved_width(&self) -> f32 {
        self.width.unwrap_or(DEFAULT_ELEMENT_SIZE)
    }

    /// Height with the documented default applied.
    pub fn resolved_height(&self) -> f32 {
        self.height.unwrap_or(DEFAULT_ELEMENT_SIZE)
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// Horizontal text alignment inside the element box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Text variant: content plus font attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in canvas pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// "normal" or "bold".
    #[serde(default = "default_font_weight")]
    pub font_weight: String,
    /// Fill color: `#rgb`, `#rrggbb`, `#rrggbbaa` or a basic color name.
    #[serde(default = "default_fill")]
    pub fill: String,
    #[serde(default)]
    pub align: Align,
}

impl TextElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_weight: default_font_weight(),
            fill: default_fill(),
            align: Align::default(),
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight.eq_ignore_ascii_case("bold")
            || self.font_weight.parse::<u16>().is_ok_and(|w| w >= 600)
    }
}

// ============================================================================
// IMAGE
// ============================================================================

/// Crop rectangle in normalized (0..1) source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Crop {
    /// The whole source image.
    pub const FULL: Crop = Crop {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
}

impl Default for Crop {
    fn default() -> Self {
        Self::FULL
    }
}

/// Image variant: source plus crop rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    /// URL, local path, or empty when the slot is unbound.
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub crop_x: f32,
    #[serde(default)]
    pub crop_y: f32,
    #[serde(default = "default_one")]
    pub crop_width: f32,
    #[serde(default = "default_one")]
    pub crop_height: f32,
    /// Preserve the source aspect ratio when fitting into the box.
    #[serde(default)]
    pub keep_ratio: bool,
}

impl ImageElement {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            crop_x: 0.0,
            crop_y: 0.0,
            crop_width: 1.0,
            crop_height: 1.0,
            keep_ratio: false,
        }
    }

    pub fn crop(&self) -> Crop {
        Crop {
            x: self.crop_x,
            y: self.crop_y,
            width: self.crop_width,
            height: self.crop_height,
        }
    }

    pub fn set_crop(&mut self, crop: Crop) {
        self.crop_x = crop.x;
        self.crop_y = crop.y;
        self.crop_width = crop.width;
        self.crop_height = crop.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_element_from_editor_json() {
        let json = r##"{"type": "text", "id": "t1", "x": 10, "y": 20, "width": 300,
            "text": "{{name}}", "fontSize": 48, "fontWeight": "bold", "fill": "#fff", "align": "center"}"##;
        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(el.id, "t1");
        assert_eq!(el.x, 10.0);
        assert_eq!(el.width, Some(300.0));
        assert_eq!(el.height, None);
        assert!(el.visible);
        let text = el.as_text().unwrap();
        assert_eq!(text.text, "{{name}}");
        assert_eq!(text.font_size, 48.0);
        assert_eq!(text.align, Align::Center);
        assert!(text.is_bold());
    }

    #[test]
    fn test_image_element_defaults() {
        let json = r#"{"type": "image", "name": "image1", "src": "https://example.com/a.png"}"#;
        let el: Element = serde_json::from_str(json).unwrap();
        let img = el.as_image().unwrap();
        assert_eq!(img.crop(), Crop::FULL);
        assert!(!img.keep_ratio);
        assert_eq!(el.resolved_width(), DEFAULT_ELEMENT_SIZE);
        assert_eq!(el.opacity, 1.0);
    }

    #[test]
    fn test_element_serializes_type_tag() {
        let el = Element::image("a.png").named("logo");
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["name"], "logo");
        assert_eq!(json["cropWidth"], 1.0);
    }

    #[test]
    fn test_numeric_font_weight_counts_as_bold() {
        let mut text = TextElement::new("x");
        text.font_weight = "700".into();
        assert!(text.is_bold());
        text.font_weight = "400".into();
        assert!(!text.is_bold());
    }
}
