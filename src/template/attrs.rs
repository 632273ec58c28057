//! Narrow attribute interface between the fill engine and elements.
//!
//! The fill engine reads an [`ElementAttributes`] snapshot and answers with an
//! [`AttributePatch`]. It never holds on to elements or depends on how a
//! canvas backend stores them; anything implementing [`ElementHandle`] can be
//! filled.

use super::types::{Crop, Element, ElementKind};

/// Element variant, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Text,
    Image,
}

/// Read-only snapshot of the attributes placeholder resolution looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementAttributes {
    pub id: String,
    pub element_type: ElementType,
    pub name: String,
    /// Text content (text elements only).
    pub text: Option<String>,
    /// Image source (image elements only).
    pub src: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub visible: bool,
}

/// A partial attribute update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributePatch {
    pub text: Option<String>,
    pub src: Option<String>,
    pub visible: Option<bool>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub crop: Option<Crop>,
}

impl AttributePatch {
    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patch replacing text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Patch swapping an image source.
    ///
    /// Geometry is re-asserted from the snapshot: renderers may recompute
    /// layout from the new image's natural size when only the source changes.
    pub fn image_source(attrs: &ElementAttributes, src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            visible: Some(true),
            x: Some(attrs.x),
            y: Some(attrs.y),
            width: Some(attrs.width),
            height: Some(attrs.height),
            rotation: Some(attrs.rotation),
            crop: Some(Crop::FULL),
            ..Default::default()
        }
    }

    /// Patch hiding an image slot that has nothing to show.
    pub fn hide_image() -> Self {
        Self {
            src: Some(String::new()),
            visible: Some(false),
            ..Default::default()
        }
    }
}

/// Access to a mutable element through snapshots and partial updates.
pub trait ElementHandle {
    fn attributes(&self) -> ElementAttributes;
    fn apply_attributes(&mut self, patch: &AttributePatch);
}

impl ElementHandle for Element {
    fn attributes(&self) -> ElementAttributes {
        let (element_type, text, src) = match &self.kind {
            ElementKind::Text(t) => (ElementType::Text, Some(t.text.clone()), None),
            ElementKind::Image(i) => (ElementType::Image, None, Some(i.src.clone())),
        };
        ElementAttributes {
            id: self.id.clone(),
            element_type,
            name: self.name.clone(),
            text,
            src,
            x: self.x,
            y: self.y,
            width: self.resolved_width(),
            height: self.resolved_height(),
            rotation: self.rotation,
            visible: self.visible,
        }
    }

    fn apply_attributes(&mut self, patch: &AttributePatch) {
        if let Some(v) = patch.visible {
            self.visible = v;
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(w) = patch.width {
            self.width = Some(w);
        }
        if let Some(h) = patch.height {
            self.height = Some(h);
        }
        if let Some(r) = patch.rotation {
            self.rotation = r;
        }

        match &mut self.kind {
            ElementKind::Text(t) => {
                if let Some(text) = &patch.text {
                    t.text.clone_from(text);
                }
            }
            ElementKind::Image(i) => {
                if let Some(src) = &patch.src {
                    i.src.clone_from(src);
                }
                if let Some(crop) = patch.crop {
                    i.set_crop(crop);
                }
            }
        }
    }
}
