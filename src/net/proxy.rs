//! Relay and image-resize proxy URL builders.
//!
//! Both are boundary collaborators: this module only builds URLs for them.

use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;

/// Percent-encode a value so it can ride inside a query parameter or path
/// segment. Spaces become `%20`; a literal `+` is already `%2B` at this point.
pub fn encode_component(value: &str) -> String {
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// CORS relay: `<base><encoded target>`, e.g. `https://relay.example/?url=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsProxy {
    pub base: String,
}

impl CorsProxy {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Route `target` through the relay. Empty targets stay empty.
    pub fn wrap(&self, target: &str) -> String {
        if target.is_empty() {
            return String::new();
        }
        format!("{}{}", self.base, encode_component(target))
    }
}

/// Image-resize service normalizing product shots to a fixed box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProxy {
    pub base: String,
    #[serde(default = "default_box")]
    pub width: u32,
    #[serde(default = "default_box")]
    pub height: u32,
    #[serde(default = "default_fit")]
    pub fit: String,
    #[serde(default = "default_bg")]
    pub background: String,
    #[serde(default = "default_output")]
    pub output: String,
    /// Trim uniform borders (threshold), if set.
    #[serde(default)]
    pub trim: Option<u32>,
}

fn default_box() -> u32 {
    800
}

fn default_fit() -> String {
    "contain".into()
}

fn default_bg() -> String {
    "transparent".into()
}

fn default_output() -> String {
    "png".into()
}

impl ImageProxy {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            width: default_box(),
            height: default_box(),
            fit: default_fit(),
            background: default_bg(),
            output: default_output(),
            trim: None,
        }
    }

    pub fn with_trim(mut self, trim: u32) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Route an image URL through the resize service.
    pub fn wrap(&self, image_url: &str) -> String {
        if image_url.is_empty() {
            return String::new();
        }
        let mut out = format!("{}{}", self.base, encode_component(image_url));
        if let Some(trim) = self.trim {
            out.push_str(&format!("&trim={}", trim));
        }
        out.push_str(&format!(
            "&output={}&bg={}&w={}&h={}&fit={}",
            self.output, self.background, self.width, self.height, self.fit
        ));
        out
    }
}

/// How record image URLs get rewritten before they reach a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ImageRewrite {
    #[default]
    None,
    Cors(CorsProxy),
    Resize(ImageProxy),
}

impl ImageRewrite {
    pub fn apply(&self, url: &str) -> String {
        match self {
            ImageRewrite::None => url.to_string(),
            ImageRewrite::Cors(proxy) => proxy.wrap(url),
            ImageRewrite::Resize(proxy) => proxy.wrap(url),
        }
    }
}
