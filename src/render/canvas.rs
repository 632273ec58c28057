//! Built-in software rasterizer.
//!
//! Draws a page onto an RGBA canvas and encodes it as PNG:
//!
//! - background color
//! - image elements, cropped and scaled to their box (optionally keeping
//!   aspect ratio)
//! - text elements, word-wrapped to the element width with Spleen glyphs
//!
//! Elements are drawn in list order (first at the bottom). Rotation is carried
//! on elements but drawn axis-aligned.

use std::io::Cursor;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::assets::PageAssets;
use super::font::{GLYPH_HEIGHT, GLYPH_WIDTH, GlyphCache, sample};
use super::Rasterizer;
use crate::PlacardError;
use crate::template::{Align, DEFAULT_CANVAS_SIZE, Element, ElementKind, ImageElement, Page, TextElement};

/// Line height as a multiple of font size.
const LINE_SPACING: f32 = 1.2;

/// Largest canvas or element box side, in output pixels.
pub const MAX_SIDE_PX: f32 = 16384.0;

/// Largest canvas area, in output pixels (256 MiB of RGBA).
pub const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Largest rendered glyph height, in output pixels.
pub const MAX_GLYPH_PX: f32 = 2048.0;

fn too_large(what: &str, value: f32, max: f32) -> PlacardError {
    PlacardError::Template(format!("{} of {} px exceeds the {} px limit", what, value, max))
}

/// Scaled pixel size, rejecting non-finite or oversized values.
fn scaled_px(what: &str, value: f32, ratio: f32, max: f32) -> Result<f32, PlacardError> {
    let px = (value * ratio).round();
    if !px.is_finite() || px > max {
        return Err(too_large(what, value * ratio, max));
    }
    Ok(px.max(0.0))
}

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)` or a basic
/// color name.
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim().to_ascii_lowercase();

    if let Some(hex) = value.strip_prefix('#') {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return match hex.len() {
            3 => Some(Rgba([digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255])),
            6 => Some(Rgba([pair(0)?, pair(2)?, pair(4)?, 255])),
            8 => Some(Rgba([pair(0)?, pair(2)?, pair(4)?, pair(6)?])),
            _ => None,
        };
    }

    if let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
        let alpha = match parts.get(3) {
            Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
            None => 255,
        };
        return Some(Rgba([
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ]));
    }

    match value.as_str() {
        "white" => Some(Rgba([255, 255, 255, 255])),
        "black" => Some(Rgba([0, 0, 0, 255])),
        "red" => Some(Rgba([255, 0, 0, 255])),
        "green" => Some(Rgba([0, 128, 0, 255])),
        "blue" => Some(Rgba([0, 0, 255, 255])),
        "gray" | "grey" => Some(Rgba([128, 128, 128, 255])),
        "transparent" => Some(Rgba([0, 0, 0, 0])),
        _ => None,
    }
}

/// Source-over blend of `color` at `opacity` onto one canvas pixel.
fn blend(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, opacity: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let src_a = (color[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for c in 0..3 {
        let s = color[c] as f32;
        let d = dst[c] as f32;
        dst[c] = ((s * src_a + d * dst_a * (1.0 - src_a)) / out_a).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// Rasterizer drawing pages with the `image` crate.
#[derive(Debug, Clone)]
pub struct CanvasRasterizer {
    pixel_ratio: f32,
}

impl Default for CanvasRasterizer {
    fn default() -> Self {
        Self { pixel_ratio: 1.0 }
    }
}

impl CanvasRasterizer {
    pub fn new(pixel_ratio: f32) -> Self {
        Self { pixel_ratio }
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Check that `page` can be drawn within the size limits.
    ///
    /// Returns the canvas size in output pixels.
    pub fn check_limits(&self, page: &Page) -> Result<(u32, u32), PlacardError> {
        let ratio = self.pixel_ratio;
        let width = scaled_px("page width", page.width.unwrap_or(DEFAULT_CANVAS_SIZE), ratio, MAX_SIDE_PX)?
            .max(1.0) as u32;
        let height = scaled_px("page height", page.height.unwrap_or(DEFAULT_CANVAS_SIZE), ratio, MAX_SIDE_PX)?
            .max(1.0) as u32;
        if width as u64 * height as u64 > MAX_CANVAS_PIXELS {
            return Err(PlacardError::Template(format!(
                "canvas of {}x{} px exceeds the {} pixel limit",
                width, height, MAX_CANVAS_PIXELS
            )));
        }

        for el in page.children.iter().filter(|el| el.visible) {
            scaled_px("element width", el.resolved_width(), ratio, MAX_SIDE_PX)?;
            scaled_px("element height", el.resolved_height(), ratio, MAX_SIDE_PX)?;
            if let ElementKind::Text(text) = &el.kind {
                scaled_px("font size", text.font_size, ratio, MAX_GLYPH_PX)?;
            }
        }
        Ok((width, height))
    }

    /// Draw `page` into an RGBA buffer.
    pub fn draw(&self, page: &Page, assets: &PageAssets) -> Result<RgbaImage, PlacardError> {
        let ratio = self.pixel_ratio;
        let (width, height) = self.check_limits(page)?;

        let background = parse_color(&page.background).unwrap_or_else(|| {
            tracing::debug!(background = %page.background, "unsupported background, using white");
            Rgba([255, 255, 255, 255])
        });
        let mut canvas = RgbaImage::from_pixel(width, height, background);
        let mut glyphs = GlyphCache::new();

        for el in page.children.iter().filter(|el| el.visible && el.opacity > 0.0) {
            match &el.kind {
                ElementKind::Image(img) => {
                    if let Some(source) = assets.image(&el.id) {
                        draw_image(&mut canvas, el, img, source, ratio);
                    }
                }
                ElementKind::Text(text) => draw_text(&mut canvas, el, text, ratio, &mut glyphs),
            }
        }

        Ok(canvas)
    }
}

#[async_trait]
impl Rasterizer for CanvasRasterizer {
    async fn rasterize(&self, page: &Page, assets: &PageAssets) -> Result<Vec<u8>, PlacardError> {
        let this = self.clone();
        let page = page.clone();
        let assets = assets.clone();

        tokio::task::spawn_blocking(move || {
            let canvas = this.draw(&page, &assets)?;
            let mut png_bytes = Vec::new();
            canvas
                .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
                .map_err(|e| PlacardError::Render(format!("PNG encoding failed: {}", e)))?;
            Ok::<_, PlacardError>(png_bytes)
        })
        .await
        .map_err(|e| PlacardError::Render(format!("render task failed: {}", e)))?
    }
}

// ============================================================================
// IMAGES
// ============================================================================

fn draw_image(
    canvas: &mut RgbaImage,
    el: &Element,
    img: &ImageElement,
    source: &DynamicImage,
    ratio: f32,
) {
    let box_w = (el.resolved_width() * ratio).round() as u32;
    let box_h = (el.resolved_height() * ratio).round() as u32;
    if box_w == 0 || box_h == 0 || source.width() == 0 || source.height() == 0 {
        return;
    }

    let crop = img.crop();
    let cx = (crop.x.clamp(0.0, 1.0) * source.width() as f32) as u32;
    let cy = (crop.y.clamp(0.0, 1.0) * source.height() as f32) as u32;
    let cw = ((crop.width.clamp(0.0, 1.0) * source.width() as f32) as u32)
        .clamp(1, source.width().saturating_sub(cx).max(1));
    let ch = ((crop.height.clamp(0.0, 1.0) * source.height() as f32) as u32)
        .clamp(1, source.height().saturating_sub(cy).max(1));
    let cropped = source.crop_imm(cx, cy, cw, ch);

    let (draw_w, draw_h) = if img.keep_ratio {
        let scale = (box_w as f32 / cw as f32).min(box_h as f32 / ch as f32);
        (
            ((cw as f32 * scale).round() as u32).max(1),
            ((ch as f32 * scale).round() as u32).max(1),
        )
    } else {
        (box_w, box_h)
    };
    let scaled = imageops::resize(&cropped.to_rgba8(), draw_w, draw_h, FilterType::Triangle);

    let left = (el.x * ratio).round() as i64 + box_w.saturating_sub(draw_w) as i64 / 2;
    let top = (el.y * ratio).round() as i64 + box_h.saturating_sub(draw_h) as i64 / 2;
    for (x, y, px) in scaled.enumerate_pixels() {
        blend(canvas, left + x as i64, top + y as i64, *px, el.opacity);
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// Greedy word wrap to `max_chars` per line. Explicit newlines are kept and
/// words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..max_chars).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }

    lines
}

fn draw_text(
    canvas: &mut RgbaImage,
    el: &Element,
    text: &TextElement,
    ratio: f32,
    glyphs: &mut GlyphCache,
) {
    if text.text.trim().is_empty() {
        return;
    }
    let color = parse_color(&text.fill).unwrap_or(Rgba([0, 0, 0, 255]));

    let glyph_h = ((text.font_size * ratio).round() as usize).max(1);
    let glyph_w = (glyph_h * GLYPH_WIDTH / GLYPH_HEIGHT).max(1);
    let line_h = (glyph_h as f32 * LINE_SPACING).round() as i64;
    let box_w = (el.resolved_width() * ratio).round() as usize;
    let bold = text.is_bold();

    let left = (el.x * ratio).round() as i64;
    let mut top = (el.y * ratio).round() as i64;

    for line in wrap_text(&text.text, box_w / glyph_w) {
        let line_w = line.chars().count() * glyph_w;
        let offset = match text.align {
            Align::Left | Align::Justify => 0,
            Align::Center => box_w.saturating_sub(line_w) / 2,
            Align::Right => box_w.saturating_sub(line_w),
        } as i64;

        if top >= canvas.height() as i64 {
            break;
        }
        if top + (glyph_h as i64) < 0 {
            top += line_h;
            continue;
        }
        for (i, ch) in line.chars().enumerate() {
            let gx = left + offset + (i * glyph_w) as i64;
            if gx >= canvas.width() as i64 {
                break;
            }
            if gx + (glyph_w as i64) < 0 {
                continue;
            }
            let glyph = glyphs.glyph(ch);
            for dy in 0..glyph_h {
                for dx in 0..glyph_w {
                    if sample(glyph, glyph_w, glyph_h, dx, dy) {
                        let (px, py) = (gx + dx as i64, top + dy as i64);
                        blend(canvas, px, py, color, el.opacity);
                        if bold {
                            blend(canvas, px + 1, py, color, el.opacity);
                        }
                    }
                }
            }
        }
        top += line_h;
    }
}
