//! Bitmap glyphs for canvas text.
//!
//! Uses the Spleen 12×24 bitmap font, scaled nearest-neighbor to the
//! requested size.

use std::collections::HashMap;

use spleen_font::{FONT_12X24, PSF2Font};

/// Native glyph cell width of the base font.
pub const GLYPH_WIDTH: usize = 12;
/// Native glyph cell height of the base font.
pub const GLYPH_HEIGHT: usize = 24;

/// A 12×24 on/off bitmap, row-major.
pub type Glyph = Vec<bool>;

/// Per-render glyph cache. Characters the font lacks get a box.
#[derive(Default)]
pub struct GlyphCache {
    glyphs: HashMap<char, Glyph>,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn glyph(&mut self, ch: char) -> &Glyph {
        self.glyphs
            .entry(ch)
            .or_insert_with(|| lookup(ch).unwrap_or_else(boxed_glyph))
    }
}

fn lookup(ch: char) -> Option<Glyph> {
    let mut font = PSF2Font::new(FONT_12X24).ok()?;
    let utf8 = ch.to_string();
    let rows = font.glyph_for_utf8(utf8.as_bytes())?;

    let mut glyph = vec![false; GLYPH_WIDTH * GLYPH_HEIGHT];
    for (row_y, row) in rows.enumerate() {
        for (col_x, on) in row.enumerate() {
            if row_y < GLYPH_HEIGHT && col_x < GLYPH_WIDTH {
                glyph[row_y * GLYPH_WIDTH + col_x] = on;
            }
        }
    }
    Some(glyph)
}

/// Box outline for unknown characters.
fn boxed_glyph() -> Glyph {
    let mut glyph = vec![false; GLYPH_WIDTH * GLYPH_HEIGHT];
    for x in 1..GLYPH_WIDTH - 1 {
        glyph[4 * GLYPH_WIDTH + x] = true;
        glyph[(GLYPH_HEIGHT - 4) * GLYPH_WIDTH + x] = true;
    }
    for y in 4..=GLYPH_HEIGHT - 4 {
        glyph[y * GLYPH_WIDTH + 1] = true;
        glyph[y * GLYPH_WIDTH + GLYPH_WIDTH - 2] = true;
    }
    glyph
}

/// Sample a glyph scaled to `width`×`height` at destination pixel `(dx, dy)`.
pub fn sample(glyph: &Glyph, width: usize, height: usize, dx: usize, dy: usize) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let sx = dx * GLYPH_WIDTH / width;
    let sy = dy * GLYPH_HEIGHT / height;
    glyph
        .get(sy * GLYPH_WIDTH + sx)
        .copied()
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_has_ink_and_space_is_blank() {
        let mut cache = GlyphCache::new();
        assert!(cache.glyph('A').iter().any(|&on| on));
        assert!(cache.glyph(' ').iter().all(|&on| !on));
    }

    #[test]
    fn test_sample_scales() {
        let mut glyph = vec![false; GLYPH_WIDTH * GLYPH_HEIGHT];
        glyph[0] = true;
        // Doubling the size maps the top-left 2x2 block onto source (0, 0).
        assert!(sample(&glyph, 24, 48, 1, 1));
        assert!(!sample(&glyph, 24, 48, 2, 0));
        assert!(!sample(&glyph, 0, 0, 0, 0));
    }
}
