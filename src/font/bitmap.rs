//! Built-in bitmap font.
//!
//! Uses the Spleen 12×24 font, scaled with nearest neighbour so that a cell is
//! `size` pixels tall and half as wide. Characters missing from Spleen render
//! as a box outline.

use spleen_font::{FONT_12X24, PSF2Font};
use std::borrow::Cow;
use std::sync::OnceLock;

use super::TextBox;

const SRC_WIDTH: usize = 12;
const SRC_HEIGHT: usize = 24;

/// Cell size in pixels for a font of `size` pixels.
pub fn cell_size(size: f32) -> (usize, usize) {
    let height = (size.round() as usize).max(1);
    let width = (height * SRC_WIDTH / SRC_HEIGHT).max(1);
    (width, height)
}

/// Latin-1 glyphs, decoded from the font on first use.
static LATIN1: OnceLock<Vec<Vec<bool>>> = OnceLock::new();

fn latin1_glyphs() -> &'static Vec<Vec<bool>> {
    LATIN1.get_or_init(|| decode_glyphs((0..=u8::MAX).map(char::from)))
}

/// Decode unscaled 12×24 glyphs, row-major, `true` = ink. Parses the font
/// once per call.
fn decode_glyphs(chars: impl Iterator<Item = char>) -> Vec<Vec<bool>> {
    let mut spleen = PSF2Font::new(FONT_12X24).ok();
    let mut utf8 = [0u8; 4];

    chars
        .map(|ch| {
            let mut glyph = vec![false; SRC_WIDTH * SRC_HEIGHT];
            let mut found = false;

            if let Some(spleen) = spleen.as_mut()
                && let Some(spleen_glyph) = spleen.glyph_for_utf8(ch.encode_utf8(&mut utf8).as_bytes())
            {
                for (row_y, row) in spleen_glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if row_y < SRC_HEIGHT && col_x < SRC_WIDTH {
                            glyph[row_y * SRC_WIDTH + col_x] = on;
                        }
                    }
                }
                found = true;
            }

            if !found {
                draw_box(&mut glyph);
            }
            glyph
        })
        .collect()
}

/// Unscaled glyph for `ch`. Latin-1 comes from the cache; anything else is
/// decoded on the spot.
fn glyph_bitmap(ch: char) -> Cow<'static, [bool]> {
    if let Some(glyph) = latin1_glyphs().get(ch as usize) {
        return Cow::Borrowed(glyph.as_slice());
    }
    match decode_glyphs(std::iter::once(ch)).pop() {
        Some(glyph) => Cow::Owned(glyph),
        None => {
            let mut glyph = vec![false; SRC_WIDTH * SRC_HEIGHT];
            draw_box(&mut glyph);
            Cow::Owned(glyph)
        }
    }
}

fn draw_box(glyph: &mut [bool]) {
    for x in 1..SRC_WIDTH - 1 {
        glyph[2 * SRC_WIDTH + x] = true;
        glyph[(SRC_HEIGHT - 3) * SRC_WIDTH + x] = true;
    }
    for y in 2..SRC_HEIGHT - 2 {
        glyph[y * SRC_WIDTH + 1] = true;
        glyph[y * SRC_WIDTH + SRC_WIDTH - 2] = true;
    }
}

/// Bounding box of `text`: one cell per character, and the lowest inked row.
pub fn measure(size: f32, text: &str) -> TextBox {
    let (cell_w, cell_h) = cell_size(size);
    let mut chars = 0usize;
    let mut lowest_row = None;

    for ch in text.chars() {
        chars += 1;
        let glyph = glyph_bitmap(ch);
        let last = (0..SRC_HEIGHT)
            .rev()
            .find(|&y| glyph[y * SRC_WIDTH..(y + 1) * SRC_WIDTH].iter().any(|&on| on));
        lowest_row = lowest_row.max(last);
    }

    let height = match lowest_row {
        Some(row) => ((row + 1) * cell_h).div_ceil(SRC_HEIGHT),
        None => 0,
    };

    TextBox {
        width: (chars * cell_w) as i32,
        height: height as i32,
    }
}

/// Rasterize `text` with its top-left at the origin.
///
/// `plot(x, y, coverage)` is called for every inked pixel with coverage 1.0.
pub fn draw<F>(size: f32, text: &str, mut plot: F)
where
    F: FnMut(i32, i32, f32),
{
    let (cell_w, cell_h) = cell_size(size);

    for (i, ch) in text.chars().enumerate() {
        let glyph = glyph_bitmap(ch);
        let origin_x = i * cell_w;

        for dy in 0..cell_h {
            for dx in 0..cell_w {
                let sx = dx * SRC_WIDTH / cell_w;
                let sy = dy * SRC_HEIGHT / cell_h;
                if glyph[sy * SRC_WIDTH + sx] {
                    plot((origin_x + dx) as i32, dy as i32, 1.0);
                }
            }
        }
    }
}
