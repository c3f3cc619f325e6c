//! TrueType measurement and rasterization with ab_glyph.
//!
//! Sizes are em sizes in pixels: a 26 px font has an em square 26 px tall,
//! matching how desktop imaging libraries size TrueType text.

use ab_glyph::{Font as _, FontArc, GlyphId, PxScale, ScaleFont, point};

use super::TextBox;

/// Scale that makes the em square `size` pixels tall.
pub fn px_scale(font: &FontArc, size: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(size * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(size),
    }
}

/// Glyph ids with their x positions, plus the total advance.
fn layout_glyphs(font: &FontArc, scale: PxScale, text: &str) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(scale);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut caret_x = 0.0f32;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
    }

    (glyphs, caret_x)
}

/// Bounding box of `text`: advance width, and the lowest outline edge with the
/// baseline placed at the ascent.
pub fn measure(font: &FontArc, size: f32, text: &str) -> TextBox {
    if text.is_empty() {
        return TextBox::default();
    }

    let scale = px_scale(font, size);
    let baseline_y = font.as_scaled(scale).ascent();
    let (glyphs, advance) = layout_glyphs(font, scale, text);

    let mut bottom = 0.0f32;
    for (glyph_id, glyph_x) in glyphs {
        let glyph = glyph_id.with_scale_and_position(scale, point(glyph_x, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            bottom = bottom.max(outlined.px_bounds().max.y);
        }
    }

    TextBox {
        width: advance.ceil() as i32,
        height: bottom.ceil() as i32,
    }
}

/// Rasterize `text` with its top-left at the origin.
///
/// `plot(x, y, coverage)` is called for every covered pixel; coverage runs
/// from 0.0 (untouched) to 1.0 (fully inside the outline).
pub fn draw<F>(font: &FontArc, size: f32, text: &str, mut plot: F)
where
    F: FnMut(i32, i32, f32),
{
    let scale = px_scale(font, size);
    let baseline_y = font.as_scaled(scale).ascent();
    let (glyphs, _) = layout_glyphs(font, scale, text);

    for (glyph_id, glyph_x) in glyphs {
        let glyph = glyph_id.with_scale_and_position(scale, point(glyph_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                plot(x, y, coverage);
            });
        }
    }
}
