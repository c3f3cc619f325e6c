//! # Label Rendering
//!
//! Paints a [`LabelLayout`] onto a grayscale raster.
//!
//! ## Architecture
//!
//! ```text
//! LabelLayout → paint() → Canvas (RasterCanvas = image::GrayImage)
//!                              │
//!                              ├─► to_png()     preview bytes
//!                              └─► pack_1bit()  printer raster rows
//! ```
//!
//! Coordinates may fall partly outside the label (negative x from the global
//! left offset, overflowing item lines); those pixels are clipped.

use image::{GrayImage, Luma};

use crate::config::LabelGeometry;
use crate::error::LabelError;
use crate::font::{Font, FontFace, bitmap, ttf};
use crate::layout::LabelLayout;

/// Paper white
pub const WHITE: u8 = 255;
/// Ink black
pub const BLACK: u8 = 0;

/// Luma at or below which a pixel prints as a black dot.
pub const PRINT_THRESHOLD: u8 = 128;

/// A drawing surface.
pub trait Canvas {
    /// Paint every pixel with `luma`.
    fn fill(&mut self, luma: u8);

    /// Draw `text` with its top-left corner at `(x, y)`.
    fn draw_text(&mut self, text: &str, font: &Font, x: i32, y: i32, luma: u8);
}

/// Canvas backed by an 8-bit grayscale image.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: GrayImage,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32, background: u8) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, Luma([background])),
        }
    }

    /// Blank white canvas the size of the label.
    pub fn for_label(geometry: &LabelGeometry) -> Self {
        Self::new(
            geometry.width.max(0) as u32,
            geometry.height.max(0) as u32,
            WHITE,
        )
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// Blend `luma` into the pixel at `(x, y)` by `coverage`, ignoring
    /// positions outside the canvas.
    fn blend(&mut self, x: i32, y: i32, luma: u8, coverage: f32) {
        if x < 0 || y < 0 || x as u32 >= self.image.width() || y as u32 >= self.image.height() {
            return;
        }
        let coverage = coverage.clamp(0.0, 1.0);
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let current = pixel.0[0] as f32;
        let value = current + (luma as f32 - current) * coverage;
        pixel.0[0] = value.round() as u8;
    }
}

impl Canvas for RasterCanvas {
    fn fill(&mut self, luma: u8) {
        for pixel in self.image.pixels_mut() {
            *pixel = Luma([luma]);
        }
    }

    fn draw_text(&mut self, text: &str, font: &Font, x: i32, y: i32, luma: u8) {
        let mut plot = |px: i32, py: i32, coverage: f32| self.blend(x + px, y + py, luma, coverage);

        match font.face() {
            FontFace::Truetype(face) => ttf::draw(face, font.size(), text, &mut plot),
            FontFace::Builtin => bitmap::draw(font.size(), text, &mut plot),
        }
    }
}

/// Draw every instruction of `label` in order, in black.
pub fn paint<C>(canvas: &mut C, label: &LabelLayout)
where
    C: Canvas + ?Sized,
{
    for instruction in &label.instructions {
        canvas.draw_text(
            &instruction.text,
            &instruction.font,
            instruction.x,
            instruction.y,
            BLACK,
        );
    }
}

/// Render `label` onto a fresh white canvas of the label's size.
pub fn render_label(label: &LabelLayout, geometry: &LabelGeometry) -> RasterCanvas {
    let mut canvas = RasterCanvas::for_label(geometry);
    paint(&mut canvas, label);
    canvas
}

/// Encode an image as PNG.
pub fn to_png(image: &GrayImage) -> Result<Vec<u8>, LabelError> {
    use image::ImageEncoder;

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::L8,
        )
        .map_err(|e: image::ImageError| LabelError::Image(e.to_string()))?;

    Ok(png_bytes)
}

/// Pack a row of dots MSB first (1 = black). The last byte is padded with
/// white on the right.
///
/// ```
/// use miracle_label::render::pack_row;
///
/// let row = vec![true, true, true, true, false, false, false, false];
/// assert_eq!(pack_row(&row), vec![0xF0]);
///
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let num_bytes = pixels.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }

    bytes
}

/// Threshold an image to 1-bit raster rows.
///
/// Length = `ceil(width / 8) * height` bytes.
pub fn pack_1bit(image: &GrayImage) -> Vec<u8> {
    let width = image.width() as usize;
    let mut data = Vec::with_capacity(width.div_ceil(8) * image.height() as usize);

    for row in image.rows() {
        let dots: Vec<bool> = row.map(|p| p.0[0] <= PRINT_THRESHOLD).collect();
        data.extend(pack_row(&dots));
    }

    data
}
