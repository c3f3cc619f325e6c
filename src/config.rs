//! # Label Configuration
//!
//! Every tunable of the label layout lives in [`LabelConfig`]. The layout
//! engine reads it and never mutates it, so one value can serve any number of
//! jobs (or tests) side by side.
//!
//! ## Supported Labels
//!
//! | Preset | Size | Resolution | Pixels |
//! |--------|------|------------|--------|
//! | M221 | 30×20 mm | 300 DPI | 354×236 |
//!
//! ## Usage
//!
//! ```
//! use miracle_label::config::LabelConfig;
//!
//! let config = LabelConfig::m221();
//! assert_eq!(config.geometry.width, 354);
//! assert_eq!(config.footer.promo, "MiracleCoins.com");
//! ```
//!
//! Configuration files are JSON. Every field is optional; anything left out
//! keeps its M221 default:
//!
//! ```json
//! { "offsets": { "left": -60 }, "printer": { "name": "/dev/usb/lp1" } }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LabelError;

/// # Label Geometry
///
/// Pixel size of one physical label.
///
/// ```text
/// dots_per_mm = dpi / 25.4
///
/// For 30×20 mm at 300 DPI:
///   dots_per_mm = 300 / 25.4 ≈ 11.8
///   width  = 30 × 11.8 = 354
///   height = 20 × 11.8 = 236
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelGeometry {
    pub width: i32,
    pub height: i32,
}

impl LabelGeometry {
    /// Geometry of a label of the given physical size.
    pub fn from_mm(width_mm: f32, height_mm: f32, dpi: u16) -> Self {
        let dots_per_mm = dpi as f32 / 25.4;
        Self {
            width: (width_mm * dots_per_mm).round() as i32,
            height: (height_mm * dots_per_mm).round() as i32,
        }
    }
}

impl Default for LabelGeometry {
    fn default() -> Self {
        Self {
            width: 354,
            height: 236,
        }
    }
}

/// Global and per-role position tuning, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offsets {
    /// Added to every x coordinate
    pub left: i32,
    /// Added to the vertically centered start position
    pub top: i32,
    /// Horizontal nudge for the buyer and item lines
    pub buyer_nudge: i32,
    /// Vertical bias for footer lines (negative pulls them up)
    pub footer_bias: i32,
    /// Extra gap above the promotional footer line
    pub footer_nudge: i32,
}

impl Default for Offsets {
    fn default() -> Self {
        Self {
            left: -63,
            top: -42,
            buyer_nudge: 65,
            footer_bias: -5,
            footer_nudge: 6,
        }
    }
}

/// Fixed margins, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: i32,
    pub right: i32,
    /// Smallest allowed start position of the first line
    pub min_top: i32,
    /// Gap kept between the last drawn pixel row and the bottom edge
    pub bottom_safety: i32,
    /// Item lines wrap at `geometry.width - item_side`
    pub item_side: i32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 5,
            right: 10,
            min_top: 5,
            bottom_safety: 4,
            item_side: 120,
        }
    }
}

/// Font family and pixel size per text role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// TrueType file, absolute or relative to a system font directory
    pub path: PathBuf,
    pub buyer: f32,
    pub item: f32,
    pub footer: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("arial.ttf"),
            buyer: 26.0,
            item: 28.0,
            footer: 24.0,
        }
    }
}

/// Buyer name truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuyerConfig {
    /// Names longer than this many characters are cut
    pub max_chars: usize,
    /// Appended after a cut name
    pub marker: String,
}

impl Default for BuyerConfig {
    fn default() -> Self {
        Self {
            max_chars: 11,
            marker: ".".to_string(),
        }
    }
}

/// Price column on the buyer line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Widest expected price, measured to size the reserved column
    pub sentinel: String,
    /// Added to the sentinel width
    pub margin: i32,
    /// Fixed x of the price (before the global left offset)
    pub column: i32,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            sentinel: "$9999".to_string(),
            margin: 35,
            column: 220,
        }
    }
}

/// The two constant lines printed at the bottom of every label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    pub promo: String,
    pub social: String,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            promo: "MiracleCoins.com".to_string(),
            social: "FB: @miraclecoinz".to_string(),
        }
    }
}

/// Printer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    /// Device path the transport opens
    pub name: String,
    /// Name given to each print job
    pub job_name: String,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            name: "/dev/usb/lp0".to_string(),
            job_name: "Label".to_string(),
        }
    }
}

/// # Label Configuration
///
/// Geometry, offsets, fonts and fixed strings for one label layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub geometry: LabelGeometry,
    pub offsets: Offsets,
    pub margins: Margins,
    /// Vertical gap after every line
    pub line_spacing: i32,
    /// Wrapped item lines beyond this count are dropped
    pub item_max_lines: usize,
    pub fonts: FontConfig,
    pub buyer: BuyerConfig,
    pub price: PriceConfig,
    pub footer: FooterConfig,
    pub printer: PrinterSettings,
}

impl LabelConfig {
    /// # M221 30×20 mm label at 300 DPI
    ///
    /// ```text
    /// ┌──────────────────────────────┐ ─┬─
    /// │ Johnathan S.       $150      │  │
    /// │ Gold Eagle 2024              │  │
    /// │ 1oz Coin                     │ 236 px
    /// │       MiracleCoins.com       │  │
    /// │      FB: @miraclecoinz       │  │
    /// └──────────────────────────────┘ ─┴─
    /// ├─────────── 354 px ───────────┤
    /// ```
    pub fn m221() -> Self {
        Self {
            geometry: LabelGeometry::default(),
            offsets: Offsets::default(),
            margins: Margins::default(),
            line_spacing: 5,
            item_max_lines: 2,
            fonts: FontConfig::default(),
            buyer: BuyerConfig::default(),
            price: PriceConfig::default(),
            footer: FooterConfig::default(),
            printer: PrinterSettings::default(),
        }
    }

    /// Load a JSON configuration file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            LabelError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
            .map_err(|e| LabelError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse a JSON configuration string.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load `path` if given, otherwise use the M221 preset.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, LabelError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::m221()),
        }
    }

    /// Maximum pixel width of a wrapped item line
    #[inline]
    pub fn item_wrap_width(&self) -> i32 {
        self.geometry.width - self.margins.item_side
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self::m221()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_geometry_from_mm() {
        assert_eq!(LabelGeometry::from_mm(30.0, 20.0, 300), LabelGeometry::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = LabelConfig::from_json(
            r#"{ "offsets": { "left": -60 }, "printer": { "name": "/dev/usb/lp1" } }"#,
        )
        .unwrap();

        assert_eq!(config.offsets.left, -60);
        assert_eq!(config.offsets.top, -42);
        assert_eq!(config.printer.name, "/dev/usb/lp1");
        assert_eq!(config.printer.job_name, "Label");
        assert_eq!(config.geometry, LabelGeometry::default());
        assert_eq!(config.footer, FooterConfig::default());
    }

    #[test]
    fn test_empty_json_is_m221() {
        assert_eq!(LabelConfig::from_json("{}").unwrap(), LabelConfig::m221());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(LabelConfig::from_json(r#"{ "line_spacing": "wide" }"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = LabelConfig::load("/nonexistent/label.json").unwrap_err();
        assert!(matches!(err, LabelError::Config(_)));
    }

    #[test]
    fn test_item_wrap_width() {
        assert_eq!(LabelConfig::m221().item_wrap_width(), 234);
    }
}
