//! # Fonts and Text Metrics
//!
//! A [`Font`] is a cheap, clonable handle: a face plus a pixel size. Faces are
//! either a TrueType file rendered with ab_glyph, or the built-in Spleen
//! bitmap font that is always available.
//!
//! ## Metrics
//!
//! The layout engine never touches a face directly. It asks a
//! [`TextMetrics`] implementation for the bounding box of a string:
//!
//! ```text
//! (0,0) ──────────── width ────────────►
//!   │  ┌──────────────────────────────┐
//!   │  │ ascent       ▲               │
//!   │  │ ─ ─ ─ ─ ─ baseline ─ ─ ─ ─ ─ │
//! height│ descent (of this text only)  │
//!   ▼  └──────────────────────────────┘
//! ```
//!
//! [`GlyphMetrics`] measures real glyphs. Tests substitute fakes with fixed
//! advances so layout runs without any font on disk.
//!
//! ## Fallback
//!
//! [`FontSet::load`] never fails: when the configured TrueType file is
//! missing or unreadable all three roles switch to the built-in font.

pub mod bitmap;
pub mod ttf;

use ab_glyph::FontArc;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::FontConfig;

/// Directories searched for a relative font path.
const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype",
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "/Library/Fonts",
    "C:\\Windows\\Fonts",
];

/// Why a TrueType font could not be used.
#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("font file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid font data in {0}")]
    Invalid(PathBuf),
}

/// Pixel bounding box of a rendered string, anchored at the line's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBox {
    pub width: i32,
    pub height: i32,
}

/// Source of glyph shapes.
#[derive(Clone)]
pub enum FontFace {
    Truetype(FontArc),
    Builtin,
}

/// A face at a given pixel size.
#[derive(Clone)]
pub struct Font {
    face: FontFace,
    size: f32,
}

impl Font {
    pub fn truetype(font: FontArc, size: f32) -> Self {
        Self {
            face: FontFace::Truetype(font),
            size,
        }
    }

    pub fn builtin(size: f32) -> Self {
        Self {
            face: FontFace::Builtin,
            size,
        }
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.face, FontFace::Builtin)
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let face = match self.face {
            FontFace::Truetype(_) => "truetype",
            FontFace::Builtin => "builtin",
        };
        f.debug_struct("Font")
            .field("face", &face)
            .field("size", &self.size)
            .finish()
    }
}

/// Measures strings. Implementations must be pure: same input, same box.
pub trait TextMetrics {
    fn measure(&self, text: &str, font: &Font) -> TextBox;
}

/// Measures with the real glyph outlines or bitmaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphMetrics;

impl TextMetrics for GlyphMetrics {
    fn measure(&self, text: &str, font: &Font) -> TextBox {
        match font.face() {
            FontFace::Truetype(face) => ttf::measure(face, font.size(), text),
            FontFace::Builtin => bitmap::measure(font.size(), text),
        }
    }
}

/// Which part of the label a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontRole {
    Buyer,
    Item,
    Footer,
}

/// One font per role, fixed for the duration of a job.
#[derive(Debug, Clone)]
pub struct FontSet {
    pub buyer: Font,
    pub item: Font,
    pub footer: Font,
}

impl FontSet {
    /// Load the configured TrueType font, or fall back to the built-in font
    /// for every role.
    pub fn load(config: &FontConfig) -> Self {
        match Self::try_load(config) {
            Ok(fonts) => fonts,
            Err(e) => {
                tracing::warn!(error = %e, "using built-in font");
                Self::builtin(config)
            }
        }
    }

    /// Load the configured TrueType font, reporting why it is unusable.
    pub fn try_load(config: &FontConfig) -> Result<Self, FontLoadError> {
        let path =
            find_font(&config.path).ok_or_else(|| FontLoadError::NotFound(config.path.clone()))?;
        let data = fs::read(&path).map_err(|source| FontLoadError::Read {
            path: path.clone(),
            source,
        })?;
        let face = FontArc::try_from_vec(data).map_err(|_| FontLoadError::Invalid(path.clone()))?;
        tracing::debug!(path = %path.display(), "loaded font");

        Ok(Self {
            buyer: Font::truetype(face.clone(), config.buyer),
            item: Font::truetype(face.clone(), config.item),
            footer: Font::truetype(face, config.footer),
        })
    }

    /// Built-in font at the configured sizes.
    pub fn builtin(config: &FontConfig) -> Self {
        Self {
            buyer: Font::builtin(config.buyer),
            item: Font::builtin(config.item),
            footer: Font::builtin(config.footer),
        }
    }

    pub fn get(&self, role: FontRole) -> &Font {
        match role {
            FontRole::Buyer => &self.buyer,
            FontRole::Item => &self.item,
            FontRole::Footer => &self.footer,
        }
    }
}

/// Resolve a font path: as given, then inside the system font directories
/// and their immediate subdirectories.
fn find_font(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    if path.is_absolute() {
        return None;
    }

    for dir in FONT_DIRS.iter().map(Path::new) {
        let candidate = dir.join(path);
        if candidate.is_file() {
            return Some(candidate);
        }
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let candidate = entry.path().join(path);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_font() -> FontConfig {
        FontConfig {
            path: PathBuf::from("/nonexistent/fonts/missing.ttf"),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_font_falls_back_to_builtin() {
        let fonts = FontSet::load(&missing_font());
        assert!(fonts.buyer.is_builtin());
        assert!(fonts.item.is_builtin());
        assert!(fonts.footer.is_builtin());
        assert_eq!(fonts.buyer.size(), 26.0);
        assert_eq!(fonts.item.size(), 28.0);
        assert_eq!(fonts.footer.size(), 24.0);
    }

    #[test]
    fn test_try_load_reports_not_found() {
        let err = FontSet::try_load(&missing_font()).unwrap_err();
        assert!(matches!(err, FontLoadError::NotFound(_)));
    }

    #[test]
    fn test_invalid_font_data() {
        let path = std::env::temp_dir().join(format!("not-a-font-{}.ttf", std::process::id()));
        fs::write(&path, b"definitely not a font").unwrap();
        let config = FontConfig {
            path: path.clone(),
            ..Default::default()
        };

        let err = FontSet::try_load(&config).unwrap_err();
        assert!(matches!(err, FontLoadError::Invalid(_)));
        assert!(FontSet::load(&config).buyer.is_builtin());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_get_by_role() {
        let fonts = FontSet::builtin(&FontConfig::default());
        assert_eq!(fonts.get(FontRole::Buyer).size(), 26.0);
        assert_eq!(fonts.get(FontRole::Item).size(), 28.0);
        assert_eq!(fonts.get(FontRole::Footer).size(), 24.0);
    }

    #[test]
    fn test_glyph_metrics_builtin() {
        let font = Font::builtin(24.0);
        let short = GlyphMetrics.measure("ab", &font);
        let long = GlyphMetrics.measure("abcd", &font);
        assert_eq!(short.width * 2, long.width);
        assert!(short.height > 0);
        assert_eq!(GlyphMetrics.measure("", &font), TextBox::default());
    }
}
