//! Glyph rasterization for captions.
//!
//! [`FontRasterizer`] renders real outlines through `fontdue`.
//! [`BlockRasterizer`] draws every visible character as a solid block; it
//! needs no font file and gives byte-stable output across machines.

use fontdue::{Font, FontSettings};
use shadereel_core::{Result, ShadeReelError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Coverage bitmap for one character.
#[derive(Debug, Clone, Default)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    /// Left bearing relative to the pen position.
    pub xmin: i32,
    /// Bottom edge relative to the baseline (negative below it).
    pub ymin: i32,
    /// Pen advance after this glyph.
    pub advance: f32,
    /// Row-major coverage, `0..=255`.
    pub coverage: Vec<u8>,
}

/// Turns characters into coverage bitmaps at a pixel size.
pub trait GlyphRasterizer: Send + Sync {
    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap;

    /// Total pen advance of `text`.
    fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars().map(|ch| self.rasterize(ch, px).advance).sum()
    }
}

/// Outline font rasterizer.
pub struct FontRasterizer {
    font: Font,
}

/// Font files tried, in order, when no explicit font is configured.
const FALLBACK_FONTS: &[&str] = &[
    "DejaVuSans-Bold.ttf",
    "DejaVuSans.ttf",
    "LiberationSans-Bold.ttf",
    "LiberationSans-Regular.ttf",
    "Arial Bold.ttf",
    "Arial.ttf",
    "arialbd.ttf",
    "arial.ttf",
    "Helvetica.ttc",
];

/// System font directories searched after the user font directory.
const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/liberation",
    "/System/Library/Fonts/Supplemental",
    "/System/Library/Fonts",
    "/Library/Fonts",
    "C:\\Windows\\Fonts",
];

impl FontRasterizer {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| ShadeReelError::unreadable(format!("invalid font data: {e}")))?;
        Ok(Self { font })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ShadeReelError::unreadable(format!("font {}: {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Look for a usable font in the user and system font directories.
    pub fn discover() -> Option<Self> {
        let mut search: Vec<PathBuf> = Vec::new();
        if let Some(user) = dirs::font_dir() {
            search.push(user);
        }
        search.extend(SYSTEM_FONT_DIRS.iter().map(PathBuf::from));

        for dir in &search {
            for name in FALLBACK_FONTS {
                let candidate = dir.join(name);
                if !candidate.is_file() {
                    continue;
                }
                match Self::from_path(&candidate) {
                    Ok(rasterizer) => {
                        debug!("Caption font: {}", candidate.display());
                        return Some(rasterizer);
                    }
                    Err(e) => debug!("Skipping font {}: {e}", candidate.display()),
                }
            }
        }
        None
    }
}

impl GlyphRasterizer for FontRasterizer {
    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap {
        let (metrics, coverage) = self.font.rasterize(ch, px);
        GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            advance: metrics.advance_width,
            coverage,
        }
    }
}

/// Font-free rasterizer: a solid block per visible character.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl GlyphRasterizer for BlockRasterizer {
    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap {
        let advance = (px * 0.6).round().max(1.0);
        if ch.is_whitespace() {
            return GlyphBitmap {
                advance,
                ..GlyphBitmap::default()
            };
        }
        let width = (px * 0.45).round().max(1.0) as usize;
        let height = (px * 0.7).round().max(1.0) as usize;
        GlyphBitmap {
            width,
            height,
            xmin: ((advance as usize - width.min(advance as usize)) / 2) as i32,
            ymin: 0,
            advance,
            coverage: vec![255; width * height],
        }
    }
}
