//! ShadeReel Effects - Frame-level compositing stages
//!
//! - `FrameBlender`: linear cross-fades between graded looks
//! - `CaptionOverlay`: bar and floating caption strategies
//! - `GlyphRasterizer`: pluggable text rasterization (fontdue or font-free)

pub mod blend;
pub mod caption;
pub mod glyphs;

pub use blend::{mix, BlendSequence, FrameBlender};
pub use caption::{CaptionOverlay, OverlayStyle, FLOAT_PERIOD};
pub use glyphs::{BlockRasterizer, FontRasterizer, GlyphBitmap, GlyphRasterizer};

use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Pick a caption rasterizer: the configured font if given, otherwise the
/// first system font found, otherwise block glyphs.
pub fn resolve_rasterizer(font: Option<&Path>) -> shadereel_core::Result<Arc<dyn GlyphRasterizer>> {
    if let Some(path) = font {
        return Ok(Arc::new(FontRasterizer::from_path(path)?));
    }
    match FontRasterizer::discover() {
        Some(font) => Ok(Arc::new(font)),
        None => {
            warn!("No caption font found; falling back to block glyphs");
            Ok(Arc::new(BlockRasterizer))
        }
    }
}
