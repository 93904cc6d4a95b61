//! Caption overlays.
//!
//! Both strategies share one compositing path: text (and bars) are drawn
//! onto a copy of the frame, and the copy is mixed back over the original at
//! a fixed overlay weight.

use crate::blend::mix_into;
use crate::glyphs::GlyphRasterizer;
use serde::{Deserialize, Serialize};
use shadereel_core::RasterFrame;
use std::sync::Arc;

/// Floating captions follow `sin(frame_index / FLOAT_PERIOD)`.
pub const FLOAT_PERIOD: f64 = 12.0;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];

/// Where and how captions are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayStyle {
    /// Opaque black bars top and bottom, caption in the bottom bar.
    Bars {
        /// Optional caption for the top bar.
        #[serde(default)]
        top_text: Option<String>,
    },
    /// A single line near the bottom edge that floats on a sine wave.
    Floating {
        /// Peak vertical displacement in pixels.
        #[serde(default = "default_amplitude")]
        amplitude: f64,
    },
}

fn default_amplitude() -> f64 {
    20.0
}

impl OverlayStyle {
    pub fn floating() -> Self {
        Self::Floating {
            amplitude: default_amplitude(),
        }
    }

    pub fn bars(top_text: Option<String>) -> Self {
        Self::Bars { top_text }
    }

    /// Weight of the drawn copy when mixed back over the frame.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Bars { .. } => 0.75,
            Self::Floating { .. } => 0.7,
        }
    }

    /// Left edge of the text as a fraction of frame width.
    fn text_left(&self) -> f64 {
        match self {
            Self::Bars { .. } => 0.03,
            Self::Floating { .. } => 0.1,
        }
    }

    /// Text size as a fraction of frame height.
    fn text_scale(&self) -> f32 {
        match self {
            Self::Bars { .. } => 0.032,
            Self::Floating { .. } => 0.03,
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::floating()
    }
}

/// Draws caption text onto frames.
#[derive(Clone)]
pub struct CaptionOverlay {
    style: OverlayStyle,
    rasterizer: Arc<dyn GlyphRasterizer>,
    font_px: Option<f32>,
}

impl CaptionOverlay {
    pub fn new(style: OverlayStyle, rasterizer: Arc<dyn GlyphRasterizer>) -> Self {
        Self {
            style,
            rasterizer,
            font_px: None,
        }
    }

    /// Fixed text size in pixels instead of the height-relative default.
    pub fn with_font_px(mut self, px: f32) -> Self {
        self.font_px = Some(px);
        self
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Height of each bar for a frame `height` pixels tall.
    pub fn bar_height(height: u32) -> u32 {
        (height as f64 * 0.12) as u32
    }

    /// Baseline of the main caption line.
    pub fn baseline(&self, height: u32, frame_index: u64, animated: bool) -> i32 {
        let h = height as f64;
        match &self.style {
            OverlayStyle::Bars { .. } => (h - Self::bar_height(height) as f64 * 0.35) as i32,
            OverlayStyle::Floating { amplitude } => {
                let wave = if animated {
                    amplitude * (frame_index as f64 / FLOAT_PERIOD).sin()
                } else {
                    0.0
                };
                (h * 0.9 + wave).floor() as i32
            }
        }
    }

    /// Composite `text` onto `frame`. Blank text returns the frame untouched.
    pub fn overlay(&self, frame: RasterFrame, text: &str, frame_index: u64, animated: bool) -> RasterFrame {
        if text.trim().is_empty() {
            return frame;
        }

        let (w, h) = frame.dimensions();
        let px = self
            .font_px
            .unwrap_or_else(|| (h as f32 * self.style.text_scale()).max(8.0));
        let left = (w as f64 * self.style.text_left()) as i32;

        let mut drawn = frame.clone();
        if let OverlayStyle::Bars { top_text } = &self.style {
            let bar = Self::bar_height(h);
            drawn.fill_rows(0, bar, BLACK);
            drawn.fill_rows(h.saturating_sub(bar), h, BLACK);
            if let Some(top) = top_text.as_deref().filter(|t| !t.trim().is_empty()) {
                let top_baseline = (bar as f64 * 0.65) as i32;
                self.draw_text(&mut drawn, top, left, top_baseline, px);
            }
        }
        self.draw_text(&mut drawn, text, left, self.baseline(h, frame_index, animated), px);

        let mut out = frame;
        let alpha = self.style.weight() as f32;
        let base = out.as_raw().to_vec();
        mix_into(out.as_raw_mut(), &base, drawn.as_raw(), alpha);
        out
    }

    /// Draw white text with its baseline at `baseline`, clipped to the frame.
    fn draw_text(&self, frame: &mut RasterFrame, text: &str, left: i32, baseline: i32, px: f32) {
        let (w, h) = (frame.width() as i32, frame.height() as i32);
        let mut pen = left as f32;
        for ch in text.chars() {
            let glyph = self.rasterizer.rasterize(ch, px);
            let gx = pen.round() as i32 + glyph.xmin;
            let gy = baseline - (glyph.height as i32 + glyph.ymin);
            for row in 0..glyph.height {
                let y = gy + row as i32;
                if y < 0 || y >= h {
                    continue;
                }
                for col in 0..glyph.width {
                    let x = gx + col as i32;
                    if x < 0 || x >= w {
                        continue;
                    }
                    let cov = glyph.coverage[row * glyph.width + col] as u32;
                    if cov == 0 {
                        continue;
                    }
                    let [r, g, b] = frame.pixel(x as u32, y as u32);
                    let over = |c: u8, t: u8| ((c as u32 * (255 - cov) + t as u32 * cov + 127) / 255) as u8;
                    frame.put_pixel(
                        x as u32,
                        y as u32,
                        [over(r, WHITE[0]), over(g, WHITE[1]), over(b, WHITE[2])],
                    );
                }
            }
            pen += glyph.advance;
        }
    }
}
