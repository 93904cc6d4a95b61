//! Aspect-preserving crop and resize.
//!
//! A source is center-cropped to the target aspect ratio, then resampled to
//! the exact target size. Crop offsets use integer floor division so output
//! is reproducible bit-for-bit.

use crate::error::{Result, ShadeReelError};
use crate::frame::RasterFrame;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

/// Axis-aligned crop window in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Whether the crop covers the whole `width`x`height` source.
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// Resampling kernel used after cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
    Lanczos3,
}

impl ResampleFilter {
    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Center-crop-then-resize to a fixed output size.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryFitter {
    filter: ResampleFilter,
}

impl GeometryFitter {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> ResampleFilter {
        self.filter
    }

    /// Compute the centered crop that matches the `target_w:target_h` aspect.
    ///
    /// A relatively wider source keeps its full height, a relatively taller
    /// one keeps its full width. Neither side of the crop drops below 1 px.
    pub fn crop_rect(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> Result<CropRect> {
        if src_w == 0 || src_h == 0 {
            return Err(ShadeReelError::invalid(format!(
                "source frame {src_w}x{src_h} has no pixels"
            )));
        }
        if target_w == 0 || target_h == 0 {
            return Err(ShadeReelError::invalid(format!(
                "target size {target_w}x{target_h} must be non-zero"
            )));
        }

        let (sw, sh, tw, th) = (src_w as u64, src_h as u64, target_w as u64, target_h as u64);
        let (new_w, new_h) = if sw * th > tw * sh {
            ((sh * tw / th).clamp(1, sw), sh)
        } else {
            (sw, (sw * th / tw).clamp(1, sh))
        };

        Ok(CropRect {
            x: ((sw - new_w) / 2) as u32,
            y: ((sh - new_h) / 2) as u32,
            width: new_w as u32,
            height: new_h as u32,
        })
    }

    /// Fit `frame` to exactly `target_w`x`target_h`.
    pub fn fit(&self, frame: RasterFrame, target_w: u32, target_h: u32) -> Result<RasterFrame> {
        let (src_w, src_h) = frame.dimensions();
        let rect = Self::crop_rect(src_w, src_h, target_w, target_h)?;

        let cropped = if rect.is_full(src_w, src_h) {
            frame
        } else {
            frame.crop(rect.x, rect.y, rect.width, rect.height)?
        };
        if cropped.dimensions() == (target_w, target_h) {
            return Ok(cropped);
        }

        let image = cropped.into_image()?;
        let resized = imageops::resize(&image, target_w, target_h, self.filter.filter_type());
        Ok(RasterFrame::from(resized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wide_source_keeps_height() {
        let rect = GeometryFitter::crop_rect(1920, 1080, 1080, 1080).unwrap();
        assert_eq!(
            rect,
            CropRect {
                x: 420,
                y: 0,
                width: 1080,
                height: 1080
            }
        );
    }

    #[test]
    fn test_tall_source_keeps_width() {
        // 1080x1920 into 1:1 keeps the full width and centers vertically.
        let rect = GeometryFitter::crop_rect(1080, 1920, 1080, 1080).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 420, 1080, 1080));
    }

    #[test]
    fn test_crop_offsets_floor() {
        // 1001 wide into a square of height 500 leaves 501 columns; offset 250.
        let rect = GeometryFitter::crop_rect(1001, 500, 100, 100).unwrap();
        assert_eq!((rect.x, rect.width), (250, 500));
    }

    #[test]
    fn test_vertical_target_from_landscape() {
        let rect = GeometryFitter::crop_rect(1920, 1080, 1088, 1920).unwrap();
        // 1080 * 1088 / 1920 = 612
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (654, 0, 612, 1080));
    }

    #[test]
    fn test_extreme_ratio_never_collapses() {
        let rect = GeometryFitter::crop_rect(4000, 1, 9, 16).unwrap();
        assert_eq!(rect.width, 1);
        assert_eq!(rect.height, 1);
    }

    #[test]
    fn test_fit_matching_size_is_identity() {
        let frame = RasterFrame::gradient(64, 64);
        let out = GeometryFitter::default().fit(frame.clone(), 64, 64).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_fit_crop_only_when_target_equals_crop() {
        let frame = RasterFrame::gradient(96, 54);
        let out = GeometryFitter::default().fit(frame.clone(), 54, 54).unwrap();
        assert_eq!(out, frame.crop(21, 0, 54, 54).unwrap());
    }

    #[test]
    fn test_fit_zero_target_rejected() {
        let frame = RasterFrame::new(8, 8);
        let result = GeometryFitter::default().fit(frame, 0, 8);
        assert!(matches!(result, Err(ShadeReelError::InvalidParameter(_))));
    }

    #[test]
    fn test_fit_exact_dimensions_many_ratios() {
        let fitter = GeometryFitter::new(ResampleFilter::Bilinear);
        let sources = [
            (160, 10),
            (10, 160),
            (64, 36),
            (36, 64),
            (50, 50),
            (40, 30),
            (30, 40),
            (21, 9),
            (9, 21),
            (97, 13),
            (7, 3),
            (1, 1),
        ];
        for (w, h) in sources {
            for (tw, th) in [(32, 32), (18, 32), (32, 18)] {
                let out = fitter.fit(RasterFrame::gradient(w, h), tw, th).unwrap();
                assert_eq!(out.dimensions(), (tw, th), "source {w}x{h} -> {tw}x{th}");
            }
        }
    }

    proptest! {
        #[test]
        fn crop_rect_is_centered_and_in_bounds(
            src_w in 1u32..4000,
            src_h in 1u32..4000,
            tw in 1u32..2000,
            th in 1u32..2000,
        ) {
            let rect = GeometryFitter::crop_rect(src_w, src_h, tw, th).unwrap();
            prop_assert!(rect.width >= 1 && rect.height >= 1);
            prop_assert!(rect.x + rect.width <= src_w);
            prop_assert!(rect.y + rect.height <= src_h);
            prop_assert_eq!(rect.x, (src_w - rect.width) / 2);
            prop_assert_eq!(rect.y, (src_h - rect.height) / 2);
            // One side of the source always survives whole.
            prop_assert!(rect.width == src_w || rect.height == src_h);
        }

        #[test]
        fn fit_always_hits_the_target(
            src_w in 1u32..48,
            src_h in 1u32..48,
            tw in 1u32..40,
            th in 1u32..40,
        ) {
            let out = GeometryFitter::default()
                .fit(RasterFrame::gradient(src_w, src_h), tw, th)
                .unwrap();
            prop_assert_eq!(out.dimensions(), (tw, th));
        }
    }
}
