//! Look grading: a fixed-order chain of 8-bit pixel operations.
//!
//! Stages run brightness, contrast, saturation, warmth, then inversion. Each
//! stage rounds and clamps to `[0, 255]` before the next one sees the pixel;
//! the stages do not commute under clipping.

use crate::lut::{clamp_u8, ChannelLut};
use rayon::prelude::*;
use shadereel_core::RasterFrame;
use shadereel_timeline::LookDescriptor;
use smallvec::SmallVec;

/// ITU-R 601 luma in 16.16 fixed point, rounded.
#[inline]
pub fn luma(rgb: [u8; 3]) -> u8 {
    ((rgb[0] as u32 * 19595 + rgb[1] as u32 * 38470 + rgb[2] as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Rounded mean luma of a frame.
pub fn mean_luma(frame: &RasterFrame) -> u8 {
    let pixels = frame.width() as u64 * frame.height() as u64;
    if pixels == 0 {
        return 0;
    }
    let stride = frame.stride().max(1);
    let sum: u64 = frame
        .as_raw()
        .par_chunks(stride)
        .map(|row| {
            row.chunks_exact(3)
                .map(|px| luma([px[0], px[1], px[2]]) as u64)
                .sum::<u64>()
        })
        .sum();
    ((sum + pixels / 2) / pixels) as u8
}

/// A single grade stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradeOp {
    /// Blend toward black: `x * f`.
    Brightness(f64),
    /// Blend toward the frame's mean luma.
    Contrast(f64),
    /// Blend toward each pixel's own luma.
    Saturation(f64),
    /// Add to red, subtract from blue.
    Warmth(i16),
    /// `255 - x` on every channel.
    Invert,
}

impl GradeOp {
    /// Apply this stage to `frame` in place.
    pub fn apply(&self, frame: &mut RasterFrame) {
        match *self {
            Self::Brightness(f) => {
                ChannelLut::uniform(|v| clamp_u8(v as f64 * f)).apply(frame);
            }
            Self::Contrast(f) => {
                let mean = mean_luma(frame) as f64;
                ChannelLut::uniform(|v| clamp_u8(mean + (v as f64 - mean) * f)).apply(frame);
            }
            Self::Saturation(f) => saturate(frame, f),
            Self::Warmth(w) => {
                let w = w as i32;
                ChannelLut::per_channel(
                    |v| (v as i32 + w).clamp(0, 255) as u8,
                    |v| v,
                    |v| (v as i32 - w).clamp(0, 255) as u8,
                )
                .apply(frame);
            }
            Self::Invert => ChannelLut::uniform(|v| 255 - v).apply(frame),
        }
    }
}

fn saturate(frame: &mut RasterFrame, f: f64) {
    let stride = frame.stride().max(1);
    frame
        .as_raw_mut()
        .par_chunks_mut(stride)
        .for_each(|row| {
            for px in row.chunks_exact_mut(3) {
                let l = luma([px[0], px[1], px[2]]) as f64;
                for c in px.iter_mut() {
                    *c = clamp_u8(l + (*c as f64 - l) * f);
                }
            }
        });
}

/// The ordered stages for one look. Stages that would not change any pixel
/// are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradePipeline {
    ops: SmallVec<[GradeOp; 5]>,
}

impl GradePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the stage chain for a look.
    pub fn for_look(look: &LookDescriptor) -> Self {
        let mut pipeline = Self::new();
        if look.brightness != 1.0 {
            pipeline.push(GradeOp::Brightness(look.brightness));
        }
        if look.contrast != 1.0 {
            pipeline.push(GradeOp::Contrast(look.contrast));
        }
        if look.saturation != 1.0 {
            pipeline.push(GradeOp::Saturation(look.saturation));
        }
        if look.warmth != 0 {
            pipeline.push(GradeOp::Warmth(look.warmth));
        }
        if look.invert {
            pipeline.push(GradeOp::Invert);
        }
        pipeline
    }

    pub fn push(&mut self, op: GradeOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[GradeOp] {
        &self.ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// Run every stage over `frame` in order.
    pub fn apply_in_place(&self, frame: &mut RasterFrame) {
        for op in &self.ops {
            op.apply(frame);
        }
    }
}

/// Pure look application.
pub struct ColorGrade;

impl ColorGrade {
    /// Grade a copy of `frame` with `look`. The input is left untouched.
    pub fn apply(frame: &RasterFrame, look: &LookDescriptor) -> RasterFrame {
        let mut out = frame.clone();
        GradePipeline::for_look(look).apply_in_place(&mut out);
        out
    }

    /// Grade `frame` in place, taking ownership.
    pub fn apply_owned(mut frame: RasterFrame, look: &LookDescriptor) -> RasterFrame {
        GradePipeline::for_look(look).apply_in_place(&mut frame);
        frame
    }
}
