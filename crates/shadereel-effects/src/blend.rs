//! Linear cross-fades between graded frames.

use rayon::prelude::*;
use shadereel_core::{RasterFrame, Result, ShadeReelError};

/// Pixels per parallel task.
const CHUNK: usize = 64 * 1024;

/// Write `round(a * (1 - alpha) + b * alpha)` into `out`, byte by byte.
///
/// All three slices must be the same length.
pub(crate) fn mix_into(out: &mut [u8], a: &[u8], b: &[u8], alpha: f32) {
    let ia = 1.0 - alpha;
    out.par_chunks_mut(CHUNK)
        .zip(a.par_chunks(CHUNK))
        .zip(b.par_chunks(CHUNK))
        .for_each(|((o, a), b)| {
            for ((o, &a), &b) in o.iter_mut().zip(a).zip(b) {
                *o = (a as f32 * ia + b as f32 * alpha).round().clamp(0.0, 255.0) as u8;
            }
        });
}

/// Mix two equally sized frames. `alpha = 0` returns `a`, `alpha = 1` returns `b`.
pub fn mix(a: &RasterFrame, b: &RasterFrame, alpha: f64) -> Result<RasterFrame> {
    if !a.same_size(b) {
        return Err(ShadeReelError::invalid(format!(
            "cannot blend {}x{} with {}x{}",
            a.width(),
            a.height(),
            b.width(),
            b.height()
        )));
    }
    if !alpha.is_finite() {
        return Err(ShadeReelError::invalid(format!("blend ratio {alpha} is not finite")));
    }
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha == 0.0 {
        return Ok(a.clone());
    }
    if alpha == 1.0 {
        return Ok(b.clone());
    }
    let mut out = RasterFrame::new(a.width(), a.height());
    mix_into(out.as_raw_mut(), a.as_raw(), b.as_raw(), alpha as f32);
    Ok(out)
}

/// Builds cross-fade sequences.
pub struct FrameBlender;

impl FrameBlender {
    /// Lazily produce `steps` frames fading from `a` toward `b`.
    ///
    /// Step `i` uses `alpha = i / steps`, so the sequence starts on `a` and
    /// stops one step short of `b`.
    pub fn blend<'a>(a: &'a RasterFrame, b: &'a RasterFrame, steps: i64) -> Result<BlendSequence<'a>> {
        if steps < 0 {
            return Err(ShadeReelError::invalid(format!(
                "blend step count must be >= 0, got {steps}"
            )));
        }
        if !a.same_size(b) {
            return Err(ShadeReelError::invalid(format!(
                "cannot blend {}x{} with {}x{}",
                a.width(),
                a.height(),
                b.width(),
                b.height()
            )));
        }
        Ok(BlendSequence {
            a,
            b,
            steps: steps as u64,
            next: 0,
        })
    }
}

/// A finite, restartable cross-fade.
#[derive(Debug, Clone)]
pub struct BlendSequence<'a> {
    a: &'a RasterFrame,
    b: &'a RasterFrame,
    steps: u64,
    next: u64,
}

impl BlendSequence<'_> {
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Mix ratio of step `i`.
    pub fn alpha(&self, i: u64) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        i as f64 / self.steps as f64
    }

    /// Render step `i` directly.
    pub fn frame_at(&self, i: u64) -> Option<RasterFrame> {
        if i >= self.steps {
            return None;
        }
        let alpha = self.alpha(i);
        if i == 0 {
            return Some(self.a.clone());
        }
        let mut out = RasterFrame::new(self.a.width(), self.a.height());
        mix_into(out.as_raw_mut(), self.a.as_raw(), self.b.as_raw(), alpha as f32);
        Some(out)
    }

    /// Rewind to the first step.
    pub fn restart(&mut self) {
        self.next = 0;
    }
}

impl Iterator for BlendSequence<'_> {
    type Item = RasterFrame;

    fn next(&mut self) -> Option<RasterFrame> {
        let frame = self.frame_at(self.next)?;
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.steps.saturating_sub(self.next) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BlendSequence<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_identical_frames() {
        let a = RasterFrame::gradient(31, 17);
        let frames: Vec<_> = FrameBlender::blend(&a, &a, 29).unwrap().collect();
        assert_eq!(frames.len(), 29);
        assert!(frames.iter().all(|f| *f == a));
    }

    #[test]
    fn test_blend_starts_on_a() {
        let a = RasterFrame::filled(4, 4, [0, 0, 0]);
        let b = RasterFrame::filled(4, 4, [200, 100, 50]);
        let mut seq = FrameBlender::blend(&a, &b, 4).unwrap();
        assert_eq!(seq.next().unwrap(), a);
        assert_eq!(seq.next().unwrap().pixel(0, 0), [50, 25, 13]); // 12.5 rounds up
        assert_eq!(seq.next().unwrap().pixel(0, 0), [100, 50, 25]);
        assert_eq!(seq.next().unwrap().pixel(0, 0), [150, 75, 38]);
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_zero_steps_is_empty() {
        let a = RasterFrame::new(2, 2);
        let seq = FrameBlender::blend(&a, &a, 0).unwrap();
        assert_eq!(seq.len(), 0);
    }

    #[test]
    fn test_negative_steps_rejected() {
        let a = RasterFrame::new(2, 2);
        let result = FrameBlender::blend(&a, &a, -1);
        assert!(matches!(result, Err(ShadeReelError::InvalidParameter(_))));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let a = RasterFrame::new(2, 2);
        let b = RasterFrame::new(2, 3);
        assert!(FrameBlender::blend(&a, &b, 3).is_err());
        assert!(mix(&a, &b, 0.5).is_err());
    }

    #[test]
    fn test_sequence_restarts() {
        let a = RasterFrame::filled(3, 3, [10, 10, 10]);
        let b = RasterFrame::filled(3, 3, [90, 90, 90]);
        let mut seq = FrameBlender::blend(&a, &b, 5).unwrap();
        let first: Vec<_> = seq.by_ref().collect();
        assert_eq!(seq.len(), 0);
        seq.restart();
        let second: Vec<_> = seq.clone().collect();
        assert_eq!(first, second);
        assert_eq!(seq.len(), 5);
    }

    #[test]
    fn test_mix_endpoints() {
        let a = RasterFrame::filled(2, 2, [1, 2, 3]);
        let b = RasterFrame::filled(2, 2, [250, 251, 252]);
        assert_eq!(mix(&a, &b, 0.0).unwrap(), a);
        assert_eq!(mix(&a, &b, 1.0).unwrap(), b);
        assert!(mix(&a, &b, f64::NAN).is_err());
    }
}
