//! Fitting a soundtrack to a fixed video duration.
//!
//! Audio longer than the video is trimmed; shorter audio is looped back to
//! back. Either way the reconciled track has exactly
//! `round(target * sample_rate)` frames and output frame `j` reads source frame
//! `j mod native_frames`, so loop boundaries carry no gap.

use crate::pcm::{write_f32le, AudioAsset};
use serde::{Deserialize, Serialize};
use shadereel_core::{Result, ShadeReelError};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Fade length used when fades are requested without a duration.
pub const DEFAULT_FADE_SECONDS: f64 = 1.0;

/// How a native duration maps onto a target duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcilePlan {
    /// The source covers the target; cut it short.
    Trim,
    /// The source is too short; repeat it this many times (last one cut).
    Loop { repeats: u32 },
}

impl ReconcilePlan {
    /// Plan from durations in seconds.
    pub fn for_durations(native: f64, target: f64) -> Result<Self> {
        if !native.is_finite() || native <= 0.0 {
            return Err(ShadeReelError::unreadable(format!(
                "source duration must be > 0, got {native}"
            )));
        }
        if !target.is_finite() || target <= 0.0 {
            return Err(ShadeReelError::invalid(format!(
                "target duration must be > 0, got {target}"
            )));
        }
        if native >= target {
            Ok(Self::Trim)
        } else {
            Ok(Self::Loop {
                repeats: (target / native).ceil() as u32,
            })
        }
    }

    /// Plan from exact frame counts.
    fn for_frames(native: u64, target: u64) -> Self {
        if native >= target {
            Self::Trim
        } else {
            Self::Loop {
                repeats: target.div_ceil(native) as u32,
            }
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Self::Loop { .. })
    }
}

/// Builds reconciled tracks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioReconciler {
    fade: Option<f64>,
}

impl AudioReconciler {
    /// No fades.
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear fade in and out of `seconds` each.
    pub fn with_fades(seconds: f64) -> Self {
        Self {
            fade: Some(seconds),
        }
    }

    pub fn fade_seconds(&self) -> Option<f64> {
        self.fade
    }

    /// Fit `asset` to `target` seconds.
    pub fn reconcile(&self, asset: Arc<AudioAsset>, target: f64) -> Result<ReconciledAudioTrack> {
        if !target.is_finite() || target <= 0.0 {
            return Err(ShadeReelError::invalid(format!(
                "target duration must be > 0, got {target}"
            )));
        }
        if let Some(fade) = self.fade {
            if !fade.is_finite() || fade < 0.0 {
                return Err(ShadeReelError::invalid(format!(
                    "fade duration must be >= 0, got {fade}"
                )));
            }
        }
        if asset.is_empty() {
            return Err(ShadeReelError::unreadable("audio asset has no samples"));
        }

        let sr = asset.sample_rate() as f64;
        let frames = (target * sr).round() as u64;
        if frames == 0 {
            return Err(ShadeReelError::invalid(format!(
                "target duration {target}s is shorter than one sample"
            )));
        }

        let plan = ReconcilePlan::for_frames(asset.frames(), frames);
        let fade_frames = match self.fade {
            Some(fade) if fade > 0.0 && target > 2.0 * fade => (fade * sr).round() as u64,
            Some(fade) => {
                debug!("Skipping {fade}s fades on a {target}s track");
                0
            }
            None => 0,
        };

        debug!(
            "Reconciled {:.3}s of audio to {target}s: {plan:?}",
            asset.duration_seconds()
        );

        Ok(ReconciledAudioTrack {
            asset,
            frames,
            fade_frames,
            plan,
        })
    }
}

/// A lazily evaluated, sample-exact soundtrack.
#[derive(Debug, Clone)]
pub struct ReconciledAudioTrack {
    asset: Arc<AudioAsset>,
    frames: u64,
    fade_frames: u64,
    plan: ReconcilePlan,
}

impl ReconciledAudioTrack {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.asset.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.asset.channels()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 / self.asset.sample_rate() as f64
    }

    pub fn plan(&self) -> ReconcilePlan {
        self.plan
    }

    pub fn fades_applied(&self) -> bool {
        self.fade_frames > 0
    }

    /// Envelope gain at output frame `j`. Fade-out reaches 0 on the last frame.
    pub fn gain(&self, j: u64) -> f32 {
        if self.fade_frames == 0 {
            return 1.0;
        }
        let fade = self.fade_frames as f64;
        let fade_in = j as f64 / fade;
        let fade_out = (self.frames - 1 - j) as f64 / fade;
        fade_in.min(fade_out).min(1.0) as f32
    }

    /// Sample `channel` of output frame `j`.
    pub fn sample(&self, j: u64, channel: u16) -> f32 {
        let src = j % self.asset.frames();
        self.asset.sample(src, channel) * self.gain(j)
    }

    /// All samples, interleaved, in output order.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        let channels = self.channels();
        (0..self.frames).flat_map(move |j| (0..channels).map(move |c| self.sample(j, c)))
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.samples().collect()
    }

    /// Write the track as raw f32le, ready for the muxer.
    pub fn write_f32le(&self, path: &Path) -> Result<u64> {
        write_f32le(path, self.samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(sample_rate: u32, seconds: u64) -> Arc<AudioAsset> {
        let samples: Vec<f32> = (0..sample_rate as u64 * seconds).map(|i| i as f32).collect();
        Arc::new(AudioAsset::new(sample_rate, 1, samples).unwrap())
    }

    #[test]
    fn test_plan_for_durations() {
        assert_eq!(ReconcilePlan::for_durations(90.0, 60.0).unwrap(), ReconcilePlan::Trim);
        assert_eq!(ReconcilePlan::for_durations(60.0, 60.0).unwrap(), ReconcilePlan::Trim);
        assert_eq!(
            ReconcilePlan::for_durations(20.0, 60.0).unwrap(),
            ReconcilePlan::Loop { repeats: 3 }
        );
        assert_eq!(
            ReconcilePlan::for_durations(25.0, 60.0).unwrap(),
            ReconcilePlan::Loop { repeats: 3 }
        );
        assert!(ReconcilePlan::for_durations(0.0, 60.0).is_err());
        assert!(ReconcilePlan::for_durations(10.0, -1.0).is_err());
    }

    #[test]
    fn test_loop_is_sample_exact_and_continuous() {
        let asset = ramp(100, 10);
        let track = AudioReconciler::new().reconcile(asset, 60.0).unwrap();
        assert_eq!(track.frames(), 6000);
        assert_eq!(track.plan(), ReconcilePlan::Loop { repeats: 6 });
        let samples = track.to_vec();
        assert_eq!(samples.len(), 6000);
        for (j, s) in samples.iter().enumerate() {
            assert_eq!(*s, (j % 1000) as f32);
        }
    }

    #[test]
    fn test_trim_is_sample_exact() {
        let asset = ramp(100, 90);
        let track = AudioReconciler::new().reconcile(asset, 60.0).unwrap();
        assert_eq!(track.plan(), ReconcilePlan::Trim);
        let samples = track.to_vec();
        assert_eq!(samples.len(), 6000);
        assert_eq!(samples[5999], 5999.0);
        assert!((track.duration_seconds() - 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_fades_ramp_linearly() {
        let asset = Arc::new(AudioAsset::new(10, 1, vec![1.0f32; 100]).unwrap());
        let track = AudioReconciler::with_fades(1.0).reconcile(asset, 5.0).unwrap();
        assert!(track.fades_applied());
        let s = track.to_vec();
        assert_eq!(s[0], 0.0);
        assert!((s[5] - 0.5).abs() < 1e-6);
        assert_eq!(s[25], 1.0);
        assert_eq!(s[49], 0.0);
    }

    #[test]
    fn test_fades_skipped_on_short_target() {
        let asset = ramp(10, 10);
        let track = AudioReconciler::with_fades(1.0).reconcile(asset, 2.0).unwrap();
        assert!(!track.fades_applied());
        assert_eq!(track.to_vec()[0], 0.0);
        assert_eq!(track.to_vec()[1], 1.0);
    }

    #[test]
    fn test_stereo_interleaving() {
        let asset = Arc::new(AudioAsset::new(4, 2, vec![0.1f32, 0.2, 0.3, 0.4]).unwrap());
        let track = AudioReconciler::new().reconcile(asset, 1.0).unwrap();
        assert_eq!(track.to_vec(), vec![0.1, 0.2, 0.3, 0.4, 0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_reconcile_errors() {
        let asset = ramp(10, 1);
        assert!(matches!(
            AudioReconciler::new().reconcile(Arc::clone(&asset), 0.0),
            Err(ShadeReelError::InvalidParameter(_))
        ));
        assert!(matches!(
            AudioReconciler::new().reconcile(Arc::clone(&asset), f64::NAN),
            Err(ShadeReelError::InvalidParameter(_))
        ));
        assert!(matches!(
            AudioReconciler::with_fades(-1.0).reconcile(Arc::clone(&asset), 5.0),
            Err(ShadeReelError::InvalidParameter(_))
        ));
        let empty = Arc::new(AudioAsset::new(10, 1, Vec::<f32>::new()).unwrap());
        assert!(matches!(
            AudioReconciler::new().reconcile(empty, 5.0),
            Err(ShadeReelError::SourceUnreadable(_))
        ));
    }
}
