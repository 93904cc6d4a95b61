//! Time representation for frame-exact output budgets.
//!
//! Uses rational numbers so that "60 s at 24000/1001 fps" maps to one frame
//! count everywhere it is computed.

use crate::error::{Result, ShadeReelError};
use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A rational time value in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    value: Rational64,
}

impl RationalTime {
    /// The time is `numerator / denominator` seconds.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Create a RationalTime from a frame number and frame rate.
    #[inline]
    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        Self {
            value: Rational64::new(frames * rate.denominator as i64, rate.numerator as i64),
        }
    }

    /// Create a RationalTime from seconds as a float, at microsecond precision.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        const PRECISION: i64 = 1_000_000;
        Self {
            value: Rational64::new((seconds * PRECISION as f64).round() as i64, PRECISION),
        }
    }

    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Convert to a frame number at the given rate, rounding down.
    #[inline]
    pub fn to_frames(self, rate: FrameRate) -> i64 {
        let frames = self.value * Rational64::new(rate.numerator as i64, rate.denominator as i64);
        frames.floor().to_integer()
    }

    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    #[inline]
    pub fn is_positive(self) -> bool {
        *self.value.numer() > 0
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Reject zero or absurd rates.
    pub fn validate(self) -> Result<()> {
        if self.numerator == 0 || self.denominator == 0 {
            return Err(ShadeReelError::invalid(format!(
                "frame rate {}/{} must be non-zero",
                self.numerator, self.denominator
            )));
        }
        if self.to_fps_f64() > crate::limits::MAX_FPS as f64 {
            return Err(ShadeReelError::invalid(format!(
                "frame rate {self} exceeds {} fps",
                crate::limits::MAX_FPS
            )));
        }
        Ok(())
    }

    /// Number of whole frames that fit in `seconds`.
    pub fn frames_in(self, seconds: f64) -> Result<u64> {
        self.validate()?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ShadeReelError::invalid(format!(
                "duration must be a positive number of seconds, got {seconds}"
            )));
        }
        let frames = RationalTime::from_seconds_f64(seconds).to_frames(self);
        Ok(frames.max(0) as u64)
    }

    /// Duration covered by `frames` frames, in seconds.
    pub fn seconds_for(self, frames: u64) -> f64 {
        RationalTime::from_frames(frames as i64, self).to_seconds_f64()
    }

    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A time range with inclusive start and exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    #[inline]
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        Self { start, duration }
    }

    /// Build a range from float seconds. `end` must be after `start`.
    pub fn from_seconds(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return Err(ShadeReelError::invalid(format!(
                "time range [{start}, {end}) is empty or malformed"
            )));
        }
        let start = RationalTime::from_seconds_f64(start);
        let end = RationalTime::from_seconds_f64(end);
        Ok(Self {
            start,
            duration: end - start,
        })
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(self) -> RationalTime {
        self.start + self.duration
    }

    /// Clamp the range to a source of known length.
    pub fn clamp_to(self, length: RationalTime) -> Option<Self> {
        if self.start >= length {
            return None;
        }
        let end = if self.end() > length { length } else { self.end() };
        Some(Self::new(self.start, end - self.start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_time_frames() {
        let rate = FrameRate::FPS_24;
        let time = RationalTime::from_frames(48, rate);
        assert_eq!(time.to_seconds_f64(), 2.0);
        assert_eq!(time.to_frames(rate), 48);
    }

    #[test]
    fn test_sixty_seconds_is_1440_frames() {
        assert_eq!(FrameRate::FPS_24.frames_in(60.0).unwrap(), 1440);
        assert_eq!(FrameRate::FPS_30.frames_in(15.0).unwrap(), 450);
    }

    #[test]
    fn test_ntsc_rate_rounds_down() {
        // 10 s at 23.976 fps is 239.76 frames.
        assert_eq!(FrameRate::FPS_23_976.frames_in(10.0).unwrap(), 239);
    }

    #[test]
    fn test_frames_in_rejects_bad_duration() {
        assert!(FrameRate::FPS_24.frames_in(0.0).is_err());
        assert!(FrameRate::FPS_24.frames_in(-3.0).is_err());
        assert!(FrameRate::FPS_24.frames_in(f64::NAN).is_err());
        assert!(FrameRate::new(0, 1).frames_in(1.0).is_err());
    }

    #[test]
    fn test_time_range_clamp() {
        let range = TimeRange::from_seconds(10.0, 40.0).unwrap();
        let clamped = range.clamp_to(RationalTime::new(25, 1)).unwrap();
        assert_eq!(clamped.end(), RationalTime::new(25, 1));
        assert!(range.clamp_to(RationalTime::new(5, 1)).is_none());
        assert!(TimeRange::from_seconds(5.0, 5.0).is_err());
    }

    #[test]
    fn test_frame_rate_display() {
        assert_eq!(FrameRate::FPS_24.to_string(), "24 fps");
        assert_eq!(FrameRate::FPS_23_976.to_string(), "23.976 fps");
    }
}
