//! Decoded PCM audio.

use shadereel_core::{Result, ShadeReelError};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Interleaved f32 PCM. Never mutated once built.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    sample_rate: u32,
    channels: u16,
    samples: Arc<[f32]>,
}

impl AudioAsset {
    pub fn new(sample_rate: u32, channels: u16, samples: impl Into<Arc<[f32]>>) -> Result<Self> {
        let samples = samples.into();
        if sample_rate == 0 {
            return Err(ShadeReelError::invalid("audio sample rate must be > 0"));
        }
        if channels == 0 {
            return Err(ShadeReelError::invalid("audio channel count must be > 0"));
        }
        if samples.len() % channels as usize != 0 {
            return Err(ShadeReelError::invalid(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// Parse little-endian f32 bytes, as produced by `ffmpeg -f f32le`.
    pub fn from_f32le_bytes(sample_rate: u32, channels: u16, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(ShadeReelError::unreadable(
                "decoded audio byte length is not aligned to f32 samples",
            ));
        }
        let samples: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(sample_rate, channels, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample `channel` of frame `frame`.
    #[inline]
    pub fn sample(&self, frame: u64, channel: u16) -> f32 {
        self.samples[frame as usize * self.channels as usize + channel as usize]
    }

    /// A copy starting `offset` seconds in. Offsets past the end give an
    /// empty asset.
    pub fn skip_seconds(&self, offset: f64) -> Result<Self> {
        if !offset.is_finite() || offset < 0.0 {
            return Err(ShadeReelError::invalid(format!(
                "audio offset must be >= 0, got {offset}"
            )));
        }
        let skip = ((offset * self.sample_rate as f64).round() as u64).min(self.frames());
        let start = skip as usize * self.channels as usize;
        Self::new(self.sample_rate, self.channels, &self.samples[start..])
    }
}

/// Write samples as raw little-endian f32 to `path`. Returns the sample count.
pub fn write_f32le(path: &Path, samples: impl IntoIterator<Item = f32>) -> Result<u64> {
    let file = std::fs::File::create(path)
        .map_err(|e| ShadeReelError::from_write(e, &format!("creating {}", path.display())))?;
    let mut out = BufWriter::new(file);
    let mut written = 0u64;
    for s in samples {
        out.write_all(&s.to_le_bytes())
            .map_err(|e| ShadeReelError::from_write(e, "writing audio samples"))?;
        written += 1;
    }
    out.flush()
        .map_err(|e| ShadeReelError::from_write(e, "flushing audio samples"))?;
    Ok(written)
}
