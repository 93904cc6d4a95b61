//! Audio decoding through ffmpeg to interleaved f32 PCM.

use crate::tools::ffmpeg_binary;
use shadereel_audio::AudioAsset;
use shadereel_core::{Result, ShadeReelError};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Sample rate the renderer decodes and muxes audio at.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Decode any audio (or the audio stream of a video) to stereo f32 at
/// `sample_rate`.
pub fn decode_audio(path: &Path, sample_rate: u32) -> Result<AudioAsset> {
    if !path.is_file() {
        return Err(ShadeReelError::unreadable(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let out = Command::new(ffmpeg_binary()?)
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ShadeReelError::unreadable(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(ShadeReelError::unreadable(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let asset = AudioAsset::from_f32le_bytes(sample_rate, 2, &out.stdout)?;
    if asset.is_empty() {
        return Err(ShadeReelError::unreadable(format!(
            "{}: no audio samples decoded",
            path.display()
        )));
    }
    debug!(
        "Decoded {:.2}s of audio from {}",
        asset.duration_seconds(),
        path.display()
    );
    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_missing_audio() {
        let result = decode_audio(Path::new("/nonexistent/song.mp3"), MIX_SAMPLE_RATE);
        assert!(matches!(result, Err(ShadeReelError::SourceUnreadable(_))));
    }
}
