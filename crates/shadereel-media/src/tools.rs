//! Locating the ffmpeg and ffprobe binaries.

use shadereel_core::{Result, ShadeReelError};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Resolve `ffmpeg`: the sidecar download location first, then `PATH`.
pub fn ffmpeg_binary() -> Result<PathBuf> {
    resolve("ffmpeg", ffmpeg_sidecar::paths::ffmpeg_path())
}

/// Resolve `ffprobe` the same way as [`ffmpeg_binary`].
pub fn ffprobe_binary() -> Result<PathBuf> {
    resolve("ffprobe", ffmpeg_sidecar::ffprobe::ffprobe_path())
}

fn resolve(name: &str, sidecar: PathBuf) -> Result<PathBuf> {
    if sidecar.is_file() {
        debug!("Using sidecar {name}: {}", sidecar.display());
        return Ok(sidecar);
    }
    which::which(name).map_err(|e| {
        ShadeReelError::EncoderFailure(format!("{name} not found (sidecar or PATH): {e}"))
    })
}

/// Whether a working `ffmpeg` can be run.
pub fn ffmpeg_available() -> bool {
    let Ok(path) = ffmpeg_binary() else {
        return false;
    };
    Command::new(path)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Classify a failed ffmpeg run from its stderr.
pub(crate) fn ffmpeg_failure(context: &str, stderr: &[u8]) -> ShadeReelError {
    let msg = String::from_utf8_lossy(stderr);
    let msg = msg.trim();
    if msg.contains("No space left on device") {
        ShadeReelError::ResourceExhausted(format!("{context}: {msg}"))
    } else {
        ShadeReelError::EncoderFailure(format!("{context}: {msg}"))
    }
}
