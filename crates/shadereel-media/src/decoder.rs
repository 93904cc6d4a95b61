//! Decoding stills and video clips to [`RasterFrame`]s.
//!
//! Stills go through the `image` crate. Clips are decoded by an ffmpeg
//! subprocess (via ffmpeg-sidecar) emitting `rgb24` raw video on stdout, so
//! no FFmpeg development headers are needed.

use crate::tools::ffmpeg_binary;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use ffmpeg_sidecar::iter::FfmpegIterator;
use shadereel_core::{RasterFrame, Result, ShadeReelError};
use std::path::Path;
use tracing::{debug, info, warn};

/// Decode a still image (JPEG, PNG, WebP, BMP) to RGB.
pub fn decode_still(path: &Path) -> Result<RasterFrame> {
    let img = image::open(path)
        .map_err(|e| ShadeReelError::unreadable(format!("{}: {e}", path.display())))?;
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(ShadeReelError::unreadable(format!(
            "{}: image has no pixels",
            path.display()
        )));
    }
    debug!("Decoded {} ({}x{})", path.display(), rgb.width(), rgb.height());
    Ok(RasterFrame::from(rgb))
}

/// Which part of a clip to decode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipWindow {
    /// Seconds skipped from the start.
    pub start: f64,
    /// Seconds decoded after `start`; `None` reads to the end.
    pub duration: Option<f64>,
}

impl ClipWindow {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(ShadeReelError::invalid(format!(
                "clip start must be >= 0, got {}",
                self.start
            )));
        }
        if let Some(d) = self.duration {
            if !d.is_finite() || d <= 0.0 {
                return Err(ShadeReelError::invalid(format!(
                    "clip duration must be > 0, got {d}"
                )));
            }
        }
        Ok(())
    }
}

/// Streaming clip decoder. Yields frames in presentation order at the given
/// output rate.
pub struct ClipDecoder {
    child: FfmpegChild,
    events: FfmpegIterator,
    path: String,
    frames: u64,
    last_error: Option<String>,
    finished: bool,
}

impl ClipDecoder {
    /// Start decoding `path` resampled to `fps` frames per second.
    pub fn open(path: &Path, window: ClipWindow, fps: f64) -> Result<Self> {
        window.validate()?;
        if !path.is_file() {
            return Err(ShadeReelError::unreadable(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let path_str = path.to_string_lossy().into_owned();
        info!("Opening video file: {}", path_str);

        let mut cmd = FfmpegCommand::new_with_path(ffmpeg_binary()?);
        cmd.hide_banner();
        if window.start > 0.0 {
            cmd.args(["-ss", &format!("{:.3}", window.start)]);
        }
        cmd.input(&path_str);
        if let Some(d) = window.duration {
            cmd.args(["-t", &format!("{d:.3}")]);
        }
        cmd.args(["-an", "-vf", &format!("fps={fps}")]);
        cmd.rawvideo();

        let mut child = cmd
            .spawn()
            .map_err(|e| ShadeReelError::unreadable(format!("failed to spawn ffmpeg: {e}")))?;
        let events = child
            .iter()
            .map_err(|e| ShadeReelError::unreadable(format!("ffmpeg output unavailable: {e}")))?;

        Ok(Self {
            child,
            events,
            path: path_str,
            frames: 0,
            last_error: None,
            finished: false,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Frames decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames
    }
}

impl Iterator for ClipDecoder {
    type Item = Result<RasterFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    self.frames += 1;
                    return Some(RasterFrame::from_raw(frame.width, frame.height, frame.data));
                }
                FfmpegEvent::Error(msg) => {
                    debug!("ffmpeg: {msg}");
                    self.last_error = Some(msg);
                }
                _ => {}
            }
        }
        self.finished = true;
        if self.frames == 0 {
            let reason = self
                .last_error
                .take()
                .unwrap_or_else(|| "no video frames decoded".to_string());
            warn!("Clip {} produced no frames", self.path);
            return Some(Err(ShadeReelError::unreadable(format!(
                "{}: {reason}",
                self.path
            ))));
        }
        None
    }
}

impl Drop for ClipDecoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
