//! Encoding rendered frames to H.264 MP4.
//!
//! Frames are piped as raw `rgb24` into an ffmpeg subprocess spawned through
//! ffmpeg-sidecar. The video pass carries no audio; the soundtrack is muxed in
//! afterwards (see [`crate::mux`]).

use crate::tools::{ffmpeg_binary, ffmpeg_failure};
use ffmpeg_sidecar::command::FfmpegCommand;
use serde::{Deserialize, Serialize};
use shadereel_core::{limits, FrameRate, RasterFrame, Result, ShadeReelError};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};
use std::str::FromStr;
use tracing::{debug, info};

// ── Output profiles ─────────────────────────────────────────────

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputProfile {
    /// 1080x1080.
    #[default]
    Square,
    /// 1088x1920; both edges divisible by 16.
    Vertical,
    /// 1080x1920.
    #[serde(rename = "vertical-1080")]
    Vertical1080,
    /// Any even size.
    Custom { width: u32, height: u32 },
}

impl OutputProfile {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Square => (1080, 1080),
            Self::Vertical => (1088, 1920),
            Self::Vertical1080 => (1080, 1920),
            Self::Custom { width, height } => (width, height),
        }
    }

    pub fn validate(self) -> Result<()> {
        let (w, h) = self.dimensions();
        if w == 0 || h == 0 {
            return Err(ShadeReelError::invalid(format!(
                "output size {w}x{h} must be non-zero"
            )));
        }
        if w % 2 != 0 || h % 2 != 0 {
            return Err(ShadeReelError::invalid(format!(
                "output size {w}x{h} must be even (required for yuv420p)"
            )));
        }
        if w > limits::MAX_EDGE || h > limits::MAX_EDGE {
            return Err(ShadeReelError::invalid(format!(
                "output size {w}x{h} exceeds {} px",
                limits::MAX_EDGE
            )));
        }
        Ok(())
    }
}

impl FromStr for OutputProfile {
    type Err = ShadeReelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "vertical" => Ok(Self::Vertical),
            "vertical-1080" | "vertical1080" => Ok(Self::Vertical1080),
            other => {
                let parsed = other
                    .split_once('x')
                    .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));
                match parsed {
                    Some((width, height)) => {
                        let profile = Self::Custom { width, height };
                        profile.validate()?;
                        Ok(profile)
                    }
                    None => Err(ShadeReelError::invalid(format!(
                        "unknown profile '{s}' (expected square, vertical, vertical-1080 or WxH)"
                    ))),
                }
            }
        }
    }
}

impl fmt::Display for OutputProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Square => write!(f, "square"),
            Self::Vertical => write!(f, "vertical"),
            Self::Vertical1080 => write!(f, "vertical-1080"),
            Self::Custom { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

// ── Encode settings ─────────────────────────────────────────────

/// Default x264 quality.
pub const DEFAULT_CRF: u8 = 18;

/// Video encode configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// CRF value for H.264 (0-51, lower = better).
    pub crf: u8,
    /// x264 preset.
    pub preset: String,
}

impl EncodeSettings {
    pub fn new(profile: OutputProfile, frame_rate: FrameRate) -> Self {
        let (width, height) = profile.dimensions();
        Self {
            width,
            height,
            frame_rate,
            crf: DEFAULT_CRF,
            preset: "medium".into(),
        }
    }

    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    pub fn validate(&self) -> Result<()> {
        OutputProfile::Custom {
            width: self.width,
            height: self.height,
        }
        .validate()?;
        self.frame_rate.validate()?;
        if self.crf > 51 {
            return Err(ShadeReelError::invalid(format!(
                "crf {} is outside 0-51",
                self.crf
            )));
        }
        Ok(())
    }

    /// Bytes in one raw `rgb24` frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(&self, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        // Input from pipe (raw frames)
        args.extend_from_slice(&[
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgb24".into(),
            "-video_size".into(),
            format!("{}x{}", self.width, self.height),
            "-framerate".into(),
            format!(
                "{}/{}",
                self.frame_rate.numerator, self.frame_rate.denominator
            ),
            "-i".into(),
            "pipe:0".into(),
        ]);

        args.extend_from_slice(&[
            "-an".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            self.preset.clone(),
            "-crf".into(),
            self.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
            "-f".into(),
            "mp4".into(),
        ]);

        args.push(output.to_string_lossy().into_owned());
        args
    }
}

// ── Encoder ─────────────────────────────────────────────────────

/// A running ffmpeg encode fed frame by frame.
pub struct FrameEncoder {
    settings: EncodeSettings,
    output: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames: u64,
}

impl FrameEncoder {
    /// Start ffmpeg writing to `output`.
    pub fn spawn(settings: EncodeSettings, output: &Path) -> Result<Self> {
        settings.validate()?;

        let mut cmd = FfmpegCommand::new_with_path(ffmpeg_binary()?);
        cmd.args(settings.ffmpeg_args(output));
        let mut child = cmd
            .as_inner_mut()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ShadeReelError::EncoderFailure(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ShadeReelError::EncoderFailure("Failed to open ffmpeg stdin".into()))?;

        info!(
            "Encoder started: {}x{} @ {}, crf {}",
            settings.width, settings.height, settings.frame_rate, settings.crf
        );

        Ok(Self {
            settings,
            output: output.to_path_buf(),
            child: Some(child),
            stdin: Some(stdin),
            frames: 0,
        })
    }

    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn write_frame(&mut self, frame: &RasterFrame) -> Result<()> {
        if frame.width() != self.settings.width || frame.height() != self.settings.height {
            return Err(ShadeReelError::invalid(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.settings.width,
                self.settings.height
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ShadeReelError::EncoderFailure(
                "ffmpeg encoder is already finalized".into(),
            ));
        };
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| ShadeReelError::from_write(e, &format!("writing frame {}", self.frames)))?;

        self.frames += 1;
        if self.frames % 240 == 0 {
            debug!("Encoded {} frames", self.frames);
        }
        Ok(())
    }

    /// Close the pipe and wait for ffmpeg. Returns the number of frames
    /// encoded.
    pub fn finish(mut self) -> Result<u64> {
        drop(self.stdin.take());
        let child = self
            .child
            .take()
            .ok_or_else(|| ShadeReelError::EncoderFailure("ffmpeg already reaped".into()))?;

        let output = child
            .wait_with_output()
            .map_err(|e| ShadeReelError::EncoderFailure(format!("Failed to wait for ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(ffmpeg_failure(
                &format!("encoding {}", self.output.display()),
                &output.stderr,
            ));
        }
        info!("Encoded {} frames to {}", self.frames, self.output.display());
        Ok(self.frames)
    }

    /// Stop ffmpeg without finalizing the file.
    pub fn abort(mut self) {
        self.kill();
    }

    fn kill(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for FrameEncoder {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_dimensions() {
        assert_eq!(OutputProfile::Square.dimensions(), (1080, 1080));
        assert_eq!(OutputProfile::Vertical.dimensions(), (1088, 1920));
        assert_eq!(OutputProfile::Vertical1080.dimensions(), (1080, 1920));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("square".parse::<OutputProfile>().unwrap(), OutputProfile::Square);
        assert_eq!(
            "Vertical-1080".parse::<OutputProfile>().unwrap(),
            OutputProfile::Vertical1080
        );
        assert_eq!(
            "720x1280".parse::<OutputProfile>().unwrap(),
            OutputProfile::Custom {
                width: 720,
                height: 1280
            }
        );
        assert!("721x1280".parse::<OutputProfile>().is_err());
        assert!("0x10".parse::<OutputProfile>().is_err());
        assert!("portrait".parse::<OutputProfile>().is_err());
    }

    #[test]
    fn test_profile_serde_names() {
        let json = serde_json::to_string(&OutputProfile::Vertical1080).unwrap();
        assert_eq!(json, "\"vertical-1080\"");
        let back: OutputProfile = serde_json::from_str("\"square\"").unwrap();
        assert_eq!(back, OutputProfile::Square);
    }

    #[test]
    fn test_ffmpeg_args() {
        let settings = EncodeSettings::new(OutputProfile::Vertical, FrameRate::FPS_24);
        let args = settings.ffmpeg_args(Path::new("/tmp/out.mp4"));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"rgb24".to_string()));
        assert!(args.contains(&"1088x1920".to_string()));
        assert!(args.contains(&"24/1".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }

    #[test]
    fn test_settings_validation() {
        let settings = EncodeSettings::new(OutputProfile::Square, FrameRate::FPS_24);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.frame_bytes(), 1080 * 1080 * 3);
        assert!(settings.clone().with_crf(60).validate().is_err());
        let odd = EncodeSettings {
            width: 101,
            ..settings
        };
        assert!(odd.validate().is_err());
    }
}
