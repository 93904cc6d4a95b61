//! Media file probing through `ffprobe` JSON output.

use crate::tools::ffprobe_binary;
use serde::{Deserialize, Serialize};
use shadereel_core::{FrameRate, Result, ShadeReelError};
use std::path::Path;
use std::process::Command;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Container duration in seconds (0 when unknown)
    pub duration_seconds: f64,
    /// Video streams
    pub video_streams: Vec<VideoStreamInfo>,
    /// Audio streams
    pub audio_streams: Vec<AudioStreamInfo>,
    /// Container format
    pub format: String,
}

/// Information about a video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

/// Information about an audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

fn parse_ratio(s: &str) -> Option<FrameRate> {
    let (num, den) = s.split_once('/')?;
    let num = num.parse::<u32>().ok()?;
    let den = den.parse::<u32>().ok()?;
    if num == 0 || den == 0 {
        return None;
    }
    Some(FrameRate::new(num, den))
}

impl MediaProbe {
    /// Probe a media file.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ShadeReelError::unreadable(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let out = Command::new(ffprobe_binary()?)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| ShadeReelError::unreadable(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ShadeReelError::unreadable(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Self::parse_json(&path.to_string_lossy(), &out.stdout)
    }

    /// Build a probe result from `ffprobe -print_format json` output.
    pub fn parse_json(path: &str, json: &[u8]) -> Result<Self> {
        let parsed: ProbeOut = serde_json::from_slice(json)
            .map_err(|e| ShadeReelError::unreadable(format!("ffprobe json parse failed: {e}")))?;

        let mut video_streams = Vec::new();
        let mut audio_streams = Vec::new();
        for s in parsed.streams {
            let codec = s.codec_name.unwrap_or_default();
            match s.codec_type.as_deref() {
                Some("video") => {
                    let (Some(width), Some(height)) = (s.width, s.height) else {
                        continue;
                    };
                    let frame_rate = s
                        .r_frame_rate
                        .as_deref()
                        .and_then(parse_ratio)
                        .unwrap_or_default();
                    video_streams.push(VideoStreamInfo {
                        index: s.index,
                        codec,
                        width,
                        height,
                        frame_rate,
                    });
                }
                Some("audio") => audio_streams.push(AudioStreamInfo {
                    index: s.index,
                    codec,
                    sample_rate: s.sample_rate.and_then(|r| r.parse().ok()).unwrap_or(0),
                    channels: s.channels.unwrap_or(0),
                }),
                _ => {}
            }
        }

        let (format, duration_seconds) = match parsed.format {
            Some(f) => (
                f.format_name.unwrap_or_default(),
                f.duration.and_then(|d| d.parse::<f64>().ok()).unwrap_or(0.0),
            ),
            None => (String::new(), 0.0),
        };

        Ok(Self {
            path: path.to_string(),
            duration_seconds,
            video_streams,
            audio_streams,
            format,
        })
    }

    /// Check if the file has video.
    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    /// Check if the file has audio.
    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }
}
