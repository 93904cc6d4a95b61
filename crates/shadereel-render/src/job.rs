//! Render job configuration.

use serde::{Deserialize, Serialize};
use shadereel_core::{FrameRate, RationalTime, ResampleFilter, Result, ShadeReelError, TimeRange};
use shadereel_effects::OverlayStyle;
use shadereel_media::{ClipWindow, OutputProfile, DEFAULT_CRF};
use shadereel_timeline::GenerationMode;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which part of a clip to render.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClipTrim {
    #[default]
    Full,
    /// The first `seconds` (or the whole clip if shorter).
    First { seconds: f64 },
    /// `start..end` in seconds; `end` is clamped to the clip length.
    Range { start: f64, end: f64 },
}

impl ClipTrim {
    /// Resolve against a clip `native` seconds long.
    pub fn window(&self, native: f64) -> Result<ClipWindow> {
        let length = RationalTime::from_seconds_f64(native);
        if !native.is_finite() || !length.is_positive() {
            return Err(ShadeReelError::unreadable(format!(
                "clip duration must be > 0, got {native}"
            )));
        }
        let wanted = match *self {
            Self::Full => TimeRange::new(RationalTime::ZERO, length),
            Self::First { seconds } => TimeRange::from_seconds(0.0, seconds)?,
            Self::Range { start, end } => TimeRange::from_seconds(start, end)?,
        };
        let Some(range) = wanted.clamp_to(length) else {
            return Err(ShadeReelError::invalid(format!(
                "clip range starts at {} but the clip is {length} long",
                wanted.start
            )));
        };
        let window = ClipWindow {
            start: range.start.to_seconds_f64(),
            duration: Some(range.duration.to_seconds_f64()),
        };
        window.validate()?;
        Ok(window)
    }
}

/// What a job renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSource {
    /// One still graded through a look timeline.
    Image { path: PathBuf },
    /// Several stills shown in turn.
    Slideshow { paths: Vec<PathBuf> },
    /// An existing clip, cropped and captioned.
    Clip {
        path: PathBuf,
        #[serde(default)]
        trim: ClipTrim,
        /// Drop the clip's own soundtrack when no external audio is given.
        #[serde(default)]
        strip_audio: bool,
    },
    /// An existing video trimmed or looped to the length of the audio track.
    LoopVideo { path: PathBuf },
}

impl Default for JobSource {
    fn default() -> Self {
        Self::Image {
            path: PathBuf::new(),
        }
    }
}

impl JobSource {
    /// The input files this source reads.
    pub fn inputs(&self) -> Vec<&PathBuf> {
        match self {
            Self::Image { path } | Self::Clip { path, .. } | Self::LoopVideo { path } => vec![path],
            Self::Slideshow { paths } => paths.iter().collect(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Caption settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionConfig {
    pub text: String,
    #[serde(default)]
    pub style: OverlayStyle,
    /// Float the text on a sine wave (floating style only).
    #[serde(default = "default_true")]
    pub animated: bool,
    /// TTF/OTF file; system fonts are searched when unset.
    #[serde(default)]
    pub font: Option<PathBuf>,
    /// Text size in pixels; height-relative when unset.
    #[serde(default)]
    pub font_px: Option<f32>,
}

impl CaptionConfig {
    pub fn new(text: impl Into<String>, style: OverlayStyle) -> Self {
        Self {
            text: text.into(),
            style,
            animated: true,
            font: None,
            font_px: None,
        }
    }
}

fn default_fade_seconds() -> f64 {
    shadereel_audio::DEFAULT_FADE_SECONDS
}

/// Soundtrack settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub path: PathBuf,
    /// Fade in and out.
    #[serde(default)]
    pub fade: bool,
    #[serde(default = "default_fade_seconds")]
    pub fade_seconds: f64,
    /// Seconds skipped from the start of the track.
    #[serde(default)]
    pub offset_seconds: f64,
}

impl AudioConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fade: false,
            fade_seconds: default_fade_seconds(),
            offset_seconds: 0.0,
        }
    }
}

/// Everything needed to render one output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub output: PathBuf,
    pub source: JobSource,
    pub duration_seconds: f64,
    pub frame_rate: FrameRate,
    pub profile: OutputProfile,
    /// Number of looks in the timeline (image jobs).
    pub keyframes: usize,
    pub mode: GenerationMode,
    pub caption: Option<CaptionConfig>,
    pub audio: Option<AudioConfig>,
    pub crf: u8,
    pub resample: ResampleFilter,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::new(),
            source: JobSource::default(),
            duration_seconds: 60.0,
            frame_rate: FrameRate::FPS_24,
            profile: OutputProfile::Square,
            keyframes: 50,
            mode: GenerationMode::default(),
            caption: None,
            audio: None,
            crf: DEFAULT_CRF,
            resample: ResampleFilter::default(),
        }
    }
}

impl JobConfig {
    /// Check every field that can be checked without touching the inputs.
    pub fn validate(&self) -> Result<()> {
        if self.output.as_os_str().is_empty() {
            return Err(ShadeReelError::invalid("output path is empty"));
        }
        match &self.source {
            JobSource::Slideshow { paths } if paths.is_empty() => {
                return Err(ShadeReelError::invalid("slideshow needs at least 1 image"));
            }
            JobSource::LoopVideo { .. } if self.audio.is_none() => {
                return Err(ShadeReelError::invalid(
                    "loop-video jobs need an audio track to take their length from",
                ));
            }
            _ => {}
        }
        if self.source.inputs().iter().any(|p| p.as_os_str().is_empty()) {
            return Err(ShadeReelError::invalid("input path is empty"));
        }
        if self.source.inputs().iter().any(|p| **p == self.output) {
            return Err(ShadeReelError::invalid(format!(
                "output {} would overwrite an input",
                self.output.display()
            )));
        }

        if !matches!(self.source, JobSource::LoopVideo { .. } | JobSource::Clip { .. })
            && (!self.duration_seconds.is_finite() || self.duration_seconds <= 0.0)
        {
            return Err(ShadeReelError::invalid(format!(
                "duration must be > 0 seconds, got {}",
                self.duration_seconds
            )));
        }
        if self.keyframes < 2 {
            return Err(ShadeReelError::invalid(format!(
                "keyframes must be >= 2, got {}",
                self.keyframes
            )));
        }
        self.frame_rate.validate()?;
        self.profile.validate()?;
        if self.crf > 51 {
            return Err(ShadeReelError::invalid(format!("crf {} is outside 0-51", self.crf)));
        }

        if let Some(caption) = &self.caption {
            if let Some(px) = caption.font_px {
                if !px.is_finite() || px <= 0.0 {
                    return Err(ShadeReelError::invalid(format!("font size must be > 0, got {px}")));
                }
            }
            if let OverlayStyle::Floating { amplitude } = caption.style {
                if !amplitude.is_finite() {
                    return Err(ShadeReelError::invalid("caption amplitude must be finite"));
                }
            }
        }
        if let Some(audio) = &self.audio {
            if !audio.fade_seconds.is_finite() || audio.fade_seconds < 0.0 {
                return Err(ShadeReelError::invalid(format!(
                    "fade must be >= 0 seconds, got {}",
                    audio.fade_seconds
                )));
            }
            if !audio.offset_seconds.is_finite() || audio.offset_seconds < 0.0 {
                return Err(ShadeReelError::invalid(format!(
                    "audio offset must be >= 0 seconds, got {}",
                    audio.offset_seconds
                )));
            }
        }
        Ok(())
    }

    /// Output frame count for image and slideshow jobs.
    pub fn total_frames(&self) -> Result<u64> {
        self.frame_rate.frames_in(self.duration_seconds)
    }
}

/// A job ready to render.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub id: JobId,
    pub config: JobConfig,
}

impl RenderJob {
    pub fn new(config: JobConfig) -> Self {
        Self {
            id: JobId::new(),
            config,
        }
    }
}
