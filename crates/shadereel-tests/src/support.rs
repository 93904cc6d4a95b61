//! In-memory [`MediaBackend`] for scenario tests.
//!
//! Inputs are registered up front by path. Encoded "videos" are JSON
//! manifests written to the path the pipeline asks for, so the usual scratch
//! file and rename handling runs for real; the first and last frames of each
//! encode are kept in memory and referenced from the manifest.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shadereel_audio::{AudioAsset, ReconcilePlan, ReconciledAudioTrack};
use shadereel_core::{FrameRate, RasterFrame, Result, ShadeReelError};
use shadereel_media::{AudioStreamInfo, ClipWindow, EncodeSettings, MediaProbe, VideoStreamInfo};
use shadereel_render::{FrameStream, MediaBackend, RenderCancel, VideoWriter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Soundtrack as seen by the muxer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSummary {
    pub frames: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub seconds: f64,
    pub plan: ReconcilePlan,
    pub fades_applied: bool,
}

/// What the in-memory encoder and muxer leave on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Index into [`MemoryBackend::capture`]; `None` for looped videos.
    pub capture: Option<usize>,
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub video_plan: Option<ReconcilePlan>,
    pub audio: Option<AudioSummary>,
}

impl Manifest {
    /// Load the manifest at `path`, panicking with the path on failure.
    pub fn read(path: &Path) -> Manifest {
        Self::load(path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
    }

    fn load(path: &Path) -> Result<Manifest> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| ShadeReelError::Serialization(e.to_string()))
    }

    fn write(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec(self).map_err(|e| ShadeReelError::Serialization(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

/// Ends of one finished encode.
#[derive(Debug, Clone, Default)]
pub struct CapturedVideo {
    pub frames: u64,
    pub first: Option<RasterFrame>,
    pub last: Option<RasterFrame>,
}

struct Clip {
    frames: Vec<RasterFrame>,
    fps: f64,
}

#[derive(Default)]
struct Faults {
    cancel_after: Option<(u64, RenderCancel)>,
    fail_encoder_call: Option<usize>,
}

/// Media backend that never leaves the process.
#[derive(Default)]
pub struct MemoryBackend {
    stills: HashMap<PathBuf, RasterFrame>,
    audio: HashMap<PathBuf, AudioAsset>,
    clips: HashMap<PathBuf, Clip>,
    faults: Faults,
    captures: Arc<Mutex<Vec<CapturedVideo>>>,
    encoder_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_still(mut self, path: impl Into<PathBuf>, frame: RasterFrame) -> Self {
        self.stills.insert(path.into(), frame);
        self
    }

    pub fn with_audio(mut self, path: impl Into<PathBuf>, asset: AudioAsset) -> Self {
        self.audio.insert(path.into(), asset);
        self
    }

    /// Register a clip decoded at `fps`. Give it audio with
    /// [`with_audio`](Self::with_audio) on the same path.
    pub fn with_clip(mut self, path: impl Into<PathBuf>, frames: Vec<RasterFrame>, fps: f64) -> Self {
        self.clips.insert(path.into(), Clip { frames, fps });
        self
    }

    /// Trip `cancel` once `frames` frames have been encoded.
    pub fn cancel_after(mut self, frames: u64, cancel: RenderCancel) -> Self {
        self.faults.cancel_after = Some((frames, cancel));
        self
    }

    /// Make the `call`-th (1-based) encoder fail to start.
    pub fn fail_encoder_call(mut self, call: usize) -> Self {
        self.faults.fail_encoder_call = Some(call);
        self
    }

    pub fn capture(&self, index: usize) -> CapturedVideo {
        self.captures.lock()[index].clone()
    }

    pub fn encoder_calls(&self) -> usize {
        self.encoder_calls.load(Ordering::SeqCst)
    }
}

struct MemoryWriter {
    path: PathBuf,
    settings: EncodeSettings,
    captured: CapturedVideo,
    captures: Arc<Mutex<Vec<CapturedVideo>>>,
    cancel_after: Option<(u64, RenderCancel)>,
}

impl VideoWriter for MemoryWriter {
    fn write_frame(&mut self, frame: &RasterFrame) -> Result<()> {
        if frame.dimensions() != (self.settings.width, self.settings.height) {
            return Err(ShadeReelError::invalid(format!(
                "frame is {:?}, encoder expects {}x{}",
                frame.dimensions(),
                self.settings.width,
                self.settings.height
            )));
        }
        if self.captured.first.is_none() {
            self.captured.first = Some(frame.clone());
        }
        self.captured.last = Some(frame.clone());
        self.captured.frames += 1;
        if let Some((after, cancel)) = &self.cancel_after {
            if self.captured.frames >= *after {
                cancel.cancel();
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        let frames = self.captured.frames;
        let capture = {
            let mut captures = self.captures.lock();
            captures.push(self.captured);
            captures.len() - 1
        };
        Manifest {
            capture: Some(capture),
            frames,
            width: self.settings.width,
            height: self.settings.height,
            video_plan: None,
            audio: None,
        }
        .write(&self.path)?;
        Ok(frames)
    }
}

impl MediaBackend for MemoryBackend {
    fn decode_still(&self, path: &Path) -> Result<RasterFrame> {
        self.stills
            .get(path)
            .cloned()
            .ok_or_else(|| ShadeReelError::unreadable(format!("no image at {}", path.display())))
    }

    fn open_clip(&self, path: &Path, window: ClipWindow, fps: f64) -> Result<FrameStream> {
        let clip = self
            .clips
            .get(path)
            .ok_or_else(|| ShadeReelError::unreadable(format!("no clip at {}", path.display())))?;
        let step = clip.fps / fps;
        let start = (window.start * clip.fps).round() as usize;
        let wanted = window.duration.map_or(usize::MAX, |d| (d * fps).round() as usize);
        let frames: Vec<RasterFrame> = (0..wanted)
            .map(|i| start + (i as f64 * step).floor() as usize)
            .take_while(|&idx| idx < clip.frames.len())
            .map(|idx| clip.frames[idx].clone())
            .collect();
        Ok(Box::new(frames.into_iter().map(Ok)))
    }

    fn decode_audio(&self, path: &Path) -> Result<AudioAsset> {
        self.audio
            .get(path)
            .cloned()
            .ok_or_else(|| ShadeReelError::unreadable(format!("no audio at {}", path.display())))
    }

    /// A registered clip has one video stream, plus an audio stream when
    /// audio was registered under the same path.
    fn probe(&self, path: &Path) -> Result<MediaProbe> {
        let clip = self
            .clips
            .get(path)
            .ok_or_else(|| ShadeReelError::unreadable(format!("no clip at {}", path.display())))?;
        let (width, height) = clip.frames.first().map_or((0, 0), RasterFrame::dimensions);
        let audio_streams = self
            .audio
            .get(path)
            .map(|asset| AudioStreamInfo {
                index: 1,
                codec: "pcm_f32le".into(),
                sample_rate: asset.sample_rate(),
                channels: asset.channels(),
            })
            .into_iter()
            .collect();
        Ok(MediaProbe {
            path: path.to_string_lossy().into_owned(),
            duration_seconds: clip.frames.len() as f64 / clip.fps,
            video_streams: vec![VideoStreamInfo {
                index: 0,
                codec: "rawvideo".into(),
                width,
                height,
                frame_rate: FrameRate::new((clip.fps * 1000.0).round() as u32, 1000),
            }],
            audio_streams,
            format: "memory".into(),
        })
    }

    fn open_encoder(&self, settings: &EncodeSettings, output: &Path) -> Result<Box<dyn VideoWriter>> {
        let call = self.encoder_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.faults.fail_encoder_call == Some(call) {
            return Err(ShadeReelError::EncoderFailure(format!("encoder {call} refused to start")));
        }
        settings.validate()?;
        Ok(Box::new(MemoryWriter {
            path: output.to_path_buf(),
            settings: settings.clone(),
            captured: CapturedVideo::default(),
            captures: Arc::clone(&self.captures),
            cancel_after: self.faults.cancel_after.clone(),
        }))
    }

    fn mux_audio(&self, video: &Path, track: &ReconciledAudioTrack, output: &Path) -> Result<()> {
        let mut manifest = Manifest::load(video)?;
        manifest.audio = Some(AudioSummary {
            frames: track.frames(),
            sample_rate: track.sample_rate(),
            channels: track.channels(),
            seconds: track.duration_seconds(),
            plan: track.plan(),
            fades_applied: track.fades_applied(),
        });
        manifest.write(output)
    }

    fn loop_video(&self, video: &Path, target: f64, output: &Path) -> Result<ReconcilePlan> {
        let native = self.probe(video)?.duration_seconds;
        let plan = ReconcilePlan::for_durations(native, target)?;
        let (width, height) = self
            .clips
            .get(video)
            .and_then(|c| c.frames.first())
            .map_or((0, 0), RasterFrame::dimensions);
        Manifest {
            capture: None,
            frames: 0,
            width,
            height,
            video_plan: Some(plan),
            audio: None,
        }
        .write(output)?;
        Ok(plan)
    }
}

// ── Fixtures ───────────────────────────────────────────────────

/// Constant-level stereo asset `seconds` long at `sample_rate`.
pub fn tone(seconds: f64, sample_rate: u32) -> AudioAsset {
    let frames = (seconds * sample_rate as f64).round() as usize;
    let samples: Vec<f32> = (0..frames * 2).map(|i| ((i / 2) % 100) as f32 / 100.0).collect();
    AudioAsset::new(sample_rate, 2, samples).unwrap_or_else(|e| panic!("building tone: {e}"))
}

/// Every file name in `dir`, sorted.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("listing {}: {e}", dir.display()))
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()).unwrap_or_default())
        .collect();
    names.sort();
    names
}
