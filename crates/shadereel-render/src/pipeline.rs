//! One job from inputs to a finished MP4.
//!
//! Output is written to hidden scratch files next to the destination and only
//! renamed into place once every stage has succeeded, so a failed or
//! cancelled job never leaves a partial file or clobbers an earlier good one.

use crate::backend::{FfmpegBackend, MediaBackend};
use crate::compositor::{CaptionPass, FrameCompositor, FrameSource};
use crate::job::{JobConfig, JobId, JobSource, RenderJob};
use crate::progress::{ProgressReporter, RenderCancel, RenderProgress};
use crate::sink::{EncoderSink, PreviewSink};
use crossbeam_channel::Sender;
use serde::Serialize;
use shadereel_audio::{AudioAsset, AudioReconciler, ReconcilePlan, ReconciledAudioTrack};
use shadereel_core::{GeometryFitter, RasterFrame, Result, ShadeReelError};
use shadereel_effects::{resolve_rasterizer, CaptionOverlay, GlyphRasterizer};
use shadereel_media::EncodeSettings;
use shadereel_timeline::TimelineGenerator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{info, warn};

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    pub job: JobId,
    pub output: PathBuf,
    /// Frames encoded. Zero for loop-video jobs, which re-encode through
    /// ffmpeg directly.
    pub frames: u64,
    pub audio_seconds: Option<f64>,
    pub audio_plan: Option<ReconcilePlan>,
    pub fades_applied: bool,
    /// How the source video was fitted to the audio (loop-video jobs).
    pub video_plan: Option<ReconcilePlan>,
}

/// Runs render jobs against a [`MediaBackend`].
#[derive(Clone)]
pub struct ExportPipeline {
    backend: Arc<dyn MediaBackend>,
    cancel: RenderCancel,
    progress: Option<Sender<RenderProgress>>,
    rasterizer: Option<Arc<dyn GlyphRasterizer>>,
}

impl ExportPipeline {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            cancel: RenderCancel::new(),
            progress: None,
            rasterizer: None,
        }
    }

    /// Pipeline backed by ffmpeg.
    pub fn ffmpeg() -> Self {
        Self::new(Arc::new(FfmpegBackend))
    }

    pub fn with_cancel(mut self, cancel: RenderCancel) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, tx: Sender<RenderProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Use this rasterizer for every caption instead of resolving a font per
    /// job.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn GlyphRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn cancel_handle(&self) -> RenderCancel {
        self.cancel.clone()
    }

    pub fn backend(&self) -> &Arc<dyn MediaBackend> {
        &self.backend
    }

    /// Render `job` to its output path.
    pub fn run(&self, job: &RenderJob) -> Result<ExportOutcome> {
        let config = &job.config;
        config.validate()?;
        self.check_cancel()?;

        let fps = config.frame_rate.to_fps_f64();
        let (source, total_frames, clip_audio) = match &config.source {
            JobSource::LoopVideo { path } => return self.run_loop_video(job, path),
            JobSource::Image { path } => {
                let still = self.backend.decode_still(path)?;
                let timeline = TimelineGenerator::generate(config.keyframes, &config.mode)?;
                let source = FrameSource::Looks {
                    source: still,
                    timeline,
                };
                (source, config.total_frames()?, None)
            }
            JobSource::Slideshow { paths } => {
                let images = self.decode_slides(paths);
                if images.is_empty() {
                    return Err(ShadeReelError::unreadable(format!(
                        "none of the {} slideshow images could be read",
                        paths.len()
                    )));
                }
                (FrameSource::Slides { images }, config.total_frames()?, None)
            }
            JobSource::Clip {
                path,
                trim,
                strip_audio,
            } => {
                let info = self.backend.probe(path)?;
                if !info.has_video() {
                    return Err(ShadeReelError::unreadable(format!(
                        "{} has no video stream",
                        path.display()
                    )));
                }
                let native = info.duration_seconds;
                let window = trim.window(native)?;
                let seconds = window.duration.unwrap_or(native - window.start);
                let total = config.frame_rate.frames_in(seconds)?;
                let frames = self.backend.open_clip(path, window, fps)?;
                let keep_audio = !strip_audio && config.audio.is_none();
                if keep_audio && !info.has_audio() {
                    info!("{} has no audio stream; rendering silent", path.display());
                }
                let own_audio = (keep_audio && info.has_audio()).then(|| (path.clone(), window.start));
                (FrameSource::Clip { frames }, total, own_audio)
            }
        };

        let target_seconds = config.frame_rate.seconds_for(total_frames);
        let track = self.prepare_audio(config, clip_audio, target_seconds)?;

        let mut compositor = FrameCompositor::new(job.id, config.profile.dimensions(), total_frames)
            .with_fitter(GeometryFitter::new(config.resample))
            .with_cancel(self.cancel.clone());
        if let Some(pass) = self.caption_pass(config)? {
            compositor = compositor.with_caption(pass);
        }
        if let Some(tx) = &self.progress {
            compositor = compositor.with_progress(ProgressReporter::to_channel(job.id, total_frames, tx.clone()));
        }
        compositor.schedule(&source)?;

        let dir = output_dir(&config.output)?;
        let video = scratch_path(&dir)?;
        let settings = EncodeSettings::new(config.profile, config.frame_rate).with_crf(config.crf);
        let mut sink = EncoderSink::new(self.backend.open_encoder(&settings, &video)?);
        let frames = compositor.render(source, &mut sink)?;
        drop(sink);
        self.check_cancel()?;

        let finished = match &track {
            Some(track) => {
                let muxed = scratch_path(&dir)?;
                self.backend.mux_audio(&video, track, &muxed)?;
                muxed
            }
            None => video,
        };
        persist(finished, &config.output)?;

        info!(
            "Job {}: wrote {} ({} frames, {})",
            job.id.short(),
            config.output.display(),
            frames,
            match &track {
                Some(t) => format!("{:.2}s audio", t.duration_seconds()),
                None => "no audio".to_string(),
            }
        );
        Ok(ExportOutcome {
            job: job.id,
            output: config.output.clone(),
            frames,
            audio_seconds: track.as_ref().map(ReconciledAudioTrack::duration_seconds),
            audio_plan: track.as_ref().map(ReconciledAudioTrack::plan),
            fades_applied: track.as_ref().is_some_and(ReconciledAudioTrack::fades_applied),
            video_plan: None,
        })
    }

    /// Write one graded still per look to `dir`. Only image jobs have looks.
    ///
    /// Renders the look timeline with a budget of one frame per look, so each
    /// still is exactly the frame a full render shows at that keyframe.
    pub fn preview(&self, job: &RenderJob, dir: &Path) -> Result<Vec<PathBuf>> {
        let config = &job.config;
        let JobSource::Image { path } = &config.source else {
            return Err(ShadeReelError::invalid("preview needs an image source"));
        };
        if config.keyframes < 2 {
            return Err(ShadeReelError::invalid(format!(
                "keyframes must be >= 2, got {}",
                config.keyframes
            )));
        }
        config.profile.validate()?;
        self.check_cancel()?;

        let source = FrameSource::Looks {
            source: self.backend.decode_still(path)?,
            timeline: TimelineGenerator::generate(config.keyframes, &config.mode)?,
        };
        let mut compositor = FrameCompositor::new(job.id, config.profile.dimensions(), config.keyframes as u64)
            .with_fitter(GeometryFitter::new(config.resample))
            .with_cancel(self.cancel.clone());
        if let Some(pass) = self.caption_pass(config)? {
            compositor = compositor.with_caption(CaptionPass {
                animated: false,
                ..pass
            });
        }
        compositor.schedule(&source)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "preview".to_string());
        let mut sink = PreviewSink::new(dir, stem)?;
        compositor.render(source, &mut sink)?;
        info!("Wrote {} previews to {}", sink.written().len(), dir.display());
        Ok(sink.written().to_vec())
    }

    fn run_loop_video(&self, job: &RenderJob, video: &Path) -> Result<ExportOutcome> {
        let config = &job.config;
        let Some(audio) = &config.audio else {
            return Err(ShadeReelError::invalid("loop-video jobs need an audio track"));
        };
        let asset = self.load_audio(&audio.path, audio.offset_seconds)?;
        let target = asset.duration_seconds();

        let dir = output_dir(&config.output)?;
        let fitted = scratch_path(&dir)?;
        let video_plan = self.backend.loop_video(video, target, &fitted)?;
        self.check_cancel()?;

        let track = reconciler_for(config).reconcile(Arc::new(asset), target)?;
        let muxed = scratch_path(&dir)?;
        self.backend.mux_audio(&fitted, &track, &muxed)?;
        persist(muxed, &config.output)?;

        info!(
            "Job {}: fitted {} to {:.2}s of audio ({video_plan:?}) -> {}",
            job.id.short(),
            video.display(),
            target,
            config.output.display()
        );
        Ok(ExportOutcome {
            job: job.id,
            output: config.output.clone(),
            frames: 0,
            audio_seconds: Some(track.duration_seconds()),
            audio_plan: Some(track.plan()),
            fades_applied: track.fades_applied(),
            video_plan: Some(video_plan),
        })
    }

    /// The soundtrack for a job: the configured track, else the clip's own
    /// audio stream.
    fn prepare_audio(
        &self,
        config: &JobConfig,
        clip_audio: Option<(PathBuf, f64)>,
        target: f64,
    ) -> Result<Option<ReconciledAudioTrack>> {
        let asset = if let Some(audio) = &config.audio {
            self.load_audio(&audio.path, audio.offset_seconds)?
        } else if let Some((path, start)) = clip_audio {
            let asset = self.backend.decode_audio(&path)?.skip_seconds(start)?;
            if asset.is_empty() {
                warn!("{} has no audio after {start}s; rendering silent", path.display());
                return Ok(None);
            }
            asset
        } else {
            return Ok(None);
        };
        reconciler_for(config).reconcile(Arc::new(asset), target).map(Some)
    }

    /// Decode every readable slide. Unreadable files are skipped.
    fn decode_slides(&self, paths: &[PathBuf]) -> Vec<RasterFrame> {
        paths
            .iter()
            .filter_map(|path| match self.backend.decode_still(path) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Skipping slide {}: {e}", path.display());
                    None
                }
            })
            .collect()
    }

    fn load_audio(&self, path: &Path, offset: f64) -> Result<AudioAsset> {
        let asset = self.backend.decode_audio(path)?;
        if offset > 0.0 {
            return asset.skip_seconds(offset);
        }
        Ok(asset)
    }

    fn caption_pass(&self, config: &JobConfig) -> Result<Option<CaptionPass>> {
        let Some(caption) = &config.caption else {
            return Ok(None);
        };
        let rasterizer = match &self.rasterizer {
            Some(r) => Arc::clone(r),
            None => resolve_rasterizer(caption.font.as_deref())?,
        };
        let mut overlay = CaptionOverlay::new(caption.style.clone(), rasterizer);
        if let Some(px) = caption.font_px {
            overlay = overlay.with_font_px(px);
        }
        Ok(Some(CaptionPass {
            overlay,
            text: caption.text.clone(),
            animated: caption.animated,
        }))
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ShadeReelError::Cancelled);
        }
        Ok(())
    }
}

fn reconciler_for(config: &JobConfig) -> AudioReconciler {
    match &config.audio {
        Some(audio) if audio.fade => AudioReconciler::with_fades(audio.fade_seconds),
        _ => AudioReconciler::new(),
    }
}

fn output_dir(output: &Path) -> Result<PathBuf> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| ShadeReelError::from_write(e, &format!("creating {}", dir.display())))?;
    Ok(dir.to_path_buf())
}

/// Hidden scratch file in `dir`, removed on drop unless persisted.
fn scratch_path(dir: &Path) -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix(".shadereel-")
        .suffix(".mp4")
        .tempfile_in(dir)
        .map_err(|e| ShadeReelError::from_write(e, &format!("creating scratch file in {}", dir.display())))?;
    Ok(file.into_temp_path())
}

fn persist(scratch: TempPath, output: &Path) -> Result<()> {
    scratch
        .persist(output)
        .map_err(|e| ShadeReelError::from_write(e.error, &format!("saving {}", output.display())))
}
