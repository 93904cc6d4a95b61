//! Per-frame composition: fit, grade, blend, caption, emit.

use crate::backend::FrameStream;
use crate::job::JobId;
use crate::progress::{ProgressReporter, RenderCancel};
use crate::sink::{FrameMeta, FrameSink};
use shadereel_color::ColorGrade;
use shadereel_core::{GeometryFitter, RasterFrame, Result, ShadeReelError};
use shadereel_effects::{CaptionOverlay, FrameBlender};
use shadereel_timeline::{EffectTimeline, FrameBudgetPlanner, FrameSchedule, SlideSchedule};
use std::fmt;
use tracing::{debug, info};

/// Lifecycle of a [`FrameCompositor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorState {
    Idle,
    Scheduling,
    Rendering,
    Finalizing,
    Done,
    Failed,
}

/// What the compositor draws from.
pub enum FrameSource {
    /// One still graded through a look timeline.
    Looks { source: RasterFrame, timeline: EffectTimeline },
    /// Stills shown in turn, ungraded.
    Slides { images: Vec<RasterFrame> },
    /// Decoded clip frames.
    Clip { frames: FrameStream },
}

impl FrameSource {
    fn kind(&self) -> &'static str {
        match self {
            Self::Looks { .. } => "looks",
            Self::Slides { .. } => "slides",
            Self::Clip { .. } => "clip",
        }
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Looks { source, timeline } => f
                .debug_struct("Looks")
                .field("source", &source.dimensions())
                .field("looks", &timeline.len())
                .finish(),
            Self::Slides { images } => f.debug_struct("Slides").field("images", &images.len()).finish(),
            Self::Clip { .. } => f.debug_struct("Clip").finish_non_exhaustive(),
        }
    }
}

/// Caption drawn on every frame.
#[derive(Clone)]
pub struct CaptionPass {
    pub overlay: CaptionOverlay,
    pub text: String,
    pub animated: bool,
}

enum Plan {
    Looks(FrameSchedule),
    Slides(SlideSchedule),
    Clip,
}

/// Turns a source into exactly `total_frames` output frames.
pub struct FrameCompositor {
    job: JobId,
    size: (u32, u32),
    total_frames: u64,
    fitter: GeometryFitter,
    caption: Option<CaptionPass>,
    cancel: RenderCancel,
    progress: Option<ProgressReporter>,
    state: CompositorState,
    plan: Option<Plan>,
    emitted: u64,
}

impl FrameCompositor {
    pub fn new(job: JobId, size: (u32, u32), total_frames: u64) -> Self {
        Self {
            job,
            size,
            total_frames,
            fitter: GeometryFitter::default(),
            caption: None,
            cancel: RenderCancel::new(),
            progress: None,
            state: CompositorState::Idle,
            plan: None,
            emitted: 0,
        }
    }

    pub fn with_fitter(mut self, fitter: GeometryFitter) -> Self {
        self.fitter = fitter;
        self
    }

    pub fn with_caption(mut self, caption: CaptionPass) -> Self {
        self.caption = Some(caption);
        self
    }

    pub fn with_cancel(mut self, cancel: RenderCancel) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> CompositorState {
        self.state
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frames handed to the sink so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Allocate the frame budget for `source`. On error the compositor stays
    /// `Idle`.
    pub fn schedule(&mut self, source: &FrameSource) -> Result<()> {
        if self.state != CompositorState::Idle {
            return Err(ShadeReelError::invalid(format!(
                "schedule called in state {:?}",
                self.state
            )));
        }
        let (w, h) = self.size;
        if w == 0 || h == 0 {
            return Err(ShadeReelError::invalid(format!("output size {w}x{h} must be non-zero")));
        }
        if self.total_frames < 1 {
            return Err(ShadeReelError::invalid("render needs at least 1 frame"));
        }

        let plan = match source {
            FrameSource::Looks { timeline, .. } => {
                let schedule = FrameBudgetPlanner::plan(timeline.len(), self.total_frames)?;
                debug!(
                    "Job {}: {} looks, {} frames per segment, {} held",
                    self.job.short(),
                    timeline.len(),
                    schedule.frames_per_segment(),
                    schedule.pad_frames()
                );
                Plan::Looks(schedule)
            }
            FrameSource::Slides { images } => Plan::Slides(FrameBudgetPlanner::plan_slideshow(
                images.len(),
                self.total_frames,
            )?),
            FrameSource::Clip { .. } => Plan::Clip,
        };
        self.plan = Some(plan);
        self.state = CompositorState::Scheduling;
        Ok(())
    }

    /// Render every frame of `source` into `sink`, then finish the sink.
    /// Returns the number of frames emitted.
    pub fn render(&mut self, source: FrameSource, sink: &mut dyn FrameSink) -> Result<u64> {
        if self.state != CompositorState::Scheduling {
            return Err(ShadeReelError::invalid(format!(
                "render called in state {:?}",
                self.state
            )));
        }
        let Some(plan) = self.plan.take() else {
            return Err(ShadeReelError::invalid("render called without a schedule"));
        };
        self.state = CompositorState::Rendering;
        info!(
            "Job {}: rendering {} frames ({}) at {}x{}",
            self.job.short(),
            self.total_frames,
            source.kind(),
            self.size.0,
            self.size.1
        );

        let rendered = match (source, &plan) {
            (FrameSource::Looks { source, timeline }, Plan::Looks(schedule)) => {
                self.render_looks(source, &timeline, schedule, sink)
            }
            (FrameSource::Slides { images }, Plan::Slides(schedule)) => self.render_slides(images, schedule, sink),
            (FrameSource::Clip { frames }, Plan::Clip) => self.render_clip(frames, sink),
            (other, _) => Err(ShadeReelError::invalid(format!(
                "source changed to {} after scheduling",
                other.kind()
            ))),
        };
        if let Err(e) = rendered {
            self.state = CompositorState::Failed;
            return Err(e);
        }

        self.state = CompositorState::Finalizing;
        match sink.finish() {
            Ok(accepted) => {
                debug!("Job {}: sink accepted {accepted}", self.job.short());
                self.state = CompositorState::Done;
                Ok(self.emitted)
            }
            Err(e) => {
                self.state = CompositorState::Failed;
                Err(e)
            }
        }
    }

    fn render_looks(
        &mut self,
        source: RasterFrame,
        timeline: &EffectTimeline,
        schedule: &FrameSchedule,
        sink: &mut dyn FrameSink,
    ) -> Result<()> {
        let (w, h) = self.size;
        let fitted = self.fitter.fit(source, w, h)?;
        let looks = timeline.looks();
        let last = looks.len() - 1;

        let mut current = if schedule.frames_per_segment() > 0 {
            // Without hold frames the last blend step gives way to the final look.
            let closing_segment = (schedule.pad_frames() == 0).then(|| schedule.segment_frames().len() - 1);
            let mut a = ColorGrade::apply(&fitted, &looks[0]);
            for (k, &steps) in schedule.segment_frames().iter().enumerate() {
                let b = ColorGrade::apply(&fitted, &looks[k + 1]);
                let closing_step = (closing_segment == Some(k)).then(|| steps - 1);
                for (step, frame) in FrameBlender::blend(&a, &b, steps as i64)?.enumerate() {
                    if closing_step == Some(step as u64) {
                        self.emit(b.clone(), Some(last), sink)?;
                    } else {
                        self.emit(frame, (step == 0).then_some(k), sink)?;
                    }
                }
                a = b;
            }
            a
        } else {
            ColorGrade::apply(&fitted, timeline.last())
        };

        for i in 0..schedule.pad_frames() {
            let frame = if i + 1 == schedule.pad_frames() {
                std::mem::replace(&mut current, RasterFrame::new(0, 0))
            } else {
                current.clone()
            };
            self.emit(frame, (i == 0).then_some(last), sink)?;
        }
        Ok(())
    }

    fn render_slides(
        &mut self,
        images: Vec<RasterFrame>,
        schedule: &SlideSchedule,
        sink: &mut dyn FrameSink,
    ) -> Result<()> {
        let (w, h) = self.size;
        for (k, (image, &count)) in images.into_iter().zip(schedule.per_image()).enumerate() {
            let fitted = self.fitter.fit(image, w, h)?;
            for i in 0..count {
                self.emit(fitted.clone(), (i == 0).then_some(k), sink)?;
            }
        }
        Ok(())
    }

    fn render_clip(&mut self, mut frames: FrameStream, sink: &mut dyn FrameSink) -> Result<()> {
        let (w, h) = self.size;
        let mut last: Option<RasterFrame> = None;
        let mut decoded = 0u64;
        while self.emitted < self.total_frames {
            self.check_cancel()?;
            let next = match frames.next() {
                Some(frame) => {
                    decoded += 1;
                    Some(self.fitter.fit(frame?, w, h)?)
                }
                None => None,
            };
            let frame = match (next, &last) {
                (Some(frame), _) => {
                    last = Some(frame.clone());
                    frame
                }
                (None, Some(held)) => held.clone(),
                (None, None) => return Err(ShadeReelError::unreadable("clip produced no frames")),
            };
            let keyframe = (self.emitted == 0).then_some(0);
            self.emit(frame, keyframe, sink)?;
        }
        if decoded < self.total_frames {
            debug!(
                "Job {}: clip ended after {decoded} frames, held the last one",
                self.job.short()
            );
        }
        Ok(())
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("Job {}: cancelled after {} frames", self.job.short(), self.emitted);
            return Err(ShadeReelError::Cancelled);
        }
        Ok(())
    }

    fn emit(&mut self, frame: RasterFrame, keyframe: Option<usize>, sink: &mut dyn FrameSink) -> Result<()> {
        self.check_cancel()?;
        let index = self.emitted;
        let frame = match &self.caption {
            Some(pass) => pass.overlay.overlay(frame, &pass.text, index, pass.animated),
            None => frame,
        };
        sink.accept(&frame, FrameMeta { index, keyframe })?;
        self.emitted += 1;
        if let Some(progress) = self.progress.as_mut() {
            progress.report(self.emitted);
        }
        Ok(())
    }
}
