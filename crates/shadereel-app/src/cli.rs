//! Command-line arguments and how they turn into render jobs.

use anyhow::{bail, Context as _};
use clap::{Args, Parser, Subcommand, ValueEnum};
use shadereel_core::FrameRate;
use shadereel_effects::OverlayStyle;
use shadereel_media::OutputProfile;
use shadereel_render::{
    collect_inputs, plan_batch, AudioConfig, BatchOptions, CaptionConfig, ClipTrim, JobConfig, JobFile, JobSource,
    RenderJob, DEFAULT_BATCH_LIMIT, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
use shadereel_timeline::{GenerationMode, LookRamp};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "shadereel", version, about = "Render color-grade look timelines to MP4")]
pub struct Cli {
    /// Job file whose first job supplies the defaults for every flag.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the planned jobs to this job file instead of rendering.
    #[arg(long, global = true)]
    pub save_config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one image through a look timeline.
    Render {
        #[arg(long)]
        image: PathBuf,
        /// Output MP4 path.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Render every image in a directory, one MP4 each.
    Batch {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        /// Maximum number of images picked up.
        #[arg(long, default_value_t = DEFAULT_BATCH_LIMIT)]
        limit: usize,
        #[command(flatten)]
        workers: WorkerOpts,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Show several images in turn. A single directory argument is expanded
    /// to the images inside it.
    Slideshow {
        #[arg(long, num_args = 1.., required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Crop and caption an existing clip.
    Clip {
        #[arg(long)]
        clip: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Keep only the first N seconds.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        first: Option<f64>,
        /// Range start in seconds.
        #[arg(long, requires = "end")]
        start: Option<f64>,
        /// Range end in seconds.
        #[arg(long, requires = "start")]
        end: Option<f64>,
        /// Drop the clip's own soundtrack.
        #[arg(long)]
        strip_audio: bool,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Trim or loop a video (or every video in a directory) to the length of
    /// the --audio track.
    LoopVideo {
        #[arg(long)]
        video: PathBuf,
        /// Output file, or output directory when --video is a directory.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        workers: WorkerOpts,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Write one graded PNG per look instead of a video.
    Preview {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Render every job in a job file.
    RunFile {
        file: PathBuf,
        #[command(flatten)]
        workers: WorkerOpts,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptionStyle {
    Bars,
    Floating,
}

/// Batch execution flags.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkerOpts {
    /// Render jobs concurrently.
    #[arg(long)]
    pub parallel: bool,
    /// Worker threads for --parallel [default: CPU count].
    #[arg(long)]
    pub workers: Option<usize>,
}

impl WorkerOpts {
    pub fn options(&self) -> BatchOptions {
        let mut options = BatchOptions {
            parallel: self.parallel,
            ..Default::default()
        };
        if let Some(workers) = self.workers {
            options.workers = workers;
        }
        options
    }
}

/// Per-job flags. Anything left unset keeps the value from --config, or the
/// built-in default.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderOpts {
    /// Output length in seconds [default: 60].
    #[arg(long)]
    pub duration: Option<f64>,
    /// Frames per second [default: 24].
    #[arg(long)]
    pub fps: Option<u32>,
    /// square, vertical, vertical-1080 or WxH [default: square].
    #[arg(long)]
    pub profile: Option<OutputProfile>,
    /// Looks in the timeline [default: 50].
    #[arg(long)]
    pub keyframes: Option<usize>,
    /// Draw looks from a random envelope instead of the fixed ramp.
    #[arg(long)]
    pub random: bool,
    /// Seed for --random.
    #[arg(long, requires = "random")]
    pub seed: Option<u64>,
    /// Use the gentle fixed ramp.
    #[arg(long, conflicts_with = "random")]
    pub subtle: bool,
    /// Caption text.
    #[arg(long)]
    pub caption: Option<String>,
    /// Text for the top bar (bars style).
    #[arg(long)]
    pub top_text: Option<String>,
    #[arg(long, value_enum)]
    pub style: Option<CaptionStyle>,
    /// Keep floating captions still.
    #[arg(long)]
    pub static_caption: bool,
    /// TTF/OTF font for captions.
    #[arg(long)]
    pub font: Option<PathBuf>,
    /// Caption size in pixels.
    #[arg(long)]
    pub font_size: Option<f32>,
    /// Soundtrack, trimmed or looped to the video length.
    #[arg(long)]
    pub audio: Option<PathBuf>,
    /// Fade the soundtrack in and out.
    #[arg(long)]
    pub fade: bool,
    #[arg(long)]
    pub fade_seconds: Option<f64>,
    /// Seconds skipped from the start of the soundtrack.
    #[arg(long)]
    pub audio_offset: Option<f64>,
    /// x264 quality, 0-51 [default: 18].
    #[arg(long)]
    pub crf: Option<u8>,
}

impl RenderOpts {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut JobConfig) {
        if let Some(duration) = self.duration {
            config.duration_seconds = duration;
        }
        if let Some(fps) = self.fps {
            config.frame_rate = FrameRate::new(fps, 1);
        }
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
        if let Some(keyframes) = self.keyframes {
            config.keyframes = keyframes;
        }
        if let Some(crf) = self.crf {
            config.crf = crf;
        }
        if self.random {
            config.mode = GenerationMode::randomized(self.seed);
        } else if self.subtle {
            config.mode = GenerationMode::Deterministic(LookRamp::subtle());
        }

        if self.caption.is_some() || self.top_text.is_some() || self.style.is_some() {
            let mut caption = config
                .caption
                .take()
                .unwrap_or_else(|| CaptionConfig::new("", OverlayStyle::default()));
            if let Some(text) = &self.caption {
                caption.text = text.clone();
            }
            caption.style = match self.style {
                Some(CaptionStyle::Floating) => OverlayStyle::floating(),
                Some(CaptionStyle::Bars) => OverlayStyle::bars(self.top_text.clone()),
                None if self.top_text.is_some() => OverlayStyle::bars(self.top_text.clone()),
                None => caption.style,
            };
            config.caption = Some(caption);
        }
        if let Some(caption) = config.caption.as_mut() {
            if self.static_caption {
                caption.animated = false;
            }
            if let Some(font) = &self.font {
                caption.font = Some(font.clone());
            }
            if let Some(px) = self.font_size {
                caption.font_px = Some(px);
            }
        }

        if let Some(path) = &self.audio {
            let mut audio = config.audio.take().unwrap_or_else(|| AudioConfig::new(path));
            audio.path = path.clone();
            config.audio = Some(audio);
        }
        if let Some(audio) = config.audio.as_mut() {
            if self.fade {
                audio.fade = true;
            }
            if let Some(seconds) = self.fade_seconds {
                audio.fade_seconds = seconds;
            }
            if let Some(offset) = self.audio_offset {
                audio.offset_seconds = offset;
            }
        }
    }
}

/// What the binary will do once arguments are resolved.
#[derive(Debug)]
pub enum Work {
    Single(RenderJob),
    Batch(Vec<RenderJob>, BatchOptions),
    Preview(RenderJob, PathBuf),
}

impl Work {
    pub fn configs(&self) -> Vec<JobConfig> {
        match self {
            Self::Single(job) | Self::Preview(job, _) => vec![job.config.clone()],
            Self::Batch(jobs, _) => jobs.iter().map(|j| j.config.clone()).collect(),
        }
    }
}

/// Defaults for every job: the first job in `path`, or the built-in ones.
pub fn load_template(path: Option<&Path>) -> anyhow::Result<JobConfig> {
    let Some(path) = path else {
        return Ok(JobConfig::default());
    };
    let file = JobFile::load_from_file(path).with_context(|| format!("loading {}", path.display()))?;
    Ok(file.jobs.into_iter().next().unwrap_or_default())
}

impl Command {
    pub fn into_work(self, template: JobConfig) -> anyhow::Result<Work> {
        let configured = |opts: &RenderOpts| {
            let mut config = template.clone();
            opts.apply(&mut config);
            config
        };

        let work = match self {
            Self::Render { image, out, opts } => {
                let mut config = configured(&opts);
                config.source = JobSource::Image { path: image };
                config.output = out;
                Work::Single(RenderJob::new(config))
            }
            Self::Batch {
                dir,
                out_dir,
                limit,
                workers,
                opts,
            } => {
                let mut config = configured(&opts);
                config.source = JobSource::Image { path: PathBuf::new() };
                let inputs = collect_inputs(&dir, IMAGE_EXTENSIONS, limit)?;
                if inputs.is_empty() {
                    bail!("no jpg/jpeg/png images in {}", dir.display());
                }
                Work::Batch(plan_batch(&config, &inputs, &out_dir), workers.options())
            }
            Self::Slideshow { images, out, opts } => {
                let paths = match images.as_slice() {
                    [dir] if dir.is_dir() => collect_inputs(dir, IMAGE_EXTENSIONS, DEFAULT_BATCH_LIMIT)?,
                    _ => images,
                };
                let mut config = configured(&opts);
                config.source = JobSource::Slideshow { paths };
                config.output = out;
                Work::Single(RenderJob::new(config))
            }
            Self::Clip {
                clip,
                out,
                first,
                start,
                end,
                strip_audio,
                opts,
            } => {
                let trim = match (first, start, end) {
                    (Some(seconds), _, _) => ClipTrim::First { seconds },
                    (None, Some(start), Some(end)) => ClipTrim::Range { start, end },
                    _ => ClipTrim::Full,
                };
                let mut config = configured(&opts);
                config.source = JobSource::Clip {
                    path: clip,
                    trim,
                    strip_audio,
                };
                config.output = out;
                Work::Single(RenderJob::new(config))
            }
            Self::LoopVideo {
                video,
                out,
                workers,
                opts,
            } => {
                let mut config = configured(&opts);
                if config.audio.is_none() {
                    bail!("loop-video needs --audio");
                }
                if video.is_dir() {
                    config.source = JobSource::LoopVideo { path: PathBuf::new() };
                    let inputs = collect_inputs(&video, VIDEO_EXTENSIONS, usize::MAX)?;
                    if inputs.is_empty() {
                        bail!("no videos in {}", video.display());
                    }
                    Work::Batch(plan_batch(&config, &inputs, &out), workers.options())
                } else {
                    config.source = JobSource::LoopVideo { path: video };
                    config.output = out;
                    Work::Single(RenderJob::new(config))
                }
            }
            Self::Preview { image, out_dir, opts } => {
                let mut config = configured(&opts);
                config.source = JobSource::Image { path: image };
                Work::Preview(RenderJob::new(config), out_dir)
            }
            Self::RunFile { file, workers } => {
                let jobs = JobFile::load_from_file(&file)
                    .with_context(|| format!("loading {}", file.display()))?
                    .jobs;
                if jobs.is_empty() {
                    bail!("{} has no jobs", file.display());
                }
                Work::Batch(jobs.into_iter().map(RenderJob::new).collect(), workers.options())
            }
        };
        Ok(work)
    }
}
