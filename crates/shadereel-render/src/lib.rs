//! ShadeReel Render - Jobs, composition and export
//!
//! Architecture:
//! - `JobConfig` / `JobFile`: serde job descriptions, versioned on disk
//! - `FrameCompositor`: fit, grade, blend and caption into a `FrameSink`
//! - `MediaBackend`: every decoder, encoder and muxer the renderer touches
//! - `ExportPipeline`: one job end to end, with scratch files and cleanup
//! - `BatchRunner`: many jobs, sequential or on a rayon pool

pub mod backend;
pub mod batch;
pub mod compositor;
pub mod job;
pub mod job_file;
pub mod pipeline;
pub mod progress;
pub mod sink;

pub use backend::{FfmpegBackend, FrameStream, MediaBackend, VideoWriter};
pub use batch::{
    collect_inputs, plan_batch, BatchItem, BatchItemStatus, BatchOptions, BatchReport, BatchRunner,
    DEFAULT_BATCH_LIMIT, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
pub use compositor::{CaptionPass, CompositorState, FrameCompositor, FrameSource};
pub use job::{AudioConfig, CaptionConfig, ClipTrim, JobConfig, JobId, JobSource, RenderJob};
pub use job_file::{JobFile, CURRENT_VERSION};
pub use pipeline::{ExportOutcome, ExportPipeline};
pub use progress::{progress_channel, ProgressReporter, RenderCancel, RenderProgress};
pub use sink::{CollectSink, CountingSink, EncoderSink, FrameMeta, FrameSink, PreviewSink};
