//! Frame sinks: where composited frames go.

use crate::backend::VideoWriter;
use shadereel_core::{RasterFrame, Result, ShadeReelError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a frame sits in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// Zero-based output frame index.
    pub index: u64,
    /// Set when the frame shows look `k` exactly, unblended.
    pub keyframe: Option<usize>,
}

/// Consumer of an ordered frame stream.
pub trait FrameSink {
    fn accept(&mut self, frame: &RasterFrame, meta: FrameMeta) -> Result<()>;

    /// Flush and close. Returns the number of frames accepted.
    fn finish(&mut self) -> Result<u64>;
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub frames: Vec<RasterFrame>,
    pub metas: Vec<FrameMeta>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for CollectSink {
    fn accept(&mut self, frame: &RasterFrame, meta: FrameMeta) -> Result<()> {
        self.frames.push(frame.clone());
        self.metas.push(meta);
        Ok(())
    }

    fn finish(&mut self) -> Result<u64> {
        Ok(self.frames.len() as u64)
    }
}

/// Counts frames and keeps only the first and last.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub count: u64,
    pub first: Option<RasterFrame>,
    pub last: Option<RasterFrame>,
    /// `(frame index, look index)` for every keyframe seen.
    pub keyframes: Vec<(u64, usize)>,
    next_index: u64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for CountingSink {
    fn accept(&mut self, frame: &RasterFrame, meta: FrameMeta) -> Result<()> {
        if meta.index != self.next_index {
            return Err(ShadeReelError::invalid(format!(
                "frame {} arrived out of order (expected {})",
                meta.index, self.next_index
            )));
        }
        self.next_index += 1;
        if self.first.is_none() {
            self.first = Some(frame.clone());
        }
        self.last = Some(frame.clone());
        if let Some(k) = meta.keyframe {
            self.keyframes.push((meta.index, k));
        }
        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64> {
        Ok(self.count)
    }
}

/// Writes a PNG thumbnail for each keyframe.
pub struct PreviewSink {
    dir: PathBuf,
    stem: String,
    written: Vec<PathBuf>,
}

impl PreviewSink {
    pub fn new(dir: &Path, stem: impl Into<String>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| ShadeReelError::from_write(e, &format!("creating {}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            stem: stem.into(),
            written: Vec::new(),
        })
    }

    /// Files written so far, in look order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FrameSink for PreviewSink {
    fn accept(&mut self, frame: &RasterFrame, meta: FrameMeta) -> Result<()> {
        let Some(look) = meta.keyframe else {
            return Ok(());
        };
        let path = self.dir.join(format!("{}_look_{look:02}.png", self.stem));
        frame
            .clone()
            .into_image()?
            .save(&path)
            .map_err(|e| ShadeReelError::EncoderFailure(format!("writing {}: {e}", path.display())))?;
        debug!("Preview {}", path.display());
        self.written.push(path);
        Ok(())
    }

    fn finish(&mut self) -> Result<u64> {
        Ok(self.written.len() as u64)
    }
}

/// Feeds frames to a video encoder.
pub struct EncoderSink {
    writer: Option<Box<dyn VideoWriter>>,
}

impl EncoderSink {
    pub fn new(writer: Box<dyn VideoWriter>) -> Self {
        Self {
            writer: Some(writer),
        }
    }
}

impl FrameSink for EncoderSink {
    fn accept(&mut self, frame: &RasterFrame, _meta: FrameMeta) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write_frame(frame),
            None => Err(ShadeReelError::EncoderFailure("encoder already finished".into())),
        }
    }

    fn finish(&mut self) -> Result<u64> {
        match self.writer.take() {
            Some(writer) => writer.finish(),
            None => Err(ShadeReelError::EncoderFailure("encoder already finished".into())),
        }
    }
}
