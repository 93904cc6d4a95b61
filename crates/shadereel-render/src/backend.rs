//! Media collaborators behind traits.
//!
//! The renderer only talks to decoders, the encoder and the muxer through
//! [`MediaBackend`], so jobs can run against ffmpeg in production and against
//! an in-memory backend in tests.

use shadereel_audio::{AudioAsset, ReconcilePlan, ReconciledAudioTrack};
use shadereel_core::{RasterFrame, Result};
use shadereel_media::{
    decode_audio, decode_still, loop_video, mux_audio, ClipDecoder, ClipWindow, EncodeSettings, FrameEncoder,
    MediaProbe, MIX_SAMPLE_RATE,
};
use std::path::Path;

/// Stream of decoded clip frames.
pub type FrameStream = Box<dyn Iterator<Item = Result<RasterFrame>>>;

/// Receives encoded frames in order.
pub trait VideoWriter {
    fn write_frame(&mut self, frame: &RasterFrame) -> Result<()>;

    /// Finalize the file. Returns the number of frames written.
    fn finish(self: Box<Self>) -> Result<u64>;
}

/// Everything the renderer needs from the outside world.
pub trait MediaBackend: Send + Sync {
    fn decode_still(&self, path: &Path) -> Result<RasterFrame>;

    fn open_clip(&self, path: &Path, window: ClipWindow, fps: f64) -> Result<FrameStream>;

    fn decode_audio(&self, path: &Path) -> Result<AudioAsset>;

    /// Container duration and stream layout.
    fn probe(&self, path: &Path) -> Result<MediaProbe>;

    fn open_encoder(&self, settings: &EncodeSettings, output: &Path) -> Result<Box<dyn VideoWriter>>;

    fn mux_audio(&self, video: &Path, track: &ReconciledAudioTrack, output: &Path) -> Result<()>;

    /// Trim or loop `video` to `target` seconds, without audio.
    fn loop_video(&self, video: &Path, target: f64, output: &Path) -> Result<ReconcilePlan>;
}

impl VideoWriter for FrameEncoder {
    fn write_frame(&mut self, frame: &RasterFrame) -> Result<()> {
        FrameEncoder::write_frame(self, frame)
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        FrameEncoder::finish(*self)
    }
}

/// Production backend: `image` for stills, ffmpeg for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl MediaBackend for FfmpegBackend {
    fn decode_still(&self, path: &Path) -> Result<RasterFrame> {
        decode_still(path)
    }

    fn open_clip(&self, path: &Path, window: ClipWindow, fps: f64) -> Result<FrameStream> {
        Ok(Box::new(ClipDecoder::open(path, window, fps)?))
    }

    fn decode_audio(&self, path: &Path) -> Result<AudioAsset> {
        decode_audio(path, MIX_SAMPLE_RATE)
    }

    fn probe(&self, path: &Path) -> Result<MediaProbe> {
        MediaProbe::probe(path)
    }

    fn open_encoder(&self, settings: &EncodeSettings, output: &Path) -> Result<Box<dyn VideoWriter>> {
        Ok(Box::new(FrameEncoder::spawn(settings.clone(), output)?))
    }

    fn mux_audio(&self, video: &Path, track: &ReconciledAudioTrack, output: &Path) -> Result<()> {
        mux_audio(video, track, output)
    }

    fn loop_video(&self, video: &Path, target: f64, output: &Path) -> Result<ReconcilePlan> {
        loop_video(video, target, output)
    }
}
