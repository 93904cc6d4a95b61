//! ShadeReel Media - FFmpeg integration for video/audio I/O
//!
//! This crate handles:
//! - Still image decoding
//! - Clip decoding through an ffmpeg subprocess
//! - Audio decoding to f32 PCM
//! - Media file probing
//! - Encoding and muxing

pub mod audio;
pub mod decoder;
pub mod export;
pub mod mux;
pub mod probe;
pub mod tools;

pub use audio::{decode_audio, MIX_SAMPLE_RATE};
pub use decoder::{decode_still, ClipDecoder, ClipWindow};
pub use export::{EncodeSettings, FrameEncoder, OutputProfile, DEFAULT_CRF};
pub use mux::{loop_video, mux_audio};
pub use probe::{AudioStreamInfo, MediaProbe, VideoStreamInfo};
pub use tools::{ffmpeg_available, ffmpeg_binary, ffprobe_binary};
