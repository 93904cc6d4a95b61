//! ShadeReel Audio - Soundtrack handling
//!
//! Architecture:
//! - `AudioAsset`: immutable interleaved f32 PCM shared behind an `Arc`
//! - `AudioReconciler`: fits an asset to a fixed video duration (trim or loop)
//! - `ReconciledAudioTrack`: lazy, sample-exact view with optional fades

pub mod pcm;
pub mod reconcile;

pub use pcm::{write_f32le, AudioAsset};
pub use reconcile::{AudioReconciler, ReconcilePlan, ReconciledAudioTrack, DEFAULT_FADE_SECONDS};
