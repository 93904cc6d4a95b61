//! Muxing a reconciled soundtrack into an encoded video, and fitting a
//! finished video to a target length.

use crate::probe::MediaProbe;
use crate::tools::{ffmpeg_binary, ffmpeg_failure};
use shadereel_audio::{ReconcilePlan, ReconciledAudioTrack};
use shadereel_core::{Result, ShadeReelError};
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Arguments that copy the video stream and encode raw f32le audio as AAC.
pub fn mux_args(video: &Path, audio_raw: &Path, sample_rate: u32, channels: u16, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-i".into(),
        video.to_string_lossy().into_owned(),
        "-f".into(),
        "f32le".into(),
        "-ar".into(),
        sample_rate.to_string(),
        "-ac".into(),
        channels.to_string(),
        "-i".into(),
        audio_raw.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "192k".into(),
        "-f".into(),
        "mp4".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Write `track` next to `output` and mux it with `video`.
pub fn mux_audio(video: &Path, track: &ReconciledAudioTrack, output: &Path) -> Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let raw = tempfile::Builder::new()
        .prefix(".shadereel-audio-")
        .suffix(".f32")
        .tempfile_in(dir)
        .map_err(|e| ShadeReelError::from_write(e, "creating audio scratch file"))?
        .into_temp_path();
    track.write_f32le(&raw)?;

    let args = mux_args(video, &raw, track.sample_rate(), track.channels(), output);
    run_ffmpeg(&args, &format!("muxing {}", output.display()))?;
    info!(
        "Muxed {:.2}s of audio ({:?}) into {}",
        track.duration_seconds(),
        track.plan(),
        output.display()
    );
    Ok(())
}

/// Arguments that trim or loop `video` to exactly `target` seconds.
pub fn fit_length_args(video: &Path, plan: ReconcilePlan, target: f64, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-v".into(), "error".into()];
    if let ReconcilePlan::Loop { repeats } = plan {
        args.extend(["-stream_loop".into(), repeats.saturating_sub(1).to_string()]);
    }
    args.extend([
        "-i".into(),
        video.to_string_lossy().into_owned(),
        "-t".into(),
        format!("{target:.3}"),
        "-an".into(),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-f".into(),
        "mp4".into(),
        output.to_string_lossy().into_owned(),
    ]);
    args
}

/// Trim or loop `video` to `target` seconds. Audio is dropped; mux it back in
/// with [`mux_audio`].
pub fn loop_video(video: &Path, target: f64, output: &Path) -> Result<ReconcilePlan> {
    let native = MediaProbe::probe(video)?.duration_seconds;
    let plan = ReconcilePlan::for_durations(native, target)?;
    let args = fit_length_args(video, plan, target, output);
    run_ffmpeg(&args, &format!("fitting {} to {target}s", video.display()))?;
    info!("Fitted {:.2}s video to {target}s ({plan:?})", native);
    Ok(plan)
}

fn run_ffmpeg(args: &[String], context: &str) -> Result<()> {
    let out = Command::new(ffmpeg_binary()?)
        .args(args)
        .output()
        .map_err(|e| ShadeReelError::EncoderFailure(format!("failed to run ffmpeg: {e}")))?;
    if !out.status.success() {
        return Err(ffmpeg_failure(context, &out.stderr));
    }
    Ok(())
}
