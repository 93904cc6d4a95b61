//! Batches of jobs through the in-memory backend.

use crate::support::{listing, tone, Manifest, MemoryBackend};
use shadereel_audio::ReconcilePlan;
use shadereel_core::{RasterFrame, ShadeReelError};
use shadereel_effects::BlockRasterizer;
use shadereel_media::OutputProfile;
use shadereel_render::{
    plan_batch, AudioConfig, BatchItemStatus, BatchOptions, BatchRunner, ExportPipeline, JobConfig, JobFile,
    JobSource, RenderJob, CURRENT_VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn runner(backend: &Arc<MemoryBackend>, parallel: bool, workers: usize) -> BatchRunner {
    let pipeline = ExportPipeline::new(backend.clone()).with_rasterizer(Arc::new(BlockRasterizer));
    BatchRunner::new(pipeline, BatchOptions { parallel, workers })
}

fn small_template() -> JobConfig {
    JobConfig {
        duration_seconds: 1.0,
        profile: OutputProfile::Custom { width: 8, height: 8 },
        keyframes: 4,
        ..Default::default()
    }
}

fn inputs(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

fn stills(names: &[&str]) -> MemoryBackend {
    names.iter().fold(MemoryBackend::new(), |backend, name| {
        backend.with_still(*name, RasterFrame::test_pattern(12, 10))
    })
}

// ── Image batches ──────────────────────────────────────────────

#[test]
fn parallel_batch_shares_one_soundtrack() {
    let dir = tempfile::tempdir().unwrap();
    let names = ["a.jpg", "b.jpg", "c.jpg"];
    let backend = Arc::new(stills(&names).with_audio("song.mp3", tone(20.0, 1000)));
    let template = JobConfig {
        profile: OutputProfile::Custom { width: 54, height: 96 },
        audio: Some(AudioConfig::new("song.mp3")),
        ..Default::default()
    };

    let jobs = plan_batch(&template, &inputs(&names), dir.path());
    let report = runner(&backend, true, 3).run(&jobs).unwrap();
    assert!(report.is_success());
    assert_eq!(report.rendered().count(), 3);

    assert_eq!(listing(dir.path()), vec!["01_a.mp4", "02_b.mp4", "03_c.mp4"]);
    for name in ["01_a.mp4", "02_b.mp4", "03_c.mp4"] {
        let manifest = Manifest::read(&dir.path().join(name));
        assert_eq!((manifest.frames, manifest.width, manifest.height), (1440, 54, 96));
        let audio = manifest.audio.unwrap();
        assert_eq!(audio.seconds, 60.0);
        assert_eq!(audio.plan, ReconcilePlan::Loop { repeats: 3 });
    }
}

#[test]
fn unreadable_item_is_recorded_and_the_batch_continues() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(stills(&["a.png", "c.png"]));
    let jobs = plan_batch(
        &small_template(),
        &inputs(&["a.png", "missing.png", "c.png"]),
        dir.path(),
    );

    let report = runner(&backend, false, 1).run(&jobs).unwrap();
    assert_eq!(report.rendered().count(), 2);
    assert_eq!(report.skipped(), 0);
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].0.output.ends_with("02_missing.mp4"));
    assert!(matches!(failed[0].1, ShadeReelError::SourceUnreadable(_)));
    assert!(report.fatal_error().is_none());

    assert_eq!(listing(dir.path()), vec!["01_a.mp4", "03_c.mp4"]);
}

#[test]
fn encoder_failure_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let names = ["a.png", "b.png", "c.png"];
    let backend = Arc::new(stills(&names).fail_encoder_call(2));
    let jobs = plan_batch(&small_template(), &inputs(&names), dir.path());

    let report = runner(&backend, false, 1).run(&jobs).unwrap();
    assert!(matches!(report.items[0].status, BatchItemStatus::Rendered(_)));
    assert!(matches!(
        report.items[1].status,
        BatchItemStatus::Failed(ShadeReelError::EncoderFailure(_))
    ));
    assert!(matches!(report.items[2].status, BatchItemStatus::Skipped));
    assert!(matches!(report.fatal_error(), Some(ShadeReelError::EncoderFailure(_))));
    assert_eq!(backend.encoder_calls(), 2);
    assert_eq!(listing(dir.path()), vec!["01_a.mp4"]);
}

#[test]
fn duplicate_outputs_are_rejected_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(stills(&["a.png", "b.png"]));
    let job = |input: &str| {
        RenderJob::new(JobConfig {
            output: dir.path().join("same.mp4"),
            source: JobSource::Image { path: input.into() },
            ..small_template()
        })
    };

    let result = runner(&backend, true, 2).run(&[job("a.png"), job("b.png")]);
    assert!(matches!(result, Err(ShadeReelError::InvalidParameter(_))));
    assert_eq!(backend.encoder_calls(), 0);
    assert!(listing(dir.path()).is_empty());
}

// ── Job files ──────────────────────────────────────────────────

fn write_v0_list(path: &Path, configs: &[JobConfig]) {
    let data = serde_json::to_vec(configs).unwrap();
    std::fs::write(path, data).unwrap();
}

#[test]
fn bare_list_job_file_is_migrated_and_runs() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(stills(&["a.png", "b.png"]));
    let configs: Vec<JobConfig> = plan_batch(&small_template(), &inputs(&["a.png", "b.png"]), dir.path())
        .into_iter()
        .map(|job| job.config)
        .collect();
    let file_path = dir.path().join("jobs.json");
    write_v0_list(&file_path, &configs);

    let file = JobFile::load_from_file(&file_path).unwrap();
    assert_eq!(file.version, CURRENT_VERSION);
    assert_eq!(file.jobs, configs);

    let jobs: Vec<RenderJob> = file.jobs.into_iter().map(RenderJob::new).collect();
    let report = runner(&backend, false, 1).run(&jobs).unwrap();
    assert!(report.is_success());
    assert_eq!(
        listing(dir.path()),
        vec!["01_a.mp4", "02_b.mp4", "jobs.json"]
    );
}

#[test]
fn saved_job_file_reloads_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let configs: Vec<JobConfig> = plan_batch(&small_template(), &inputs(&["x.jpg"]), dir.path())
        .into_iter()
        .map(|job| job.config)
        .collect();
    let path = dir.path().join("saved.json");
    JobFile::new(configs.clone()).save_to_file(&path).unwrap();

    let loaded = JobFile::load_from_file(&path).unwrap();
    assert_eq!(loaded.version, CURRENT_VERSION);
    assert_eq!(loaded.jobs, configs);
}
