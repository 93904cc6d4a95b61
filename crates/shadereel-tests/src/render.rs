//! Single jobs end to end through the in-memory backend.

use crate::support::{listing, tone, Manifest, MemoryBackend};
use shadereel_audio::ReconcilePlan;
use shadereel_color::ColorGrade;
use shadereel_core::{FrameRate, GeometryFitter, RasterFrame, ResampleFilter, ShadeReelError};
use shadereel_effects::BlockRasterizer;
use shadereel_media::OutputProfile;
use shadereel_render::{
    AudioConfig, CaptionConfig, ClipTrim, ExportPipeline, JobConfig, JobSource, RenderCancel, RenderJob,
};
use shadereel_timeline::{GenerationMode, TimelineGenerator};
use std::path::Path;
use std::sync::Arc;

// ── Helpers ────────────────────────────────────────────────────

fn pipeline(backend: &Arc<MemoryBackend>) -> ExportPipeline {
    ExportPipeline::new(backend.clone()).with_rasterizer(Arc::new(BlockRasterizer))
}

fn image_job(out_dir: &Path, size: u32) -> JobConfig {
    JobConfig {
        output: out_dir.join("cat.mp4"),
        source: JobSource::Image {
            path: "in/cat.jpg".into(),
        },
        profile: OutputProfile::Custom {
            width: size,
            height: size,
        },
        ..Default::default()
    }
}

fn clip_frames(count: u8, size: u32) -> Vec<RasterFrame> {
    (0..count).map(|i| RasterFrame::filled(size, size, [i, i, i])).collect()
}

// ── Image jobs ─────────────────────────────────────────────────

#[test]
fn wide_source_renders_exact_frame_count_with_pure_end_looks() {
    let dir = tempfile::tempdir().unwrap();
    // 1920x1080 and 1080x1080 scaled down by ten.
    let source = RasterFrame::gradient(192, 108);
    let backend = Arc::new(MemoryBackend::new().with_still("in/cat.jpg", source.clone()));

    let outcome = pipeline(&backend)
        .run(&RenderJob::new(image_job(dir.path(), 108)))
        .unwrap();
    assert_eq!(outcome.frames, 1440);
    assert_eq!(outcome.audio_seconds, None);

    let manifest = Manifest::read(&dir.path().join("cat.mp4"));
    assert_eq!((manifest.frames, manifest.width, manifest.height), (1440, 108, 108));

    let fitted = GeometryFitter::new(ResampleFilter::default())
        .fit(source, 108, 108)
        .unwrap();
    let timeline = TimelineGenerator::generate(50, &GenerationMode::default()).unwrap();
    let captured = backend.capture(manifest.capture.unwrap());
    assert_eq!(captured.frames, 1440);
    assert_eq!(captured.first.unwrap(), ColorGrade::apply(&fitted, timeline.first()));
    assert_eq!(captured.last.unwrap(), ColorGrade::apply(&fitted, timeline.last()));

    assert_eq!(listing(dir.path()), vec!["cat.mp4"]);
}

#[test]
fn short_soundtrack_is_looped_with_fades() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_still("in/cat.jpg", RasterFrame::test_pattern(40, 30))
            .with_audio("song.mp3", tone(4.0, 1000)),
    );
    let mut config = image_job(dir.path(), 16);
    config.duration_seconds = 10.0;
    let mut audio = AudioConfig::new("song.mp3");
    audio.fade = true;
    config.audio = Some(audio);
    config.caption = Some(CaptionConfig::new("Follow for more", Default::default()));

    let outcome = pipeline(&backend).run(&RenderJob::new(config)).unwrap();
    assert_eq!(outcome.frames, 240);
    assert!(outcome.fades_applied);

    let audio = Manifest::read(&outcome.output).audio.unwrap();
    assert_eq!(audio.seconds, 10.0);
    assert_eq!(audio.frames, 10_000);
    assert_eq!(audio.plan, ReconcilePlan::Loop { repeats: 3 });
    assert!(audio.fades_applied);
}

#[test]
fn cancelled_job_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = RenderCancel::new();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_still("in/cat.jpg", RasterFrame::test_pattern(32, 32))
            .cancel_after(100, cancel.clone()),
    );
    let result = pipeline(&backend)
        .with_cancel(cancel)
        .run(&RenderJob::new(image_job(dir.path(), 32)));

    assert!(matches!(result, Err(ShadeReelError::Cancelled)));
    assert!(listing(dir.path()).is_empty());
}

#[test]
fn unreadable_image_fails_before_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let result = pipeline(&backend).run(&RenderJob::new(image_job(dir.path(), 16)));
    assert!(matches!(result, Err(ShadeReelError::SourceUnreadable(_))));
    assert_eq!(backend.encoder_calls(), 0);
    assert!(listing(dir.path()).is_empty());
}

#[test]
fn preview_writes_one_png_per_look() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::new().with_still("in/cat.jpg", RasterFrame::test_pattern(40, 30)));
    let mut config = image_job(dir.path(), 16);
    config.keyframes = 4;

    let written = pipeline(&backend)
        .preview(&RenderJob::new(config), &dir.path().join("looks"))
        .unwrap();
    assert_eq!(written.len(), 4);
    assert_eq!(
        listing(&dir.path().join("looks")),
        vec!["cat_look_00.png", "cat_look_01.png", "cat_look_02.png", "cat_look_03.png"]
    );
    assert_eq!(backend.encoder_calls(), 0);
}

#[test]
fn preview_stills_match_the_graded_looks() {
    let dir = tempfile::tempdir().unwrap();
    let source = RasterFrame::test_pattern(40, 30);
    let backend = Arc::new(MemoryBackend::new().with_still("in/cat.jpg", source.clone()));
    for keyframes in [2, 3, 7] {
        let mut config = image_job(dir.path(), 16);
        config.keyframes = keyframes;
        let out = dir.path().join(format!("looks_{keyframes}"));
        let written = pipeline(&backend).preview(&RenderJob::new(config), &out).unwrap();
        assert_eq!(written.len(), keyframes);

        let fitted = GeometryFitter::new(ResampleFilter::default())
            .fit(source.clone(), 16, 16)
            .unwrap();
        let timeline = TimelineGenerator::generate(keyframes, &GenerationMode::default()).unwrap();
        for (path, look) in written.iter().zip(timeline.looks()) {
            let still = shadereel_media::decode_still(path).unwrap();
            assert_eq!(still, ColorGrade::apply(&fitted, look), "{}", path.display());
        }
    }
}

// ── Slideshow, clip and loop-video jobs ────────────────────────

#[test]
fn slideshow_splits_frames_across_images() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_still("a.png", RasterFrame::filled(16, 8, [255, 0, 0]))
            .with_still("b.png", RasterFrame::filled(8, 16, [0, 255, 0]))
            .with_still("c.png", RasterFrame::filled(8, 8, [0, 0, 255])),
    );
    let config = JobConfig {
        output: dir.path().join("show.mp4"),
        source: JobSource::Slideshow {
            paths: vec!["a.png".into(), "b.png".into(), "c.png".into()],
        },
        duration_seconds: 1.0,
        frame_rate: FrameRate::new(10, 1),
        profile: OutputProfile::Custom { width: 8, height: 8 },
        ..Default::default()
    };

    let outcome = pipeline(&backend).run(&RenderJob::new(config)).unwrap();
    assert_eq!(outcome.frames, 10);
    let captured = backend.capture(Manifest::read(&outcome.output).capture.unwrap());
    assert_eq!(captured.first.unwrap().pixel(4, 4), [255, 0, 0]);
    assert_eq!(captured.last.unwrap().pixel(4, 4), [0, 0, 255]);
}

#[test]
fn slideshow_skips_unreadable_images() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_still("a.png", RasterFrame::filled(8, 8, [255, 0, 0]))
            .with_still("c.png", RasterFrame::filled(8, 8, [0, 0, 255])),
    );
    let config = JobConfig {
        output: dir.path().join("show.mp4"),
        source: JobSource::Slideshow {
            paths: vec!["a.png".into(), "missing.png".into(), "c.png".into()],
        },
        duration_seconds: 1.0,
        frame_rate: FrameRate::new(10, 1),
        profile: OutputProfile::Custom { width: 8, height: 8 },
        ..Default::default()
    };

    let outcome = pipeline(&backend).run(&RenderJob::new(config)).unwrap();
    assert_eq!(outcome.frames, 10);
    let captured = backend.capture(Manifest::read(&outcome.output).capture.unwrap());
    assert_eq!(captured.first.unwrap().pixel(4, 4), [255, 0, 0]);
    assert_eq!(captured.last.unwrap().pixel(4, 4), [0, 0, 255]);
}

#[test]
fn slideshow_with_no_readable_images_fails() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let config = JobConfig {
        output: dir.path().join("show.mp4"),
        source: JobSource::Slideshow {
            paths: vec!["gone.png".into(), "missing.png".into()],
        },
        duration_seconds: 1.0,
        profile: OutputProfile::Custom { width: 8, height: 8 },
        ..Default::default()
    };

    let result = pipeline(&backend).run(&RenderJob::new(config));
    assert!(matches!(result, Err(ShadeReelError::SourceUnreadable(_))));
    assert_eq!(backend.encoder_calls(), 0);
    assert!(listing(dir.path()).is_empty());
}

#[test]
fn trimmed_clip_keeps_its_own_audio() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_clip("clip.mp4", clip_frames(48, 16), 24.0)
            .with_audio("clip.mp4", tone(2.0, 1000)),
    );
    let config = JobConfig {
        output: dir.path().join("clip_out.mp4"),
        source: JobSource::Clip {
            path: "clip.mp4".into(),
            trim: ClipTrim::First { seconds: 1.0 },
            strip_audio: false,
        },
        profile: OutputProfile::Custom { width: 16, height: 16 },
        ..Default::default()
    };

    let outcome = pipeline(&backend).run(&RenderJob::new(config)).unwrap();
    assert_eq!(outcome.frames, 24);
    let manifest = Manifest::read(&outcome.output);
    let audio = manifest.audio.unwrap();
    assert_eq!((audio.seconds, audio.plan), (1.0, ReconcilePlan::Trim));
    let captured = backend.capture(manifest.capture.unwrap());
    assert_eq!(captured.last.unwrap().pixel(0, 0), [23, 23, 23]);
}

#[test]
fn clip_range_with_stripped_audio_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_clip("clip.mp4", clip_frames(48, 16), 24.0)
            .with_audio("clip.mp4", tone(2.0, 1000)),
    );
    let config = JobConfig {
        output: dir.path().join("clip_out.mp4"),
        source: JobSource::Clip {
            path: "clip.mp4".into(),
            trim: ClipTrim::Range { start: 0.5, end: 1.5 },
            strip_audio: true,
        },
        profile: OutputProfile::Custom { width: 16, height: 16 },
        ..Default::default()
    };

    let outcome = pipeline(&backend).run(&RenderJob::new(config)).unwrap();
    assert_eq!(outcome.frames, 24);
    let manifest = Manifest::read(&outcome.output);
    assert!(manifest.audio.is_none());
    let captured = backend.capture(manifest.capture.unwrap());
    assert_eq!(captured.first.unwrap().pixel(0, 0), [12, 12, 12]);
}

#[test]
fn loop_video_is_fitted_to_the_soundtrack() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_clip("clips/beach.mp4", clip_frames(96, 4), 24.0)
            .with_audio("song.mp3", tone(10.0, 1000)),
    );
    let mut config = JobConfig {
        output: dir.path().join("beach_with_audio.mp4"),
        source: JobSource::LoopVideo {
            path: "clips/beach.mp4".into(),
        },
        ..Default::default()
    };
    config.audio = Some(AudioConfig::new("song.mp3"));

    let outcome = pipeline(&backend).run(&RenderJob::new(config)).unwrap();
    assert_eq!(outcome.video_plan, Some(ReconcilePlan::Loop { repeats: 3 }));
    assert_eq!(outcome.audio_seconds, Some(10.0));

    let manifest = Manifest::read(&outcome.output);
    assert_eq!(manifest.video_plan, Some(ReconcilePlan::Loop { repeats: 3 }));
    assert_eq!(manifest.audio.unwrap().plan, ReconcilePlan::Trim);
    assert_eq!(listing(dir.path()), vec!["beach_with_audio.mp4"]);
}
