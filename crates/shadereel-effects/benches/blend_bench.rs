//! Benchmarks for cross-fades and caption compositing.
//!
//! Run with: cargo bench -p shadereel-effects

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shadereel_core::RasterFrame;
use shadereel_effects::{mix, BlockRasterizer, CaptionOverlay, FrameBlender, OverlayStyle};
use std::sync::Arc;

fn bench_blend(c: &mut Criterion) {
    let a = RasterFrame::test_pattern(1080, 1080);
    let b = RasterFrame::gradient(1080, 1080);

    c.bench_function("mix_half_1080sq", |bencher| {
        bencher.iter(|| mix(black_box(&a), black_box(&b), 0.5));
    });

    c.bench_function("blend_segment_28_steps", |bencher| {
        bencher.iter(|| {
            FrameBlender::blend(&a, &b, 28)
                .map(|seq| seq.map(|f| f.as_raw()[0] as u64).sum::<u64>())
        });
    });
}

fn bench_caption(c: &mut Criterion) {
    let frame = RasterFrame::gradient(1088, 1920);
    let floating = CaptionOverlay::new(OverlayStyle::floating(), Arc::new(BlockRasterizer));

    c.bench_function("caption_floating_vertical", |bencher| {
        bencher.iter(|| floating.overlay(black_box(frame.clone()), "Follow for more", 42, true));
    });
}

criterion_group!(benches, bench_blend, bench_caption);
criterion_main!(benches);
