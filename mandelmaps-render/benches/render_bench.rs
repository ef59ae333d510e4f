use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use mandelmaps_core::{FractalKernel, ViewportState};
use mandelmaps_render::{
    ColorMapper, CosineRamp, NullObserver, PixelBuffer, ProgressiveBlockScheduler,
    RenderCoordinator, RenderSettings, Section,
};

fn classic(width: u32, height: u32) -> ViewportState {
    ViewportState::home(FractalKernel::Mandelbrot, width, height).unwrap()
}

fn bench_full_frame_render(c: &mut Criterion) {
    let viewport = classic(640, 480);
    let mut coordinator =
        RenderCoordinator::new(640, 480, RenderSettings::default(), Arc::new(NullObserver)).unwrap();

    c.bench_function("full_frame_640x480_2_workers", |b| {
        b.iter(|| {
            coordinator.buffer().invalidate();
            coordinator.start(viewport, false).unwrap().wait()
        });
    });
}

fn bench_single_section(c: &mut Criterion) {
    let viewport = ViewportState::new(-0.75, 0.1, 5e-4, 256, 256, 1000, FractalKernel::Mandelbrot)
        .unwrap();
    let scheduler = ProgressiveBlockScheduler::new(&[16, 8, 4, 2, 1], Section::All, &viewport);
    let buffer = PixelBuffer::new(256, 256);
    let mapper = CosineRamp::MANDELBROT;

    c.bench_function("progressive_256x256_1000iter", |b| {
        b.iter(|| {
            buffer.invalidate();
            for &block_size in scheduler.passes() {
                for row in scheduler.block_rows(block_size) {
                    scheduler.render_row(row, &viewport, &mapper, &buffer);
                }
            }
        });
    });
}

fn bench_pan(c: &mut Criterion) {
    let viewport = classic(640, 480);
    let mut coordinator =
        RenderCoordinator::new(640, 480, RenderSettings::default(), Arc::new(NullObserver)).unwrap();
    coordinator.start(viewport, false).unwrap().wait();

    let mut step = 0;
    c.bench_function("pan_640x480_by_8px", |b| {
        b.iter(|| {
            step += 1;
            let d = if step % 2 == 0 { 8 } else { -8 };
            coordinator.pan(d, d, false).unwrap().wait()
        });
    });
}

fn bench_color_mapping(c: &mut Criterion) {
    let mapper = CosineRamp::MANDELBROT;
    c.bench_function("cosine_ramp_100k", |b| {
        b.iter(|| (0..100_000u32).fold(0u32, |acc, it| acc ^ mapper.color(it % 1000, 1000)));
    });
}

criterion_group!(
    benches,
    bench_full_frame_render,
    bench_single_section,
    bench_pan,
    bench_color_mapping
);
criterion_main!(benches);
