use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use reactive_video::audio::{analyze, BandExtractor};
use reactive_video::effects::{
    EffectId, EffectPipeline, FrameIntensitySnapshot, ReactivityConfig, SmoothingState,
};
use reactive_video::graphics::Renderer;
use std::f32::consts::PI;
use std::sync::Arc;

const SAMPLE_RATE: f32 = 44100.0;

fn track(seconds: f32) -> Vec<f32> {
    (0..(seconds * SAMPLE_RATE) as usize)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE;
            0.5 * (2.0 * PI * 90.0 * t).sin() + 0.2 * (2.0 * PI * 2500.0 * t).sin()
        })
        .collect()
}

fn frame() -> RgbImage {
    RgbImage::from_fn(320, 180, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
}

fn bench_analysis(c: &mut Criterion) {
    let samples = track(10.0);
    c.bench_function("extract_bands_10s", |b| {
        b.iter(|| BandExtractor::default().extract(black_box(&samples), SAMPLE_RATE))
    });
}

fn bench_mixer(c: &mut Criterion) {
    let analysis = Arc::new(analyze(&track(10.0), SAMPLE_RATE).expect("analysis"));
    let renderer = Renderer::new(analysis, 30.0).expect("renderer");
    let mut config = ReactivityConfig::default();
    config.enable_all();

    c.bench_function("mix_300_frames", |b| {
        b.iter(|| {
            let mut state = SmoothingState::new();
            for index in 0..300 {
                black_box(renderer.intensities(index, &config, &mut state));
            }
        })
    });
}

fn bench_effects(c: &mut Criterion) {
    let input = frame();
    let mut config = ReactivityConfig::default();
    config.enable_all();
    let pipeline = EffectPipeline::new();

    let mut group = c.benchmark_group("effect_320x180");
    for effect in EffectId::ALL {
        let mut snapshot = FrameIntensitySnapshot::idle(0, 0.0);
        snapshot.set(effect, 0.8);
        group.bench_function(effect.name(), |b| {
            b.iter(|| pipeline.apply(black_box(&input), &snapshot, &config))
        });
    }
    group.finish();

    let mut everything = FrameIntensitySnapshot::idle(0, 0.0);
    for effect in EffectId::ALL {
        everything.set(effect, 0.6);
    }
    c.bench_function("all_effects_320x180", |b| {
        b.iter(|| pipeline.apply(black_box(&input), &everything, &config))
    });
}

criterion_group!(benches, bench_analysis, bench_mixer, bench_effects);
criterion_main!(benches);
