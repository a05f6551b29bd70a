//! Benchmarks for the notation parser, mixer render loop, and a full
//! scheduler batch pass.
//!
//! Run with: cargo bench
//!
//! The mixer render must complete well within real-time deadlines at
//! 48kHz (512 samples = 10.67ms); the others run off the audio thread
//! but should stay comfortably sub-millisecond.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use serpentone::dsp::{AmpShape, Waveform};
use serpentone::graph::mixer::{Mixer, MixerCommand};
use serpentone::graph::mock::MockBackend;
use serpentone::graph::AudioGraph;
use serpentone::melody::{parser, MelodyCatalog};
use serpentone::scheduler::PlaybackScheduler;
use serpentone::voice::{Bus, VoiceSpec};

const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("melody/parse");

    let score = MelodyCatalog::standard()
        .get("ode-to-joy")
        .map(|m| {
            // Rebuild a notation string of comparable size to the
            // shipped scores.
            m.events
                .iter()
                .map(|_| "0.5:E4 ")
                .collect::<String>()
        })
        .unwrap_or_default();

    group.bench_function("catalog_sized_score", |b| {
        b.iter(|| parser::parse(black_box(&score)))
    });
    group.bench_function("chords_and_comments", |b| {
        b.iter(|| {
            parser::parse(black_box(
                "// refrain\n1:C4+E4+G4 0.5:REST 0.5:F4 // turn\n2:G3+B3+D4",
            ))
        })
    });
    group.finish();
}

fn bench_mixer_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/render");

    for &size in BLOCK_SIZES {
        let mut mixer = Mixer::new(48_000.0);
        // A worst-ish case: eight overlapping blended voices.
        for i in 0..8 {
            mixer.apply(MixerCommand::Spawn(VoiceSpec {
                bus: Bus::Melody,
                frequency: 220.0 + i as f32 * 55.0,
                glide: None,
                start: 0.0,
                duration: 3_600.0,
                peak: 0.1,
                waveform: Waveform::Triangle,
                blend: Some(Waveform::Square),
                shape: AmpShape::Note,
            }));
        }
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("eight_voices", size), &size, |b, _| {
            b.iter(|| mixer.render(black_box(&mut buffer)))
        });
    }
    group.finish();
}

fn bench_scheduler_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler/batch");

    group.bench_function("start_one_batch", |b| {
        b.iter(|| {
            let mut scheduler = PlaybackScheduler::with_seed(MelodyCatalog::standard(), 7);
            let (backend, _handle) = MockBackend::new();
            let mut graph = AudioGraph::new(Box::new(backend));
            graph.request_resume();
            black_box(scheduler.start(&mut graph))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_parser, bench_mixer_render, bench_scheduler_batch);
criterion_main!(benches);
