use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wavetable_synth::{AudioSource, Oscillator, WavetableFactory, WavetableKind};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut factory = WavetableFactory::new();

    c.bench_function("Oscillator::render(256)", |b| {
        let osc = Oscillator::new(factory.get_wave_table(WavetableKind::Saw));
        osc.set_frequency(440.0);
        let mut output = [0.0f32; 256];

        b.iter(|| osc.render(black_box(&mut output), 256))
    });

    c.bench_function("Oscillator::render_interleaved(256 x 2)", |b| {
        let osc = Oscillator::new(factory.get_wave_table(WavetableKind::Square));
        osc.set_frequency(440.0);
        let mut output = [0.0f32; 512];

        b.iter(|| osc.render_interleaved(black_box(&mut output), 2))
    });

    c.bench_function("WavetableFactory cold build", |b| {
        b.iter(|| {
            let mut factory = WavetableFactory::new();
            factory.preload();
            black_box(factory.generation_count())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
