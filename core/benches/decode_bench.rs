//! Benchmarks for printf record decoding and capture.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gpu_printf::{Decoder, FloatFormat, FrameId, MemoryBackend, RecordEncoder, ShaderPrintf};

/// A stream shaped like typical shader debug output: a label, an id and a vector.
fn mixed_stream(records: usize) -> Vec<u32> {
    let mut enc = RecordEncoder::new();
    for i in 0..records {
        enc.set_suffix(0)
            .text("id=")
            .uints(&[i as u32])
            .set_suffix(b'\n')
            .char(b' ')
            .floats(&[i as f32 * 0.5, -1.25, 3.0, 0.0]);
    }
    enc.finish()
}

fn bench_decode_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decode Mixed");
    let decoder = Decoder::default();

    for records in [16, 256, 4096] {
        let words = mixed_stream(records);
        group.bench_with_input(BenchmarkId::from_parameter(records), &words, |b, words| {
            b.iter(|| black_box(decoder.decode_words(black_box(words))));
        });
    }

    group.finish();
}

fn bench_decode_matrices(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decode Matrices");

    let mut enc = RecordEncoder::new();
    let values: Vec<f32> = (0..16).map(|i| i as f32 / 3.0).collect();
    for _ in 0..512 {
        enc.matrix(4, 4, &values);
    }
    let words = enc.finish();

    for pattern in ["%.3f", "%e", "%g"] {
        let format = match FloatFormat::parse(pattern) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Skipping {}: {}", pattern, e);
                continue;
            }
        };
        let decoder = Decoder::new(format, b'\n');
        group.bench_function(pattern, |b| {
            b.iter(|| black_box(decoder.decode_words(black_box(&words))));
        });
    }

    group.finish();
}

fn bench_capture_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("Capture Cycle");

    let backend = match MemoryBackend::new(64 * 1024) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Skipping capture benchmarks: {}", e);
            return;
        }
    };
    let mut printf = ShaderPrintf::init(backend, false);

    let mut enc = RecordEncoder::new();
    enc.text("frame").ints(&[1, 2, 3]).floats(&[0.25; 8]);

    let mut frame = FrameId(0);
    group.bench_function("before_produce_after", |b| {
        b.iter(|| {
            printf.capture(frame, |backend| backend.produce(&enc));
            frame = frame.next();
            black_box(printf.output().len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_mixed,
    bench_decode_matrices,
    bench_capture_cycle
);
criterion_main!(benches);
