//! AES-GCM and envelope codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recordvault_bench::utils::{random_data, FAST_ITERATIONS, PAYLOAD_SIZES};
use recordvault_core::crypto::{derive, generate_salt, CipherEngine, Passcode};
use recordvault_core::{EncryptedEnvelope, StoredRecord};

/// Benchmark raw seal and open under one derived key.
fn bench_seal_open(c: &mut Criterion) {
    let key = derive(&Passcode::new("4921"), &generate_salt(), FAST_ITERATIONS).unwrap();
    let engine = CipherEngine::new(&key);

    let mut group = c.benchmark_group("aes_gcm");
    for size in PAYLOAD_SIZES {
        let data = random_data(size);
        let sealed = engine.seal(&data).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("seal", size), &data, |b, data| {
            b.iter(|| black_box(engine.seal(black_box(data)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("open", size), &sealed, |b, sealed| {
            b.iter(|| black_box(engine.open(black_box(sealed)).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark envelope serialization without the KDF.
fn bench_envelope_codec(c: &mut Criterion) {
    let passcode = Passcode::new("4921");

    let mut group = c.benchmark_group("envelope_codec");
    for size in PAYLOAD_SIZES {
        let envelope = EncryptedEnvelope::seal(&random_data(size), &passcode, FAST_ITERATIONS).unwrap();
        let record = StoredRecord::Encrypted(envelope);
        let encoded = record.encode().unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &record, |b, record| {
            b.iter(|| black_box(record.encode().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| black_box(StoredRecord::decode(black_box(encoded)).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark legacy detection on user JSON.
fn bench_legacy_detection(c: &mut Criterion) {
    let legacy = br#"{"name":"Ada","title":"Engineer","skills":["rust","crypto"]}"#;
    c.bench_function("is_legacy_format", |b| {
        b.iter(|| black_box(recordvault_core::is_legacy_format(black_box(legacy))));
    });
}

criterion_group!(benches, bench_seal_open, bench_envelope_codec, bench_legacy_detection);
criterion_main!(benches);
