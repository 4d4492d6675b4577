//! Benchmarks for per-file compression and end-to-end slice creation.
//!
//! Measures throughput across codecs and directory shapes, mirroring
//! the creation benchmarks this engine's teacher corpus ships.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use sliceback_core::ArchiveRunBuilder;
use sliceback_core::cancellation::CancellationToken;
use sliceback_core::collaborators::NoopSink;
use sliceback_core::compressor::compress;
use sliceback_core::config::Codec;
use sliceback_core::config::Target;
use std::fs;
use std::hint::black_box;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn populate_tree(root: &Path, files: usize, bytes_per_file: usize) {
    let payload = vec![b'x'; bytes_per_file];
    for i in 0..files {
        fs::write(root.join(format!("file-{i}.dat")), &payload).unwrap();
    }
}

fn bench_compress_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_one_file");
    let payload = vec![b'a'; 1024 * 1024];
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for codec in [Codec::None, Codec::Gzip, Codec::Bzip2] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{codec:?}")), &codec, |b, &codec| {
            b.iter(|| {
                let mut src = Cursor::new(&payload);
                let mut dst = Vec::new();
                let cancel = CancellationToken::new();
                compress(codec, &mut src, &mut dst, &cancel).unwrap();
                black_box(dst.len())
            });
        });
    }
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_run");

    for &(files, bytes_per_file) in &[(10usize, 4096usize), (100, 4096), (10, 1024 * 1024)] {
        let total_bytes = (files * bytes_per_file) as u64;
        group.throughput(Throughput::Bytes(total_bytes));
        group.bench_with_input(
            BenchmarkId::new("uncompressed", format!("{files}x{bytes_per_file}")),
            &(files, bytes_per_file),
            |b, &(files, bytes_per_file)| {
                b.iter_batched(
                    || {
                        let src = TempDir::new().unwrap();
                        populate_tree(src.path(), files, bytes_per_file);
                        let dst = TempDir::new().unwrap();
                        (src, dst)
                    },
                    |(src, dst)| {
                        let report = ArchiveRunBuilder::new(Target::Local(dst.path().to_path_buf()))
                            .include(src.path())
                            .run(&mut NoopSink)
                            .unwrap();
                        black_box(report.total_bytes)
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_compress_codecs, bench_full_run);
criterion_main!(benches);
