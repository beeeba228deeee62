//! Benchmarks for loading sessions and flattening schemas
//!
//! Covers the full load pipeline (read, parse, validate, deserialize) and
//! descriptor flattening for CLI registration.

use clap::Command;
use confbind::{cli, demo::SimulationConfig, ConfigSession};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::PathBuf;
use tempfile::TempDir;

/// Write a sample document with `author_len` characters in its author field
fn create_sample_file(dir: &TempDir, author_len: usize) -> PathBuf {
    let mut session = ConfigSession::<SimulationConfig>::new();
    session.get_mut().author = "x".repeat(author_len);
    session.get_mut().physics.flags = [1, 2, 3];

    let path = dir.path().join(format!("sample_{author_len}.toml"));
    session.save(&path).expect("Failed to write benchmark config");
    path
}

fn bench_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut group = c.benchmark_group("session_load");

    for size in [16, 1024, 65536] {
        let path = create_sample_file(&dir, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &path, |b, path| {
            b.iter(|| {
                let mut session = ConfigSession::<SimulationConfig>::new();
                session.load(black_box(path)).expect("load failed");
                black_box(session.into_inner())
            })
        });
    }

    group.finish();
}

fn bench_flatten(c: &mut Criterion) {
    let session = ConfigSession::<SimulationConfig>::new();

    c.bench_function("flatten_schema", |b| {
        b.iter(|| black_box(cli::flatten(black_box(session.schema()), "")))
    });

    c.bench_function("register_as_cli", |b| {
        b.iter(|| black_box(cli::register_as_cli(&session, Command::new("bench"))))
    });
}

criterion_group!(benches, bench_load, bench_flatten);
criterion_main!(benches);
