//! This bench splits a generated document of anonymous, interlinked
//! requirements into a fresh fragment directory.

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use perky::{engine, FragmentStore, IdFactory};
use tempfile::TempDir;

/// Generates a document with one anonymous requirement per section, each
/// refining the one before.
fn document(size: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for i in 0..size {
        lines.push(format!("Section {i}"));
        lines.push("==========".to_string());
        lines.push(String::new());
        lines.push("PRK-REQ".to_string());
        if i > 0 {
            lines.push(format!("PRK-REF SEED-{}", i - 1));
        }
        lines.push(format!("The system shall handle case number {i}."));
        lines.push(format!("PRK-TAG owner team-{}", i % 7));
        lines.push("-- PRK-REQ".to_string());
        lines.push(String::new());
    }
    lines.push("PRK-MTX".to_string());
    lines
}

fn split_document(c: &mut Criterion) {
    let lines = document(200);

    c.bench_function("split document", |b| {
        b.iter_batched(
            || TempDir::new().unwrap(),
            |tmp_dir| {
                let store = FragmentStore::new(
                    tmp_dir.path().to_path_buf(),
                    "prk",
                    perky::domain::StorageMode::File,
                );
                let mut factory = IdFactory::default();
                let preprocessed = engine::preprocess(&lines, &mut factory);
                engine::split(&lines, &mut factory, &preprocessed, &store, &mut std::io::sink())
                    .unwrap();
                tmp_dir
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, split_document);
criterion_main!(benches);
