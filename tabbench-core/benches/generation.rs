//! Dataset preparation benchmarks.
//!
//! Measures blob generation on the host, the upload of a generated dataset
//! to the host device, and parsing of the text format, for a few dataset
//! sizes around the default benchmark shape.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
#![expect(
    clippy::shadow_reuse,
    reason = "Criterion bench_with_input closures rebind parameter names"
)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use tabbench_core::{
    BlobsConfig, Dataset, DatasetError, HostDevice, make_blobs, read_dataset, write_dataset,
};

/// Seed used for all generated benchmark data.
const SEED: u64 = 42;

/// Feature columns of every benchmark dataset.
const COLS: usize = 81;

/// Row counts to benchmark.
const ROW_COUNTS: &[usize] = &[1_000, 10_001];

fn config(rows: usize) -> BlobsConfig {
    BlobsConfig {
        rows,
        cols: COLS,
        seed: SEED,
        ..BlobsConfig::default()
    }
}

fn blobs_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("make_blobs");
    group.sample_size(20);
    for &rows in ROW_COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &config(rows), |b, config| {
            b.iter(|| make_blobs(config));
        });
    }
    group.finish();
}

fn device_upload_impl(c: &mut Criterion) -> Result<(), DatasetError> {
    let mut group = c.benchmark_group("host_device_upload");
    group.sample_size(20);
    let device = HostDevice::new();
    for &rows in ROW_COUNTS {
        let host = make_blobs(&config(rows))?;
        group.bench_with_input(BenchmarkId::from_parameter(rows), &host, |b, host| {
            b.iter(|| {
                if let Ok(dataset) = Dataset::from_host(&device, host) {
                    let _released = dataset.deallocate(&device);
                }
            });
        });
    }
    group.finish();
    Ok(())
}

fn device_upload(c: &mut Criterion) {
    if let Err(err) = device_upload_impl(c) {
        panic!("host_device_upload benchmark setup failed: {err}");
    }
}

fn text_parsing_impl(c: &mut Criterion) -> Result<(), DatasetError> {
    let mut group = c.benchmark_group("read_dataset");
    group.sample_size(10);
    for &rows in ROW_COUNTS {
        let host = make_blobs(&config(rows))?;
        let mut text = Vec::new();
        write_dataset(&mut text, &host)?;
        group.bench_with_input(BenchmarkId::from_parameter(rows), &text, |b, text| {
            b.iter(|| read_dataset(text.as_slice()));
        });
    }
    group.finish();
    Ok(())
}

fn text_parsing(c: &mut Criterion) {
    if let Err(err) = text_parsing_impl(c) {
        panic!("read_dataset benchmark setup failed: {err}");
    }
}

criterion_group!(benches, blobs_generation, device_upload, text_parsing);
criterion_main!(benches);
