//! Unit tests for the blob generator.

use super::{BlobsConfig, generate_blobs, make_blobs};
use crate::device::{Device, DeviceBuffer, HostDevice};
use crate::error::{BlobsError, DatasetError, DeviceError};
use rstest::{fixture, rstest};

#[fixture]
fn small_config() -> BlobsConfig {
    BlobsConfig {
        rows: 120,
        cols: 4,
        clusters: 3,
        cluster_std: 0.5,
        seed: 11,
        ..BlobsConfig::default()
    }
}

#[rstest]
fn default_config_matches_documented_defaults() {
    let config = BlobsConfig::default();
    assert_eq!(config.rows, 10_001);
    assert_eq!(config.cols, 81);
    assert_eq!(config.clusters, 2);
    assert!(!config.shuffle);
    assert_eq!(config.seed, 1234);
}

#[rstest]
#[case::even(12, 3, vec![4, 4, 4])]
#[case::remainder(11, 3, vec![4, 4, 3])]
#[case::one_per_cluster(4, 4, vec![1, 1, 1, 1])]
fn rows_are_spread_across_clusters(
    #[case] rows: usize,
    #[case] clusters: usize,
    #[case] expected: Vec<usize>,
) {
    let dataset = make_blobs(&BlobsConfig {
        rows,
        cols: 2,
        clusters,
        ..BlobsConfig::default()
    })
    .expect("generation must succeed");
    assert_eq!(dataset.class_counts(), expected);
    assert_eq!(dataset.classes(), clusters);
    assert_eq!(dataset.features().len(), rows * 2);
}

#[rstest]
fn unshuffled_rows_are_grouped_by_label(small_config: BlobsConfig) {
    let dataset = make_blobs(&small_config).expect("generation must succeed");
    assert!(dataset.labels().windows(2).all(|pair| pair[0] <= pair[1]));
}

#[rstest]
fn generation_is_deterministic(small_config: BlobsConfig) {
    let left = make_blobs(&small_config).expect("first generation must succeed");
    let right = make_blobs(&small_config).expect("second generation must succeed");
    assert_eq!(left, right);
}

#[rstest]
fn shuffled_generation_is_deterministic(small_config: BlobsConfig) {
    let shuffled = BlobsConfig {
        shuffle: true,
        ..small_config
    };
    let left = make_blobs(&shuffled).expect("first generation must succeed");
    let right = make_blobs(&shuffled).expect("second generation must succeed");
    assert_eq!(left, right);

    let reseeded = make_blobs(&BlobsConfig {
        seed: 12,
        ..shuffled
    })
    .expect("reseeded generation must succeed");
    assert_eq!(left.class_counts(), reseeded.class_counts());
    assert_ne!(left.labels(), reseeded.labels());
}

#[rstest]
fn different_seeds_produce_different_data(small_config: BlobsConfig) {
    let left = make_blobs(&small_config).expect("first generation must succeed");
    let right = make_blobs(&BlobsConfig {
        seed: 12,
        ..small_config
    })
    .expect("second generation must succeed");
    assert_ne!(left.features(), right.features());
}

#[rstest]
fn shuffle_permutes_rows_without_changing_counts(small_config: BlobsConfig) {
    let ordered = make_blobs(&small_config).expect("generation must succeed");
    let shuffled = make_blobs(&BlobsConfig {
        shuffle: true,
        ..small_config
    })
    .expect("generation must succeed");

    assert_eq!(ordered.class_counts(), shuffled.class_counts());
    assert_ne!(ordered.labels(), shuffled.labels());
    assert!(!shuffled.labels().windows(2).all(|pair| pair[0] <= pair[1]));
}

#[rstest]
#[expect(
    clippy::float_arithmetic,
    reason = "distance to the cluster mean requires floating-point arithmetic"
)]
fn zero_std_collapses_each_cluster_onto_its_center(small_config: BlobsConfig) {
    let dataset = make_blobs(&BlobsConfig {
        cluster_std: 0.0,
        ..small_config
    })
    .expect("generation must succeed");
    let first = dataset.row(0).expect("row 0 exists");
    let second = dataset.row(1).expect("row 1 exists");
    assert_eq!(first, second);
    assert!(
        first.iter().all(|v| (-10.0..10.0).contains(v)),
        "centers must fall inside the default box"
    );
    let last = dataset.row(119).expect("row 119 exists");
    assert!(first.iter().zip(last).any(|(a, b)| (a - b).abs() > f32::EPSILON));
}

#[rstest]
#[case::zero_rows(BlobsConfig { rows: 0, ..BlobsConfig::default() }, BlobsError::ZeroRows)]
#[case::zero_cols(BlobsConfig { cols: 0, ..BlobsConfig::default() }, BlobsError::ZeroCols)]
#[case::zero_clusters(
    BlobsConfig { clusters: 0, ..BlobsConfig::default() },
    BlobsError::ZeroClusters
)]
#[case::too_many_clusters(
    BlobsConfig { rows: 2, clusters: 3, ..BlobsConfig::default() },
    BlobsError::ClusterCountExceedsRowCount { clusters: 3, rows: 2 }
)]
#[case::negative_std(
    BlobsConfig { cluster_std: -1.0, ..BlobsConfig::default() },
    BlobsError::InvalidClusterStd { value: -1.0 }
)]
#[case::empty_box(
    BlobsConfig { center_box_min: 1.0, center_box_max: 1.0, ..BlobsConfig::default() },
    BlobsError::InvalidCenterBox { min: 1.0, max: 1.0 }
)]
#[case::overflowing_box_width(
    BlobsConfig { center_box_min: -3.0e38, center_box_max: 3.0e38, ..BlobsConfig::default() },
    BlobsError::InvalidCenterBox { min: -3.0e38, max: 3.0e38 }
)]
#[case::unaddressable_features(
    BlobsConfig { rows: 1 << 62, cols: 1, clusters: 1, ..BlobsConfig::default() },
    BlobsError::SizeOverflow { rows: 1 << 62, cols: 1 }
)]
fn invalid_configs_are_rejected(#[case] config: BlobsConfig, #[case] expected: BlobsError) {
    assert_eq!(config.validate(), Err(expected.clone()));
    let err = make_blobs(&config).expect_err("invalid config must fail");
    assert_eq!(err, expected);
}

#[rstest]
fn non_finite_std_is_rejected() {
    let err = BlobsConfig {
        cluster_std: f32::NAN,
        ..BlobsConfig::default()
    }
    .validate()
    .expect_err("NaN std must fail");
    assert!(matches!(err, BlobsError::InvalidClusterStd { .. }));
}

#[rstest]
fn generate_blobs_places_the_dataset_on_the_device(small_config: BlobsConfig) {
    let device = HostDevice::new();
    let dataset = generate_blobs(&device, &small_config).expect("generation must succeed");
    assert_eq!(dataset.rows(), 120);
    assert_eq!(dataset.cols(), 4);
    assert_eq!(dataset.classes(), 3);
    assert_eq!(device.memory_stats().live_allocations, 2);
    assert_eq!(device.memory_stats().peak_bytes, 120 * 4 * 4 + 120 * 4);
    assert_eq!(dataset.features().len(), 480);

    let host = dataset.to_host(&device).expect("download must succeed");
    let expected = make_blobs(&small_config).expect("generation must succeed");
    assert_eq!(host, expected);
    dataset.deallocate(&device).expect("release must succeed");
    assert_eq!(device.memory_stats().live_allocations, 0);
}

#[rstest]
fn generate_blobs_reports_device_exhaustion(small_config: BlobsConfig) {
    let device = HostDevice::with_limit(16);
    let err = generate_blobs(&device, &small_config).expect_err("limit must be enforced");
    assert!(matches!(err, DatasetError::Device { device: ref name, .. } if name == "host"));
    assert_eq!(device.name(), "host");
}

#[rstest]
fn device_limits_are_checked_before_generation() {
    // 4 TiB of features: far beyond the limit, but addressable.
    let config = BlobsConfig {
        rows: 1 << 40,
        cols: 1,
        clusters: 1,
        ..BlobsConfig::default()
    };
    let device = HostDevice::with_limit(1024);
    let err = generate_blobs(&device, &config).expect_err("limit must be enforced");
    assert!(matches!(
        err,
        DatasetError::Device {
            error: DeviceError::OutOfMemory { .. },
            ..
        }
    ));
    assert_eq!(device.memory_stats().live_allocations, 0);
    assert_eq!(device.memory_stats().peak_bytes, 0);
}

#[rstest]
fn invalid_configs_allocate_nothing() {
    let device = HostDevice::new();
    let err = generate_blobs(
        &device,
        &BlobsConfig {
            clusters: 0,
            ..BlobsConfig::default()
        },
    )
    .expect_err("zero clusters must fail");
    assert!(matches!(err, DatasetError::Blobs(BlobsError::ZeroClusters)));
    assert_eq!(device.memory_stats().peak_bytes, 0);
}
