//! Random sampling helpers for the blob generator.

use std::f32::consts::PI;

use rand::{Rng, rngs::SmallRng};

use super::BlobsConfig;

/// Draws `clusters * cols` center coordinates uniformly from the center box.
pub(super) fn sample_centers(config: &BlobsConfig, rng: &mut SmallRng) -> Vec<f32> {
    let len = config.clusters.saturating_mul(config.cols);
    (0..len)
        .map(|_| rng.gen_range(config.center_box_min..config.center_box_max))
        .collect()
}

/// Draws one standard normal sample with the Box-Muller transform.
///
/// `u1` is clamped to at least `f32::EPSILON`, which bounds the radius by
/// `sqrt(-2 ln EPSILON)`, so every sample is finite.
#[expect(
    clippy::float_arithmetic,
    reason = "Box-Muller transform requires floating-point arithmetic"
)]
pub(super) fn standard_normal_sample(rng: &mut SmallRng) -> f32 {
    let mut u1 = rng.gen_range(0.0_f32..1.0_f32);
    if u1 <= f32::EPSILON {
        u1 = f32::EPSILON;
    }
    let u2 = rng.gen_range(0.0_f32..1.0_f32);
    let radius = (-2.0_f32 * u1.ln()).sqrt();
    let theta = 2.0_f32 * PI * u2;
    radius * theta.cos()
}
