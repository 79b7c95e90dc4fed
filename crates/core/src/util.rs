//! Common utility functions shared across modules.

use crate::error::{FitError, FitResult};

/// Compute squared distance between two 3D points.
#[inline(always)]
pub fn distance_squared(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
    let dx = p1[0] - p2[0];
    let dy = p1[1] - p2[1];
    let dz = p1[2] - p2[2];
    dx * dx + dy * dy + dz * dz
}

/// Weighted arithmetic mean of a set of points.
///
/// Fails when the weights do not sum to a positive value, so a degenerate
/// weighting never yields a NaN center.
pub fn weighted_center(points: &[[f64; 3]], weights: &[f64]) -> FitResult<[f64; 3]> {
    if points.len() != weights.len() {
        return Err(FitError::InvalidWeights(format!(
            "{} weights given for {} points",
            weights.len(),
            points.len()
        )));
    }
    let mut sum = [0.0f64; 3];
    let mut total = 0.0f64;
    for (p, &w) in points.iter().zip(weights) {
        sum[0] += p[0] * w;
        sum[1] += p[1] * w;
        sum[2] += p[2] * w;
        total += w;
    }
    if total.is_nan() || total <= 0.0 {
        return Err(FitError::InvalidWeights(format!(
            "weights must sum to a positive value, got {}",
            total
        )));
    }
    Ok([sum[0] / total, sum[1] / total, sum[2] / total])
}

/// Subtract `center` from every point.
#[inline]
pub fn centered(points: &[[f64; 3]], center: &[f64; 3]) -> Vec<[f64; 3]> {
    points
        .iter()
        .map(|p| [p[0] - center[0], p[1] - center[1], p[2] - center[2]])
        .collect()
}

/// Weighted RMSD between two matched point sets without any superposition.
pub fn weighted_rmsd(a: &[[f64; 3]], b: &[[f64; 3]], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let msd: f64 = a
        .iter()
        .zip(b)
        .zip(weights)
        .map(|((p, q), &w)| w * distance_squared(p, q))
        .sum::<f64>()
        / total;
    msd.sqrt()
}
