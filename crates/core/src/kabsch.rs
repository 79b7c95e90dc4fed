//! Weighted Kabsch superposition.
//!
//! Rotations are returned in column form: for centered mobile point `m` and
//! centered reference point `r`, the fitted rotation `R` minimizes
//! `sum_i w_i |R m_i - r_i|^2`.

use nalgebra::{Matrix3, Rotation3, SVD};

use crate::error::{FitError, FitResult};
use crate::plane::Plane;
use crate::util::distance_squared;

pub type Matrix = [[f64; 3]; 3];

pub const IDENTITY: Matrix = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Result of a weighted superposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KabschFit {
    /// Proper rotation (determinant +1) taking mobile onto reference.
    pub rotation: Matrix,
    /// Weighted RMSD after applying `rotation`.
    pub rmsd: f64,
}

/// Compute centroid of a set of 3D points.
#[inline]
pub fn compute_centroid(points: &[[f64; 3]]) -> [f64; 3] {
    if points.is_empty() {
        return [0.0; 3];
    }
    let n = points.len() as f64;
    let mut sum = [0.0; 3];
    for p in points {
        sum[0] += p[0];
        sum[1] += p[1];
        sum[2] += p[2];
    }
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

/// Optimal rotation between two matched, centered, weighted point sets.
///
/// Both sets must already be centered on their own weighted centers. When the
/// unconstrained optimum is a reflection, the axis of the smallest singular
/// value is flipped so the result is always a proper rotation.
pub fn weighted_kabsch(
    mobile_centered: &[[f64; 3]],
    ref_centered: &[[f64; 3]],
    weights: &[f64],
) -> FitResult<KabschFit> {
    let n = mobile_centered.len();
    if ref_centered.len() != n || weights.len() != n {
        return Err(FitError::IncompatibleSelections(format!(
            "cannot superpose {} mobile points onto {} reference points with {} weights",
            n,
            ref_centered.len(),
            weights.len()
        )));
    }

    let mut h = [[0.0f64; 3]; 3];
    for k in 0..n {
        let w = weights[k];
        let m = &mobile_centered[k];
        let r = &ref_centered[k];
        for i in 0..3 {
            for j in 0..3 {
                h[i][j] += w * m[i] * r[j];
            }
        }
    }

    let mat = Matrix3::new(
        h[0][0], h[0][1], h[0][2], h[1][0], h[1][1], h[1][2], h[2][0], h[2][1], h[2][2],
    );

    let svd = SVD::new(mat, true, true);
    let u = svd
        .u
        .ok_or_else(|| FitError::Numerical("SVD decomposition failed: no U matrix".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| FitError::Numerical("SVD decomposition failed: no V^T matrix".to_string()))?;
    let v = v_t.transpose();
    let mut r = v * u.transpose();

    if r.determinant() < 0.0 {
        let mut v_corrected = v;
        for i in 0..3 {
            v_corrected[(i, 2)] *= -1.0;
        }
        r = v_corrected * u.transpose();
    }

    let rotation = from_matrix3(&r);
    let rmsd = superposed_rmsd(mobile_centered, ref_centered, weights, &rotation);
    Ok(KabschFit { rotation, rmsd })
}

/// Weighted RMSD between `rotation * mobile` and `reference`.
pub fn superposed_rmsd(
    mobile_centered: &[[f64; 3]],
    ref_centered: &[[f64; 3]],
    weights: &[f64],
    rotation: &Matrix,
) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let msd: f64 = mobile_centered
        .iter()
        .zip(ref_centered)
        .zip(weights)
        .map(|((m, r), &w)| w * distance_squared(&rotate(rotation, m), r))
        .sum::<f64>()
        / total;
    msd.sqrt()
}

/// Apply a column-form rotation to a point.
#[inline(always)]
pub fn rotate(rotation: &Matrix, p: &[f64; 3]) -> [f64; 3] {
    [
        rotation[0][0] * p[0] + rotation[0][1] * p[1] + rotation[0][2] * p[2],
        rotation[1][0] * p[0] + rotation[1][1] * p[1] + rotation[1][2] * p[2],
        rotation[2][0] * p[0] + rotation[2][1] * p[1] + rotation[2][2] * p[2],
    ]
}

/// Static x-y-z Euler angles `[a, b, c]` with `R = Rz(c) * Ry(b) * Rx(a)`.
pub fn euler_from_matrix(rotation: &Matrix) -> [f64; 3] {
    if rotation[2][0].abs() >= 1.0 - 1e-12 {
        log::warn!("Euler decomposition at gimbal lock; rotation about z is folded into x");
    }
    let rot = Rotation3::from_matrix_unchecked(to_matrix3(rotation));
    let (roll, pitch, yaw) = rot.euler_angles();
    [roll, pitch, yaw]
}

/// Inverse of [`euler_from_matrix`].
pub fn euler_matrix(angles: [f64; 3]) -> Matrix {
    let rot = Rotation3::from_euler_angles(angles[0], angles[1], angles[2]);
    from_matrix3(rot.matrix())
}

/// Remove the rotation about the axis associated with `plane`.
///
/// The rotation is split into static x-y-z Euler angles, the angle at
/// `plane.axis()` is set to zero and the matrix rebuilt. This is a projection
/// after an unconstrained fit, not a constrained RMSD minimization, so the
/// result is generally not the best rotation restricted to the plane.
pub fn project_rotation(rotation: &Matrix, plane: Plane) -> Matrix {
    let mut angles = euler_from_matrix(rotation);
    angles[plane.axis()] = 0.0;
    euler_matrix(angles)
}

#[inline]
pub fn transpose(m: &Matrix) -> Matrix {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

pub fn determinant(m: &Matrix) -> f64 {
    to_matrix3(m).determinant()
}

fn to_matrix3(m: &Matrix) -> Matrix3<f64> {
    Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    )
}

fn from_matrix3(r: &Matrix3<f64>) -> Matrix {
    [
        [r[(0, 0)], r[(0, 1)], r[(0, 2)]],
        [r[(1, 0)], r[(1, 1)], r[(1, 2)]],
        [r[(2, 0)], r[(2, 1)], r[(2, 2)]],
    ]
}
