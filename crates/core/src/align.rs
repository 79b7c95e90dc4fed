//! Full RMSD superposition of a mobile group onto a fixed reference.

use crate::error::{FitError, FitResult};
use crate::frame::Frame;
use crate::group::AtomGroup;
use crate::kabsch::{rotate, weighted_kabsch};
use crate::transform::Transformation;
use crate::util::{centered, weighted_center, weighted_rmsd};
use crate::weights::{resolve_weights, WeightSpec};

/// Reference coordinates captured once from a reference structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSnapshot {
    positions: Vec<[f64; 3]>,
}

impl ReferenceSnapshot {
    /// Copy the positions of `group` out of `frame`.
    pub fn capture(group: &AtomGroup, frame: &Frame) -> FitResult<Self> {
        Ok(Self {
            positions: group.positions(frame)?,
        })
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    pub fn n_atoms(&self) -> usize {
        self.positions.len()
    }
}

/// Superpose `mobile` onto `reference` and move the whole frame with it.
///
/// The fit uses only the mobile group; the resulting rotation and translation
/// are applied to every atom of `frame`. Returns the weighted RMSD before and
/// after the superposition; the "before" value is taken with both groups
/// already moved to their weighted centers, so it measures the rotational
/// misfit only.
pub fn alignto(
    mobile: &AtomGroup,
    frame: &mut Frame,
    reference: &ReferenceSnapshot,
    weights: &[f64],
) -> FitResult<(f64, f64)> {
    if mobile.n_atoms() != reference.n_atoms() {
        return Err(FitError::IncompatibleSelections(format!(
            "mobile has {} atoms, reference has {}",
            mobile.n_atoms(),
            reference.n_atoms()
        )));
    }

    let mobile_pos = mobile.positions(frame)?;
    let mobile_center = weighted_center(&mobile_pos, weights)?;
    let ref_center = weighted_center(reference.positions(), weights)?;
    let mobile_centered = centered(&mobile_pos, &mobile_center);
    let ref_centered = centered(reference.positions(), &ref_center);
    let old_rmsd = weighted_rmsd(&mobile_centered, &ref_centered, weights);
    let fit = weighted_kabsch(&mobile_centered, &ref_centered, weights)?;

    for p in frame.positions.iter_mut() {
        let shifted = [
            p[0] - mobile_center[0],
            p[1] - mobile_center[1],
            p[2] - mobile_center[2],
        ];
        let r = rotate(&fit.rotation, &shifted);
        *p = [
            r[0] + ref_center[0],
            r[1] + ref_center[1],
            r[2] + ref_center[2],
        ];
    }

    log::trace!(
        "frame {}: aligned {} atoms, rmsd {:.4} -> {:.4}",
        frame.index,
        mobile.n_atoms(),
        old_rmsd,
        fit.rmsd
    );
    Ok((old_rmsd, fit.rmsd))
}

/// Per-frame transformation that runs [`alignto`] against a fixed reference.
#[derive(Debug, Clone)]
pub struct Aligner {
    mobile: AtomGroup,
    reference: ReferenceSnapshot,
    weights: Vec<f64>,
}

impl Aligner {
    /// Capture the reference and resolve weights against the mobile group.
    ///
    /// Unequal atom counts are not rejected here; they surface when the
    /// aligner is applied.
    pub fn new(
        mobile: &AtomGroup,
        reference: &AtomGroup,
        reference_frame: &Frame,
        weights: &WeightSpec,
    ) -> FitResult<Self> {
        let weights = resolve_weights(mobile, weights)?;
        let reference = ReferenceSnapshot::capture(reference, reference_frame)?;
        log::debug!(
            "Aligner: {} mobile atoms onto {} reference atoms",
            mobile.n_atoms(),
            reference.n_atoms()
        );
        Ok(Self {
            mobile: mobile.clone(),
            reference,
            weights,
        })
    }
}

impl Transformation for Aligner {
    fn apply<'a>(&self, frame: &'a mut Frame) -> FitResult<&'a mut Frame> {
        alignto(&self.mobile, frame, &self.reference, &self.weights)?;
        Ok(frame)
    }
}

/// Build an [`Aligner`] from any weight option.
///
/// Explicit weights are taken per mobile atom.
pub fn align_to(
    mobile: &AtomGroup,
    reference: &AtomGroup,
    reference_frame: &Frame,
    weights: impl Into<WeightSpec>,
) -> FitResult<Aligner> {
    Aligner::new(mobile, reference, reference_frame, &weights.into())
}
