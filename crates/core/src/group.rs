//! Atom groups: index sets into a frame with optional per-atom metadata.
//!
//! A group does not own coordinates. It reads them from, and writes them to,
//! whichever [`Frame`] it is applied to, so one group can serve every frame
//! of a trajectory.

use crate::error::{FitError, FitResult};
use crate::frame::Frame;
use crate::util::weighted_center;

/// Default tolerance (in mass units) when pairing atoms by mass.
pub const DEFAULT_TOL_MASS: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct AtomGroup {
    indices: Vec<usize>,
    masses: Option<Vec<f64>>,
    compounds: Option<Vec<usize>>,
}

impl AtomGroup {
    /// Group over the given frame indices, without masses or compounds.
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices,
            masses: None,
            compounds: None,
        }
    }

    /// Group over atoms `0..n_atoms`.
    pub fn all(n_atoms: usize) -> Self {
        Self::new((0..n_atoms).collect())
    }

    /// Attach per-atom masses, one per group member.
    pub fn with_masses(mut self, masses: Vec<f64>) -> FitResult<Self> {
        if masses.len() != self.indices.len() {
            return Err(FitError::MalformedInput(format!(
                "{} masses given for a group of {} atoms",
                masses.len(),
                self.indices.len()
            )));
        }
        self.masses = Some(masses);
        Ok(self)
    }

    /// Attach per-atom compound ids (fragment or residue membership).
    pub fn with_compounds(mut self, compounds: Vec<usize>) -> FitResult<Self> {
        if compounds.len() != self.indices.len() {
            return Err(FitError::MalformedInput(format!(
                "{} compound ids given for a group of {} atoms",
                compounds.len(),
                self.indices.len()
            )));
        }
        self.compounds = Some(compounds);
        Ok(self)
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Per-atom masses, or `MissingAttribute` when the group carries none.
    pub fn masses(&self) -> FitResult<&[f64]> {
        self.masses.as_deref().ok_or_else(|| {
            FitError::MissingAttribute(format!(
                "group of {} atoms has no masses",
                self.indices.len()
            ))
        })
    }

    pub fn compounds(&self) -> Option<&[usize]> {
        self.compounds.as_deref()
    }

    /// Check that every index addresses an atom of `frame`.
    pub fn check_frame(&self, frame: &Frame) -> FitResult<()> {
        let n = frame.n_atoms();
        match self.indices.iter().find(|&&idx| idx >= n) {
            Some(&idx) => Err(FitError::MalformedInput(format!(
                "atom index {} out of range for a frame of {} atoms",
                idx, n
            ))),
            None => Ok(()),
        }
    }

    /// Positions of the group members in `frame`, in group order.
    pub fn positions(&self, frame: &Frame) -> FitResult<Vec<[f64; 3]>> {
        self.check_frame(frame)?;
        Ok(self.indices.iter().map(|&i| frame.positions[i]).collect())
    }

    /// Weighted center of the group in `frame`.
    pub fn center(&self, frame: &Frame, weights: &[f64]) -> FitResult<[f64; 3]> {
        weighted_center(&self.positions(frame)?, weights)
    }

    pub fn center_of_geometry(&self, frame: &Frame) -> FitResult<[f64; 3]> {
        let uniform = vec![1.0; self.indices.len()];
        self.center(frame, &uniform)
    }

    pub fn center_of_mass(&self, frame: &Frame) -> FitResult<[f64; 3]> {
        let masses = self.masses()?;
        self.center(frame, masses)
    }
}

/// Convert signed ids (indices or compound ids) to `usize`.
///
/// Negative entries are rejected with `InvalidArgument`.
pub fn unsigned_ids(values: &[i64], what: &str) -> FitResult<Vec<usize>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            usize::try_from(x).map_err(|_| {
                FitError::InvalidArgument(format!("{} {} cannot be negative: {}", what, i, x))
            })
        })
        .collect()
}

/// Pair reference and mobile atoms one to one.
///
/// Both groups must have the same number of atoms. When both carry masses,
/// each pair has to agree within `tol_mass`; this catches selections that have
/// the right size but pick different atoms.
pub fn match_atoms(reference: &AtomGroup, mobile: &AtomGroup, tol_mass: f64) -> FitResult<()> {
    if reference.n_atoms() != mobile.n_atoms() {
        return Err(FitError::IncompatibleSelections(format!(
            "reference has {} atoms, mobile has {}",
            reference.n_atoms(),
            mobile.n_atoms()
        )));
    }
    if let (Some(ref_masses), Some(mob_masses)) = (&reference.masses, &mobile.masses) {
        let mismatch = ref_masses
            .iter()
            .zip(mob_masses)
            .position(|(a, b)| (a - b).abs() > tol_mass);
        if let Some(k) = mismatch {
            return Err(FitError::IncompatibleSelections(format!(
                "mass mismatch at pair {}: reference atom {} ({}) vs mobile atom {} ({}), tolerance {}",
                k, reference.indices[k], ref_masses[k], mobile.indices[k], mob_masses[k], tol_mass
            )));
        }
    }
    Ok(())
}
