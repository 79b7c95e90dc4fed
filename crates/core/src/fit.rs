//! Fitting transformations: remove translation, or translation and rotation,
//! of a mobile group relative to a reference structure.
//!
//! Both fitters compute their reference data once at construction and then
//! work frame by frame. The fit is computed on the mobile group only; the
//! resulting motion is applied to every atom of the frame.

use crate::error::FitResult;
use crate::frame::Frame;
use crate::group::{match_atoms, AtomGroup, DEFAULT_TOL_MASS};
use crate::kabsch::{project_rotation, rotate, superposed_rmsd, weighted_kabsch, Matrix};
use crate::plane::Plane;
use crate::transform::Transformation;
use crate::util::{centered, weighted_center};
use crate::weights::{resolve_weights, CenterOf, WeightSpec};

/// Options for [`TranslationFitter`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TranslationFitConfig {
    /// Restrict the correction to a plane; the normal component is kept.
    pub plane: Option<Plane>,
    pub center_of: CenterOf,
}

/// Shifts each frame so the mobile group's center matches the reference center.
#[derive(Debug, Clone)]
pub struct TranslationFitter {
    mobile: AtomGroup,
    weights: Vec<f64>,
    ref_center: [f64; 3],
    plane: Option<Plane>,
}

impl TranslationFitter {
    pub fn new(
        mobile: &AtomGroup,
        reference: &AtomGroup,
        reference_frame: &Frame,
        config: TranslationFitConfig,
    ) -> FitResult<Self> {
        let spec = config.center_of.weight_spec();
        let ref_weights = resolve_weights(reference, &spec)?;
        let weights = resolve_weights(mobile, &spec)?;
        let ref_center = reference.center(reference_frame, &ref_weights)?;

        log::debug!(
            "TranslationFitter: reference center {:?} ({:?}), plane {:?}",
            ref_center,
            config.center_of,
            config.plane
        );
        Ok(Self {
            mobile: mobile.clone(),
            weights,
            ref_center,
            plane: config.plane,
        })
    }

    pub fn reference_center(&self) -> [f64; 3] {
        self.ref_center
    }

    /// Displacement that would be added to every position of `frame`.
    pub fn displacement(&self, frame: &Frame) -> FitResult<[f64; 3]> {
        let center = self.mobile.center(frame, &self.weights)?;
        let mut vector = [
            self.ref_center[0] - center[0],
            self.ref_center[1] - center[1],
            self.ref_center[2] - center[2],
        ];
        if let Some(plane) = self.plane {
            vector[plane.axis()] = 0.0;
        }
        Ok(vector)
    }
}

impl Transformation for TranslationFitter {
    fn apply<'a>(&self, frame: &'a mut Frame) -> FitResult<&'a mut Frame> {
        let vector = self.displacement(frame)?;
        log::trace!("frame {}: translate by {:?}", frame.index, vector);
        frame.translate(&vector);
        Ok(frame)
    }
}

/// String-keyed constructor for [`TranslationFitter`].
///
/// `plane` is one of `"xy"`, `"yz"`, `"xz"`; `center_of` is `"geometry"` or
/// `"mass"`. Anything else is rejected before the reference is touched.
pub fn fit_translation(
    mobile: &AtomGroup,
    reference: &AtomGroup,
    reference_frame: &Frame,
    plane: Option<&str>,
    center_of: &str,
) -> FitResult<TranslationFitter> {
    let config = TranslationFitConfig {
        plane: Plane::parse_optional(plane)?,
        center_of: center_of.parse()?,
    };
    TranslationFitter::new(mobile, reference, reference_frame, config)
}

/// Options for [`RotoTranslationFitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RotTransFitConfig {
    /// Drop the Euler angle about this plane's axis after fitting.
    pub plane: Option<Plane>,
    pub weights: WeightSpec,
    /// Largest mass difference accepted when pairing atoms.
    pub tol_mass: f64,
}

impl Default for RotTransFitConfig {
    fn default() -> Self {
        Self {
            plane: None,
            weights: WeightSpec::Uniform,
            tol_mass: DEFAULT_TOL_MASS,
        }
    }
}

/// Per-frame result of a roto-translation fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSolution {
    /// Weighted center of the mobile group before the fit.
    pub mobile_center: [f64; 3],
    /// Reference center minus mobile center.
    pub translation: [f64; 3],
    /// Column-form rotation about the reference center.
    pub rotation: Matrix,
    /// Weighted RMSD of the mobile group after the fit.
    pub rmsd: f64,
}

/// Removes translation and rotation of the mobile group relative to the
/// reference by weighted least-squares superposition.
#[derive(Debug, Clone)]
pub struct RotoTranslationFitter {
    mobile: AtomGroup,
    weights: Vec<f64>,
    ref_center: [f64; 3],
    ref_centered: Vec<[f64; 3]>,
    plane: Option<Plane>,
}

impl RotoTranslationFitter {
    pub fn new(
        mobile: &AtomGroup,
        reference: &AtomGroup,
        reference_frame: &Frame,
        config: RotTransFitConfig,
    ) -> FitResult<Self> {
        match_atoms(reference, mobile, config.tol_mass)?;
        let weights = resolve_weights(reference, &config.weights)?;
        let ref_pos = reference.positions(reference_frame)?;
        let ref_center = weighted_center(&ref_pos, &weights)?;
        let ref_centered = centered(&ref_pos, &ref_center);

        log::debug!(
            "RotoTranslationFitter: {} atoms, reference center {:?}, plane {:?}",
            ref_pos.len(),
            ref_center,
            config.plane
        );
        Ok(Self {
            mobile: mobile.clone(),
            weights,
            ref_center,
            ref_centered,
            plane: config.plane,
        })
    }

    pub fn reference_center(&self) -> [f64; 3] {
        self.ref_center
    }

    /// Fit the mobile group in `frame` without modifying it.
    ///
    /// With a plane set, the rotation is the unconstrained optimum with one
    /// Euler angle zeroed (see [`project_rotation`]); it approximates, but does
    /// not minimize, the RMSD under the plane constraint.
    pub fn solve(&self, frame: &Frame) -> FitResult<FitSolution> {
        let mobile_pos = self.mobile.positions(frame)?;
        let mobile_center = weighted_center(&mobile_pos, &self.weights)?;
        let mobile_centered = centered(&mobile_pos, &mobile_center);
        let fit = weighted_kabsch(&mobile_centered, &self.ref_centered, &self.weights)?;

        let (rotation, rmsd) = match self.plane {
            Some(plane) => {
                let projected = project_rotation(&fit.rotation, plane);
                let rmsd = superposed_rmsd(
                    &mobile_centered,
                    &self.ref_centered,
                    &self.weights,
                    &projected,
                );
                (projected, rmsd)
            }
            None => (fit.rotation, fit.rmsd),
        };

        Ok(FitSolution {
            mobile_center,
            translation: [
                self.ref_center[0] - mobile_center[0],
                self.ref_center[1] - mobile_center[1],
                self.ref_center[2] - mobile_center[2],
            ],
            rotation,
            rmsd,
        })
    }
}

impl Transformation for RotoTranslationFitter {
    fn apply<'a>(&self, frame: &'a mut Frame) -> FitResult<&'a mut Frame> {
        let solution = self.solve(frame)?;
        let t = solution.translation;
        let c = self.ref_center;

        // translate onto the reference center, then rotate about it
        for p in frame.positions.iter_mut() {
            let moved = [p[0] + t[0], p[1] + t[1], p[2] + t[2]];
            let r = rotate(
                &solution.rotation,
                &[moved[0] - c[0], moved[1] - c[1], moved[2] - c[2]],
            );
            *p = [r[0] + c[0], r[1] + c[1], r[2] + c[2]];
        }

        log::trace!("frame {}: rmsd after fit {:.4}", frame.index, solution.rmsd);
        Ok(frame)
    }
}

/// String-keyed constructor for [`RotoTranslationFitter`].
pub fn fit_rot_trans(
    mobile: &AtomGroup,
    reference: &AtomGroup,
    reference_frame: &Frame,
    plane: Option<&str>,
    weights: WeightSpec,
) -> FitResult<RotoTranslationFitter> {
    let config = RotTransFitConfig {
        plane: Plane::parse_optional(plane)?,
        weights,
        ..RotTransFitConfig::default()
    };
    RotoTranslationFitter::new(mobile, reference, reference_frame, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FitError;
    use crate::kabsch::{determinant, euler_matrix, transpose, IDENTITY};

    fn centered_cluster(center: [f64; 3]) -> Frame {
        let offsets = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, -2.0, 0.0],
            [0.0, 0.0, 3.0],
            [0.0, 0.0, -3.0],
        ];
        Frame::new(
            offsets
                .iter()
                .map(|o| [o[0] + center[0], o[1] + center[1], o[2] + center[2]])
                .collect(),
        )
    }

    fn protein_like() -> Frame {
        Frame::new(vec![
            [1.2, 0.3, -0.7],
            [2.5, 1.1, 0.4],
            [0.1, 2.2, 1.9],
            [-1.4, 0.8, 2.6],
            [-0.6, -1.9, 0.2],
            [3.1, -0.4, -1.8],
        ])
    }

    fn transformed(frame: &Frame, angles: [f64; 3], shift: [f64; 3]) -> Frame {
        let r = euler_matrix(angles);
        Frame::new(
            frame
                .positions
                .iter()
                .map(|p| {
                    let q = rotate(&r, p);
                    [q[0] + shift[0], q[1] + shift[1], q[2] + shift[2]]
                })
                .collect(),
        )
    }

    fn assert_close(a: &[f64; 3], b: &[f64; 3], tol: f64) {
        for k in 0..3 {
            assert!((a[k] - b[k]).abs() < tol, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_translation_no_plane() {
        let reference = centered_cluster([0.0, 0.0, 0.0]);
        let group = AtomGroup::all(6);
        let fitter = fit_translation(&group, &group, &reference, None, "geometry").unwrap();

        let mut frame = centered_cluster([5.0, 0.0, 0.0]);
        assert_eq!(fitter.displacement(&frame).unwrap(), [-5.0, 0.0, 0.0]);
        fitter.apply(&mut frame).unwrap();
        assert_close(&group.center_of_geometry(&frame).unwrap(), &[0.0; 3], 1e-12);
    }

    #[test]
    fn test_translation_xy_plane_zeroes_z() {
        let reference = centered_cluster([0.0, 0.0, 0.0]);
        let group = AtomGroup::all(6);
        let fitter = fit_translation(&group, &group, &reference, Some("xy"), "geometry").unwrap();

        let mut frame = centered_cluster([5.0, 0.0, 0.0]);
        fitter.apply(&mut frame).unwrap();
        assert_close(&group.center_of_geometry(&frame).unwrap(), &[0.0; 3], 1e-12);

        let mut frame = centered_cluster([5.0, -2.0, 4.0]);
        fitter.apply(&mut frame).unwrap();
        let center = group.center_of_geometry(&frame).unwrap();
        assert_close(&center, &[0.0, 0.0, 4.0], 1e-12);
    }

    #[test]
    fn test_translation_yz_plane_zeroes_x() {
        let reference = centered_cluster([0.0, 0.0, 0.0]);
        let group = AtomGroup::all(6);
        let fitter = fit_translation(&group, &group, &reference, Some("yz"), "geometry").unwrap();

        let mut frame = centered_cluster([5.0, 0.0, 0.0]);
        assert_eq!(fitter.displacement(&frame).unwrap(), [0.0, 0.0, 0.0]);
        fitter.apply(&mut frame).unwrap();
        assert_close(&group.center_of_geometry(&frame).unwrap(), &[5.0, 0.0, 0.0], 1e-12);
    }

    #[test]
    fn test_translation_each_plane_keeps_normal_offset() {
        let ref_center = [1.0, 2.0, 3.0];
        let reference = centered_cluster(ref_center);
        let group = AtomGroup::all(6);
        for plane in ["yz", "xz", "xy"] {
            let fitter =
                fit_translation(&group, &group, &reference, Some(plane), "geometry").unwrap();
            let axis = plane.parse::<Plane>().unwrap().axis();

            let mut frame = centered_cluster([-4.0, 7.0, 0.5]);
            let before = group.center_of_geometry(&frame).unwrap();
            fitter.apply(&mut frame).unwrap();
            let after = group.center_of_geometry(&frame).unwrap();
            for k in 0..3 {
                if k == axis {
                    assert!((after[k] - before[k]).abs() < 1e-12);
                } else {
                    assert!((after[k] - ref_center[k]).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_translation_center_of_mass() {
        let reference = Frame::new(vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]]);
        let group = AtomGroup::all(2).with_masses(vec![3.0, 1.0]).unwrap();
        let fitter = fit_translation(&group, &group, &reference, None, "mass").unwrap();
        assert_close(&fitter.reference_center(), &[1.0, 0.0, 0.0], 1e-12);

        let mut frame = Frame::new(vec![[10.0, 0.0, 0.0], [14.0, 0.0, 0.0]]);
        fitter.apply(&mut frame).unwrap();
        assert_close(&frame.positions[0], &[0.0, 0.0, 0.0], 1e-12);
    }

    #[test]
    fn test_translation_moves_atoms_outside_group() {
        let reference = Frame::new(vec![[0.0; 3], [0.0; 3], [9.0, 9.0, 9.0]]);
        let group = AtomGroup::new(vec![0, 1]);
        let fitter = fit_translation(&group, &group, &reference, None, "geometry").unwrap();

        let mut frame = Frame::new(vec![[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]);
        fitter.apply(&mut frame).unwrap();
        assert_close(&frame.positions[2], &[1.0, 1.0, 1.0], 1e-12);
    }

    #[test]
    fn test_translation_invalid_arguments() {
        let reference = centered_cluster([0.0; 3]);
        let group = AtomGroup::all(6);
        assert!(matches!(
            fit_translation(&group, &group, &reference, Some("ab"), "geometry"),
            Err(FitError::InvalidArgument(_))
        ));
        assert!(matches!(
            fit_translation(&group, &group, &reference, None, "charge"),
            Err(FitError::InvalidArgument(_))
        ));
        assert!(matches!(
            fit_translation(&group, &group, &reference, None, "mass"),
            Err(FitError::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_rot_trans_idempotent_on_aligned_structure() {
        let reference = protein_like();
        let group = AtomGroup::all(6);
        let fitter =
            fit_rot_trans(&group, &group, &reference, None, WeightSpec::Uniform).unwrap();

        let solution = fitter.solve(&reference).unwrap();
        assert_close(&solution.translation, &[0.0; 3], 1e-12);
        for i in 0..3 {
            assert_close(&solution.rotation[i], &IDENTITY[i], 1e-9);
        }

        let mut frame = reference.clone();
        fitter.apply(&mut frame).unwrap();
        for (p, q) in frame.positions.iter().zip(&reference.positions) {
            assert_close(p, q, 1e-9);
        }
    }

    #[test]
    fn test_rot_trans_undoes_rigid_motion() {
        let reference = protein_like();
        let group = AtomGroup::all(6)
            .with_masses(vec![12.0, 14.0, 16.0, 12.0, 1.0, 32.0])
            .unwrap();
        let fitter = fit_rot_trans(&group, &group, &reference, None, WeightSpec::Mass).unwrap();

        let mut frame = transformed(&reference, [0.7, -0.3, 2.1], [4.0, -6.0, 1.5]);
        let solution = fitter.solve(&frame).unwrap();
        assert!(solution.rmsd < 1e-9);

        let r = solution.rotation;
        assert!((determinant(&r) - 1.0).abs() < 1e-6);
        let rt = transpose(&r);
        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = (0..3).map(|k| rt[i][k] * r[k][j]).sum();
                assert!((dot - IDENTITY[i][j]).abs() < 1e-6);
            }
        }

        fitter.apply(&mut frame).unwrap();
        for (p, q) in frame.positions.iter().zip(&reference.positions) {
            assert_close(p, q, 1e-9);
        }
    }

    #[test]
    fn test_rot_trans_plane_drops_in_plane_angle() {
        let reference = protein_like();
        let group = AtomGroup::all(6);
        let fitter =
            fit_rot_trans(&group, &group, &reference, Some("xy"), WeightSpec::Uniform).unwrap();

        // a pure rotation about z of the reference: the fit wants to undo it,
        // the xy projection zeroes the z angle so nothing is rotated
        let center = fitter.reference_center();
        let rz = euler_matrix([0.0, 0.0, 0.6]);
        let frame = Frame::new(
            reference
                .positions
                .iter()
                .map(|p| {
                    let q = rotate(&rz, &[p[0] - center[0], p[1] - center[1], p[2] - center[2]]);
                    [q[0] + center[0], q[1] + center[1], q[2] + center[2]]
                })
                .collect(),
        );
        let solution = fitter.solve(&frame).unwrap();
        for i in 0..3 {
            assert_close(&solution.rotation[i], &IDENTITY[i], 1e-9);
        }
        assert!(solution.rmsd > 0.1);

        // with yz the x angle is dropped instead and the z rotation is undone
        let fitter =
            fit_rot_trans(&group, &group, &reference, Some("yz"), WeightSpec::Uniform).unwrap();
        let solution = fitter.solve(&frame).unwrap();
        assert!(solution.rmsd < 1e-9);
    }

    #[test]
    fn test_rot_trans_validation() {
        let reference = protein_like();
        let group = AtomGroup::all(6);
        assert!(matches!(
            fit_rot_trans(&group, &group, &reference, Some("ab"), WeightSpec::Uniform),
            Err(FitError::InvalidArgument(_))
        ));
        assert!(matches!(
            fit_rot_trans(&group, &AtomGroup::all(5), &reference, None, WeightSpec::Uniform),
            Err(FitError::IncompatibleSelections(_))
        ));
        assert!(matches!(
            fit_rot_trans(&group, &group, &reference, None, WeightSpec::Explicit(vec![1.0; 4])),
            Err(FitError::InvalidWeights(_))
        ));
        assert!(matches!(
            fit_rot_trans(&group, &group, &reference, None, WeightSpec::Mass),
            Err(FitError::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_rot_trans_malformed_frame() {
        let reference = protein_like();
        let group = AtomGroup::all(6);
        let fitter =
            fit_rot_trans(&group, &group, &reference, None, WeightSpec::Uniform).unwrap();
        let mut short = Frame::new(vec![[0.0; 3]; 3]);
        assert!(matches!(
            fitter.apply(&mut short),
            Err(FitError::MalformedInput(_))
        ));
    }
}
