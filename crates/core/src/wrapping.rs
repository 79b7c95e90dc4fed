//! Periodic boundary wrapping and unwrapping for orthorhombic boxes.

use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::error::{FitError, FitResult};
use crate::frame::Frame;
use crate::group::AtomGroup;
use crate::kabsch::compute_centroid;

/// Unit that is kept together when wrapping into the primary cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compound {
    /// Each atom is wrapped on its own.
    #[default]
    Atoms,
    /// The whole group moves by one shift, chosen from its centroid.
    Group,
    /// Each compound id of the group moves as a unit.
    Fragments,
}

impl FromStr for Compound {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atoms" => Ok(Compound::Atoms),
            "group" => Ok(Compound::Group),
            "fragments" | "residues" | "segments" => Ok(Compound::Fragments),
            other => Err(FitError::InvalidArgument(format!(
                "{} is not a valid compound",
                other
            ))),
        }
    }
}

fn box_of(frame: &Frame) -> FitResult<[f64; 3]> {
    match frame.dimensions {
        Some(b) if b.iter().all(|&l| l > 0.0) => Ok(b),
        Some(b) => Err(FitError::InvalidArgument(format!(
            "box dimensions must be positive, got {:?}",
            b
        ))),
        None => Err(FitError::InvalidArgument(
            "frame has no box dimensions".to_string(),
        )),
    }
}

/// Shift that moves `p` into `[0, L)` along every axis.
#[inline]
fn cell_shift(p: &[f64; 3], box_dims: &[f64; 3]) -> [f64; 3] {
    [
        -(p[0] / box_dims[0]).floor() * box_dims[0],
        -(p[1] / box_dims[1]).floor() * box_dims[1],
        -(p[2] / box_dims[2]).floor() * box_dims[2],
    ]
}

#[inline]
fn add(p: &mut [f64; 3], v: &[f64; 3]) {
    p[0] += v[0];
    p[1] += v[1];
    p[2] += v[2];
}

/// Move the atoms of `group` into the primary unit cell of `frame`.
///
/// With [`Compound::Fragments`] the group must carry compound ids.
pub fn wrap(frame: &mut Frame, group: &AtomGroup, compound: Compound) -> FitResult<()> {
    let box_dims = box_of(frame)?;
    group.check_frame(frame)?;
    let indices = group.indices();

    match compound {
        Compound::Atoms => {
            for &i in indices {
                let shift = cell_shift(&frame.positions[i], &box_dims);
                add(&mut frame.positions[i], &shift);
            }
        }
        Compound::Group => {
            let centroid = compute_centroid(&group.positions(frame)?);
            let shift = cell_shift(&centroid, &box_dims);
            for &i in indices {
                add(&mut frame.positions[i], &shift);
            }
        }
        Compound::Fragments => {
            let compounds = group.compounds().ok_or_else(|| {
                FitError::MissingAttribute("group has no compound ids".to_string())
            })?;
            let mut members: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
            for (&atom, &id) in indices.iter().zip(compounds) {
                members.entry(id).or_default().push(atom);
            }
            for atoms in members.values() {
                let points: Vec<[f64; 3]> = atoms.iter().map(|&i| frame.positions[i]).collect();
                let shift = cell_shift(&compute_centroid(&points), &box_dims);
                for &i in atoms {
                    add(&mut frame.positions[i], &shift);
                }
            }
        }
    }
    Ok(())
}

/// Unwrap a trajectory to remove periodic boundary artifacts.
///
/// Each atom keeps a running image shift; whenever it moves by more than half
/// a box length between consecutive frames, the jump is attributed to a
/// boundary crossing and removed. Jumps of several box lengths are handled.
///
/// # Arguments
/// * `trajectory` - Frames of [n_atoms] positions
/// * `box_dimensions` - Box [x, y, z] per frame
///
/// # Returns
/// Unwrapped trajectory
pub fn unwrap_system(
    trajectory: &[Vec<[f64; 3]>],
    box_dimensions: &[[f64; 3]],
) -> FitResult<Vec<Vec<[f64; 3]>>> {
    let num_frames = trajectory.len();
    if box_dimensions.len() != num_frames {
        return Err(FitError::InvalidArgument(format!(
            "{} box dimensions given for {} frames",
            box_dimensions.len(),
            num_frames
        )));
    }
    if num_frames == 0 {
        return Ok(Vec::new());
    }

    let num_atoms = trajectory[0].len();
    if let Some(k) = trajectory.iter().position(|f| f.len() != num_atoms) {
        return Err(FitError::MalformedInput(format!(
            "frame {} has {} atoms, expected {}",
            k,
            trajectory[k].len(),
            num_atoms
        )));
    }

    let mut result = Vec::with_capacity(num_frames);

    // First frame: copy directly
    result.push(trajectory[0].clone());

    let mut shifts = vec![[0.0f64; 3]; num_atoms];

    for frame_idx in 1..num_frames {
        let box_dims = &box_dimensions[frame_idx];
        let mut frame = Vec::with_capacity(num_atoms);

        for atom_idx in 0..num_atoms {
            let curr = &trajectory[frame_idx][atom_idx];
            let prev = &trajectory[frame_idx - 1][atom_idx];

            for k in 0..3 {
                if box_dims[k] > 0.0 {
                    let delta = curr[k] - prev[k];
                    shifts[atom_idx][k] -= (delta / box_dims[k]).round() * box_dims[k];
                }
            }

            frame.push([
                curr[0] + shifts[atom_idx][0],
                curr[1] + shifts[atom_idx][1],
                curr[2] + shifts[atom_idx][2],
            ]);
        }

        result.push(frame);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit_translation;
    use crate::transform::Transformation;

    /// Small ring of atoms straddling the x boundary of a 10 A box.
    fn straddling_frame() -> Frame {
        Frame::new(vec![
            [8.5, 5.0, 5.0],
            [10.5, 5.5, 5.0],
            [10.2, 4.5, 5.5],
            [9.0, 4.0, 4.5],
        ])
        .with_dimensions([10.0, 10.0, 10.0])
    }

    #[test]
    fn test_wrap_atoms_into_cell() {
        let mut frame = straddling_frame();
        wrap(&mut frame, &AtomGroup::all(4), Compound::Atoms).unwrap();
        for p in &frame.positions {
            assert!(p.iter().all(|&x| (0.0..10.0).contains(&x)));
        }
        assert!((frame.positions[1][0] - 0.5).abs() < 1e-12);
        assert!((frame.positions[0][0] - 8.5).abs() < 1e-12);
        assert!((frame.positions[2][0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_group_keeps_molecule_whole() {
        let mut frame = straddling_frame();
        let original = frame.positions.clone();
        // shift two boxes along x; the group moves back as one piece
        frame.translate(&[20.0, 0.0, 0.0]);
        wrap(&mut frame, &AtomGroup::all(4), Compound::Group).unwrap();
        for (p, q) in frame.positions.iter().zip(&original) {
            for k in 0..3 {
                assert!((p[k] - q[k]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_wrap_fragments() {
        let mut frame = Frame::new(vec![
            [12.0, 1.0, 1.0],
            [12.5, 1.0, 1.0],
            [-3.0, 2.0, 2.0],
            [-2.5, 2.0, 2.0],
        ])
        .with_dimensions([10.0, 10.0, 10.0]);
        let group = AtomGroup::all(4).with_compounds(vec![0, 0, 1, 1]).unwrap();
        wrap(&mut frame, &group, Compound::Fragments).unwrap();
        assert!((frame.positions[0][0] - 2.0).abs() < 1e-12);
        assert!((frame.positions[1][0] - 2.5).abs() < 1e-12);
        assert!((frame.positions[2][0] - 7.0).abs() < 1e-12);
        assert!((frame.positions[3][0] - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_errors() {
        let mut frame = Frame::new(vec![[0.0; 3]]);
        assert!(matches!(
            wrap(&mut frame, &AtomGroup::all(1), Compound::Atoms),
            Err(FitError::InvalidArgument(_))
        ));

        let mut frame = straddling_frame();
        assert!(matches!(
            wrap(&mut frame, &AtomGroup::all(4), Compound::Fragments),
            Err(FitError::MissingAttribute(_))
        ));
        assert!(matches!(
            wrap(&mut frame, &AtomGroup::new(vec![0, 8]), Compound::Atoms),
            Err(FitError::MalformedInput(_))
        ));
        assert!("molecules".parse::<Compound>().is_err());
        assert_eq!("residues".parse::<Compound>().unwrap(), Compound::Fragments);
    }

    #[test]
    fn test_unwrap_simple_crossing() {
        let trajectory = vec![vec![[9.5, 0.0, 0.0]], vec![[0.5, 0.0, 0.0]]];
        let boxes = vec![[10.0, 10.0, 10.0]; 2];
        let out = unwrap_system(&trajectory, &boxes).unwrap();
        assert!((out[1][0][0] - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_unwrap_errors() {
        let trajectory = vec![vec![[0.0; 3]], vec![[0.0; 3]]];
        assert!(matches!(
            unwrap_system(&trajectory, &[[10.0; 3]]),
            Err(FitError::InvalidArgument(_))
        ));
        let ragged = vec![vec![[0.0; 3]], vec![[0.0; 3]; 2]];
        assert!(matches!(
            unwrap_system(&ragged, &[[10.0; 3]; 2]),
            Err(FitError::MalformedInput(_))
        ));
        assert!(unwrap_system(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_wrap_unwrap_recenter_round_trip() {
        let original = straddling_frame();
        let group = AtomGroup::all(4);
        let original_center = group.center_of_geometry(&original).unwrap();

        // wrapping breaks the ring across the boundary
        let mut wrapped = original.clone();
        wrapped.translate(&[10.0, 0.0, -10.0]);
        wrap(&mut wrapped, &group, Compound::Atoms).unwrap();

        // restore continuity with the original as the previous frame
        let boxes = vec![[10.0, 10.0, 10.0]; 2];
        let unwrapped =
            unwrap_system(&[original.positions.clone(), wrapped.positions.clone()], &boxes)
                .unwrap();
        let mut restored = Frame::new(unwrapped[1].clone());

        let fitter = fit_translation(&group, &group, &original, None, "geometry").unwrap();
        fitter.apply(&mut restored).unwrap();

        let center = group.center_of_geometry(&restored).unwrap();
        for k in 0..3 {
            assert!((center[k] - original_center[k]).abs() < 1e-6);
        }
        for (p, q) in restored.positions.iter().zip(&original.positions) {
            for k in 0..3 {
                assert!((p[k] - q[k]).abs() < 1e-6);
            }
        }
    }
}
