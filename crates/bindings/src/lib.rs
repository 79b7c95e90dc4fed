#![allow(clippy::too_many_arguments)]

use ndarray::{Array2, Array3};
use numpy::{PyArray2, PyArray3, PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3, ToPyArray};
use pyo3::exceptions::{PyAttributeError, PyValueError};
use pyo3::prelude::*;

use mdfit_core::{
    align_to, fit_rot_trans, fit_translation, transform_trajectory, unsigned_ids, unwrap_system,
    wrap, AtomGroup, Compound, FitError, Frame, Transformation, WeightSpec,
};

// ============================================================================
// Helpers: conversions between numpy arrays and frames
// ============================================================================

fn array3_to_frames(arr: &ndarray::ArrayView3<f64>) -> Vec<Frame> {
    let n_frames = arr.shape()[0];
    let n_atoms = arr.shape()[1];
    let mut frames = Vec::with_capacity(n_frames);
    for i in 0..n_frames {
        let mut positions = Vec::with_capacity(n_atoms);
        for j in 0..n_atoms {
            positions.push([arr[[i, j, 0]], arr[[i, j, 1]], arr[[i, j, 2]]]);
        }
        frames.push(Frame::new(positions).with_index(i));
    }
    frames
}

fn frames_to_array3(frames: &[Frame]) -> Array3<f64> {
    let n_frames = frames.len();
    let n_atoms = if n_frames > 0 { frames[0].n_atoms() } else { 0 };
    let mut result = Array3::<f64>::zeros((n_frames, n_atoms, 3));
    for (i, frame) in frames.iter().enumerate() {
        for (j, atom) in frame.positions.iter().enumerate() {
            result[[i, j, 0]] = atom[0];
            result[[i, j, 1]] = atom[1];
            result[[i, j, 2]] = atom[2];
        }
    }
    result
}

fn array2_to_coords(arr: &ndarray::ArrayView2<f64>) -> Vec<[f64; 3]> {
    let n = arr.shape()[0];
    (0..n)
        .map(|i| [arr[[i, 0]], arr[[i, 1]], arr[[i, 2]]])
        .collect()
}

fn coords_to_array2(coords: &[[f64; 3]]) -> Array2<f64> {
    let mut result = Array2::<f64>::zeros((coords.len(), 3));
    for (i, p) in coords.iter().enumerate() {
        result[[i, 0]] = p[0];
        result[[i, 1]] = p[1];
        result[[i, 2]] = p[2];
    }
    result
}

fn check_xyz(shape: &[usize], name: &str) -> PyResult<()> {
    if shape.last() != Some(&3) {
        return Err(PyValueError::new_err(format!(
            "{} must have a trailing dimension of 3, got shape {:?}",
            name, shape
        )));
    }
    Ok(())
}

/// Map core errors onto the Python exceptions users of MD toolkits expect.
fn fit_err(err: FitError) -> PyErr {
    match err {
        FitError::MissingAttribute(_) | FitError::MalformedInput(_) => {
            PyAttributeError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Build a group from system-level indices and (optionally) system-level masses.
fn build_group(
    indices: &PyReadonlyArray1<'_, i64>,
    masses: Option<&PyReadonlyArray1<'_, f64>>,
    name: &str,
) -> PyResult<AtomGroup> {
    let raw: Vec<i64> = indices.as_array().iter().copied().collect();
    let idx = unsigned_ids(&raw, &format!("{} index", name)).map_err(fit_err)?;

    let group = AtomGroup::new(idx);
    match masses {
        Some(m) => {
            let all = m.as_array();
            let picked = group
                .indices()
                .iter()
                .map(|&i| {
                    all.get(i).copied().ok_or_else(|| {
                        PyValueError::new_err(format!(
                            "{} index {} out of range for {} masses",
                            name,
                            i,
                            all.len()
                        ))
                    })
                })
                .collect::<PyResult<Vec<f64>>>()?;
            group.with_masses(picked).map_err(fit_err)
        }
        None => Ok(group),
    }
}

/// Accept `None`, `"mass"`, or a float array as a weight specification.
fn extract_weights(weights: Option<&Bound<'_, PyAny>>) -> PyResult<WeightSpec> {
    let Some(w) = weights else {
        return Ok(WeightSpec::Uniform);
    };
    if w.is_none() {
        return Ok(WeightSpec::Uniform);
    }
    if let Ok(name) = w.extract::<String>() {
        return name.parse().map_err(fit_err);
    }
    if let Ok(arr) = w.extract::<PyReadonlyArray1<f64>>() {
        return Ok(WeightSpec::Explicit(arr.as_array().to_vec()));
    }
    if let Ok(list) = w.extract::<Vec<f64>>() {
        return Ok(WeightSpec::Explicit(list));
    }
    Err(PyValueError::new_err(
        "weights must be None, \"mass\", or a float array",
    ))
}

fn run_transform<'py, T: Transformation>(
    py: Python<'py>,
    trajectory: &PyReadonlyArray3<'py, f64>,
    transform: &T,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    let mut frames = array3_to_frames(&trajectory.as_array());
    transform_trajectory(&mut frames, transform).map_err(fit_err)?;
    Ok(frames_to_array3(&frames).to_pyarray(py))
}

// ============================================================================
// FITTING TRANSFORMATIONS
// ============================================================================

/// Translate every frame so the mobile group's center matches the reference.
///
/// Parameters
/// ----------
/// trajectory : ndarray (num_frames, num_atoms, 3)
/// reference : ndarray (num_ref_atoms, 3)
/// mobile_indices, reference_indices : ndarray of int
/// plane : {"xy", "yz", "xz"} or None
/// center_of : {"geometry", "mass"}
/// masses, reference_masses : ndarray of float, optional, one per system atom
#[pyfunction]
#[pyo3(
    name = "fit_translation",
    signature = (trajectory, reference, mobile_indices, reference_indices, plane=None, center_of="geometry", masses=None, reference_masses=None)
)]
fn fit_translation_py<'py>(
    py: Python<'py>,
    trajectory: PyReadonlyArray3<'py, f64>,
    reference: PyReadonlyArray2<'py, f64>,
    mobile_indices: PyReadonlyArray1<'py, i64>,
    reference_indices: PyReadonlyArray1<'py, i64>,
    plane: Option<&str>,
    center_of: &str,
    masses: Option<PyReadonlyArray1<'py, f64>>,
    reference_masses: Option<PyReadonlyArray1<'py, f64>>,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    check_xyz(trajectory.as_array().shape(), "trajectory")?;
    check_xyz(reference.as_array().shape(), "reference")?;
    let mobile = build_group(&mobile_indices, masses.as_ref(), "mobile")?;
    let ref_group = build_group(&reference_indices, reference_masses.as_ref(), "reference")?;
    let ref_frame = Frame::new(array2_to_coords(&reference.as_array()));

    let fitter =
        fit_translation(&mobile, &ref_group, &ref_frame, plane, center_of).map_err(fit_err)?;
    run_transform(py, &trajectory, &fitter)
}

/// Remove translation and rotation of the mobile group by RMSD fitting.
///
/// With `plane` set, the rotation angle about the plane's associated axis is
/// zeroed after the fit; this is an approximation, not a constrained fit.
#[pyfunction]
#[pyo3(
    name = "fit_rot_trans",
    signature = (trajectory, reference, mobile_indices, reference_indices, plane=None, weights=None, masses=None, reference_masses=None)
)]
fn fit_rot_trans_py<'py>(
    py: Python<'py>,
    trajectory: PyReadonlyArray3<'py, f64>,
    reference: PyReadonlyArray2<'py, f64>,
    mobile_indices: PyReadonlyArray1<'py, i64>,
    reference_indices: PyReadonlyArray1<'py, i64>,
    plane: Option<&str>,
    weights: Option<&Bound<'py, PyAny>>,
    masses: Option<PyReadonlyArray1<'py, f64>>,
    reference_masses: Option<PyReadonlyArray1<'py, f64>>,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    check_xyz(trajectory.as_array().shape(), "trajectory")?;
    check_xyz(reference.as_array().shape(), "reference")?;
    let spec = extract_weights(weights)?;
    let mobile = build_group(&mobile_indices, masses.as_ref(), "mobile")?;
    let ref_group = build_group(&reference_indices, reference_masses.as_ref(), "reference")?;
    let ref_frame = Frame::new(array2_to_coords(&reference.as_array()));

    let fitter = fit_rot_trans(&mobile, &ref_group, &ref_frame, plane, spec).map_err(fit_err)?;
    run_transform(py, &trajectory, &fitter)
}

/// Full RMSD superposition of the mobile group onto the reference, per frame.
///
/// `weights` may be None, "mass", or one float per mobile atom.
#[pyfunction]
#[pyo3(
    name = "alignto",
    signature = (trajectory, reference, mobile_indices, reference_indices, weights=None, masses=None, reference_masses=None)
)]
fn alignto_py<'py>(
    py: Python<'py>,
    trajectory: PyReadonlyArray3<'py, f64>,
    reference: PyReadonlyArray2<'py, f64>,
    mobile_indices: PyReadonlyArray1<'py, i64>,
    reference_indices: PyReadonlyArray1<'py, i64>,
    weights: Option<&Bound<'py, PyAny>>,
    masses: Option<PyReadonlyArray1<'py, f64>>,
    reference_masses: Option<PyReadonlyArray1<'py, f64>>,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    check_xyz(trajectory.as_array().shape(), "trajectory")?;
    check_xyz(reference.as_array().shape(), "reference")?;
    let spec = extract_weights(weights)?;
    let mobile = build_group(&mobile_indices, masses.as_ref(), "mobile")?;
    let ref_group = build_group(&reference_indices, reference_masses.as_ref(), "reference")?;
    let ref_frame = Frame::new(array2_to_coords(&reference.as_array()));

    let aligner = align_to(&mobile, &ref_group, &ref_frame, spec).map_err(fit_err)?;
    run_transform(py, &trajectory, &aligner)
}

// ============================================================================
// WRAPPING
// ============================================================================

/// Wrap the selected atoms of one frame into the primary unit cell.
#[pyfunction]
#[pyo3(name = "wrap", signature = (positions, box_dimensions, indices=None, compound="atoms", compounds=None))]
fn wrap_py<'py>(
    py: Python<'py>,
    positions: PyReadonlyArray2<'py, f64>,
    box_dimensions: PyReadonlyArray1<'py, f64>,
    indices: Option<PyReadonlyArray1<'py, i64>>,
    compound: &str,
    compounds: Option<PyReadonlyArray1<'py, i64>>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    check_xyz(positions.as_array().shape(), "positions")?;
    let dims = box_dimensions.as_array();
    if dims.len() < 3 {
        return Err(PyValueError::new_err("box_dimensions needs at least 3 values"));
    }
    let mut frame = Frame::new(array2_to_coords(&positions.as_array()))
        .with_dimensions([dims[0], dims[1], dims[2]]);

    let mut group = match &indices {
        Some(idx) => build_group(idx, None, "wrap")?,
        None => AtomGroup::all(frame.n_atoms()),
    };
    if let Some(ids) = &compounds {
        let raw: Vec<i64> = ids.as_array().iter().copied().collect();
        let ids = unsigned_ids(&raw, "compound id").map_err(fit_err)?;
        group = group.with_compounds(ids).map_err(fit_err)?;
    }
    let compound: Compound = compound.parse().map_err(fit_err)?;

    wrap(&mut frame, &group, compound).map_err(fit_err)?;
    Ok(coords_to_array2(&frame.positions).to_pyarray(py))
}

#[pyfunction]
#[pyo3(name = "unwrap_system", signature = (trajectory, box_dimensions))]
fn unwrap_system_py<'py>(
    py: Python<'py>,
    trajectory: PyReadonlyArray3<'py, f64>,
    box_dimensions: PyReadonlyArray2<'py, f64>,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    check_xyz(trajectory.as_array().shape(), "trajectory")?;
    let traj_arr = trajectory.as_array();
    let box_arr = box_dimensions.as_array();
    if box_arr.shape()[1] < 3 {
        return Err(PyValueError::new_err("box_dimensions needs at least 3 columns"));
    }

    let traj_vec: Vec<Vec<[f64; 3]>> = array3_to_frames(&traj_arr)
        .into_iter()
        .map(|f| f.positions)
        .collect();
    let box_vec: Vec<[f64; 3]> = (0..box_arr.shape()[0])
        .map(|i| [box_arr[[i, 0]], box_arr[[i, 1]], box_arr[[i, 2]]])
        .collect();

    let unwrapped = unwrap_system(&traj_vec, &box_vec).map_err(fit_err)?;
    let frames: Vec<Frame> = unwrapped.into_iter().map(Frame::new).collect();
    Ok(frames_to_array3(&frames).to_pyarray(py))
}

// ============================================================================
// MODULE DEFINITION
// ============================================================================

#[pymodule]
fn mdfit(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Fitting
    m.add_function(wrap_pyfunction!(fit_translation_py, m)?)?;
    m.add_function(wrap_pyfunction!(fit_rot_trans_py, m)?)?;
    m.add_function(wrap_pyfunction!(alignto_py, m)?)?;

    // Wrapping
    m.add_function(wrap_pyfunction!(wrap_py, m)?)?;
    m.add_function(wrap_pyfunction!(unwrap_system_py, m)?)?;

    Ok(())
}
