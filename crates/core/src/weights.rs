//! Per-atom weight resolution for centering and RMSD fitting.

use std::str::FromStr;

use crate::error::{FitError, FitResult};
use crate::group::AtomGroup;

/// How atoms are weighted in a fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WeightSpec {
    /// Every atom counts equally.
    #[default]
    Uniform,
    /// Atoms are weighted by mass.
    Mass,
    /// One weight per atom, in group order.
    Explicit(Vec<f64>),
}

impl FromStr for WeightSpec {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mass" => Ok(WeightSpec::Mass),
            "none" | "None" => Ok(WeightSpec::Uniform),
            other => Err(FitError::InvalidArgument(format!(
                "{} is not a valid weight specification (expected \"mass\" or an array)",
                other
            ))),
        }
    }
}

impl From<Vec<f64>> for WeightSpec {
    fn from(weights: Vec<f64>) -> Self {
        WeightSpec::Explicit(weights)
    }
}

/// Centering method for the translation fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CenterOf {
    #[default]
    Geometry,
    Mass,
}

impl CenterOf {
    /// Equivalent weight specification.
    pub fn weight_spec(self) -> WeightSpec {
        match self {
            CenterOf::Geometry => WeightSpec::Uniform,
            CenterOf::Mass => WeightSpec::Mass,
        }
    }
}

impl FromStr for CenterOf {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "geometry" => Ok(CenterOf::Geometry),
            "mass" => Ok(CenterOf::Mass),
            other => Err(FitError::InvalidArgument(format!(
                "{} is not a valid argument for center_of",
                other
            ))),
        }
    }
}

/// Turn a weight specification into a validated weight vector for `group`.
///
/// The result has one non-negative, finite entry per atom and a positive sum.
pub fn resolve_weights(group: &AtomGroup, spec: &WeightSpec) -> FitResult<Vec<f64>> {
    let n = group.n_atoms();
    let weights = match spec {
        WeightSpec::Uniform => vec![1.0; n],
        WeightSpec::Mass => group.masses()?.to_vec(),
        WeightSpec::Explicit(w) => {
            if w.len() != n {
                return Err(FitError::InvalidWeights(format!(
                    "weights must have the same length as the group ({}), got {}",
                    n,
                    w.len()
                )));
            }
            w.clone()
        }
    };

    if let Some(k) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
        return Err(FitError::InvalidWeights(format!(
            "weight {} is {}, expected a finite non-negative value",
            k, weights[k]
        )));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(FitError::InvalidWeights(
            "weights must sum to a positive value".to_string(),
        ));
    }
    Ok(weights)
}
