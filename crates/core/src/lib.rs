//! Core library for mdfit.
//!
//! Pure Rust implementations with no Python dependencies.
//! Provides per-frame fitting transformations for molecular dynamics
//! trajectories: full RMSD alignment, center matching with an optional plane
//! constraint, and roto-translational superposition, plus the periodic
//! wrapping helpers they are usually chained with.

pub mod align;
pub mod error;
pub mod fit;
pub mod frame;
pub mod group;
pub mod kabsch;
pub mod plane;
pub mod transform;
pub mod util;
pub mod weights;
pub mod wrapping;

pub use align::{align_to, alignto, Aligner, ReferenceSnapshot};
pub use error::{FitError, FitResult};
pub use fit::{
    fit_rot_trans, fit_translation, FitSolution, RotTransFitConfig, RotoTranslationFitter,
    TranslationFitConfig, TranslationFitter,
};
pub use frame::Frame;
pub use group::{match_atoms, unsigned_ids, AtomGroup};
pub use kabsch::{weighted_kabsch, KabschFit};
pub use plane::Plane;
pub use transform::{from_fn, transform_trajectory, BoxedTransformation, Transformation};
pub use weights::{resolve_weights, CenterOf, WeightSpec};
pub use wrapping::{unwrap_system, wrap, Compound};
