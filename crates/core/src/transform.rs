//! The per-frame transformation interface.

use rayon::prelude::*;

use crate::error::FitResult;
use crate::frame::Frame;

/// A coordinate transformation applied to one frame at a time.
///
/// Implementors capture their reference data at construction and never change
/// it afterwards, so one instance can be shared across threads and applied to
/// many frames. A single frame must not be handed to two calls at once.
pub trait Transformation: Send + Sync {
    /// Transform `frame` in place and hand it back.
    fn apply<'a>(&self, frame: &'a mut Frame) -> FitResult<&'a mut Frame>;
}

impl<T: Transformation + ?Sized> Transformation for Box<T> {
    fn apply<'a>(&self, frame: &'a mut Frame) -> FitResult<&'a mut Frame> {
        (**self).apply(frame)
    }
}

impl<T: Transformation + ?Sized> Transformation for &T {
    fn apply<'a>(&self, frame: &'a mut Frame) -> FitResult<&'a mut Frame> {
        (**self).apply(frame)
    }
}

pub type BoxedTransformation = Box<dyn Transformation>;

/// Adapter turning a plain closure into a [`Transformation`].
pub struct FnTransformation<F>(F);

impl<F> Transformation for FnTransformation<F>
where
    F: Fn(&mut Frame) -> FitResult<()> + Send + Sync,
{
    fn apply<'a>(&self, frame: &'a mut Frame) -> FitResult<&'a mut Frame> {
        (self.0)(frame)?;
        Ok(frame)
    }
}

pub fn from_fn<F>(f: F) -> FnTransformation<F>
where
    F: Fn(&mut Frame) -> FitResult<()> + Send + Sync,
{
    FnTransformation(f)
}

/// Apply `transform` to every frame of a trajectory.
///
/// Frames are independent, so they are processed in parallel. Processing
/// stops early on failure and one of the errors is returned.
pub fn transform_trajectory<T>(frames: &mut [Frame], transform: &T) -> FitResult<()>
where
    T: Transformation + ?Sized,
{
    log::debug!("Applying transformation to {} frames", frames.len());
    frames
        .par_iter_mut()
        .try_for_each(|frame| transform.apply(frame).map(|_| ()))
}
