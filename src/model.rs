use std::path::Path;

use ndarray::{Array2, ArrayView2, ArrayViewD};

use crate::Result;

/// One affine layer as held by the training side: `weight` is `(out, in)` and `bias` is `(out,)`.
///
/// The views are dynamic-rank on purpose, checking the rank is the layout transformer's job.
#[derive(Debug, Clone)]
pub struct NativeLayer<'a> {
    pub weight: ArrayViewD<'a, f32>,
    pub bias: ArrayViewD<'a, f32>,
}

impl<'a> NativeLayer<'a> {
    /// Creates a new `NativeLayer`.
    ///
    /// # Arguments
    /// * `weight` - The native `(out, in)` weight.
    /// * `bias` - The native `(out,)` bias.
    ///
    /// # Returns
    /// A new `NativeLayer` instance.
    pub fn new(weight: ArrayViewD<'a, f32>, bias: ArrayViewD<'a, f32>) -> Self {
        Self { weight, bias }
    }
}

/// A trained feed-forward network whose parameters can be exported.
///
/// The export pipeline only ever talks to the trainer through this trait.
pub trait TrainedModel {
    /// Returns the affine layers in evaluation order.
    fn native_layers(&self) -> Vec<NativeLayer<'_>>;

    /// Evaluates the network in inference mode, without touching any training caches.
    ///
    /// # Arguments
    /// * `x` - A `(batch, in_features)` input.
    ///
    /// # Returns
    /// The `(batch, out_features)` output or an error if `x` has the wrong width.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Loads a model from a persisted checkpoint.
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;
}
