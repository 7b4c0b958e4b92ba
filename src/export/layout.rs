use ndarray::{Array2, ArrayView2};

/// A weight matrix in the training framework's `(out_features, in_features)` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeWeight(Array2<f32>);

/// A weight matrix in the export `(in_features, out_features)` layout.
///
/// Always backed by fresh row-major storage, so `as_slice` on the inner array never fails and
/// `.npy` files are written with `fortran_order: False`.
///
/// Outside this crate one is only obtained through `NativeWeight::to_canonical` or by reading an
/// artifact, never by wrapping a raw matrix:
///
/// ```compile_fail
/// use ndarray::Array2;
/// use pinn_export::export::CanonicalWeight;
///
/// let w = CanonicalWeight::new(Array2::<f32>::zeros((64, 2)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalWeight(Array2<f32>);

impl NativeWeight {
    pub fn new(weight: Array2<f32>) -> Self {
        Self(weight)
    }

    pub fn out_features(&self) -> usize {
        self.0.nrows()
    }

    pub fn in_features(&self) -> usize {
        self.0.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    /// Transposes into the export layout.
    ///
    /// # Returns
    /// A `CanonicalWeight` owning a contiguous copy of the transposed matrix.
    pub fn to_canonical(&self) -> CanonicalWeight {
        CanonicalWeight::from_transposed(self.0.t())
    }
}

impl CanonicalWeight {
    /// Wraps an `(in, out)` matrix, materializing it in standard layout if it is not already.
    pub(crate) fn new(weight: Array2<f32>) -> Self {
        if weight.is_standard_layout() {
            Self(weight)
        } else {
            Self::from_transposed(weight.view())
        }
    }

    // `to_owned` on a transposed view keeps column-major strides, so the copy has to go through
    // `as_standard_layout`.
    fn from_transposed(view: ArrayView2<f32>) -> Self {
        Self(view.as_standard_layout().into_owned())
    }

    pub fn in_features(&self) -> usize {
        self.0.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.0.ncols()
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.0.nrows(), self.0.ncols()]
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    /// Transposes back into the training layout.
    pub fn to_native(&self) -> NativeWeight {
        NativeWeight(self.0.t().as_standard_layout().into_owned())
    }
}
