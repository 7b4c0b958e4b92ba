use ndarray::{Array2, ArrayView2, Axis, concatenate};

use crate::{ExportErr, Result, export::NetworkArtifact};

/// Recomputes a network's forward pass from its exported arrays alone.
///
/// Only concatenation, matrix products, bias addition and elementwise tanh are used: none of the
/// trainer's layers or forward code is involved.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceEvaluator<'a> {
    artifact: &'a NetworkArtifact,
}

impl<'a> ReferenceEvaluator<'a> {
    pub fn new(artifact: &'a NetworkArtifact) -> Self {
        Self { artifact }
    }

    /// Concatenates raw input columns (e.g. `S` and `t`) and evaluates the network on them.
    ///
    /// # Arguments
    /// * `columns` - `(batch, n_i)` blocks whose widths add up to the input feature count.
    ///
    /// # Returns
    /// The `(batch, out_features)` output.
    pub fn evaluate_columns(&self, columns: &[ArrayView2<f32>]) -> Result<Array2<f32>> {
        let x = concatenate(Axis(1), columns).map_err(|_| {
            let rows: Vec<_> = columns.iter().map(|c| c.nrows()).collect();
            ExportErr::shape(1, "input", &rows, "columns with the same number of rows")
        })?;

        self.evaluate(x.view())
    }

    /// Evaluates the network, `x = activation(x @ weight + bias)` layer by layer.
    ///
    /// # Arguments
    /// * `x` - A `(batch, in_features)` input.
    ///
    /// # Returns
    /// The `(batch, out_features)` output, or a `ShapeMismatch` if `x` has the wrong width.
    pub fn evaluate(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let n_in = self.artifact.input_features();
        if x.ncols() != n_in {
            return Err(ExportErr::shape(
                1,
                "input",
                x.shape(),
                format!("(batch, {n_in})"),
            ));
        }

        let mut a = x.to_owned();
        for layer in self.artifact.layers() {
            let z = a.dot(&layer.weight().view()) + &layer.bias();
            a = layer.activation().apply(z);
        }

        Ok(a)
    }
}
