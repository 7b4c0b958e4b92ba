use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::activations::ActFn;
use crate::{ExportErr, Result};

/// A fully connected layer stored the way the trainer uses it: `weight` is `(out, in)`.
///
/// Forward computes `x @ weight^T + bias`, row per sample.
#[derive(Clone, Debug)]
pub struct Dense {
    weight: Array2<f32>,
    bias: Array1<f32>,
    act_fn: Option<ActFn>,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer from existing parameters.
    ///
    /// # Arguments
    /// * `weight` - The `(out, in)` weight.
    /// * `bias` - The `(out,)` bias.
    /// * `act_fn` - The activation, `None` for a linear layer.
    ///
    /// # Returns
    /// A new `Dense`, or an error if the bias doesn't match the weight's output size.
    pub fn new(weight: Array2<f32>, bias: Array1<f32>, act_fn: Option<ActFn>) -> Result<Self> {
        if bias.len() != weight.nrows() {
            return Err(ExportErr::InvalidLayer {
                reason: format!(
                    "bias has {} elements but the weight has {} rows",
                    bias.len(),
                    weight.nrows()
                ),
            });
        }

        let zeros = Array2::zeros((1, 1));
        Ok(Self {
            weight: weight.as_standard_layout().into_owned(),
            bias,
            act_fn,
            x: zeros.clone(),
            z: zeros,
        })
    }

    /// Creates a new `Dense` layer using Xavier uniform initialization for the weights and zeros
    /// for the biases.
    ///
    /// # Arguments
    /// * `dim` - The `(in, out)` sizes of the layer.
    /// * `act_fn` - The activation, `None` for a linear layer.
    /// * `rng` - A random number generator.
    pub fn xavier<R: Rng>(dim: (usize, usize), act_fn: Option<ActFn>, rng: &mut R) -> Result<Self> {
        let (n_in, n_out) = dim;
        let range = (6. / (n_in + n_out) as f32).sqrt();
        let dist = Uniform::new(-range, range).map_err(|e| ExportErr::InvalidLayer {
            reason: format!("no xavier range for a ({n_out}, {n_in}) weight: {e}"),
        })?;

        let weight = Array2::from_shape_fn((n_out, n_in), |_| dist.sample(rng));
        Self::new(weight, Array1::zeros(n_out), act_fn)
    }

    pub fn in_size(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_size(&self) -> usize {
        self.weight.nrows()
    }

    pub fn weight(&self) -> ArrayView2<'_, f32> {
        self.weight.view()
    }

    pub fn bias(&self) -> ArrayView1<'_, f32> {
        self.bias.view()
    }

    pub fn act_fn(&self) -> Option<ActFn> {
        self.act_fn
    }

    /// Inference-only forward pass, leaves the backward metadata untouched.
    pub fn predict(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let z = x.dot(&self.weight.t()) + &self.bias;
        match self.act_fn {
            Some(act_fn) => z.mapv_into(|z| act_fn.f(z)),
            None => z,
        }
    }

    /// Forward pass that stores what `backward` needs.
    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        self.z = x.dot(&self.weight.t()) + &self.bias;
        self.x = x.to_owned();

        let Some(act_fn) = self.act_fn else {
            return self.z.clone();
        };

        self.z.mapv(|z| act_fn.f(z))
    }

    /// Backward pass for the last forwarded batch.
    ///
    /// # Arguments
    /// * `d` - dL/da for this layer's output, `(batch, out)`.
    ///
    /// # Returns
    /// The weight gradient `(out, in)`, the bias gradient `(out,)` and dL/dx `(batch, in)`.
    pub fn backward(&self, mut d: Array2<f32>) -> (Array2<f32>, Array1<f32>, Array2<f32>) {
        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let dw = d.t().dot(&self.x);
        let db = d.sum_axis(Axis(0));
        let dx = d.dot(&self.weight);

        (dw, db, dx)
    }

    /// Mutable flat views of the weight and bias, in that order.
    pub(crate) fn params_mut(&mut self) -> Result<(&mut [f32], &mut [f32])> {
        let w = self
            .weight
            .as_slice_mut()
            .ok_or(ExportErr::NonContiguous { what: "weight" })?;
        let b = self
            .bias
            .as_slice_mut()
            .ok_or(ExportErr::NonContiguous { what: "bias" })?;

        Ok((w, b))
    }
}
