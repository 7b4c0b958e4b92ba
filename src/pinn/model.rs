use std::path::Path;

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{activations::ActFn, checkpoint, dense::Dense};
use crate::{
    ExportErr, Result,
    model::{NativeLayer, TrainedModel},
};

/// A feed-forward network `(S, t) -> price`: tanh on every hidden layer, linear output.
#[derive(Clone, Debug)]
pub struct Pinn {
    layers: Vec<Dense>,
}

impl Pinn {
    /// Creates a freshly initialized `Pinn`.
    ///
    /// # Arguments
    /// * `dims` - The width of every layer boundary, e.g. `[2, 64, 64, 1]`.
    /// * `rng` - The random number generator used for the weights.
    ///
    /// # Returns
    /// A new `Pinn`, or an error if there are fewer than two dims or one of them is zero.
    pub fn new<R: Rng>(dims: &[usize], rng: &mut R) -> Result<Self> {
        if dims.len() < 2 {
            return Err(ExportErr::EmptyNetwork);
        }

        let nlayers = dims.len() - 1;
        let layers = dims
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                if w[0] == 0 || w[1] == 0 {
                    return Err(ExportErr::shape(i + 1, "weight", &[w[1], w[0]], "non-zero dims"));
                }
                let act_fn = (i + 1 < nlayers).then_some(ActFn::Tanh);
                Dense::xavier((w[0], w[1]), act_fn, rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { layers })
    }

    /// Creates a `Pinn` from already built layers.
    ///
    /// # Returns
    /// The network, or an error if there are no layers or two adjacent ones don't chain.
    pub fn from_layers(layers: Vec<Dense>) -> Result<Self> {
        if layers.is_empty() {
            return Err(ExportErr::EmptyNetwork);
        }

        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].out_size() != pair[1].in_size() {
                return Err(ExportErr::shape(
                    i + 2,
                    "weight",
                    pair[1].weight().shape(),
                    format!("(_, {})", pair[0].out_size()),
                ));
            }
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Dense] {
        &mut self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].in_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].out_size()
    }

    /// Widths of every layer boundary.
    pub fn dims(&self) -> Vec<usize> {
        std::iter::once(self.input_size())
            .chain(self.layers.iter().map(Dense::out_size))
            .collect()
    }

    /// Forward pass storing the backprop metadata of every layer.
    pub(crate) fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let mut a = x.to_owned();
        for layer in self.layers.iter_mut() {
            a = layer.forward(a.view());
        }

        a
    }

    /// Prices one option.
    ///
    /// # Arguments
    /// * `s` - The underlying's price.
    /// * `t` - The time elapsed since issue.
    pub fn price(&self, s: f32, t: f32) -> Result<f32> {
        let y = self.predict(ndarray::array![[s, t]].view())?;
        Ok(y[[0, 0]])
    }

    /// Saves the parameters as a safetensors checkpoint.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        checkpoint::save(self, path.as_ref())
    }
}

impl TrainedModel for Pinn {
    fn native_layers(&self) -> Vec<NativeLayer<'_>> {
        self.layers
            .iter()
            .map(|l| NativeLayer::new(l.weight().into_dyn(), l.bias().into_dyn()))
            .collect()
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.input_size() {
            return Err(ExportErr::shape(
                1,
                "input",
                x.shape(),
                format!("(batch, {})", self.input_size()),
            ));
        }

        let mut a = x.to_owned();
        for layer in &self.layers {
            a = layer.predict(a.view());
        }

        Ok(a)
    }

    fn load(path: &Path) -> Result<Self> {
        checkpoint::load(path)
    }
}
