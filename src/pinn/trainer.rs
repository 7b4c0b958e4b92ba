use log::info;
use ndarray::{Array2, Axis};
use rand::{Rng, seq::SliceRandom};

use super::{
    black_scholes::BlackScholes,
    loss::{LossFn, Mse},
    model::Pinn,
    optimization::Optimizer,
};
use crate::{ExportErr, Result};

/// How long and on how much data to train.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSettings {
    pub epochs: usize,
    pub batch_size: usize,
    pub samples: usize,
    /// Log the epoch loss every `log_every` epochs. Zero disables it.
    pub log_every: usize,
}

/// Fits a `Pinn` to the closed-form Black-Scholes surface with mini-batch MSE.
pub struct Trainer<O: Optimizer, R: Rng> {
    model: Pinn,
    problem: BlackScholes,
    // Two per layer: weight, bias.
    optimizers: Vec<O>,
    settings: TrainSettings,
    rng: R,
}

impl<O: Optimizer, R: Rng> Trainer<O, R> {
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The network to train.
    /// * `problem` - The option whose prices are the targets.
    /// * `settings` - Epochs, batching and logging.
    /// * `build_optimizer` - Builds the optimizer for a parameter tensor of the given length.
    /// * `rng` - Drives sampling and shuffling.
    pub fn new<F>(
        model: Pinn,
        problem: BlackScholes,
        settings: TrainSettings,
        mut build_optimizer: F,
        rng: R,
    ) -> Result<Self>
    where
        F: FnMut(usize) -> O,
    {
        if settings.batch_size == 0 {
            return Err(ExportErr::InvalidSettings {
                reason: "batch_size must not be zero".into(),
            });
        }

        let optimizers = model
            .layers()
            .iter()
            .flat_map(|l| [l.weight().len(), l.bias().len()])
            .map(&mut build_optimizer)
            .collect();

        Ok(Self {
            model,
            problem,
            optimizers,
            settings,
            rng,
        })
    }

    pub fn model(&self) -> &Pinn {
        &self.model
    }

    pub fn into_model(self) -> Pinn {
        self.model
    }

    /// Trains for `settings.epochs` epochs over a freshly sampled collocation set.
    ///
    /// # Returns
    /// The mean batch loss of every epoch.
    pub fn train(&mut self) -> Result<Vec<f32>> {
        let TrainSettings {
            epochs,
            batch_size,
            samples,
            log_every,
        } = self.settings;

        let (x, y) = self.problem.sample(samples, &mut self.rng);
        let mut idx: Vec<usize> = (0..samples).collect();
        let mut losses = Vec::with_capacity(epochs);

        info!("training on {samples} samples for {epochs} epochs");
        for epoch in 1..=epochs {
            idx.shuffle(&mut self.rng);

            let mut total = 0.0;
            let mut batches = 0;
            for chunk in idx.chunks(batch_size) {
                let xb = x.select(Axis(0), chunk);
                let yb = y.select(Axis(0), chunk);
                total += self.step(&xb, &yb)?;
                batches += 1;
            }

            let loss = if batches == 0 { 0.0 } else { total / batches as f32 };
            losses.push(loss);

            if log_every > 0 && (epoch % log_every == 0 || epoch == epochs) {
                info!("epoch {epoch}/{epochs}: loss {loss:.6}");
            }
        }

        Ok(losses)
    }

    /// One forward/backward pass and parameter update on a batch.
    fn step(&mut self, x: &Array2<f32>, y: &Array2<f32>) -> Result<f32> {
        let y_pred = self.model.forward(x.view());
        let loss = Mse.loss(y_pred.view(), y.view())?;
        let mut d = Mse.loss_prime(y_pred.view(), y.view())?;

        let mut optimizers = self.optimizers.chunks_exact_mut(2).rev();
        for layer in self.model.layers_mut().iter_mut().rev() {
            let (dw, db, dx) = layer.backward(d);
            d = dx;

            let Some([w_opt, b_opt]) = optimizers.next() else {
                return Err(ExportErr::EmptyNetwork);
            };
            let (w, b) = layer.params_mut()?;
            let dw = dw.as_standard_layout();
            let dw = dw
                .as_slice()
                .ok_or(ExportErr::NonContiguous { what: "weight gradient" })?;
            let db = db
                .as_slice()
                .ok_or(ExportErr::NonContiguous { what: "bias gradient" })?;

            w_opt.update_params(w, dw)?;
            b_opt.update_params(b, db)?;
        }

        Ok(loss)
    }
}
