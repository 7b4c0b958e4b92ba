use super::{Optimizer, optimizer::check_lengths};
use crate::Result;

/// Adam with bias-corrected first and second moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    // Number of steps taken so far.
    t: i32,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Adam {
    /// Creates the optimizer for a tensor of `len` parameters.
    ///
    /// # Arguments
    /// * `len` - Size of the tensor, both moment estimates start as `len` zeros.
    /// * `lr` - Step size.
    /// * `beta1` - Decay of the gradient mean.
    /// * `beta2` - Decay of the squared gradient mean.
    /// * `epsilon` - Added to the denominator.
    pub fn new(len: usize, lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: vec![0.0; len],
            v: vec![0.0; len],
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_lengths(params, grad)?;
        check_lengths(&self.m, grad)?;

        self.t += 1;
        let m_hat_scale = 1.0 / (1.0 - self.beta1.powi(self.t));
        let v_hat_scale = 1.0 / (1.0 - self.beta2.powi(self.t));

        for i in 0..params.len() {
            let g = grad[i];
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = self.m[i] * m_hat_scale;
            let v_hat = self.v[i] * v_hat_scale;
            params[i] -= self.lr * m_hat / (v_hat.sqrt() + self.epsilon);
        }

        Ok(())
    }
}
