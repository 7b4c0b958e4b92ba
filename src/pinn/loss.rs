use ndarray::{Array2, ArrayView2, Zip};

use crate::{ExportErr, Result};

/// A training objective over a batch of predictions.
pub trait LossFn {
    /// The scalar loss of `y_pred` against the targets `y`.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32>;

    /// dL/dy_pred, shaped like `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array2<f32>>;
}

/// Mean of the squared residuals over every element of the batch.
#[derive(Default, Clone, Copy, Debug)]
pub struct Mse;

fn check_targets(y_pred: &ArrayView2<f32>, y: &ArrayView2<f32>) -> Result<()> {
    if y_pred.dim() != y.dim() {
        return Err(ExportErr::LengthMismatch {
            what: "targets",
            expected: y_pred.len(),
            got: y.len(),
        });
    }

    Ok(())
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        check_targets(&y_pred, &y)?;
        if y.is_empty() {
            return Ok(0.0);
        }

        let sum = Zip::from(&y_pred)
            .and(&y)
            .fold(0.0, |acc, &p, &t| acc + (p - t) * (p - t));

        Ok(sum / y.len() as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_targets(&y_pred, &y)?;

        let scale = 2.0 / y.len().max(1) as f32;
        Ok(Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| scale * (p - t)))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn mse_of_known_values() {
        let y_pred = array![[1.0f32], [3.0]];
        let y = array![[0.0f32], [1.0]];

        assert_eq!(Mse.loss(y_pred.view(), y.view()).unwrap(), 2.5);
        assert_eq!(
            Mse.loss_prime(y_pred.view(), y.view()).unwrap(),
            array![[1.0f32], [2.0]]
        );
    }

    #[test]
    fn targets_must_match_predictions() {
        let y_pred = array![[1.0f32], [3.0]];
        let y = array![[0.0f32, 1.0]];

        assert!(Mse.loss(y_pred.view(), y.view()).is_err());
        assert!(Mse.loss_prime(y_pred.view(), y.view()).is_err());
    }
}
