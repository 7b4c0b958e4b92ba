use super::{Optimizer, optimizer::check_lengths};
use crate::Result;

/// Plain `p -= lr * g`, stateless.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    lr: f32,
}

impl GradientDescent {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_lengths(params, grad)?;

        for (p, &g) in params.iter_mut().zip(grad) {
            *p -= self.lr * g;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExportErr;

    #[test]
    fn steps_against_the_gradient() {
        let mut params = [1.0f32, -2.0];
        GradientDescent::new(0.5)
            .update_params(&mut params, &[2.0, -4.0])
            .unwrap();
        assert_eq!(params, [0.0, 0.0]);
    }

    #[test]
    fn short_gradient_is_rejected() {
        let mut params = [1.0f32, 1.0, 1.0];
        let err = GradientDescent::new(0.5)
            .update_params(&mut params, &[1.0, 1.0])
            .unwrap_err();

        assert!(matches!(
            err,
            ExportErr::LengthMismatch {
                expected: 3,
                got: 2,
                ..
            }
        ));
        assert_eq!(params, [1.0, 1.0, 1.0]);
    }
}
