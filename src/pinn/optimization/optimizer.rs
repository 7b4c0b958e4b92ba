use crate::{ExportErr, Result};

/// Turns a gradient into a step on one parameter tensor.
///
/// An instance owns whatever running state the rule keeps for its tensor, so a network needs one
/// instance per weight and per bias.
pub trait Optimizer {
    /// Steps `params` against `grad`.
    ///
    /// # Errors
    /// `LengthMismatch` if `grad` and `params` differ in length; `params` is left untouched.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}

pub(super) fn check_lengths(params: &[f32], grad: &[f32]) -> Result<()> {
    if params.len() != grad.len() {
        return Err(ExportErr::LengthMismatch {
            what: "gradient",
            expected: params.len(),
            got: grad.len(),
        });
    }

    Ok(())
}
