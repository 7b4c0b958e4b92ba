mod controller;
mod evaluator;

pub use controller::{
    DEFAULT_TOLERANCE, ProbeReport, VerificationController, VerificationReport, Verdict,
};
pub use evaluator::ReferenceEvaluator;
