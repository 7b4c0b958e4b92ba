use log::{info, warn};
use ndarray::{Array2, ArrayView2, Zip};

use super::evaluator::ReferenceEvaluator;
use crate::{ExportErr, Result, export::NetworkArtifact, model::TrainedModel};

/// Tolerance of the reference scenario.
pub const DEFAULT_TOLERANCE: f32 = 1e-6;

/// The outcome of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASSED",
            Verdict::Fail => "FAILED",
        }
    }
}

/// The comparison of one probe input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub input: Vec<f32>,
    pub original: Array2<f32>,
    pub reconstructed: Array2<f32>,
    /// Largest elementwise `|original - reconstructed|`, NaN if any element is NaN.
    pub diff: f32,
    pub verdict: Verdict,
}

/// The comparison of every probe input.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub probes: Vec<ProbeReport>,
    pub tolerance: f32,
    pub verdict: Verdict,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.verdict.is_pass()
    }

    /// Returns the largest diff over all probes, NaN if any diff is NaN.
    pub fn max_diff(&self) -> f32 {
        self.probes.iter().map(|p| p.diff).fold(0.0, nan_max)
    }

    /// Turns a failed verification into an error.
    pub fn into_result(self) -> Result<Self> {
        match self.verdict {
            Verdict::Pass => Ok(self),
            Verdict::Fail => Err(ExportErr::VerificationFailed {
                max_diff: self.max_diff(),
                tolerance: self.tolerance,
            }),
        }
    }
}

// One probe walks Idle -> OriginalEvaluated -> ReconstructedEvaluated -> Compared. Each state is
// its own type, so comparing is only possible once both outputs exist.

struct Idle<'p> {
    input: &'p [f32],
}

struct OriginalEvaluated<'p> {
    input: &'p [f32],
    original: Array2<f32>,
}

struct ReconstructedEvaluated<'p> {
    input: &'p [f32],
    original: Array2<f32>,
    reconstructed: Array2<f32>,
}

impl<'p> Idle<'p> {
    fn evaluate_original<M: TrainedModel>(self, model: &M) -> Result<OriginalEvaluated<'p>> {
        let x = ArrayView2::from_shape((1, self.input.len()), self.input)
            .map_err(|_| ExportErr::shape(1, "input", &[self.input.len()], "a row vector"))?;
        let original = model.predict(x)?;

        Ok(OriginalEvaluated {
            input: self.input,
            original,
        })
    }
}

impl<'p> OriginalEvaluated<'p> {
    fn evaluate_reconstructed(
        self,
        evaluator: &ReferenceEvaluator<'_>,
    ) -> Result<ReconstructedEvaluated<'p>> {
        let columns: Vec<_> = self
            .input
            .iter()
            .map(|v| ArrayView2::from_shape((1, 1), std::slice::from_ref(v)))
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| ExportErr::shape(1, "input", &[self.input.len()], "scalar features"))?;
        let reconstructed = evaluator.evaluate_columns(&columns)?;

        Ok(ReconstructedEvaluated {
            input: self.input,
            original: self.original,
            reconstructed,
        })
    }
}

impl ReconstructedEvaluated<'_> {
    fn compare(self, tolerance: f32) -> Result<ProbeReport> {
        if self.original.shape() != self.reconstructed.shape() {
            return Err(ExportErr::shape(
                1,
                "output",
                self.reconstructed.shape(),
                format!("{:?} like the trained model's output", self.original.shape()),
            ));
        }

        let diff = Zip::from(&self.original)
            .and(&self.reconstructed)
            .fold(0.0, |acc, &o, &r| nan_max(acc, (o - r).abs()));

        // NaN never compares below the tolerance, so it fails.
        let verdict = if diff < tolerance {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        Ok(ProbeReport {
            input: self.input.to_vec(),
            original: self.original,
            reconstructed: self.reconstructed,
            diff,
            verdict,
        })
    }
}

fn nan_max(acc: f32, d: f32) -> f32 {
    if acc.is_nan() || d.is_nan() {
        f32::NAN
    } else {
        acc.max(d)
    }
}

/// Checks that an exported artifact reproduces the trained model it was exported from.
pub struct VerificationController<'a, M: TrainedModel> {
    model: &'a M,
    artifact: &'a NetworkArtifact,
    tolerance: f32,
}

impl<'a, M: TrainedModel> VerificationController<'a, M> {
    /// Creates a new `VerificationController`.
    ///
    /// # Arguments
    /// * `model` - The trained model, the source of truth.
    /// * `artifact` - The artifact as reloaded from storage.
    /// * `tolerance` - The exclusive upper bound for a passing diff.
    ///
    /// # Returns
    /// A new `VerificationController` instance.
    pub fn new(model: &'a M, artifact: &'a NetworkArtifact, tolerance: f32) -> Self {
        Self {
            model,
            artifact,
            tolerance,
        }
    }

    /// Compares both evaluation paths on every probe.
    ///
    /// # Arguments
    /// * `probes` - Fixed input vectors, each `in_features` wide.
    ///
    /// # Returns
    /// The report, which fails if any probe fails, or an error if a probe could not be evaluated.
    pub fn verify<P: AsRef<[f32]>>(&self, probes: &[P]) -> Result<VerificationReport> {
        let evaluator = ReferenceEvaluator::new(self.artifact);

        let reports = probes
            .iter()
            .map(|probe| {
                let report = Idle {
                    input: probe.as_ref(),
                }
                .evaluate_original(self.model)?
                .evaluate_reconstructed(&evaluator)?
                .compare(self.tolerance)?;

                info!("input:         {:?}", report.input);
                info!("original:      {}", report.original);
                info!("reconstructed: {}", report.reconstructed);
                info!("diff:          {}", report.diff);
                Ok(report)
            })
            .collect::<Result<Vec<_>>>()?;

        let verdict = if !reports.is_empty() && reports.iter().all(|r| r.verdict.is_pass()) {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        match verdict {
            Verdict::Pass => info!("weight export test {}", verdict.as_str()),
            Verdict::Fail => warn!("weight export test {}", verdict.as_str()),
        }

        Ok(VerificationReport {
            probes: reports,
            tolerance: self.tolerance,
            verdict,
        })
    }
}
