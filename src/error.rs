use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use ndarray_npy::{ReadNpyError, WriteNpyError};

/// The result type used in the entire export pipeline.
pub type Result<T> = std::result::Result<T, ExportErr>;

/// The export pipeline's error type.
#[derive(Debug)]
pub enum ExportErr {
    /// A layer's parameters do not conform to the expected rank or shape.
    ShapeMismatch {
        /// 1-indexed layer number.
        layer: usize,
        /// The offending array (e.g. "weight", "bias", "input").
        what: &'static str,
        /// Observed shape.
        got: Vec<usize>,
        /// Human-readable description of what was expected.
        expected: String,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    WriteNpy {
        path: PathBuf,
        source: WriteNpyError,
    },
    ReadNpy {
        path: PathBuf,
        source: ReadNpyError,
    },
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The metadata record parsed but breaks one of the artifact's invariants.
    InvalidMetadata {
        layer: String,
        reason: String,
    },
    Checkpoint {
        path: PathBuf,
        reason: String,
    },
    Config {
        path: PathBuf,
        reason: String,
    },
    /// A layer's parameters are unusable before it has a position in a network.
    InvalidLayer {
        reason: String,
    },
    InvalidSettings {
        reason: String,
    },
    /// An optimizer got a gradient that doesn't line up with its parameters.
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    EmptyNetwork,
    NonContiguous {
        what: &'static str,
    },
    VerificationFailed {
        max_diff: f32,
        tolerance: f32,
    },
}

impl ExportErr {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shape(
        layer: usize,
        what: &'static str,
        got: &[usize],
        expected: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            layer,
            what,
            got: got.to_vec(),
            expected: expected.into(),
        }
    }
}

impl Display for ExportErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportErr::ShapeMismatch {
                layer,
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch in layer{layer} {what}: got {got:?}, expected {expected}"
            ),
            ExportErr::Io { path, source } => write!(f, "io error on '{}': {source}", path.display()),
            ExportErr::WriteNpy { path, source } => {
                write!(f, "failed to write array '{}': {source}", path.display())
            }
            ExportErr::ReadNpy { path, source } => {
                write!(f, "failed to read array '{}': {source}", path.display())
            }
            ExportErr::Metadata { path, source } => {
                write!(f, "invalid metadata record '{}': {source}", path.display())
            }
            ExportErr::InvalidMetadata { layer, reason } => {
                write!(f, "invalid metadata for {layer}: {reason}")
            }
            ExportErr::Checkpoint { path, reason } => {
                write!(f, "invalid checkpoint '{}': {reason}", path.display())
            }
            ExportErr::Config { path, reason } => {
                write!(f, "invalid config '{}': {reason}", path.display())
            }
            ExportErr::InvalidLayer { reason } => write!(f, "invalid layer: {reason}"),
            ExportErr::InvalidSettings { reason } => {
                write!(f, "invalid training settings: {reason}")
            }
            ExportErr::LengthMismatch {
                what,
                expected,
                got,
            } => write!(f, "{what} has {got} elements, expected {expected}"),
            ExportErr::EmptyNetwork => write!(f, "the network has no layers"),
            ExportErr::NonContiguous { what } => {
                write!(f, "{what} is not stored contiguously")
            }
            ExportErr::VerificationFailed {
                max_diff,
                tolerance,
            } => write!(
                f,
                "verification failed: max diff {max_diff} is not below tolerance {tolerance}"
            ),
        }
    }
}

impl Error for ExportErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExportErr::Io { source, .. } => Some(source),
            ExportErr::WriteNpy { source, .. } => Some(source),
            ExportErr::ReadNpy { source, .. } => Some(source),
            ExportErr::Metadata { source, .. } => Some(source),
            _ => None,
        }
    }
}
