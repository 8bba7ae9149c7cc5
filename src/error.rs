use std::{error::Error, fmt, io};

/// Boxed failure reported by an external collaborator (model, checkpoint sink, barrier).
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// The hook's result type.
pub type Result<T> = std::result::Result<T, HookErr>;

/// Validation hook failures. None of them are recovered from inside the hook.
#[derive(Debug)]
pub enum HookErr {
    Io(io::Error),
    Config(String),
    EmptyValidationSet,
    BatchCountMismatch {
        got: usize,
        expected: usize,
    },
    Model {
        batch: Option<usize>,
        source: BoxError,
    },
    NonScalarLoss {
        batch: Option<usize>,
        name: String,
        len: usize,
    },
    Checkpoint {
        name: String,
        source: BoxError,
    },
    Synchronize(BoxError),
}

impl fmt::Display for HookErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookErr::Io(e) => write!(f, "io error: {e}"),
            HookErr::Config(detail) => write!(f, "invalid configuration: {detail}"),
            HookErr::EmptyValidationSet => {
                write!(f, "the validation source has no batches, cannot compute a mean loss")
            }
            HookErr::BatchCountMismatch { got, expected } => write!(
                f,
                "the validation source yielded {got} batches but reported {expected}"
            ),
            HookErr::Model {
                batch: Some(batch),
                source,
            } => write!(f, "model failed on validation batch {batch}: {source}"),
            HookErr::Model {
                batch: None,
                source,
            } => write!(f, "model failed: {source}"),
            HookErr::NonScalarLoss {
                batch: Some(batch),
                name,
                len,
            } => write!(
                f,
                "loss term {name:?} of validation batch {batch} is not a scalar, it has {len} elements"
            ),
            HookErr::NonScalarLoss {
                batch: None,
                name,
                len,
            } => write!(
                f,
                "loss term {name:?} is not a scalar, it has {len} elements"
            ),
            HookErr::Checkpoint { name, source } => {
                write!(f, "failed to save checkpoint {name:?}: {source}")
            }
            HookErr::Synchronize(e) => write!(f, "process group synchronization failed: {e}"),
        }
    }
}

impl HookErr {
    /// Attributes a per-batch failure to the validation batch `idx`.
    pub(crate) fn at_batch(self, idx: usize) -> Self {
        match self {
            HookErr::Model { source, .. } => HookErr::Model {
                batch: Some(idx),
                source,
            },
            HookErr::NonScalarLoss { name, len, .. } => HookErr::NonScalarLoss {
                batch: Some(idx),
                name,
                len,
            },
            other => other,
        }
    }
}

impl Error for HookErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HookErr::Io(e) => Some(e),
            HookErr::Model { source, .. } | HookErr::Checkpoint { source, .. } => {
                Some(source.as_ref())
            }
            HookErr::Synchronize(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for HookErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for HookErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}
