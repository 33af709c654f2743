// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::lifecycle::{Split, ValidationStatus};

/// Root error type for all Rigor Kernel failures.
///
/// Three families live here: configuration errors (fail fast at setup),
/// lifecycle violations (always raised, carry their diagnostic payload)
/// and plumbing errors (backend, timeout, cancellation, I/O).
/// Statistical degeneracy is never an error; it travels as data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RigorError {
    /// Split ratios do not sum to one, or a split is missing.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// Agreement needs at least two annotators on at least one sample.
    #[error("insufficient annotators: {0}")]
    InsufficientAnnotators(String),

    /// Too few observations for the requested computation.
    #[error("insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    /// Tuning-purpose read of a split already consumed by final evaluation.
    #[error("sealed split violation: {split} split was sealed for final evaluation at {sealed_at}")]
    SealedSplitViolation {
        split: Split,
        sealed_at: DateTime<Utc>,
    },

    /// `validate()` called on a measure that already reached a terminal state.
    #[error("measure '{measure}' already finalized as {status}; construct a fresh instance")]
    AlreadyFinalized {
        measure: String,
        status: ValidationStatus,
    },

    /// `score()` called on a measure that is not `Validated`.
    #[error("measure '{measure}' is not validated (state: {status})")]
    NotValidated {
        measure: String,
        status: ValidationStatus,
    },

    /// A plan is already registered under this project identifier.
    #[error("project '{project_id}' already has a plan registered at {registered_at}")]
    OneShotRegistration {
        project_id: String,
        registered_at: DateTime<Utc>,
    },

    /// No plan registered under this project identifier.
    #[error("no analysis plan registered for project '{0}'")]
    UnknownPlan(String),

    /// A declared test has no data to run on.
    #[error("missing data: {0}")]
    MissingData(String),

    /// Plan failed structural checks at construction.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Invalid input (lengths, labels, ids).
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Statistical backend exceeded its deadline.
    #[error("timeout: statistical backend exceeded {deadline_ms}ms deadline")]
    Timeout { deadline_ms: u64 },

    /// Long-running resampling was cancelled; partial results discarded.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Statistical backend failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// Numerical error (NaN/Inf where a finite value is required).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Report or config (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem access failed.
    #[error("io error: {0}")]
    Io(String),
}

impl RigorError {
    /// True for the errors that represent a methodological failure rather
    /// than a setup or plumbing problem.
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyFinalized { .. }
                | Self::NotValidated { .. }
                | Self::SealedSplitViolation { .. }
                | Self::OneShotRegistration { .. }
        )
    }
}

impl From<serde_json::Error> for RigorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for RigorError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type RigorResult<T> = Result<T, RigorError>;
