// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Lifecycle Tags
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared purpose of a split read.
///
/// The first `FinalEvaluation` read of the test split seals it; a later
/// `Tuning` read of the sealed split is a leakage violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPurpose {
    Tuning,
    FinalEvaluation,
    /// Read-only reporting; never seals and never violates.
    Inspection,
}

impl fmt::Display for AccessPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tuning => "tuning",
            Self::FinalEvaluation => "final_evaluation",
            Self::Inspection => "inspection",
        })
    }
}

/// Payload-free tag of a measure's validation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Unvalidated,
    Validating,
    Validated,
    Rejected,
}

impl ValidationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Validated | Self::Rejected)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unvalidated => "unvalidated",
            Self::Validating => "validating",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
        })
    }
}
