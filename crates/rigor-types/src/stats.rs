// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Statistical Vocabulary
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RigorError;

/// Direction of the alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tail {
    #[default]
    TwoSided,
    /// First group (or correlation) greater than the null.
    Greater,
    /// First group (or correlation) less than the null.
    Less,
}

/// Multiple-comparison correction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// Flat family-wise control: p * m.
    Bonferroni,
    /// Step-down family-wise control.
    #[default]
    Holm,
    /// Benjamini–Hochberg step-up false-discovery control.
    FdrBh,
}

impl CorrectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bonferroni => "bonferroni",
            Self::Holm => "holm",
            Self::FdrBh => "fdr_bh",
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectionMethod {
    type Err = RigorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bonferroni" => Ok(Self::Bonferroni),
            "holm" => Ok(Self::Holm),
            "fdr_bh" | "bh" | "benjamini_hochberg" => Ok(Self::FdrBh),
            other => Err(RigorError::Config(format!(
                "unknown correction method '{other}'"
            ))),
        }
    }
}
