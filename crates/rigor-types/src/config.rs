// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{RigorError, RigorResult};
use crate::stats::CorrectionMethod;

/// Interval construction for Cohen's kappa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KappaInterval {
    #[default]
    Bootstrap,
    Analytic,
}

/// Experiment configuration for the Rigor Kernel.
///
/// Passed explicitly to every constructor that needs it; there is no
/// process-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigorConfig {
    /// Bootstrap resamples behind F1/kappa intervals.
    /// Default: 1000.
    pub bootstrap_resamples: usize,

    /// Seed for bootstrap resampling. Recorded in every metrics object.
    /// Default: 42.
    pub bootstrap_seed: u64,

    /// Two-sided confidence level for all intervals.
    /// Default: 0.95.
    pub confidence_level: f64,

    /// Kappa interval construction.
    /// Default: bootstrap.
    pub kappa_interval: KappaInterval,

    /// Spread bootstrap resamples across the rayon pool.
    /// Default: true.
    pub parallel_resampling: bool,

    /// Scores strictly above this are assigned to the positive class.
    /// Default: 0.5.
    pub decision_threshold: f64,

    /// Minimum labelled evaluation samples for `validate()`.
    /// Default: 30.
    pub min_validation_samples: usize,

    /// Overlap above which differing method families are still flagged
    /// as a self-validating pattern.
    /// Default: 0.6.
    pub circularity_threshold: f64,

    /// Family-wise / FDR target level for correction.
    /// Default: 0.05.
    pub correction_alpha: f64,

    /// Correction a plan picks up through `CorrectionSpec::from_config`.
    /// Default: holm.
    pub default_correction: CorrectionMethod,

    /// Deadline for a whole plan execution against the statistical backend.
    /// Default: 5000.
    pub backend_deadline_ms: u64,

    /// Ground-truth quality floor on inter-annotator agreement.
    /// Default: 0.7.
    pub min_inter_rater_kappa: f64,

    /// Ground-truth quality floor on sample count.
    /// Default: 100.
    pub min_ground_truth_samples: usize,

    /// Ground-truth quality floor on distinct annotators.
    /// Default: 3.
    pub min_annotators: usize,

    /// Seed used by `split()` when the caller does not pass one.
    /// Default: 42.
    pub split_seed: u64,
}

impl Default for RigorConfig {
    fn default() -> Self {
        Self {
            bootstrap_resamples: 1000,
            bootstrap_seed: 42,
            confidence_level: 0.95,
            kappa_interval: KappaInterval::Bootstrap,
            parallel_resampling: true,
            decision_threshold: 0.5,
            min_validation_samples: 30,
            circularity_threshold: 0.6,
            correction_alpha: 0.05,
            default_correction: CorrectionMethod::Holm,
            backend_deadline_ms: 5000,
            min_inter_rater_kappa: 0.7,
            min_ground_truth_samples: 100,
            min_annotators: 3,
            split_seed: 42,
        }
    }
}

impl RigorConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> RigorResult<()> {
        if self.bootstrap_resamples < 2 {
            return Err(RigorError::Config(format!(
                "bootstrap_resamples must be >= 2, got {}",
                self.bootstrap_resamples
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(RigorError::Config(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !self.decision_threshold.is_finite() {
            return Err(RigorError::Config(format!(
                "decision_threshold must be finite, got {}",
                self.decision_threshold
            )));
        }
        if self.min_validation_samples < 2 {
            return Err(RigorError::Config(format!(
                "min_validation_samples must be >= 2, got {}",
                self.min_validation_samples
            )));
        }
        if !(0.0..=1.0).contains(&self.circularity_threshold) {
            return Err(RigorError::Config(format!(
                "circularity_threshold must be in [0, 1], got {}",
                self.circularity_threshold
            )));
        }
        if !(self.correction_alpha > 0.0 && self.correction_alpha < 1.0) {
            return Err(RigorError::Config(format!(
                "correction_alpha must be in (0, 1), got {}",
                self.correction_alpha
            )));
        }
        if self.backend_deadline_ms == 0 {
            return Err(RigorError::Config(
                "backend_deadline_ms must be > 0".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.min_inter_rater_kappa) {
            return Err(RigorError::Config(format!(
                "min_inter_rater_kappa must be in [-1, 1], got {}",
                self.min_inter_rater_kappa
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> RigorResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RigorError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
