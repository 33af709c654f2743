// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Metric Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serde adapter writing non-finite floats as JSON `null` and reading
/// `null` back as NaN. JSON has no NaN literal.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_some(value)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

/// A ratio that may be undefined (zero denominator).
///
/// Undefined ratios are NaN with `defined = false`; they are never
/// collapsed to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioMetric {
    #[serde(with = "nan_as_null")]
    pub value: f64,
    pub defined: bool,
}

impl RatioMetric {
    pub fn defined(value: f64) -> Self {
        if value.is_finite() {
            Self { value, defined: true }
        } else {
            Self::undefined()
        }
    }

    pub fn undefined() -> Self {
        Self {
            value: f64::NAN,
            defined: false,
        }
    }

    /// `numerator / denominator`, undefined when the denominator is zero.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Self::undefined()
        } else {
            Self::defined(numerator / denominator)
        }
    }

    /// Threshold comparison. An undefined metric never meets a threshold.
    pub fn meets(&self, minimum: f64) -> bool {
        self.defined && self.value >= minimum
    }
}

impl fmt::Display for RatioMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defined {
            write!(f, "{:.3}", self.value)
        } else {
            f.write_str("undefined")
        }
    }
}

/// Metrics a validation threshold may be declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Accuracy,
    Precision,
    Recall,
    F1,
    Kappa,
    Auc,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accuracy => "accuracy",
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::F1 => "f1",
            Self::Kappa => "kappa",
            Self::Auc => "auc",
        })
    }
}

/// How an interval was obtained; embedded for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum IntervalMethod {
    PercentileBootstrap { resamples: usize, seed: u64 },
    Wilson,
    /// Large-sample standard error of Cohen's kappa.
    AnalyticKappa,
    FisherZ,
    HanleyMcNeil,
    /// Normal approximation on an effect-size standard error.
    NormalApprox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    #[serde(with = "nan_as_null")]
    pub lower: f64,
    #[serde(with = "nan_as_null")]
    pub upper: f64,
    pub level: f64,
    pub method: IntervalMethod,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64, level: f64, method: IntervalMethod) -> Self {
        Self {
            lower,
            upper,
            level,
            method,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.is_defined() && value >= self.lower && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Square confusion matrix. Rows are ground-truth classes, columns are
/// predicted classes, both in `classes` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub classes: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn zeros(classes: Vec<String>) -> Self {
        let k = classes.len();
        Self {
            classes,
            counts: vec![vec![0; k]; k],
        }
    }

    pub fn index_of(&self, class: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == class)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.classes.len()).map(|k| self.counts[k][k]).sum()
    }

    pub fn true_positives(&self, k: usize) -> u64 {
        self.counts[k][k]
    }

    /// Row sum: samples whose ground truth is class `k`.
    pub fn support(&self, k: usize) -> u64 {
        self.counts[k].iter().sum()
    }

    /// Column sum: samples predicted as class `k`.
    pub fn predicted(&self, k: usize) -> u64 {
        self.counts.iter().map(|row| row[k]).sum()
    }

    pub fn false_positives(&self, k: usize) -> u64 {
        self.predicted(k) - self.true_positives(k)
    }

    pub fn false_negatives(&self, k: usize) -> u64 {
        self.support(k) - self.true_positives(k)
    }
}

/// Averaging applied to per-class precision/recall/F1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Averaging {
    /// Metrics of the designated positive class only.
    Binary { positive: String },
    /// Support-weighted mean over classes present in the ground truth.
    Weighted,
}

/// Record of the resampling run behind the bootstrap intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResamplingRecord {
    pub method: String,
    pub resamples: usize,
    pub seed: u64,
    pub confidence_level: f64,
    /// Resamples on which the statistic was undefined and was dropped.
    pub degenerate_resamples: usize,
}

/// Calibration metrics of a measure against ground truth. Immutable
/// once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub accuracy: f64,
    pub precision: RatioMetric,
    pub recall: RatioMetric,
    pub f1: RatioMetric,
    pub kappa: RatioMetric,
    pub auc: Option<RatioMetric>,
    pub averaging: Averaging,
    pub confusion_matrix: ConfusionMatrix,
    pub intervals: BTreeMap<MetricName, ConfidenceInterval>,
    pub sample_size: usize,
    pub resampling: ResamplingRecord,
    pub computed_at: DateTime<Utc>,
}

impl ValidationMetrics {
    /// Value of a named metric; undefined metrics yield NaN.
    pub fn metric(&self, name: MetricName) -> RatioMetric {
        match name {
            MetricName::Accuracy => RatioMetric::defined(self.accuracy),
            MetricName::Precision => self.precision,
            MetricName::Recall => self.recall,
            MetricName::F1 => self.f1,
            MetricName::Kappa => self.kappa,
            MetricName::Auc => self.auc.unwrap_or_else(RatioMetric::undefined),
        }
    }

    pub fn interval(&self, name: MetricName) -> Option<&ConfidenceInterval> {
        self.intervals.get(&name)
    }
}

/// One correlation coefficient with its inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEstimate {
    #[serde(with = "nan_as_null")]
    pub coefficient: f64,
    #[serde(with = "nan_as_null")]
    pub p_value: f64,
    pub interval: ConfidenceInterval,
    pub n: usize,
}

/// Agreement with a continuous or behavioural criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMetrics {
    pub pearson: CorrelationEstimate,
    pub spearman: CorrelationEstimate,
    pub sample_size: usize,
}

/// Area under the ROC curve of a continuous score against binary truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AucEstimate {
    pub auc: RatioMetric,
    pub interval: Option<ConfidenceInterval>,
    pub positives: usize,
    pub negatives: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_denominator_is_undefined() {
        let r = RatioMetric::ratio(0.0, 0.0);
        assert!(!r.defined);
        assert!(r.value.is_nan());
        assert!(!r.meets(0.0));
    }

    #[test]
    fn test_ratio_defined() {
        let r = RatioMetric::ratio(3.0, 4.0);
        assert!(r.defined);
        assert!((r.value - 0.75).abs() < 1e-12);
        assert!(r.meets(0.75));
        assert!(!r.meets(0.76));
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let json = serde_json::to_string(&RatioMetric::undefined()).unwrap();
        assert_eq!(json, r#"{"value":null,"defined":false}"#);
        let back: RatioMetric = serde_json::from_str(&json).unwrap();
        assert!(back.value.is_nan());
        assert!(!back.defined);
    }

    #[test]
    fn test_confusion_counts() {
        let mut cm = ConfusionMatrix::zeros(vec!["neg".into(), "pos".into()]);
        cm.counts = vec![vec![50, 10], vec![5, 35]];
        let pos = cm.index_of("pos").unwrap();
        assert_eq!(cm.total(), 100);
        assert_eq!(cm.correct(), 85);
        assert_eq!(cm.true_positives(pos), 35);
        assert_eq!(cm.false_positives(pos), 10);
        assert_eq!(cm.false_negatives(pos), 5);
        assert_eq!(cm.support(pos), 40);
    }

    #[test]
    fn test_interval_contains() {
        let ci = ConfidenceInterval::new(0.2, 0.4, 0.95, IntervalMethod::Wilson);
        assert!(ci.contains(0.3));
        assert!(!ci.contains(0.5));
        assert!((ci.width() - 0.2).abs() < 1e-12);
    }
}
