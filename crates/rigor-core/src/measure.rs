// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Validated Measure (validate-before-use gate)
// Mirrors: skills/research-methodology-validator/scripts/validated_measure.py
// ─────────────────────────────────────────────────────────────────────
//! A measurement instrument wrapped in an explicit validation state
//! machine:
//!
//! ```text
//! Unvalidated ──validate()──▶ Validating ──▶ Validated(outcome)
//!                                        └─▶ Rejected(outcome)
//! ```
//!
//! `Validated` and `Rejected` are terminal. Scoring is only reachable from
//! `Validated`; the metrics of a rejection are kept for diagnosis.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use rigor_types::{
    AccessPurpose, MetricName, RatioMetric, RigorConfig, RigorError, RigorResult, Split,
    ValidationMetrics, ValidationStatus,
};

use crate::dataset::GroundTruthDataset;
use crate::metrics::{CancelToken, MetricEngine};

/// Structured description of a procedure, consumed by the circularity
/// detector. The family tag is normalized to trimmed lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDescriptor {
    pub family: String,
    pub rationale: String,
}

impl ProcedureDescriptor {
    pub fn new(family: impl AsRef<str>, rationale: impl Into<String>) -> Self {
        Self {
            family: family.as_ref().trim().to_lowercase(),
            rationale: rationale.into(),
        }
    }
}

/// Measurement plug-in contract: a descriptor and `score(sample)`.
pub trait Measurement<S>: Send + Sync {
    fn descriptor(&self) -> &ProcedureDescriptor;

    fn score(&self, sample: &S) -> f64;
}

type ScoreFn<S> = Box<dyn Fn(&S) -> f64 + Send + Sync>;

/// Closure-backed measurement, for instruments living outside the crate.
pub struct ExternalMeasurement<S> {
    descriptor: ProcedureDescriptor,
    score_fn: ScoreFn<S>,
}

impl<S> ExternalMeasurement<S> {
    pub fn new(
        descriptor: ProcedureDescriptor,
        score_fn: impl Fn(&S) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptor,
            score_fn: Box::new(score_fn),
        }
    }
}

impl<S> Measurement<S> for ExternalMeasurement<S> {
    fn descriptor(&self) -> &ProcedureDescriptor {
        &self.descriptor
    }

    fn score(&self, sample: &S) -> f64 {
        (self.score_fn)(sample)
    }
}

/// Score → label mapping fixed from the ground truth's label domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discretizer {
    /// Binary domain: `score > cutoff` ⇒ positive.
    Threshold {
        positive: String,
        negative: String,
        cutoff: f64,
    },
    /// Multi-class domain: rounded score indexes the sorted domain.
    Index { classes: Vec<String> },
}

impl Discretizer {
    pub fn for_domain(domain: &[String], positive: Option<&str>, cutoff: f64) -> RigorResult<Self> {
        match positive {
            Some(p) => {
                if domain.len() != 2 {
                    return Err(RigorError::Validation(format!(
                        "positive class '{p}' designated on a {}-class label domain",
                        domain.len()
                    )));
                }
                let negative = domain.iter().find(|c| c.as_str() != p).ok_or_else(|| {
                    RigorError::Validation(format!("label domain has no class besides '{p}'"))
                })?;
                if !domain.iter().any(|c| c == p) {
                    return Err(RigorError::Validation(format!(
                        "positive class '{p}' is not in the label domain {domain:?}"
                    )));
                }
                Ok(Self::Threshold {
                    positive: p.to_string(),
                    negative: negative.clone(),
                    cutoff,
                })
            }
            None if domain.is_empty() => Err(RigorError::Validation(
                "ground truth has an empty label domain".to_string(),
            )),
            None => Ok(Self::Index {
                classes: domain.to_vec(),
            }),
        }
    }

    pub fn label(&self, score: f64) -> &str {
        match self {
            Self::Threshold {
                positive,
                negative,
                cutoff,
            } => {
                if score > *cutoff {
                    positive.as_str()
                } else {
                    negative.as_str()
                }
            }
            Self::Index { classes } => {
                let last = classes.len().saturating_sub(1);
                let idx = score.round().clamp(0.0, last as f64) as usize;
                classes.get(idx).map_or("", String::as_str)
            }
        }
    }

    fn positive(&self) -> Option<&str> {
        match self {
            Self::Threshold { positive, .. } => Some(positive.as_str()),
            Self::Index { .. } => None,
        }
    }
}

/// Minimum acceptable value per metric; judged as a logical AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(BTreeMap<MetricName, f64>);

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: MetricName, minimum: f64) -> Self {
        self.0.insert(metric, minimum);
        self
    }

    pub fn get(&self, metric: MetricName) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        self.0.iter().map(|(&m, &v)| (m, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn check(&self) -> RigorResult<()> {
        if self.is_empty() {
            return Err(RigorError::Config(
                "at least one validation threshold must be declared".to_string(),
            ));
        }
        for (metric, minimum) in self.iter() {
            let lower = if metric == MetricName::Kappa { -1.0 } else { 0.0 };
            if !minimum.is_finite() || !(lower..=1.0).contains(&minimum) {
                return Err(RigorError::Config(format!(
                    "threshold for {metric} must be in [{lower}, 1], got {minimum}"
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(MetricName, f64)> for Thresholds {
    fn from_iter<I: IntoIterator<Item = (MetricName, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of one declared threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCheck {
    pub metric: MetricName,
    pub required: f64,
    pub observed: RatioMetric,
    pub passed: bool,
}

/// Everything a terminal state carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub metrics: ValidationMetrics,
    pub thresholds: Thresholds,
    pub checks: Vec<ThresholdCheck>,
    pub evaluated_split: Option<Split>,
    pub finalized_at: DateTime<Utc>,
}

impl ValidationOutcome {
    pub fn failed_checks(&self) -> impl Iterator<Item = &ThresholdCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationState {
    Unvalidated,
    Validating,
    Validated(ValidationOutcome),
    Rejected(ValidationOutcome),
}

impl ValidationState {
    pub fn status(&self) -> ValidationStatus {
        match self {
            Self::Unvalidated => ValidationStatus::Unvalidated,
            Self::Validating => ValidationStatus::Validating,
            Self::Validated(_) => ValidationStatus::Validated,
            Self::Rejected(_) => ValidationStatus::Rejected,
        }
    }

    pub fn outcome(&self) -> Option<&ValidationOutcome> {
        match self {
            Self::Validated(o) | Self::Rejected(o) => Some(o),
            Self::Unvalidated | Self::Validating => None,
        }
    }
}

/// The measure's section of the report artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureReport {
    pub name: String,
    pub description: String,
    pub procedure: ProcedureDescriptor,
    pub status: ValidationStatus,
    pub outcome: Option<ValidationOutcome>,
    pub limitations: Vec<String>,
}

/// A measurement instrument that refuses to score until validated.
pub struct ValidatedMeasure<S> {
    name: String,
    description: String,
    measurement: Box<dyn Measurement<S>>,
    positive_class: Option<String>,
    state: ValidationState,
    discretizer: Option<Discretizer>,
    limitations: Vec<String>,
    config: RigorConfig,
    cancel: Option<CancelToken>,
}

impl<S> ValidatedMeasure<S> {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        measurement: impl Measurement<S> + 'static,
        config: &RigorConfig,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            measurement: Box::new(measurement),
            positive_class: None,
            state: ValidationState::Unvalidated,
            discretizer: None,
            limitations: Vec::new(),
            config: config.clone(),
            cancel: None,
        }
    }

    /// Designate the positive class; binary metrics and AUC are then
    /// computed for it and scores are cut at `decision_threshold`.
    pub fn with_positive_class(mut self, positive: impl Into<String>) -> Self {
        self.positive_class = Some(positive.into());
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &ProcedureDescriptor {
        self.measurement.descriptor()
    }

    pub fn state(&self) -> &ValidationState {
        &self.state
    }

    pub fn status(&self) -> ValidationStatus {
        self.state.status()
    }

    pub fn metrics(&self) -> Option<&ValidationMetrics> {
        self.state.outcome().map(|o| &o.metrics)
    }

    pub fn limitations(&self) -> &[String] {
        &self.limitations
    }

    /// Allowed in any state; always carried into the report.
    pub fn add_limitation(&mut self, text: impl Into<String>) {
        self.limitations.push(text.into());
    }

    /// Judge the measure against `ground_truth` and the declared
    /// thresholds. The only exit from `Unvalidated`.
    ///
    /// Setup failures (empty thresholds, too few samples, bad label
    /// domain) and interrupted computations leave the measure
    /// `Unvalidated`. A completed run always ends in a terminal state.
    pub fn validate(
        &mut self,
        ground_truth: &GroundTruthDataset<S>,
        thresholds: &Thresholds,
    ) -> RigorResult<ValidationStatus> {
        let status = self.status();
        if status.is_terminal() {
            log::error!(
                "re-validation of '{}' refused: already {}",
                self.name,
                status
            );
            return Err(RigorError::AlreadyFinalized {
                measure: self.name.clone(),
                status,
            });
        }
        thresholds.check()?;
        let discretizer = Discretizer::for_domain(
            ground_truth.label_domain(),
            self.positive_class.as_deref(),
            self.config.decision_threshold,
        )?;

        // Count through an inspection read so a refused run never seals.
        let available = if ground_truth.is_split() {
            ground_truth
                .access(Split::Test, AccessPurpose::Inspection)?
                .labeled_count()
        } else {
            ground_truth.labeled_count()
        };
        if available < self.config.min_validation_samples {
            return Err(RigorError::InsufficientSamples {
                required: self.config.min_validation_samples,
                actual: available,
            });
        }

        self.state = ValidationState::Validating;
        match self.evaluate(ground_truth, &discretizer) {
            Ok((metrics, evaluated_split)) => {
                let checks: Vec<ThresholdCheck> = thresholds
                    .iter()
                    .map(|(metric, required)| {
                        let observed = metrics.metric(metric);
                        ThresholdCheck {
                            metric,
                            required,
                            observed,
                            passed: observed.meets(required),
                        }
                    })
                    .collect();
                let outcome = ValidationOutcome {
                    metrics,
                    thresholds: thresholds.clone(),
                    checks,
                    evaluated_split,
                    finalized_at: Utc::now(),
                };
                if outcome.checks.iter().all(|c| c.passed) {
                    log::info!(
                        "measure '{}' validated on {} samples",
                        self.name,
                        outcome.metrics.sample_size
                    );
                    self.discretizer = Some(discretizer);
                    self.state = ValidationState::Validated(outcome);
                } else {
                    for c in outcome.failed_checks() {
                        log::error!(
                            "measure '{}' rejected: {} = {:.4} < {:.4}",
                            self.name,
                            c.metric,
                            c.observed.value,
                            c.required
                        );
                    }
                    self.state = ValidationState::Rejected(outcome);
                }
                Ok(self.status())
            }
            Err(e) => {
                log::warn!("validation of '{}' interrupted: {e}", self.name);
                self.state = ValidationState::Unvalidated;
                Err(e)
            }
        }
    }

    fn evaluate(
        &self,
        ground_truth: &GroundTruthDataset<S>,
        discretizer: &Discretizer,
    ) -> RigorResult<(ValidationMetrics, Option<Split>)> {
        let view = ground_truth.evaluation_view()?;
        let mut predictions = Vec::with_capacity(view.len());
        let mut labels = Vec::with_capacity(view.len());
        let mut scores = Vec::with_capacity(view.len());
        for (sample, label) in view.labeled() {
            let score = self.invoke(sample)?;
            predictions.push(discretizer.label(score));
            labels.push(label);
            scores.push(score);
        }

        let mut engine = MetricEngine::from_config(&self.config);
        if let Some(token) = &self.cancel {
            engine = engine.with_cancel_token(token.clone());
        }
        let metrics = match discretizer.positive() {
            Some(positive) => {
                engine.classification_with_scores(&predictions, &labels, positive, &scores)?
            }
            None => engine.classification(&predictions, &labels, None)?,
        };
        Ok((metrics, view.split()))
    }

    /// Call the measurement procedure, containing panics and rejecting
    /// non-finite scores.
    fn invoke(&self, sample: &S) -> RigorResult<f64> {
        let score = catch_unwind(AssertUnwindSafe(|| self.measurement.score(sample)))
            .map_err(|_| {
                log::error!("measurement procedure of '{}' panicked", self.name);
                RigorError::Backend(format!("measurement procedure of '{}' panicked", self.name))
            })?;
        if !score.is_finite() {
            return Err(RigorError::Numerical(format!(
                "measurement '{}' returned non-finite score {score}",
                self.name
            )));
        }
        Ok(score)
    }

    fn ensure_validated(&self) -> RigorResult<()> {
        match self.state {
            ValidationState::Validated(_) => Ok(()),
            _ => {
                let status = self.status();
                log::error!("use of unvalidated measure '{}' ({status})", self.name);
                Err(RigorError::NotValidated {
                    measure: self.name.clone(),
                    status,
                })
            }
        }
    }

    /// Score one sample. Only permitted once `Validated`.
    pub fn score(&self, sample: &S) -> RigorResult<f64> {
        self.ensure_validated()?;
        self.invoke(sample)
    }

    pub fn score_batch(&self, samples: &[S]) -> RigorResult<Vec<f64>> {
        self.ensure_validated()?;
        samples.iter().map(|s| self.invoke(s)).collect()
    }

    /// Score and discretize into the ground truth's label domain.
    pub fn classify(&self, sample: &S) -> RigorResult<String> {
        self.ensure_validated()?;
        let score = self.invoke(sample)?;
        let discretizer = self.discretizer.as_ref().ok_or_else(|| {
            RigorError::Validation(format!("measure '{}' has no label mapping", self.name))
        })?;
        Ok(discretizer.label(score).to_string())
    }

    pub fn report(&self) -> MeasureReport {
        MeasureReport {
            name: self.name.clone(),
            description: self.description.clone(),
            procedure: self.descriptor().clone(),
            status: self.status(),
            outcome: self.state.outcome().cloned(),
            limitations: self.limitations.clone(),
        }
    }
}

/// One independent validation: a measure, its private dataset and the
/// thresholds it is judged against.
pub struct ValidationJob<'a, S> {
    pub measure: ValidatedMeasure<S>,
    pub ground_truth: &'a GroundTruthDataset<S>,
    pub thresholds: Thresholds,
}

/// Validate independent measures across the rayon pool. Results are in
/// job order; each measure's state is updated in place.
pub fn validate_in_parallel<S: Send + Sync>(
    jobs: &mut [ValidationJob<'_, S>],
) -> Vec<RigorResult<ValidationStatus>> {
    jobs.par_iter_mut()
        .map(|job| job.measure.validate(job.ground_truth, &job.thresholds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 samples, 25 "biased"; three annotators with Fleiss kappa ≈ 0.75.
    fn ground_truth() -> GroundTruthDataset<usize> {
        let mut b = GroundTruthDataset::builder();
        for i in 0..100 {
            let id = format!("s{i}");
            let gold = if i < 25 { "biased" } else { "neutral" };
            let c = if i < 7 { "neutral" } else { gold };
            let bb = if (30..37).contains(&i) { "biased" } else { gold };
            b = b
                .sample(id.clone(), i)
                .label(id.clone(), gold)
                .annotate(id.clone(), "a", gold)
                .annotate(id.clone(), "b", bb)
                .annotate(id, "c", c);
        }
        b.build().unwrap()
    }

    fn detector_score(i: &usize) -> f64 {
        // TP 18, FN 7, FP 6, TN 69 → F1 ≈ 0.735, kappa ≈ 0.649
        if *i < 18 || (25..31).contains(i) {
            0.9
        } else {
            0.1
        }
    }

    fn config() -> RigorConfig {
        RigorConfig {
            bootstrap_resamples: 200,
            ..Default::default()
        }
    }

    fn measure() -> ValidatedMeasure<usize> {
        ValidatedMeasure::new(
            "bias_detector",
            "keyword bias detector",
            ExternalMeasurement::new(
                ProcedureDescriptor::new("Dictionary", "counts loaded terms"),
                detector_score,
            ),
            &config(),
        )
        .with_positive_class("biased")
    }

    fn passing() -> Thresholds {
        Thresholds::new()
            .with(MetricName::F1, 0.7)
            .with(MetricName::Kappa, 0.6)
    }

    #[test]
    fn test_descriptor_family_normalized() {
        let d = ProcedureDescriptor::new("  Pattern Matching ", "x");
        assert_eq!(d.family, "pattern matching");
    }

    #[test]
    fn test_end_to_end_validated() {
        let gt = ground_truth();
        let agreement = gt.inter_annotator_agreement().unwrap();
        assert!((agreement.kappa.value - 0.7511).abs() < 1e-3);

        let mut m = measure();
        let status = m.validate(&gt, &passing()).unwrap();
        assert_eq!(status, ValidationStatus::Validated);
        let metrics = m.metrics().unwrap();
        assert!((metrics.f1.value - 36.0 / 49.0).abs() < 1e-12);
        assert!((metrics.kappa.value - 0.24 / 0.37).abs() < 1e-12);
        assert!((metrics.recall.value - 0.72).abs() < 1e-12);
        assert!(metrics.auc.is_some());
        assert_eq!(m.score(&3).unwrap(), 0.9);
        assert_eq!(m.classify(&50).unwrap(), "neutral");
        assert_eq!(m.score_batch(&[0, 99]).unwrap(), vec![0.9, 0.1]);
    }

    #[test]
    fn test_end_to_end_rejected_keeps_metrics() {
        let gt = ground_truth();
        let mut m = measure();
        let status = m
            .validate(&gt, &Thresholds::new().with(MetricName::F1, 0.8))
            .unwrap();
        assert_eq!(status, ValidationStatus::Rejected);
        let outcome = m.state().outcome().unwrap();
        assert!((outcome.metrics.f1.value - 36.0 / 49.0).abs() < 1e-12);
        assert_eq!(outcome.failed_checks().count(), 1);
        assert!(matches!(
            m.score(&0),
            Err(RigorError::NotValidated {
                status: ValidationStatus::Rejected,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_twice_is_already_finalized() {
        let gt = ground_truth();
        for thresholds in [passing(), Thresholds::new().with(MetricName::F1, 0.99)] {
            let mut m = measure();
            m.validate(&gt, &thresholds).unwrap();
            let err = m.validate(&gt, &Thresholds::new().with(MetricName::F1, 0.1));
            assert!(matches!(err, Err(RigorError::AlreadyFinalized { .. })));
        }
    }

    #[test]
    fn test_score_before_validation_fails_regardless_of_limitations() {
        let mut m = measure();
        m.add_limitation("English-only");
        m.add_limitation("news domain");
        assert!(matches!(
            m.score(&0),
            Err(RigorError::NotValidated {
                status: ValidationStatus::Unvalidated,
                ..
            })
        ));
        assert!(m.score_batch(&[0]).is_err());
        assert!(m.classify(&0).is_err());
        assert_eq!(m.report().limitations.len(), 2);
    }

    #[test]
    fn test_empty_thresholds_rejected_at_setup() {
        let mut m = measure();
        let err = m.validate(&ground_truth(), &Thresholds::new());
        assert!(matches!(err, Err(RigorError::Config(_))));
        assert_eq!(m.status(), ValidationStatus::Unvalidated);
    }

    #[test]
    fn test_insufficient_samples_leaves_unvalidated_and_unsealed() {
        let mut gt = ground_truth();
        gt.split(0.7, 0.15, 0.15, 1).unwrap();
        let mut m = measure();
        let err = m.validate(&gt, &passing());
        assert!(matches!(
            err,
            Err(RigorError::InsufficientSamples { required: 30, .. })
        ));
        assert_eq!(m.status(), ValidationStatus::Unvalidated);
        assert!(!gt.is_sealed());
    }

    #[test]
    fn test_validation_seals_test_split() {
        let mut gt = ground_truth();
        gt.split(0.5, 0.1, 0.4, 3).unwrap();
        let mut m = ValidatedMeasure::new(
            "bias_detector",
            "",
            ExternalMeasurement::new(ProcedureDescriptor::new("dictionary", ""), detector_score),
            &RigorConfig {
                bootstrap_resamples: 100,
                min_validation_samples: 20,
                ..Default::default()
            },
        )
        .with_positive_class("biased");
        m.validate(&gt, &Thresholds::new().with(MetricName::Accuracy, 0.5))
            .unwrap();
        let outcome = m.state().outcome().unwrap();
        assert_eq!(outcome.evaluated_split, Some(Split::Test));
        assert_eq!(outcome.metrics.sample_size, gt.split_sizes()[&Split::Test]);
        assert!(gt.is_sealed());
        assert!(matches!(
            gt.access(Split::Test, AccessPurpose::Tuning),
            Err(RigorError::SealedSplitViolation { .. })
        ));
    }

    #[test]
    fn test_cancellation_reverts_to_unvalidated() {
        let token = CancelToken::new();
        token.cancel();
        let mut m = measure().with_cancel_token(token);
        let err = m.validate(&ground_truth(), &passing());
        assert!(matches!(err, Err(RigorError::Cancelled(_))));
        assert_eq!(m.status(), ValidationStatus::Unvalidated);
    }

    #[test]
    fn test_panicking_measurement_is_backend_error() {
        let mut m = ValidatedMeasure::new(
            "broken",
            "",
            ExternalMeasurement::new(ProcedureDescriptor::new("model", ""), |_: &usize| {
                panic!("model crashed")
            }),
            &config(),
        )
        .with_positive_class("biased");
        let err = m.validate(&ground_truth(), &passing());
        assert!(matches!(err, Err(RigorError::Backend(_))));
        assert_eq!(m.status(), ValidationStatus::Unvalidated);
    }

    #[test]
    fn test_positive_class_outside_domain() {
        let mut m = measure().with_positive_class("toxic");
        assert!(matches!(
            m.validate(&ground_truth(), &passing()),
            Err(RigorError::Validation(_))
        ));
    }

    #[test]
    fn test_multiclass_index_discretizer() {
        let d = Discretizer::for_domain(
            &["high".into(), "low".into(), "mid".into()],
            None,
            0.5,
        )
        .unwrap();
        assert_eq!(d.label(-3.0), "high");
        assert_eq!(d.label(1.2), "low");
        assert_eq!(d.label(7.0), "mid");
    }

    #[test]
    fn test_threshold_discretizer_cut_is_strict() {
        let d = Discretizer::for_domain(&["neg".into(), "pos".into()], Some("pos"), 0.5).unwrap();
        assert_eq!(d.label(0.5), "neg");
        assert_eq!(d.label(0.51), "pos");
    }

    #[test]
    fn test_report_in_any_state() {
        let mut m = measure();
        let r = m.report();
        assert_eq!(r.status, ValidationStatus::Unvalidated);
        assert!(r.outcome.is_none());
        m.validate(&ground_truth(), &passing()).unwrap();
        m.add_limitation("validated on news text only");
        let r = m.report();
        assert_eq!(r.status, ValidationStatus::Validated);
        assert_eq!(r.procedure.family, "dictionary");
        assert_eq!(r.limitations, vec!["validated on news text only".to_string()]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"status\":\"validated\""));
    }

    #[test]
    fn test_validate_in_parallel() {
        let a = ground_truth();
        let b = ground_truth();
        let mut jobs = vec![
            ValidationJob {
                measure: measure(),
                ground_truth: &a,
                thresholds: passing(),
            },
            ValidationJob {
                measure: measure(),
                ground_truth: &b,
                thresholds: Thresholds::new().with(MetricName::F1, 0.8),
            },
        ];
        let results = validate_in_parallel(&mut jobs);
        assert_eq!(results[0], Ok(ValidationStatus::Validated));
        assert_eq!(results[1], Ok(ValidationStatus::Rejected));
        assert_eq!(jobs[0].measure.status(), ValidationStatus::Validated);
    }
}
