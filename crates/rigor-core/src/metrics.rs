// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Metric Engine
// Mirrors: skills/research-methodology-validator/scripts/validated_measure.py
// ─────────────────────────────────────────────────────────────────────
//! Classification, agreement, correlation and AUC metrics.
//!
//! Point estimates are pure functions of (predictions, labels). Interval
//! estimates depend only on the configured seed: every bootstrap resample
//! seeds its own RNG from `(seed, resample_index)`, so a run spread over
//! the rayon pool produces exactly the intervals of a sequential run.
//!
//! Zero denominators are reported as undefined (`RatioMetric::undefined`),
//! never as zero.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use rigor_types::{
    AucEstimate, Averaging, ConfidenceInterval, ConfusionMatrix, CorrelationEstimate,
    CorrelationMetrics, IntervalMethod, KappaInterval, MetricName, RatioMetric, ResamplingRecord,
    RigorConfig, RigorError, RigorResult, ValidationMetrics,
};

use crate::stats::{average_ranks, pearson, percentile_sorted, student_t_cdf, z_critical};

/// Cooperative cancellation flag, checked between resamples.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Confusion-matrix metrics ─────────────────────────────────────────

/// Tabulate predictions against ground truth over `classes`.
pub fn confusion_matrix<P, L>(predictions: &[P], labels: &[L], classes: &[String]) -> ConfusionMatrix
where
    P: AsRef<str>,
    L: AsRef<str>,
{
    let mut cm = ConfusionMatrix::zeros(classes.to_vec());
    for (p, l) in predictions.iter().zip(labels) {
        if let (Some(r), Some(c)) = (cm.index_of(l.as_ref()), cm.index_of(p.as_ref())) {
            cm.counts[r][c] += 1;
        }
    }
    cm
}

/// tp / (tp + fp) for class `k`.
pub fn precision(cm: &ConfusionMatrix, k: usize) -> RatioMetric {
    RatioMetric::ratio(cm.true_positives(k) as f64, cm.predicted(k) as f64)
}

/// tp / (tp + fn) for class `k`.
pub fn recall(cm: &ConfusionMatrix, k: usize) -> RatioMetric {
    RatioMetric::ratio(cm.true_positives(k) as f64, cm.support(k) as f64)
}

/// 2tp / (2tp + fp + fn) for class `k`.
pub fn f1(cm: &ConfusionMatrix, k: usize) -> RatioMetric {
    let tp = cm.true_positives(k) as f64;
    RatioMetric::ratio(
        2.0 * tp,
        2.0 * tp + cm.false_positives(k) as f64 + cm.false_negatives(k) as f64,
    )
}

/// Cohen's kappa from a square agreement table.
pub fn cohen_kappa(cm: &ConfusionMatrix) -> RatioMetric {
    let (po, pe) = agreement_proportions(cm);
    if po.is_nan() || (1.0 - pe).abs() < 1e-15 {
        return RatioMetric::undefined();
    }
    RatioMetric::defined((po - pe) / (1.0 - pe))
}

fn agreement_proportions(cm: &ConfusionMatrix) -> (f64, f64) {
    let n = cm.total() as f64;
    if n == 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let po = cm.correct() as f64 / n;
    let pe = (0..cm.classes.len())
        .map(|k| cm.support(k) as f64 * cm.predicted(k) as f64)
        .sum::<f64>()
        / (n * n);
    (po, pe)
}

/// Support-weighted mean of a per-class metric. Undefined if any class
/// present in the ground truth has an undefined value.
pub fn weighted<F>(cm: &ConfusionMatrix, metric: F) -> RatioMetric
where
    F: Fn(&ConfusionMatrix, usize) -> RatioMetric,
{
    let n = cm.total() as f64;
    if n == 0.0 {
        return RatioMetric::undefined();
    }
    let mut acc = 0.0;
    for k in 0..cm.classes.len() {
        let support = cm.support(k);
        if support == 0 {
            continue;
        }
        let m = metric(cm, k);
        if !m.defined {
            return RatioMetric::undefined();
        }
        acc += support as f64 * m.value;
    }
    RatioMetric::defined(acc / n)
}

fn averaged(cm: &ConfusionMatrix, positive: Option<usize>, metric: fn(&ConfusionMatrix, usize) -> RatioMetric) -> RatioMetric {
    match positive {
        Some(k) => metric(cm, k),
        None => weighted(cm, metric),
    }
}

/// Wilson score interval for a binomial proportion.
pub fn wilson_interval(successes: u64, n: u64, level: f64) -> ConfidenceInterval {
    if n == 0 {
        return ConfidenceInterval::new(f64::NAN, f64::NAN, level, IntervalMethod::Wilson);
    }
    let z = z_critical(level);
    let n = n as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ConfidenceInterval::new(
        (center - half).max(0.0),
        (center + half).min(1.0),
        level,
        IntervalMethod::Wilson,
    )
}

/// Large-sample interval for Cohen's kappa:
/// SE = sqrt(po (1 - po) / (n (1 - pe)^2)).
pub fn analytic_kappa_interval(cm: &ConfusionMatrix, level: f64) -> ConfidenceInterval {
    let kappa = cohen_kappa(cm);
    let (po, pe) = agreement_proportions(cm);
    let n = cm.total() as f64;
    if !kappa.defined || n == 0.0 {
        return ConfidenceInterval::new(f64::NAN, f64::NAN, level, IntervalMethod::AnalyticKappa);
    }
    let se = (po * (1.0 - po) / (n * (1.0 - pe).powi(2))).sqrt();
    let z = z_critical(level);
    ConfidenceInterval::new(
        (kappa.value - z * se).max(-1.0),
        (kappa.value + z * se).min(1.0),
        level,
        IntervalMethod::AnalyticKappa,
    )
}

/// Fisher-z interval for a correlation coefficient.
pub(crate) fn fisher_interval(r: f64, se: f64, level: f64) -> ConfidenceInterval {
    if !r.is_finite() || !se.is_finite() {
        return ConfidenceInterval::new(f64::NAN, f64::NAN, level, IntervalMethod::FisherZ);
    }
    let z = r.clamp(-1.0, 1.0).atanh();
    let zc = z_critical(level);
    ConfidenceInterval::new(
        (z - zc * se).tanh(),
        (z + zc * se).tanh(),
        level,
        IntervalMethod::FisherZ,
    )
}

/// Two-sided p-value of H0: rho = 0 via t = r sqrt((n-2)/(1-r^2)).
pub(crate) fn correlation_p_value(r: f64, n: usize) -> f64 {
    if !r.is_finite() || n < 3 {
        return f64::NAN;
    }
    if r.abs() >= 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    (2.0 * (1.0 - student_t_cdf(t.abs(), df))).clamp(0.0, 1.0)
}

// ── Engine ───────────────────────────────────────────────────────────

/// Label-encoded (prediction, truth) pairs.
struct Encoded {
    classes: Vec<String>,
    predictions: Vec<usize>,
    truth: Vec<usize>,
}

impl Encoded {
    fn tabulate<I: Iterator<Item = usize>>(&self, rows: I) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::zeros(self.classes.clone());
        for i in rows {
            cm.counts[self.truth[i]][self.predictions[i]] += 1;
        }
        cm
    }
}

/// Per-resample statistics.
struct ResampleStats {
    f1: f64,
    kappa: f64,
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Seed of resample `index` under base `seed`.
fn resample_seed(seed: u64, index: usize) -> u64 {
    splitmix64(seed ^ splitmix64(index as u64))
}

/// Percentile interval over the finite entries of `values`.
fn percentile_interval(values: &mut Vec<f64>, level: f64, resamples: usize, seed: u64) -> (ConfidenceInterval, usize) {
    values.retain(|v| v.is_finite());
    let degenerate = resamples - values.len();
    values.sort_by(|a, b| a.total_cmp(b));
    let alpha = 1.0 - level;
    let ci = ConfidenceInterval::new(
        percentile_sorted(values, alpha / 2.0),
        percentile_sorted(values, 1.0 - alpha / 2.0),
        level,
        IntervalMethod::PercentileBootstrap { resamples, seed },
    );
    (ci, degenerate)
}

/// Computes `ValidationMetrics`, correlation metrics and AUC.
#[derive(Debug, Clone)]
pub struct MetricEngine {
    config: RigorConfig,
    cancel: Option<CancelToken>,
}

impl MetricEngine {
    pub fn new(config: RigorConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    pub fn from_config(config: &RigorConfig) -> Self {
        Self::new(config.clone())
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &RigorConfig {
        &self.config
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn encode<P, L>(predictions: &[P], labels: &[L], positive: Option<&str>) -> RigorResult<Encoded>
    where
        P: AsRef<str>,
        L: AsRef<str>,
    {
        if predictions.len() != labels.len() {
            return Err(RigorError::Validation(format!(
                "predictions ({}) and labels ({}) differ in length",
                predictions.len(),
                labels.len()
            )));
        }
        if labels.is_empty() {
            return Err(RigorError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }
        let mut domain: BTreeSet<&str> = predictions
            .iter()
            .map(AsRef::as_ref)
            .chain(labels.iter().map(AsRef::as_ref))
            .collect();
        if let Some(p) = positive {
            domain.insert(p);
        }
        let classes: Vec<String> = domain.into_iter().map(String::from).collect();
        let position = |s: &str| classes.iter().position(|c| c == s).unwrap_or(0);
        let predictions = predictions.iter().map(|p| position(p.as_ref())).collect();
        let truth = labels.iter().map(|l| position(l.as_ref())).collect();
        Ok(Encoded {
            classes,
            predictions,
            truth,
        })
    }

    fn resample(&self, data: &Encoded, positive: Option<usize>, index: usize) -> ResampleStats {
        let n = data.truth.len();
        let mut rng = StdRng::seed_from_u64(resample_seed(self.config.bootstrap_seed, index));
        let cm = data.tabulate((0..n).map(|_| rng.gen_range(0..n)));
        ResampleStats {
            f1: averaged(&cm, positive, f1).value,
            kappa: cohen_kappa(&cm).value,
        }
    }

    fn bootstrap(&self, data: &Encoded, positive: Option<usize>) -> RigorResult<Vec<ResampleStats>> {
        let b = self.config.bootstrap_resamples;
        log::debug!(
            "bootstrap: {b} resamples, seed={}, parallel={}",
            self.config.bootstrap_seed,
            self.config.parallel_resampling
        );
        let stats = if self.config.parallel_resampling {
            (0..b)
                .into_par_iter()
                .map(|i| (!self.cancelled()).then(|| self.resample(data, positive, i)))
                .collect::<Option<Vec<_>>>()
        } else {
            let mut out = Vec::with_capacity(b);
            for i in 0..b {
                if self.cancelled() {
                    break;
                }
                out.push(self.resample(data, positive, i));
            }
            (out.len() == b).then_some(out)
        };
        stats.ok_or_else(|| {
            log::warn!("bootstrap cancelled; partial resamples discarded");
            RigorError::Cancelled("bootstrap resampling cancelled".to_string())
        })
    }

    /// Classification metrics of `predictions` against `labels`.
    ///
    /// With a designated positive class the precision/recall/F1 are those
    /// of that class; otherwise they are support-weighted across classes.
    pub fn classification<P, L>(
        &self,
        predictions: &[P],
        labels: &[L],
        positive: Option<&str>,
    ) -> RigorResult<ValidationMetrics>
    where
        P: AsRef<str>,
        L: AsRef<str>,
    {
        self.evaluate(predictions, labels, positive, None)
    }

    /// As `classification`, additionally computing AUC from the raw
    /// scores when a positive class is designated.
    pub fn classification_with_scores<P, L>(
        &self,
        predictions: &[P],
        labels: &[L],
        positive: &str,
        scores: &[f64],
    ) -> RigorResult<ValidationMetrics>
    where
        P: AsRef<str>,
        L: AsRef<str>,
    {
        self.evaluate(predictions, labels, Some(positive), Some(scores))
    }

    fn evaluate<P, L>(
        &self,
        predictions: &[P],
        labels: &[L],
        positive: Option<&str>,
        scores: Option<&[f64]>,
    ) -> RigorResult<ValidationMetrics>
    where
        P: AsRef<str>,
        L: AsRef<str>,
    {
        let data = Self::encode(predictions, labels, positive)?;
        let positive_idx = positive.and_then(|p| data.classes.iter().position(|c| c == p));
        let cm = data.tabulate(0..data.truth.len());
        let level = self.config.confidence_level;

        let precision = averaged(&cm, positive_idx, precision);
        let recall = averaged(&cm, positive_idx, recall);
        let f1_point = averaged(&cm, positive_idx, f1);
        let kappa = cohen_kappa(&cm);
        let accuracy = cm.correct() as f64 / cm.total() as f64;

        let auc = match (scores, positive) {
            (Some(scores), Some(p)) => {
                let truth: Vec<bool> = labels.iter().map(|l| l.as_ref() == p).collect();
                Some(self.auc(scores, &truth)?)
            }
            _ => None,
        };

        let resamples = self.bootstrap(&data, positive_idx)?;
        let seed = self.config.bootstrap_seed;
        let b = self.config.bootstrap_resamples;
        let mut f1_samples: Vec<f64> = resamples.iter().map(|r| r.f1).collect();
        let (f1_ci, f1_degenerate) = percentile_interval(&mut f1_samples, level, b, seed);

        let mut intervals = BTreeMap::new();
        intervals.insert(MetricName::Accuracy, wilson_interval(cm.correct(), cm.total(), level));
        intervals.insert(MetricName::F1, f1_ci);
        let kappa_degenerate = match self.config.kappa_interval {
            KappaInterval::Bootstrap => {
                let mut kappa_samples: Vec<f64> = resamples.iter().map(|r| r.kappa).collect();
                let (ci, degenerate) = percentile_interval(&mut kappa_samples, level, b, seed);
                intervals.insert(MetricName::Kappa, ci);
                degenerate
            }
            KappaInterval::Analytic => {
                intervals.insert(MetricName::Kappa, analytic_kappa_interval(&cm, level));
                0
            }
        };
        if let Some(ci) = auc.as_ref().and_then(|a| a.interval.clone()) {
            intervals.insert(MetricName::Auc, ci);
        }

        let averaging = match positive {
            Some(p) => Averaging::Binary {
                positive: p.to_string(),
            },
            None => Averaging::Weighted,
        };

        Ok(ValidationMetrics {
            accuracy,
            precision,
            recall,
            f1: f1_point,
            kappa,
            auc: auc.map(|a| a.auc),
            averaging,
            sample_size: cm.total() as usize,
            confusion_matrix: cm,
            intervals,
            resampling: ResamplingRecord {
                method: "percentile_bootstrap".to_string(),
                resamples: b,
                seed,
                confidence_level: level,
                degenerate_resamples: f1_degenerate.max(kappa_degenerate),
            },
            computed_at: Utc::now(),
        })
    }

    /// AUC via the Mann-Whitney statistic with average ranks for ties,
    /// with a Hanley–McNeil interval. Undefined when a class is absent.
    pub fn auc(&self, scores: &[f64], truth: &[bool]) -> RigorResult<AucEstimate> {
        if scores.len() != truth.len() {
            return Err(RigorError::Validation(format!(
                "scores ({}) and truth ({}) differ in length",
                scores.len(),
                truth.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(RigorError::Numerical(format!("non-finite score {bad}")));
        }
        let positives = truth.iter().filter(|&&t| t).count();
        let negatives = truth.len() - positives;
        if positives == 0 || negatives == 0 {
            return Ok(AucEstimate {
                auc: RatioMetric::undefined(),
                interval: None,
                positives,
                negatives,
            });
        }

        let ranks = average_ranks(scores);
        let rank_sum: f64 = ranks
            .iter()
            .zip(truth)
            .filter(|(_, t)| **t)
            .map(|(r, _)| r)
            .sum();
        let (n1, n0) = (positives as f64, negatives as f64);
        let u = rank_sum - n1 * (n1 + 1.0) / 2.0;
        let a = u / (n1 * n0);

        let q1 = a / (2.0 - a);
        let q2 = 2.0 * a * a / (1.0 + a);
        let var = (a * (1.0 - a) + (n1 - 1.0) * (q1 - a * a) + (n0 - 1.0) * (q2 - a * a)) / (n1 * n0);
        let se = var.max(0.0).sqrt();
        let z = z_critical(self.config.confidence_level);
        let interval = ConfidenceInterval::new(
            (a - z * se).max(0.0),
            (a + z * se).min(1.0),
            self.config.confidence_level,
            IntervalMethod::HanleyMcNeil,
        );

        Ok(AucEstimate {
            auc: RatioMetric::defined(a),
            interval: Some(interval),
            positives,
            negatives,
        })
    }

    /// Pearson and Spearman agreement with a continuous criterion.
    pub fn correlation(&self, predicted: &[f64], observed: &[f64]) -> RigorResult<CorrelationMetrics> {
        if predicted.len() != observed.len() {
            return Err(RigorError::Validation(format!(
                "predicted ({}) and observed ({}) differ in length",
                predicted.len(),
                observed.len()
            )));
        }
        let n = predicted.len();
        if n < 4 {
            return Err(RigorError::InsufficientSamples {
                required: 4,
                actual: n,
            });
        }
        if predicted.iter().chain(observed).any(|v| !v.is_finite()) {
            return Err(RigorError::Numerical(
                "correlation inputs must be finite".to_string(),
            ));
        }
        let level = self.config.confidence_level;
        let se = 1.0 / ((n - 3) as f64).sqrt();

        let r = pearson(predicted, observed);
        let rho = pearson(&average_ranks(predicted), &average_ranks(observed));

        Ok(CorrelationMetrics {
            pearson: CorrelationEstimate {
                coefficient: r,
                p_value: correlation_p_value(r, n),
                interval: fisher_interval(r, se, level),
                n,
            },
            spearman: CorrelationEstimate {
                coefficient: rho,
                p_value: correlation_p_value(rho, n),
                interval: fisher_interval(rho, 1.06_f64.sqrt() * se, level),
                n,
            },
            sample_size: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(counts: [[u64; 2]; 2]) -> ConfusionMatrix {
        // classes: [neg, pos]; rows truth, cols prediction
        ConfusionMatrix {
            classes: vec!["neg".into(), "pos".into()],
            counts: counts.iter().map(|r| r.to_vec()).collect(),
        }
    }

    fn engine() -> MetricEngine {
        MetricEngine::new(RigorConfig {
            bootstrap_resamples: 200,
            ..Default::default()
        })
    }

    /// Expand a binary confusion matrix into label vectors.
    fn vectors(tp: usize, fn_: usize, fp: usize, tn: usize) -> (Vec<&'static str>, Vec<&'static str>) {
        let mut pred = Vec::new();
        let mut truth = Vec::new();
        for (p, t, n) in [("pos", "pos", tp), ("neg", "pos", fn_), ("pos", "neg", fp), ("neg", "neg", tn)] {
            pred.extend(std::iter::repeat(p).take(n));
            truth.extend(std::iter::repeat(t).take(n));
        }
        (pred, truth)
    }

    #[test]
    fn test_precision_recall_reference_matrices() {
        // (tn, fp, fn, tp) → reference precision, recall
        let cases: [([[u64; 2]; 2], f64, f64); 5] = [
            ([[50, 10], [5, 35]], 35.0 / 45.0, 35.0 / 40.0),
            ([[90, 0], [0, 10]], 1.0, 1.0),
            ([[10, 40], [30, 20]], 20.0 / 60.0, 20.0 / 50.0),
            ([[0, 5], [0, 5]], 0.5, 1.0),
            ([[8, 1], [1, 0]], 0.0, 0.0),
        ];
        for (counts, p_ref, r_ref) in cases {
            let cm = matrix(counts);
            let pos = cm.index_of("pos").unwrap();
            assert!((precision(&cm, pos).value - p_ref).abs() < 1e-12, "{counts:?}");
            assert!((recall(&cm, pos).value - r_ref).abs() < 1e-12, "{counts:?}");
        }
    }

    #[test]
    fn test_zero_denominator_is_nan_with_flag() {
        // nothing predicted positive → precision undefined
        let cm = matrix([[90, 0], [10, 0]]);
        let pos = 1;
        let p = precision(&cm, pos);
        assert!(!p.defined);
        assert!(p.value.is_nan());
        let r = recall(&cm, pos);
        assert!(r.defined);
        assert_eq!(r.value, 0.0);

        // no positives in truth → recall undefined
        let cm = matrix([[95, 5], [0, 0]]);
        assert!(!recall(&cm, pos).defined);
        assert!(precision(&cm, pos).defined);
    }

    #[test]
    fn test_cohen_kappa_reference() {
        // po = 0.85, pe = 0.6*0.55 + 0.4*0.45 = 0.51 → kappa = 0.34/0.49
        let cm = matrix([[50, 10], [5, 35]]);
        assert!((cohen_kappa(&cm).value - 0.34 / 0.49).abs() < 1e-12);
        // single class everywhere → pe = 1 → undefined
        let cm = matrix([[10, 0], [0, 0]]);
        assert!(!cohen_kappa(&cm).defined);
    }

    #[test]
    fn test_weighted_average() {
        let cm = matrix([[50, 10], [5, 35]]);
        let w = weighted(&cm, recall);
        // (60 * 50/60 + 40 * 35/40) / 100 = 0.85
        assert!((w.value - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_classification_binary_point_estimates() {
        let (pred, truth) = vectors(35, 5, 10, 50);
        let m = engine().classification(&pred, &truth, Some("pos")).unwrap();
        assert_eq!(m.sample_size, 100);
        assert!((m.accuracy - 0.85).abs() < 1e-12);
        assert!((m.precision.value - 35.0 / 45.0).abs() < 1e-12);
        assert!((m.recall.value - 35.0 / 40.0).abs() < 1e-12);
        assert!((m.f1.value - 70.0 / 85.0).abs() < 1e-12);
        assert_eq!(
            m.averaging,
            Averaging::Binary {
                positive: "pos".into()
            }
        );
        let f1_ci = m.interval(MetricName::F1).unwrap();
        assert!(f1_ci.lower <= m.f1.value && m.f1.value <= f1_ci.upper);
        assert_eq!(m.resampling.resamples, 200);
        assert_eq!(m.resampling.seed, 42);
    }

    #[test]
    fn test_classification_deterministic_with_seed() {
        let (pred, truth) = vectors(18, 7, 6, 69);
        let a = engine().classification(&pred, &truth, Some("pos")).unwrap();
        let b = engine().classification(&pred, &truth, Some("pos")).unwrap();
        assert_eq!(a.f1, b.f1);
        assert_eq!(a.kappa, b.kappa);
        assert_eq!(a.intervals, b.intervals);
    }

    #[test]
    fn test_parallel_and_sequential_bootstrap_agree() {
        let (pred, truth) = vectors(30, 10, 8, 52);
        let par = engine().classification(&pred, &truth, Some("pos")).unwrap();
        let seq = MetricEngine::new(RigorConfig {
            bootstrap_resamples: 200,
            parallel_resampling: false,
            ..Default::default()
        })
        .classification(&pred, &truth, Some("pos"))
        .unwrap();
        assert_eq!(par.intervals, seq.intervals);
    }

    #[test]
    fn test_different_seed_changes_interval() {
        let (pred, truth) = vectors(30, 10, 8, 52);
        let a = engine().classification(&pred, &truth, Some("pos")).unwrap();
        let b = MetricEngine::new(RigorConfig {
            bootstrap_resamples: 200,
            bootstrap_seed: 7,
            ..Default::default()
        })
        .classification(&pred, &truth, Some("pos"))
        .unwrap();
        assert_eq!(a.f1, b.f1);
        assert_ne!(a.interval(MetricName::F1), b.interval(MetricName::F1));
    }

    #[test]
    fn test_analytic_kappa_interval() {
        let (pred, truth) = vectors(35, 5, 10, 50);
        let m = MetricEngine::new(RigorConfig {
            bootstrap_resamples: 50,
            kappa_interval: KappaInterval::Analytic,
            ..Default::default()
        })
        .classification(&pred, &truth, Some("pos"))
        .unwrap();
        let ci = m.interval(MetricName::Kappa).unwrap();
        assert_eq!(ci.method, IntervalMethod::AnalyticKappa);
        assert!(ci.contains(m.kappa.value));
    }

    #[test]
    fn test_weighted_multiclass() {
        let pred = ["a", "b", "c", "a", "b", "c"];
        let truth = ["a", "b", "c", "a", "c", "b"];
        let m = engine().classification(&pred, &truth, None).unwrap();
        assert_eq!(m.averaging, Averaging::Weighted);
        assert!((m.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert!((m.recall.value - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        assert!(matches!(
            engine().classification(&["a"], &["a", "b"], None),
            Err(RigorError::Validation(_))
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(
            engine().classification(&empty, &empty, None),
            Err(RigorError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn test_cancelled_run_discards_results() {
        let token = CancelToken::new();
        token.cancel();
        let (pred, truth) = vectors(10, 2, 3, 20);
        for parallel in [true, false] {
            let result = MetricEngine::new(RigorConfig {
                parallel_resampling: parallel,
                ..Default::default()
            })
            .with_cancel_token(token.clone())
            .classification(&pred, &truth, Some("pos"));
            assert!(matches!(result, Err(RigorError::Cancelled(_))));
        }
    }

    #[test]
    fn test_wilson_interval() {
        let ci = wilson_interval(85, 100, 0.95);
        assert!((ci.lower - 0.7672).abs() < 1e-3);
        assert!((ci.upper - 0.9069).abs() < 1e-3);
    }

    #[test]
    fn test_auc_perfect_and_ties() {
        let e = engine();
        let perfect = e
            .auc(&[0.1, 0.2, 0.8, 0.9], &[false, false, true, true])
            .unwrap();
        assert!((perfect.auc.value - 1.0).abs() < 1e-12);

        let tied = e.auc(&[0.5, 0.5, 0.5, 0.5], &[false, true, false, true]).unwrap();
        assert!((tied.auc.value - 0.5).abs() < 1e-12);

        // one inversion out of 4 pairs
        let partial = e.auc(&[0.1, 0.6, 0.4, 0.9], &[false, false, true, true]).unwrap();
        assert!((partial.auc.value - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_undefined() {
        let est = engine().auc(&[0.1, 0.2], &[true, true]).unwrap();
        assert!(!est.auc.defined);
        assert!(est.interval.is_none());
    }

    #[test]
    fn test_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let y = [1.0, 4.0, 9.0, 16.0, 25.0, 36.0, 49.0, 64.0];
        let m = engine().correlation(&x, &y).unwrap();
        assert!((m.spearman.coefficient - 1.0).abs() < 1e-12);
        assert!(m.pearson.coefficient > 0.95 && m.pearson.coefficient < 1.0);
        assert!(m.pearson.p_value < 0.001);
        assert!(m.pearson.interval.contains(m.pearson.coefficient));
        assert!(matches!(
            engine().correlation(&x[..3], &y[..3]),
            Err(RigorError::InsufficientSamples { required: 4, actual: 3 })
        ));
    }
}
