// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Statistical Backend
// ─────────────────────────────────────────────────────────────────────
//! Pluggable statistical backend and the native implementation of every
//! test an analysis plan may declare.
//!
//! Degenerate inputs (zero variance, all-zero differences) yield NaN
//! statistics and p-values as data. Malformed inputs (length mismatch,
//! too few observations, non-finite values) are errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use rigor_types::{nan_as_null, ConfidenceInterval, IntervalMethod, RigorError, RigorResult, Tail};

use crate::metrics::{fisher_interval, CancelToken};
use crate::stats::{
    average_ranks, f_cdf, mean, normal_cdf, pearson, skewness_kurtosis, student_t_cdf,
    tie_correction, variance, z_critical,
};

/// Arrangement of the observations a test consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataShape {
    TwoSample,
    Paired,
    OneSample,
    Bivariate,
}

impl fmt::Display for DataShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TwoSample => "two-sample",
            Self::Paired => "paired",
            Self::OneSample => "one-sample",
            Self::Bivariate => "bivariate",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestKind {
    WelchT,
    StudentT,
    PairedT,
    OneSampleT { mu: f64 },
    MannWhitneyU,
    WilcoxonSignedRank,
    Pearson,
    Spearman,
}

impl TestKind {
    pub fn shape(&self) -> DataShape {
        match self {
            Self::WelchT | Self::StudentT | Self::MannWhitneyU => DataShape::TwoSample,
            Self::PairedT | Self::WilcoxonSignedRank => DataShape::Paired,
            Self::OneSampleT { .. } => DataShape::OneSample,
            Self::Pearson | Self::Spearman => DataShape::Bivariate,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WelchT => "welch_t",
            Self::StudentT => "student_t",
            Self::PairedT => "paired_t",
            Self::OneSampleT { .. } => "one_sample_t",
            Self::MannWhitneyU => "mann_whitney_u",
            Self::WilcoxonSignedRank => "wilcoxon_signed_rank",
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneSampleT { mu } => write!(f, "one_sample_t(mu={mu})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Pre-declared test assumption, checked at its own alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "assumption", rename_all = "snake_case")]
pub enum Assumption {
    /// Jarque–Bera on each group / the differences / both variables.
    Normality { alpha: f64 },
    /// Two-sided variance-ratio F test.
    EqualVariance { alpha: f64 },
}

impl Assumption {
    pub fn alpha(&self) -> f64 {
        match self {
            Self::Normality { alpha } | Self::EqualVariance { alpha } => *alpha,
        }
    }

    pub fn applies_to(&self, shape: DataShape) -> bool {
        match self {
            Self::Normality { .. } => true,
            Self::EqualVariance { .. } => shape == DataShape::TwoSample,
        }
    }
}

/// Observations for one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TestData {
    TwoSample { a: Vec<f64>, b: Vec<f64> },
    Paired { a: Vec<f64>, b: Vec<f64> },
    OneSample { values: Vec<f64> },
    Bivariate { x: Vec<f64>, y: Vec<f64> },
}

impl TestData {
    pub fn shape(&self) -> DataShape {
        match self {
            Self::TwoSample { .. } => DataShape::TwoSample,
            Self::Paired { .. } => DataShape::Paired,
            Self::OneSample { .. } => DataShape::OneSample,
            Self::Bivariate { .. } => DataShape::Bivariate,
        }
    }

    fn check_finite(&self) -> RigorResult<()> {
        let finite = match self {
            Self::TwoSample { a, b } | Self::Paired { a, b } => {
                a.iter().chain(b).all(|v| v.is_finite())
            }
            Self::OneSample { values } => values.iter().all(|v| v.is_finite()),
            Self::Bivariate { x, y } => x.iter().chain(y).all(|v| v.is_finite()),
        };
        if finite {
            Ok(())
        } else {
            Err(RigorError::Numerical(format!(
                "{} data contains non-finite values",
                self.shape()
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSizeKind {
    CohensD,
    CohensDz,
    RankBiserial,
    CorrelationR,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    pub kind: EffectSizeKind,
    #[serde(with = "nan_as_null")]
    pub value: f64,
}

/// Raw output of one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    #[serde(with = "nan_as_null")]
    pub statistic: f64,
    pub df: Option<f64>,
    #[serde(with = "nan_as_null")]
    pub p_value: f64,
    pub effect_size: EffectSize,
    /// Interval for the effect size.
    pub interval: ConfidenceInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionCheck {
    pub assumption: Assumption,
    #[serde(with = "nan_as_null")]
    pub statistic: f64,
    #[serde(with = "nan_as_null")]
    pub p_value: f64,
    /// False when violated or not assessable.
    pub passed: bool,
}

/// Statistical backend contract.
pub trait StatBackend: Send + Sync {
    fn name(&self) -> &str;

    fn run(
        &self,
        test: &TestKind,
        data: &TestData,
        tail: Tail,
        confidence_level: f64,
    ) -> RigorResult<TestOutcome>;

    /// `run` under a flag the caller raises once it stops waiting for the
    /// result. Long-running backends should poll it and bail out.
    fn run_cancellable(
        &self,
        test: &TestKind,
        data: &TestData,
        tail: Tail,
        confidence_level: f64,
        cancel: &CancelToken,
    ) -> RigorResult<TestOutcome> {
        let _ = cancel;
        self.run(test, data, tail, confidence_level)
    }

    fn check(&self, assumption: &Assumption, data: &TestData) -> RigorResult<AssumptionCheck>;
}

/// p-value of a statistic with a symmetric reference CDF.
fn tail_p(stat: f64, tail: Tail, cdf: impl Fn(f64) -> f64) -> f64 {
    if stat.is_nan() {
        return f64::NAN;
    }
    let p = match tail {
        Tail::TwoSided => 2.0 * (1.0 - cdf(stat.abs())),
        Tail::Greater => 1.0 - cdf(stat),
        Tail::Less => cdf(stat),
    };
    p.clamp(0.0, 1.0)
}

fn require(n: usize, required: usize) -> RigorResult<()> {
    if n < required {
        return Err(RigorError::InsufficientSamples {
            required,
            actual: n,
        });
    }
    Ok(())
}

fn same_length(a: &[f64], b: &[f64]) -> RigorResult<()> {
    if a.len() != b.len() {
        return Err(RigorError::Validation(format!(
            "paired observations differ in length ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

fn normal_interval(value: f64, se: f64, level: f64, lo: f64, hi: f64) -> ConfidenceInterval {
    if !value.is_finite() || !se.is_finite() {
        return ConfidenceInterval::new(f64::NAN, f64::NAN, level, IntervalMethod::NormalApprox);
    }
    let z = z_critical(level);
    ConfidenceInterval::new(
        (value - z * se).max(lo),
        (value + z * se).min(hi),
        level,
        IntervalMethod::NormalApprox,
    )
}

/// Normal z with a 0.5 continuity correction toward the mean.
fn continuity_z(stat: f64, mu: f64, sigma: f64, tail: Tail) -> f64 {
    if !(sigma > 0.0) {
        return f64::NAN;
    }
    let d = stat - mu;
    let corrected = match tail {
        Tail::TwoSided => (d.abs() - 0.5).max(0.0) * d.signum(),
        Tail::Greater => d - 0.5,
        Tail::Less => d + 0.5,
    };
    corrected / sigma
}

/// Hedges-style large-sample SE of Cohen's d.
fn cohens_d_se(d: f64, n1: f64, n2: f64) -> f64 {
    ((n1 + n2) / (n1 * n2) + d * d / (2.0 * (n1 + n2))).sqrt()
}

fn one_sample_t(values: &[f64], mu: f64, tail: Tail, level: f64, kind: EffectSizeKind) -> TestOutcome {
    let n = values.len() as f64;
    let sd = variance(values).sqrt();
    let diff = mean(values) - mu;
    let (t, d) = if sd > 0.0 {
        (diff / (sd / n.sqrt()), diff / sd)
    } else {
        (f64::NAN, f64::NAN)
    };
    let df = n - 1.0;
    let se_d = (1.0 / n + d * d / (2.0 * n)).sqrt();
    TestOutcome {
        statistic: t,
        df: Some(df),
        p_value: tail_p(t, tail, |x| student_t_cdf(x, df)),
        effect_size: EffectSize { kind, value: d },
        interval: normal_interval(d, se_d, level, f64::NEG_INFINITY, f64::INFINITY),
    }
}

fn two_sample_t(a: &[f64], b: &[f64], pooled: bool, tail: Tail, level: f64) -> TestOutcome {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (v1, v2) = (variance(a), variance(b));
    let diff = mean(a) - mean(b);
    let sp = (((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0)).sqrt();

    let (se, df) = if pooled {
        (sp * (1.0 / n1 + 1.0 / n2).sqrt(), n1 + n2 - 2.0)
    } else {
        let (q1, q2) = (v1 / n1, v2 / n2);
        let df = (q1 + q2).powi(2) / (q1 * q1 / (n1 - 1.0) + q2 * q2 / (n2 - 1.0));
        ((q1 + q2).sqrt(), df)
    };
    let t = if se > 0.0 { diff / se } else { f64::NAN };
    let d = if sp > 0.0 { diff / sp } else { f64::NAN };
    TestOutcome {
        statistic: t,
        df: Some(df),
        p_value: tail_p(t, tail, |x| student_t_cdf(x, df)),
        effect_size: EffectSize {
            kind: EffectSizeKind::CohensD,
            value: d,
        },
        interval: normal_interval(d, cohens_d_se(d, n1, n2), level, f64::NEG_INFINITY, f64::INFINITY),
    }
}

fn mann_whitney(a: &[f64], b: &[f64], tail: Tail, level: f64) -> TestOutcome {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let ranks = average_ranks(&pooled);
    let r1: f64 = ranks[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;

    let n = n1 + n2;
    let mu = n1 * n2 / 2.0;
    let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - tie_correction(&pooled) / (n * (n - 1.0)))).sqrt();
    let z = continuity_z(u1, mu, sigma, tail);

    let r = 2.0 * u1 / (n1 * n2) - 1.0;
    TestOutcome {
        statistic: u1,
        df: None,
        p_value: tail_p(z, tail, normal_cdf),
        effect_size: EffectSize {
            kind: EffectSizeKind::RankBiserial,
            value: r,
        },
        interval: normal_interval(r, 2.0 * sigma / (n1 * n2), level, -1.0, 1.0),
    }
}

fn wilcoxon(a: &[f64], b: &[f64], tail: Tail, level: f64) -> TestOutcome {
    let diffs: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len() as f64;
    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&magnitudes);
    let w_plus: f64 = ranks
        .iter()
        .zip(&diffs)
        .filter(|(_, d)| **d > 0.0)
        .map(|(r, _)| r)
        .sum();

    let total = n * (n + 1.0) / 2.0;
    let mu = total / 2.0;
    let sigma = (n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_correction(&magnitudes) / 48.0).sqrt();
    let z = continuity_z(w_plus, mu, sigma, tail);
    let (r, se_r) = if total > 0.0 {
        (2.0 * w_plus / total - 1.0, 2.0 * sigma / total)
    } else {
        (f64::NAN, f64::NAN)
    };
    TestOutcome {
        statistic: w_plus,
        df: None,
        p_value: tail_p(z, tail, normal_cdf),
        effect_size: EffectSize {
            kind: EffectSizeKind::RankBiserial,
            value: r,
        },
        interval: normal_interval(r, se_r, level, -1.0, 1.0),
    }
}

fn correlation_test(x: &[f64], y: &[f64], spearman: bool, tail: Tail, level: f64) -> TestOutcome {
    let n = x.len() as f64;
    let r = if spearman {
        pearson(&average_ranks(x), &average_ranks(y))
    } else {
        pearson(x, y)
    };
    let df = n - 2.0;
    let t = if r.abs() >= 1.0 {
        r.signum() * f64::INFINITY
    } else {
        r * (df / (1.0 - r * r)).sqrt()
    };
    let se = if spearman { 1.06_f64.sqrt() } else { 1.0 } / (n - 3.0).sqrt();
    TestOutcome {
        statistic: r,
        df: Some(df),
        p_value: tail_p(t, tail, |v| student_t_cdf(v, df)),
        effect_size: EffectSize {
            kind: EffectSizeKind::CorrelationR,
            value: r,
        },
        interval: fisher_interval(r, se, level),
    }
}

/// Jarque–Bera statistic and its chi-square(2) p-value.
pub fn jarque_bera(values: &[f64]) -> (f64, f64) {
    let (skew, kurt) = skewness_kurtosis(values);
    if !skew.is_finite() || !kurt.is_finite() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let jb = n / 6.0 * (skew * skew + (kurt - 3.0).powi(2) / 4.0);
    (jb, (-jb / 2.0).exp())
}

/// Two-sided variance-ratio F test.
pub fn variance_ratio_test(a: &[f64], b: &[f64]) -> (f64, f64) {
    let (va, vb) = (variance(a), variance(b));
    if !(vb > 0.0) || !va.is_finite() {
        return (f64::NAN, f64::NAN);
    }
    let f = va / vb;
    let cdf = f_cdf(f, (a.len() - 1) as f64, (b.len() - 1) as f64);
    (f, (2.0 * cdf.min(1.0 - cdf)).clamp(0.0, 1.0))
}

/// In-process backend implementing every `TestKind`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl StatBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn run(
        &self,
        test: &TestKind,
        data: &TestData,
        tail: Tail,
        confidence_level: f64,
    ) -> RigorResult<TestOutcome> {
        if test.shape() != data.shape() {
            return Err(RigorError::Validation(format!(
                "{test} needs {} data, got {}",
                test.shape(),
                data.shape()
            )));
        }
        data.check_finite()?;
        let level = confidence_level;
        let outcome = match (test, data) {
            (TestKind::WelchT | TestKind::StudentT, TestData::TwoSample { a, b }) => {
                require(a.len().min(b.len()), 2)?;
                two_sample_t(a, b, *test == TestKind::StudentT, tail, level)
            }
            (TestKind::MannWhitneyU, TestData::TwoSample { a, b }) => {
                require(a.len().min(b.len()), 2)?;
                mann_whitney(a, b, tail, level)
            }
            (TestKind::PairedT, TestData::Paired { a, b }) => {
                same_length(a, b)?;
                require(a.len(), 2)?;
                let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
                one_sample_t(&diffs, 0.0, tail, level, EffectSizeKind::CohensDz)
            }
            (TestKind::WilcoxonSignedRank, TestData::Paired { a, b }) => {
                same_length(a, b)?;
                require(a.len(), 2)?;
                wilcoxon(a, b, tail, level)
            }
            (TestKind::OneSampleT { mu }, TestData::OneSample { values }) => {
                require(values.len(), 2)?;
                one_sample_t(values, *mu, tail, level, EffectSizeKind::CohensD)
            }
            (TestKind::Pearson | TestKind::Spearman, TestData::Bivariate { x, y }) => {
                same_length(x, y)?;
                require(x.len(), 4)?;
                correlation_test(x, y, *test == TestKind::Spearman, tail, level)
            }
            _ => {
                return Err(RigorError::Validation(format!(
                    "{test} cannot run on {} data",
                    data.shape()
                )))
            }
        };
        Ok(outcome)
    }

    fn check(&self, assumption: &Assumption, data: &TestData) -> RigorResult<AssumptionCheck> {
        data.check_finite()?;
        let (statistic, p_value) = match (assumption, data) {
            (Assumption::Normality { .. }, TestData::TwoSample { a, b })
            | (Assumption::Normality { .. }, TestData::Bivariate { x: a, y: b }) => {
                let (ja, pa) = jarque_bera(a);
                let (jb, pb) = jarque_bera(b);
                if pa.is_nan() || pb.is_nan() {
                    (f64::NAN, f64::NAN)
                } else if pa <= pb {
                    (ja, pa)
                } else {
                    (jb, pb)
                }
            }
            (Assumption::Normality { .. }, TestData::Paired { a, b }) => {
                same_length(a, b)?;
                let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
                jarque_bera(&diffs)
            }
            (Assumption::Normality { .. }, TestData::OneSample { values }) => jarque_bera(values),
            (Assumption::EqualVariance { .. }, TestData::TwoSample { a, b }) => {
                require(a.len().min(b.len()), 2)?;
                variance_ratio_test(a, b)
            }
            (Assumption::EqualVariance { .. }, other) => {
                return Err(RigorError::Validation(format!(
                    "equal-variance check needs two-sample data, got {}",
                    other.shape()
                )))
            }
        };
        Ok(AssumptionCheck {
            assumption: *assumption,
            statistic,
            p_value,
            passed: p_value > assumption.alpha(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(test: TestKind, data: TestData, tail: Tail) -> TestOutcome {
        NativeBackend.run(&test, &data, tail, 0.95).unwrap()
    }

    #[test]
    fn test_welch_reference() {
        // var(a) = 2.5, var(b) = 4.041667: t = -3.583333 / 1.083333, df ≈ 8.988
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.5];
        let o = run(TestKind::WelchT, TestData::TwoSample { a, b }, Tail::TwoSided);
        assert!((o.statistic + 3.307692).abs() < 1e-5, "{}", o.statistic);
        assert!((o.df.unwrap() - 8.988).abs() < 0.01, "{:?}", o.df);
        assert!(o.p_value > 0.005 && o.p_value < 0.015, "{}", o.p_value);
        assert_eq!(o.effect_size.kind, EffectSizeKind::CohensD);
        assert!(o.effect_size.value < 0.0);
        assert!(o.interval.contains(o.effect_size.value));
    }

    #[test]
    fn test_student_equal_groups() {
        let a = vec![2.0, 4.0, 6.0];
        let b = vec![2.0, 4.0, 6.0];
        let o = run(TestKind::StudentT, TestData::TwoSample { a, b }, Tail::TwoSided);
        assert_eq!(o.statistic, 0.0);
        assert!((o.p_value - 1.0).abs() < 1e-9);
        assert_eq!(o.df, Some(4.0));
    }

    #[test]
    fn test_one_sided_tails_sum_to_one() {
        let a = vec![5.1, 4.9, 5.6, 5.8, 6.0, 5.5];
        let b = vec![4.8, 4.7, 5.0, 5.2, 4.9, 5.1];
        let data = TestData::TwoSample { a, b };
        let g = run(TestKind::WelchT, data.clone(), Tail::Greater);
        let l = run(TestKind::WelchT, data.clone(), Tail::Less);
        let two = run(TestKind::WelchT, data, Tail::TwoSided);
        assert!((g.p_value + l.p_value - 1.0).abs() < 1e-9);
        assert!((two.p_value - 2.0 * g.p_value).abs() < 1e-9);
        assert!(g.p_value < 0.05);
    }

    #[test]
    fn test_paired_t_effect_dz() {
        let a = vec![10.0, 12.0, 9.0, 11.0, 13.0];
        let b = vec![9.0, 10.0, 8.0, 10.0, 11.0];
        // diffs 1,2,1,1,2: mean 1.4, sd 0.5477
        let o = run(TestKind::PairedT, TestData::Paired { a, b }, Tail::TwoSided);
        assert!((o.statistic - 1.4 / (0.3_f64.sqrt() / 5.0_f64.sqrt())).abs() < 1e-9);
        assert_eq!(o.effect_size.kind, EffectSizeKind::CohensDz);
        assert!((o.effect_size.value - 1.4 / 0.3_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_one_sample_t() {
        let values = vec![5.0, 5.0, 5.0, 5.0];
        let o = run(TestKind::OneSampleT { mu: 5.0 }, TestData::OneSample { values }, Tail::TwoSided);
        // zero variance is degenerate, returned as NaN data
        assert!(o.statistic.is_nan());
        assert!(o.p_value.is_nan());
    }

    #[test]
    fn test_mann_whitney_separated_groups() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let o = run(TestKind::MannWhitneyU, TestData::TwoSample { a, b }, Tail::TwoSided);
        assert_eq!(o.statistic, 0.0);
        assert!((o.effect_size.value + 1.0).abs() < 1e-12);
        // scipy asymptotic with continuity: p ≈ 0.00507
        assert!((o.p_value - 0.00507).abs() < 5e-4, "{}", o.p_value);
    }

    #[test]
    fn test_wilcoxon_all_positive() {
        let a = vec![2.0, 3.0, 4.5, 6.0, 7.5, 9.0, 11.0, 12.5];
        let b = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let o = run(TestKind::WilcoxonSignedRank, TestData::Paired { a, b }, Tail::Greater);
        assert_eq!(o.statistic, 36.0);
        assert!((o.effect_size.value - 1.0).abs() < 1e-12);
        assert!(o.p_value < 0.01);
    }

    #[test]
    fn test_wilcoxon_all_zero_is_degenerate() {
        let a = vec![1.0, 2.0, 3.0];
        let o = run(
            TestKind::WilcoxonSignedRank,
            TestData::Paired { a: a.clone(), b: a },
            Tail::TwoSided,
        );
        assert!(o.p_value.is_nan());
    }

    #[test]
    fn test_pearson_and_spearman() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = vec![2.1, 3.9, 6.2, 7.8, 10.1, 12.0];
        let p = run(TestKind::Pearson, TestData::Bivariate { x: x.clone(), y: y.clone() }, Tail::TwoSided);
        assert!(p.statistic > 0.99);
        assert!(p.p_value < 1e-3);
        let s = run(TestKind::Spearman, TestData::Bivariate { x, y }, Tail::TwoSided);
        assert!((s.statistic - 1.0).abs() < 1e-12);
        assert_eq!(s.p_value, 0.0);
    }

    #[test]
    fn test_shape_mismatch_and_size_errors() {
        let err = NativeBackend.run(
            &TestKind::PairedT,
            &TestData::OneSample { values: vec![1.0, 2.0] },
            Tail::TwoSided,
            0.95,
        );
        assert!(matches!(err, Err(RigorError::Validation(_))));
        let err = NativeBackend.run(
            &TestKind::Pearson,
            &TestData::Bivariate { x: vec![1.0, 2.0, 3.0], y: vec![1.0, 2.0, 3.0] },
            Tail::TwoSided,
            0.95,
        );
        assert!(matches!(err, Err(RigorError::InsufficientSamples { required: 4, .. })));
        let err = NativeBackend.run(
            &TestKind::WelchT,
            &TestData::TwoSample { a: vec![1.0, f64::NAN], b: vec![1.0, 2.0] },
            Tail::TwoSided,
            0.95,
        );
        assert!(matches!(err, Err(RigorError::Numerical(_))));
    }

    #[test]
    fn test_normality_check() {
        let normalish: Vec<f64> = (0..200)
            .map(|i| crate::stats::normal_quantile((i as f64 + 0.5) / 200.0))
            .collect();
        let check = NativeBackend
            .check(&Assumption::Normality { alpha: 0.05 }, &TestData::OneSample { values: normalish })
            .unwrap();
        assert!(check.passed, "{check:?}");

        let skewed: Vec<f64> = (0..200).map(|i| ((i as f64) / 20.0).exp()).collect();
        let check = NativeBackend
            .check(&Assumption::Normality { alpha: 0.05 }, &TestData::OneSample { values: skewed })
            .unwrap();
        assert!(!check.passed);
        assert!(check.p_value < 0.05);
    }

    #[test]
    fn test_equal_variance_check() {
        let a: Vec<f64> = (0..30).map(|i| (i % 5) as f64).collect();
        let b: Vec<f64> = (0..30).map(|i| (i % 5) as f64 * 10.0).collect();
        let check = NativeBackend
            .check(&Assumption::EqualVariance { alpha: 0.05 }, &TestData::TwoSample { a: a.clone(), b })
            .unwrap();
        assert!(!check.passed);
        let check = NativeBackend
            .check(&Assumption::EqualVariance { alpha: 0.05 }, &TestData::TwoSample { a: a.clone(), b: a })
            .unwrap();
        assert!(check.passed);
        assert!((check.statistic - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_assumption_applicability() {
        assert!(Assumption::Normality { alpha: 0.05 }.applies_to(DataShape::Paired));
        assert!(!Assumption::EqualVariance { alpha: 0.05 }.applies_to(DataShape::Bivariate));
        assert_eq!(TestKind::WilcoxonSignedRank.shape(), DataShape::Paired);
        assert_eq!(TestKind::OneSampleT { mu: 1.0 }.to_string(), "one_sample_t(mu=1)");
    }
}
