// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Multiple-Comparison Correction
// ─────────────────────────────────────────────────────────────────────
//! Family-wise (Bonferroni, Holm) and false-discovery-rate
//! (Benjamini–Hochberg) correction over a batch of raw p-values.
//!
//! The family size `m` is the number of declared tests, including those
//! whose p-value is NaN. NaN p-values keep a NaN adjusted value and are
//! never rejected.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use rigor_types::{nan_as_null, CorrectionMethod, RigorConfig, RigorError, RigorResult};

use crate::plan::TestResult;

/// Raw and adjusted p-values with reject/retain decisions, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPValues {
    pub method: CorrectionMethod,
    pub alpha: f64,
    pub raw: Vec<f64>,
    pub adjusted: Vec<f64>,
    pub reject: Vec<bool>,
}

/// One confirmatory result annotated with its correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedResult {
    pub result: TestResult,
    #[serde(with = "nan_as_null")]
    pub adjusted_p: f64,
    pub reject: bool,
    pub method: CorrectionMethod,
    pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionEngine {
    method: CorrectionMethod,
    alpha: f64,
}

impl CorrectionEngine {
    pub fn new(method: CorrectionMethod, alpha: f64) -> RigorResult<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(RigorError::Config(format!(
                "correction alpha must be in (0, 1), got {alpha}"
            )));
        }
        Ok(Self { method, alpha })
    }

    pub fn from_config(config: &RigorConfig) -> RigorResult<Self> {
        Self::new(config.default_correction, config.correction_alpha)
    }

    pub fn method(&self) -> CorrectionMethod {
        self.method
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Adjust `p_values` and decide reject/retain at the engine's alpha.
    pub fn adjust(&self, p_values: &[f64]) -> RigorResult<AdjustedPValues> {
        if let Some(bad) = p_values
            .iter()
            .find(|p| !p.is_nan() && !(0.0..=1.0).contains(*p))
        {
            return Err(RigorError::Validation(format!(
                "p-value {bad} outside [0, 1]"
            )));
        }
        let m = p_values.len();
        let order = ascending_order(p_values);
        let (adjusted, reject) = match self.method {
            CorrectionMethod::Bonferroni => self.bonferroni(p_values),
            CorrectionMethod::Holm => self.holm(p_values, &order),
            CorrectionMethod::FdrBh => self.benjamini_hochberg(p_values, &order),
        };
        log::debug!(
            "{} correction over {m} tests at alpha={}: {} rejected",
            self.method,
            self.alpha,
            reject.iter().filter(|&&r| r).count()
        );
        Ok(AdjustedPValues {
            method: self.method,
            alpha: self.alpha,
            raw: p_values.to_vec(),
            adjusted,
            reject,
        })
    }

    fn bonferroni(&self, p: &[f64]) -> (Vec<f64>, Vec<bool>) {
        let m = p.len() as f64;
        let adjusted: Vec<f64> = p
            .iter()
            .map(|&pi| if pi.is_nan() { f64::NAN } else { (pi * m).min(1.0) })
            .collect();
        let reject = p.iter().map(|&pi| pi <= self.alpha / m).collect();
        (adjusted, reject)
    }

    /// Exact step-down: the i-th smallest p (1-based) is compared with
    /// alpha / (m - i + 1); testing stops at the first retention.
    fn holm(&self, p: &[f64], order: &[usize]) -> (Vec<f64>, Vec<bool>) {
        let m = p.len();
        let mut adjusted = vec![f64::NAN; m];
        let mut reject = vec![false; m];

        let mut running = 0.0_f64;
        for (rank, &idx) in order.iter().enumerate() {
            if p[idx].is_nan() {
                continue;
            }
            let factor = (m - rank) as f64;
            running = running.max((p[idx] * factor).min(1.0));
            adjusted[idx] = running;
        }

        for (rank, &idx) in order.iter().enumerate() {
            let bound = self.alpha / (m - rank) as f64;
            if p[idx].is_nan() || p[idx] > bound {
                break;
            }
            reject[idx] = true;
        }
        (adjusted, reject)
    }

    /// Step-up: reject every hypothesis ranked at or below the largest
    /// rank k with p(k) <= k alpha / m.
    fn benjamini_hochberg(&self, p: &[f64], order: &[usize]) -> (Vec<f64>, Vec<bool>) {
        let m = p.len();
        let mf = m as f64;
        let mut adjusted = vec![f64::NAN; m];
        let mut reject = vec![false; m];

        let mut running = 1.0_f64;
        for (rank0, &idx) in order.iter().enumerate().rev() {
            if p[idx].is_nan() {
                continue;
            }
            running = running.min((p[idx] * mf / (rank0 + 1) as f64).min(1.0));
            adjusted[idx] = running;
        }

        let cutoff = order
            .iter()
            .enumerate()
            .filter(|&(rank0, &idx)| p[idx] <= (rank0 + 1) as f64 * self.alpha / mf)
            .map(|(rank0, _)| rank0)
            .last();
        if let Some(k) = cutoff {
            for &idx in &order[..=k] {
                reject[idx] = true;
            }
        }
        (adjusted, reject)
    }

    /// Annotate confirmatory results with corrected p-values.
    pub fn apply(&self, results: Vec<TestResult>) -> RigorResult<Vec<CorrectedResult>> {
        let raw: Vec<f64> = results.iter().map(|r| r.p_value).collect();
        let adjusted = self.adjust(&raw)?;
        Ok(results
            .into_iter()
            .zip(adjusted.adjusted.iter().zip(&adjusted.reject))
            .map(|(result, (&adjusted_p, &reject))| CorrectedResult {
                result,
                adjusted_p,
                reject,
                method: self.method,
                alpha: self.alpha,
            })
            .collect())
    }
}

/// Indices sorted by ascending p-value, NaN last, ties by input order.
fn ascending_order(p: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p.len()).collect();
    order.sort_by(|&i, &j| match (p[i].is_nan(), p[j].is_nan()) {
        (false, false) => p[i]
            .partial_cmp(&p[j])
            .unwrap_or(Ordering::Equal)
            .then(i.cmp(&j)),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => i.cmp(&j),
    });
    order
}
