// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Circularity Detector
// Mirrors: skills/research-methodology-validator/scripts/validated_measure.py
// ─────────────────────────────────────────────────────────────────────
//! Heuristic independence check between a measurement procedure and the
//! procedure that produced its ground truth.
//!
//! Decision rule:
//! 1. identical method family ⇒ not independent;
//! 2. otherwise an `OverlapStrategy` scores the two descriptors, and an
//!    overlap strictly above the threshold is a self-validating pattern;
//! 3. otherwise independent.
//!
//! The verdict is advisory. Nothing here blocks execution.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rigor_types::RigorConfig;

use crate::measure::{ProcedureDescriptor, ValidatedMeasure};

/// Overlap strategy contract. Scores lie in [0, 1].
pub trait OverlapStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn overlap(&self, measurement: &ProcedureDescriptor, validation: &ProcedureDescriptor) -> f64;

    /// Score plus the name of the strategy that produced it.
    fn score(&self, measurement: &ProcedureDescriptor, validation: &ProcedureDescriptor) -> (f64, String) {
        (self.overlap(measurement, validation), self.name().to_string())
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "each", "for", "from", "in", "into", "is",
    "it", "its", "of", "on", "or", "our", "that", "the", "their", "then", "this", "to", "use",
    "used", "using", "via", "we", "with",
];

fn text_of(d: &ProcedureDescriptor) -> String {
    format!("{} {}", d.family, d.rationale).to_lowercase()
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Token-set Jaccard similarity of two texts; 0 when both are empty.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let (a, b) = (tokens(a), tokens(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Stopword-filtered token-set Jaccard over family tag and rationale.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenJaccard;

impl OverlapStrategy for TokenJaccard {
    fn name(&self) -> &str {
        "token_jaccard"
    }

    fn overlap(&self, measurement: &ProcedureDescriptor, validation: &ProcedureDescriptor) -> f64 {
        jaccard(&text_of(measurement), &text_of(validation))
    }
}

/// Red-flag phrase pairs: the measurement mentions the first phrase and
/// the validation mentions the second. A hit scores 1.0.
#[derive(Debug, Clone)]
pub struct PatternRules {
    rules: Vec<(String, String)>,
}

impl Default for PatternRules {
    fn default() -> Self {
        Self::new([
            ("pattern matching", "pattern matching"),
            ("dictionary", "dictionary"),
            ("same model", "same model"),
            ("self-reported", "self-reported"),
            ("model confidence", "model output"),
        ])
    }
}

impl PatternRules {
    pub fn new<I, A, B>(rules: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(a, b)| (a.into().to_lowercase(), b.into().to_lowercase()))
                .collect(),
        }
    }

    /// First rule matched by the pair, if any.
    pub fn matching_rule(
        &self,
        measurement: &ProcedureDescriptor,
        validation: &ProcedureDescriptor,
    ) -> Option<(&str, &str)> {
        let (m, v) = (text_of(measurement), text_of(validation));
        self.rules
            .iter()
            .find(|(a, b)| m.contains(a.as_str()) && v.contains(b.as_str()))
            .map(|(a, b)| (a.as_str(), b.as_str()))
    }
}

impl OverlapStrategy for PatternRules {
    fn name(&self) -> &str {
        "pattern_rules"
    }

    fn overlap(&self, measurement: &ProcedureDescriptor, validation: &ProcedureDescriptor) -> f64 {
        if self.matching_rule(measurement, validation).is_some() {
            1.0
        } else {
            0.0
        }
    }
}

type OverlapFn = Box<dyn Fn(&ProcedureDescriptor, &ProcedureDescriptor) -> f64 + Send + Sync>;

/// Closure-backed strategy, e.g. embedding cosine similarity computed by
/// a model outside the crate.
pub struct ExternalOverlap {
    name: String,
    overlap_fn: OverlapFn,
}

impl ExternalOverlap {
    pub fn new(
        name: impl Into<String>,
        overlap_fn: impl Fn(&ProcedureDescriptor, &ProcedureDescriptor) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            overlap_fn: Box::new(overlap_fn),
        }
    }
}

impl OverlapStrategy for ExternalOverlap {
    fn name(&self) -> &str {
        &self.name
    }

    fn overlap(&self, measurement: &ProcedureDescriptor, validation: &ProcedureDescriptor) -> f64 {
        (self.overlap_fn)(measurement, validation)
    }
}

/// Maximum over several strategies.
pub struct MaxOverlap {
    name: String,
    strategies: Vec<Arc<dyn OverlapStrategy>>,
}

impl MaxOverlap {
    pub fn new(strategies: Vec<Arc<dyn OverlapStrategy>>) -> Self {
        let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        Self {
            name: format!("max({})", names.join(",")),
            strategies,
        }
    }
}

impl OverlapStrategy for MaxOverlap {
    fn name(&self) -> &str {
        &self.name
    }

    fn overlap(&self, measurement: &ProcedureDescriptor, validation: &ProcedureDescriptor) -> f64 {
        self.score(measurement, validation).0
    }

    fn score(&self, measurement: &ProcedureDescriptor, validation: &ProcedureDescriptor) -> (f64, String) {
        self.strategies
            .iter()
            .map(|s| s.score(measurement, validation))
            .fold((0.0, self.name.clone()), |best, cur| {
                if sanitize(cur.0) > best.0 {
                    (sanitize(cur.0), cur.1)
                } else {
                    best
                }
            })
    }
}

fn sanitize(overlap: f64) -> f64 {
    if overlap.is_finite() {
        overlap.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircularityFinding {
    SameFamily,
    SelfValidating,
    Independent,
}

impl fmt::Display for CircularityFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SameFamily => "same method family",
            Self::SelfValidating => "self-validating pattern",
            Self::Independent => "independent",
        })
    }
}

/// Explained, advisory independence verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularityVerdict {
    pub independent: bool,
    pub overlap: f64,
    pub threshold: f64,
    pub finding: CircularityFinding,
    pub strategy: String,
    pub explanation: String,
}

pub struct CircularityDetector {
    strategy: Arc<dyn OverlapStrategy>,
    threshold: f64,
}

impl Default for CircularityDetector {
    fn default() -> Self {
        Self::from_config(&RigorConfig::default())
    }
}

impl CircularityDetector {
    pub fn new(strategy: Arc<dyn OverlapStrategy>, threshold: f64) -> Self {
        Self {
            strategy,
            threshold,
        }
    }

    /// Token Jaccard composed with the red-flag pattern rules.
    pub fn from_config(config: &RigorConfig) -> Self {
        Self::new(
            Arc::new(MaxOverlap::new(vec![
                Arc::new(TokenJaccard),
                Arc::new(PatternRules::default()),
            ])),
            config.circularity_threshold,
        )
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn check(
        &self,
        measurement: &ProcedureDescriptor,
        validation: &ProcedureDescriptor,
    ) -> CircularityVerdict {
        if measurement.family == validation.family {
            let verdict = CircularityVerdict {
                independent: false,
                overlap: 1.0,
                threshold: self.threshold,
                finding: CircularityFinding::SameFamily,
                strategy: "family_tag".to_string(),
                explanation: format!(
                    "Circular validation: measurement and ground truth both use the '{}' method family; \
                     agreement between them is not independent evidence.",
                    measurement.family
                ),
            };
            log::warn!("{}", verdict.explanation);
            return verdict;
        }

        let (raw, strategy) = self.strategy.score(measurement, validation);
        if !raw.is_finite() {
            log::warn!("overlap strategy '{strategy}' returned {raw}; treating as 0");
        }
        let overlap = sanitize(raw);

        if overlap > self.threshold {
            let verdict = CircularityVerdict {
                independent: false,
                overlap,
                threshold: self.threshold,
                finding: CircularityFinding::SelfValidating,
                strategy: strategy.clone(),
                explanation: format!(
                    "Self-validating pattern: '{}' and '{}' overlap {:.2} (> {:.2}, {}); \
                     the ground truth may reproduce the measurement.",
                    measurement.family, validation.family, overlap, self.threshold, strategy
                ),
            };
            log::warn!("{}", verdict.explanation);
            return verdict;
        }

        CircularityVerdict {
            independent: true,
            overlap,
            threshold: self.threshold,
            finding: CircularityFinding::Independent,
            explanation: format!(
                "Validation appears independent: '{}' vs '{}' overlap {:.2} (<= {:.2}, {}).",
                measurement.family, validation.family, overlap, self.threshold, strategy
            ),
            strategy,
        }
    }

    /// Check a wrapped measure against a proposed validation procedure.
    pub fn check_measure<S>(
        &self,
        measure: &ValidatedMeasure<S>,
        validation: &ProcedureDescriptor,
    ) -> CircularityVerdict {
        self.check(measure.descriptor(), validation)
    }
}
