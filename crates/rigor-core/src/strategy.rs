// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Validation Strategy Selection
// ─────────────────────────────────────────────────────────────────────
//! Maps a structured feasibility assessment to a ground-truth strategy.
//!
//! Preference order: an existing labelled benchmark of adequate size,
//! fresh expert annotation, a behavioural criterion, a pilot annotation
//! whose shortfalls become mandatory limitations, and finally
//! "not feasible".

use std::fmt;

use serde::{Deserialize, Serialize};

use rigor_types::RigorConfig;

/// What the caller has available for building ground truth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityAssessment {
    /// Size of an existing labelled benchmark, if one exists.
    #[serde(default)]
    pub existing_benchmark_size: Option<usize>,
    #[serde(default)]
    pub expert_annotators_available: usize,
    /// Samples the annotation budget covers.
    #[serde(default)]
    pub annotation_budget_samples: usize,
    /// An observable outcome the measure should predict.
    #[serde(default)]
    pub behavioral_criterion_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ValidationStrategy {
    ExistingBenchmark,
    ExpertAnnotation,
    BehavioralCriterion,
    PilotAnnotation { mandatory_limitations: Vec<String> },
    NotFeasible,
}

impl ValidationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExistingBenchmark => "existing_benchmark",
            Self::ExpertAnnotation => "expert_annotation",
            Self::BehavioralCriterion => "behavioral_criterion",
            Self::PilotAnnotation { .. } => "pilot_annotation",
            Self::NotFeasible => "not_feasible",
        }
    }

    pub fn is_feasible(&self) -> bool {
        !matches!(self, Self::NotFeasible)
    }
}

impl fmt::Display for ValidationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub strategy: ValidationStrategy,
    pub rationale: String,
}

/// Agreement needs at least two raters.
const MIN_PILOT_ANNOTATORS: usize = 2;

pub fn select_strategy(assessment: &FeasibilityAssessment, config: &RigorConfig) -> StrategyDecision {
    let full = config.min_ground_truth_samples;
    let pilot = config.min_validation_samples;
    let experts = assessment.expert_annotators_available;
    let budget = assessment.annotation_budget_samples;
    let benchmark = assessment.existing_benchmark_size.unwrap_or(0);

    let decision = |strategy, rationale: String| StrategyDecision { strategy, rationale };

    if benchmark >= full {
        return decision(
            ValidationStrategy::ExistingBenchmark,
            format!("existing benchmark of {benchmark} labelled samples meets the {full}-sample minimum"),
        );
    }
    if experts >= config.min_annotators && budget >= full {
        return decision(
            ValidationStrategy::ExpertAnnotation,
            format!(
                "{experts} expert annotators and a {budget}-sample budget meet the \
                 {}-annotator, {full}-sample minimum",
                config.min_annotators
            ),
        );
    }
    if assessment.behavioral_criterion_available {
        return decision(
            ValidationStrategy::BehavioralCriterion,
            "no adequate labelled ground truth; validate by correlation with the behavioural criterion"
                .to_string(),
        );
    }

    let annotatable = experts >= MIN_PILOT_ANNOTATORS && budget >= pilot;
    if annotatable || benchmark >= pilot {
        let mut limitations = Vec::new();
        let size = if annotatable { budget.max(benchmark) } else { benchmark };
        if size < full {
            limitations.push(format!(
                "ground truth limited to {size} samples (recommended minimum {full}); \
                 intervals will be wide"
            ));
        }
        if !annotatable {
            limitations.push(
                "reuses a small existing benchmark; annotation guidelines and agreement \
                 may be undocumented"
                    .to_string(),
            );
        } else if experts < config.min_annotators {
            limitations.push(format!(
                "only {experts} annotators (recommended {}); agreement estimate is unstable",
                config.min_annotators
            ));
        }
        limitations.push("results are preliminary and must be replicated on full ground truth".to_string());
        return decision(
            ValidationStrategy::PilotAnnotation {
                mandatory_limitations: limitations,
            },
            format!("pilot-scale ground truth of {size} samples is the best available option"),
        );
    }

    decision(
        ValidationStrategy::NotFeasible,
        format!(
            "no benchmark, fewer than {MIN_PILOT_ANNOTATORS} annotators or budget below \
             {pilot} samples, and no behavioural criterion"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RigorConfig {
        RigorConfig::default()
    }

    #[test]
    fn test_existing_benchmark_preferred() {
        let a = FeasibilityAssessment {
            existing_benchmark_size: Some(500),
            expert_annotators_available: 5,
            annotation_budget_samples: 1000,
            behavioral_criterion_available: true,
        };
        assert_eq!(select_strategy(&a, &cfg()).strategy, ValidationStrategy::ExistingBenchmark);
    }

    #[test]
    fn test_expert_annotation() {
        let a = FeasibilityAssessment {
            existing_benchmark_size: Some(40),
            expert_annotators_available: 3,
            annotation_budget_samples: 100,
            behavioral_criterion_available: true,
        };
        assert_eq!(select_strategy(&a, &cfg()).strategy, ValidationStrategy::ExpertAnnotation);
    }

    #[test]
    fn test_behavioral_criterion_when_annotation_short() {
        let a = FeasibilityAssessment {
            expert_annotators_available: 2,
            annotation_budget_samples: 50,
            behavioral_criterion_available: true,
            ..Default::default()
        };
        let d = select_strategy(&a, &cfg());
        assert_eq!(d.strategy, ValidationStrategy::BehavioralCriterion);
        assert!(d.strategy.is_feasible());
    }

    #[test]
    fn test_pilot_carries_limitations() {
        let a = FeasibilityAssessment {
            expert_annotators_available: 2,
            annotation_budget_samples: 50,
            ..Default::default()
        };
        let d = select_strategy(&a, &cfg());
        match d.strategy {
            ValidationStrategy::PilotAnnotation {
                mandatory_limitations,
            } => {
                assert_eq!(mandatory_limitations.len(), 3);
                assert!(mandatory_limitations[0].contains("50 samples"));
                assert!(mandatory_limitations[1].contains("only 2 annotators"));
            }
            other => panic!("expected pilot, got {other}"),
        }
    }

    #[test]
    fn test_small_benchmark_pilot() {
        let a = FeasibilityAssessment {
            existing_benchmark_size: Some(60),
            ..Default::default()
        };
        assert_eq!(select_strategy(&a, &cfg()).strategy.name(), "pilot_annotation");
    }

    #[test]
    fn test_not_feasible() {
        let a = FeasibilityAssessment {
            existing_benchmark_size: Some(10),
            expert_annotators_available: 1,
            annotation_budget_samples: 500,
            behavioral_criterion_available: false,
        };
        let d = select_strategy(&a, &cfg());
        assert_eq!(d.strategy, ValidationStrategy::NotFeasible);
        assert!(!d.strategy.is_feasible());
    }

    #[test]
    fn test_thresholds_follow_config() {
        let mut config = cfg();
        config.min_ground_truth_samples = 40;
        let a = FeasibilityAssessment {
            existing_benchmark_size: Some(40),
            ..Default::default()
        };
        assert_eq!(select_strategy(&a, &config).strategy, ValidationStrategy::ExistingBenchmark);
    }

    #[test]
    fn test_decision_serializes_tagged() {
        let d = select_strategy(&FeasibilityAssessment::default(), &cfg());
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"strategy\":\"not_feasible\""));
    }
}
