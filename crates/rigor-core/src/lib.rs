// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Measure validation, leakage-proof ground truth, circularity
//! detection and locked statistical analysis plans for research
//! workflows.
//!
//! # Safety Invariants
//!
//! 1. **No score before validation**: `ValidatedMeasure::score()` is
//!    reachable only from the `Validated` state. `Validated` and
//!    `Rejected` are terminal; a second `validate()` raises
//!    `AlreadyFinalized`.
//!
//! 2. **The test split is read once for evaluation**: the first
//!    `FinalEvaluation` read seals it with a timestamp. Any later
//!    `Tuning` read raises `SealedSplitViolation` carrying that
//!    timestamp.
//!
//! 3. **One plan per project**: a registered plan is locked and
//!    fingerprinted. A second registration raises `OneShotRegistration`.
//!    Execution runs exactly the declared tests; analyses outside the
//!    plan are stored apart and tagged exploratory.
//!
//! 4. **Undefined is not zero**: zero-denominator metrics and
//!    degenerate statistics are NaN with an explicit flag, and travel as
//!    JSON `null`.
//!
//! 5. **Reproducible resampling**: every bootstrap resample derives its
//!    stream from (seed, index); sequential and parallel runs agree.

pub mod audit;
pub mod backend;
pub mod circularity;
pub mod correction;
pub mod dataset;
pub mod measure;
pub mod metrics;
pub mod plan;
pub mod report;
pub mod stats;
pub mod strategy;

pub use audit::{
    AuditReport, AuditSummary, IssueCategory, MethodologyAuditor, MethodologyIssue, Severity,
};
pub use backend::{
    Assumption, AssumptionCheck, DataShape, EffectSize, EffectSizeKind, NativeBackend,
    StatBackend, TestData, TestKind, TestOutcome,
};
pub use circularity::{
    CircularityDetector, CircularityFinding, CircularityVerdict, ExternalOverlap, MaxOverlap,
    OverlapStrategy, PatternRules, TokenJaccard,
};
pub use correction::{AdjustedPValues, CorrectedResult, CorrectionEngine};
pub use dataset::{
    AgreementReport, AgreementStatistic, DatasetBuilder, DatasetMetadata, GroundTruthDataset,
    GroundTruthRecord, QualityAssessment, SealRecord, SplitView,
};
pub use measure::{
    validate_in_parallel, Discretizer, ExternalMeasurement, MeasureReport, Measurement,
    ProcedureDescriptor, ThresholdCheck, Thresholds, ValidatedMeasure, ValidationJob,
    ValidationOutcome, ValidationState,
};
pub use metrics::{CancelToken, MetricEngine};
pub use plan::{
    AnalysisData, AnalysisPlan, AnalysisPlanRegistry, CorrectionSpec, ExploratoryAnalysis,
    Hypothesis, PlanDraft, PlanExecution, TestResult, TestSpec,
};
pub use report::{StudyReport, StudyReportBuilder};
pub use strategy::{select_strategy, FeasibilityAssessment, StrategyDecision, ValidationStrategy};
