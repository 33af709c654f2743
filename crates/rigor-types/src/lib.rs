// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! Rigor Kernel, the measure-validation and analysis-plan gate for
//! Director-Class AI research workflows.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod stats;

pub use config::{KappaInterval, RigorConfig};
pub use error::{RigorError, RigorResult};
pub use lifecycle::{AccessPurpose, Split, ValidationStatus};
pub use metrics::{
    nan_as_null, AucEstimate, Averaging, ConfidenceInterval, ConfusionMatrix,
    CorrelationEstimate, CorrelationMetrics, IntervalMethod, MetricName, RatioMetric,
    ResamplingRecord, ValidationMetrics,
};
pub use stats::{CorrectionMethod, Tail};
