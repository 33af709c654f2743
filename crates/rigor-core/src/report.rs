// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Study Report
// ─────────────────────────────────────────────────────────────────────
//! The externally consumed artifact: measure validation, circularity
//! verdict, confirmatory plan results and, listed apart, exploratory
//! analyses.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rigor_types::{RigorResult, ValidationStatus};

use crate::circularity::CircularityVerdict;
use crate::correction::CorrectedResult;
use crate::measure::MeasureReport;
use crate::plan::{ExploratoryAnalysis, PlanExecution};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    pub measure: MeasureReport,
    pub circularity: Option<CircularityVerdict>,
    pub plan_id: Option<String>,
    pub plan_fingerprint: Option<String>,
    pub confirmatory: Vec<CorrectedResult>,
    pub exploratory: Vec<ExploratoryAnalysis>,
    pub limitations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl StudyReport {
    pub fn builder(measure: MeasureReport) -> StudyReportBuilder {
        StudyReportBuilder {
            measure,
            circularity: None,
            execution: None,
            exploratory: Vec::new(),
            limitations: Vec::new(),
        }
    }

    pub fn to_json(&self) -> RigorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> RigorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(72);
        let _ = writeln!(out, "{rule}\nSTUDY REPORT: {}\n{rule}", self.measure.name);
        let _ = writeln!(out, "Generated: {}", self.generated_at.to_rfc3339());

        let m = &self.measure;
        let _ = writeln!(out, "\nMEASURE");
        let _ = writeln!(out, "  {} ({})", m.name, m.description);
        let _ = writeln!(out, "  procedure family: {}", m.procedure.family);
        let _ = writeln!(out, "  status: {}", m.status);
        if let Some(outcome) = &m.outcome {
            let metrics = &outcome.metrics;
            let _ = writeln!(
                out,
                "  n={} accuracy={:.3} precision={} recall={} f1={} kappa={}",
                metrics.sample_size,
                metrics.accuracy,
                metrics.precision,
                metrics.recall,
                metrics.f1,
                metrics.kappa
            );
            for (name, ci) in &metrics.intervals {
                let _ = writeln!(
                    out,
                    "  {name} {:.0}% CI [{:.3}, {:.3}] ({:?})",
                    ci.level * 100.0,
                    ci.lower,
                    ci.upper,
                    ci.method
                );
            }
            for check in &outcome.checks {
                let _ = writeln!(
                    out,
                    "  [{}] {} >= {:.3}: observed {}",
                    if check.passed { "pass" } else { "FAIL" },
                    check.metric,
                    check.required,
                    check.observed
                );
            }
        }

        if let Some(v) = &self.circularity {
            let _ = writeln!(out, "\nCIRCULARITY");
            let _ = writeln!(
                out,
                "  {} (overlap {:.2}, threshold {:.2}, {})",
                v.finding, v.overlap, v.threshold, v.strategy
            );
            let _ = writeln!(out, "  {}", v.explanation);
        }

        if let Some(plan_id) = &self.plan_id {
            let _ = writeln!(out, "\nCONFIRMATORY ANALYSES (plan {plan_id})");
            if let Some(fp) = &self.plan_fingerprint {
                let _ = writeln!(out, "  plan sha256: {fp}");
            }
            for r in &self.confirmatory {
                let t = &r.result;
                let _ = writeln!(
                    out,
                    "  {}: {}{} stat={:.4} p={:.4} p_adj={:.4} ({}) {} {:?}={:.3} [{:.3}, {:.3}]{}",
                    t.hypothesis_id,
                    t.test,
                    if t.used_backup { " (backup)" } else { "" },
                    t.statistic,
                    t.p_value,
                    r.adjusted_p,
                    r.method,
                    if r.reject { "reject" } else { "retain" },
                    t.effect_size.kind,
                    t.effect_size.value,
                    t.interval.lower,
                    t.interval.upper,
                    if t.assumption_violated { " ASSUMPTION VIOLATED" } else { "" }
                );
            }
        }

        if !self.exploratory.is_empty() {
            let _ = writeln!(out, "\nEXPLORATORY ANALYSES (not pre-registered, uncorrected)");
            for e in &self.exploratory {
                let _ = writeln!(
                    out,
                    "  {}: {} p={:.4} {:?}={:.3} ({})",
                    e.label,
                    e.result.test,
                    e.result.p_value,
                    e.result.effect_size.kind,
                    e.result.effect_size.value,
                    e.rationale
                );
            }
        }

        if !self.limitations.is_empty() {
            let _ = writeln!(out, "\nLIMITATIONS");
            for l in &self.limitations {
                let _ = writeln!(out, "  - {l}");
            }
        }
        out
    }
}

pub struct StudyReportBuilder {
    measure: MeasureReport,
    circularity: Option<CircularityVerdict>,
    execution: Option<PlanExecution>,
    exploratory: Vec<ExploratoryAnalysis>,
    limitations: Vec<String>,
}

impl StudyReportBuilder {
    pub fn circularity(mut self, verdict: CircularityVerdict) -> Self {
        self.circularity = Some(verdict);
        self
    }

    pub fn execution(mut self, execution: PlanExecution) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn exploratory(mut self, analyses: Vec<ExploratoryAnalysis>) -> Self {
        self.exploratory = analyses;
        self
    }

    pub fn limitation(mut self, text: impl Into<String>) -> Self {
        self.limitations.push(text.into());
        self
    }

    /// Measure limitations come first, then stated ones, then those
    /// derived from the assembled sections.
    pub fn build(self) -> StudyReport {
        let mut limitations = self.measure.limitations.clone();
        limitations.extend(self.limitations);

        if self.measure.status != ValidationStatus::Validated {
            limitations.push(format!(
                "measure '{}' is {}; its scores must not be used as findings",
                self.measure.name, self.measure.status
            ));
        }
        if let Some(v) = self.circularity.as_ref().filter(|v| !v.independent) {
            limitations.push(format!("validation independence not established: {}", v.finding));
        }
        let (plan_id, plan_fingerprint, confirmatory) = match self.execution {
            Some(e) => (Some(e.project_id), Some(e.plan_fingerprint), e.results),
            None => (None, None, Vec::new()),
        };
        for r in confirmatory.iter().filter(|r| r.result.assumption_violated) {
            limitations.push(format!(
                "{}: assumption of {} violated and no backup test was declared",
                r.result.hypothesis_id, r.result.test
            ));
        }
        if !self.exploratory.is_empty() {
            limitations.push(format!(
                "{} exploratory analyses were not pre-registered and are hypothesis-generating only",
                self.exploratory.len()
            ));
        }

        StudyReport {
            measure: self.measure,
            circularity: self.circularity,
            plan_id,
            plan_fingerprint,
            confirmatory,
            exploratory: self.exploratory,
            limitations,
            generated_at: Utc::now(),
        }
    }
}
