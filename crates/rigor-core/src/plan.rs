// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Analysis Plan Registry
// ─────────────────────────────────────────────────────────────────────
//! Pre-registered, locked statistical analysis plans.
//!
//! A plan is validated and locked at construction; no method mutates it
//! afterwards. The registry accepts one plan per project identifier and
//! executes exactly the tests the plan declares. Analyses outside the
//! plan are stored separately, tagged exploratory.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use rigor_types::{
    nan_as_null, ConfidenceInterval, CorrectionMethod, RigorConfig, RigorError, RigorResult, Tail,
};

use crate::backend::{
    Assumption, AssumptionCheck, EffectSize, NativeBackend, StatBackend, TestData, TestKind,
    TestOutcome,
};
use crate::correction::{CorrectedResult, CorrectionEngine};
use crate::metrics::CancelToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub statement: String,
    #[serde(default)]
    pub tail: Tail,
    /// Restates the correction alpha; absent means inherit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

impl Hypothesis {
    pub fn new(id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            tail: Tail::TwoSided,
            alpha: None,
        }
    }

    pub fn with_tail(mut self, tail: Tail) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
}

/// The test declared for one hypothesis, including any conditional
/// branch ("if an assumption fails, run the backup").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    pub hypothesis_id: String,
    pub test: TestKind,
    #[serde(default)]
    pub assumptions: Vec<Assumption>,
    #[serde(default)]
    pub backup: Option<TestKind>,
}

impl TestSpec {
    pub fn new(hypothesis_id: impl Into<String>, test: TestKind) -> Self {
        Self {
            hypothesis_id: hypothesis_id.into(),
            test,
            assumptions: Vec::new(),
            backup: None,
        }
    }

    pub fn assuming(mut self, assumption: Assumption) -> Self {
        self.assumptions.push(assumption);
        self
    }

    pub fn with_backup(mut self, backup: TestKind) -> Self {
        self.backup = Some(backup);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSpec {
    pub method: CorrectionMethod,
    pub alpha: f64,
}

impl CorrectionSpec {
    pub fn from_config(config: &RigorConfig) -> Self {
        Self {
            method: config.default_correction,
            alpha: config.correction_alpha,
        }
    }
}

/// Unlocked plan content, as authored or loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub project_id: String,
    pub hypotheses: Vec<Hypothesis>,
    pub tests: Vec<TestSpec>,
    pub correction: CorrectionSpec,
}

impl PlanDraft {
    fn check(&self) -> RigorResult<()> {
        let invalid = |msg: String| Err(RigorError::InvalidPlan(msg));
        if self.project_id.trim().is_empty() {
            return invalid("project id is empty".to_string());
        }
        if self.hypotheses.is_empty() {
            return invalid("plan declares no hypotheses".to_string());
        }
        if !(self.correction.alpha > 0.0 && self.correction.alpha < 1.0) {
            return invalid(format!(
                "correction alpha must be in (0, 1), got {}",
                self.correction.alpha
            ));
        }

        let mut ids = HashSet::new();
        for h in &self.hypotheses {
            if !ids.insert(h.id.as_str()) {
                return invalid(format!("duplicate hypothesis id '{}'", h.id));
            }
            let Some(alpha) = h.alpha else {
                continue;
            };
            if !(alpha > 0.0 && alpha < 1.0) {
                return invalid(format!("hypothesis '{}' alpha must be in (0, 1)", h.id));
            }
            // Decisions use the family-wise correction alpha only.
            if (alpha - self.correction.alpha).abs() > 1e-12 {
                return Err(RigorError::Config(format!(
                    "hypothesis '{}' alpha {alpha} differs from correction alpha {}",
                    h.id, self.correction.alpha
                )));
            }
        }

        let mut specified = HashSet::new();
        for spec in &self.tests {
            let hid = spec.hypothesis_id.as_str();
            if !ids.contains(hid) {
                return invalid(format!("test declared for unknown hypothesis '{hid}'"));
            }
            if !specified.insert(hid) {
                return invalid(format!("hypothesis '{hid}' has more than one test"));
            }
            let shape = spec.test.shape();
            for assumption in &spec.assumptions {
                if !assumption.applies_to(shape) {
                    return invalid(format!(
                        "assumption {assumption:?} does not apply to {shape} test {}",
                        spec.test
                    ));
                }
                let a = assumption.alpha();
                if !(a > 0.0 && a < 1.0) {
                    return invalid(format!("assumption alpha must be in (0, 1), got {a}"));
                }
            }
            if let Some(backup) = &spec.backup {
                if backup.shape() != shape {
                    return invalid(format!(
                        "backup {backup} ({}) does not match primary {} ({shape})",
                        backup.shape(),
                        spec.test
                    ));
                }
                if spec.assumptions.is_empty() {
                    return invalid(format!(
                        "backup declared for '{hid}' without an assumption to trigger it"
                    ));
                }
            }
            if let TestKind::OneSampleT { mu } = spec.test {
                if !mu.is_finite() {
                    return invalid(format!("one-sample mu for '{hid}' must be finite"));
                }
            }
        }
        if let Some(h) = self.hypotheses.iter().find(|h| !specified.contains(h.id.as_str())) {
            return invalid(format!("hypothesis '{}' has no test", h.id));
        }
        Ok(())
    }
}

/// A validated, locked, timestamped plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPlan {
    #[serde(flatten)]
    content: PlanDraft,
    locked_at: DateTime<Utc>,
    /// Stamped by the registry that accepts the plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    registered_at: Option<DateTime<Utc>>,
    locked: bool,
    fingerprint: String,
}

impl AnalysisPlan {
    pub fn new(
        project_id: impl Into<String>,
        hypotheses: Vec<Hypothesis>,
        tests: Vec<TestSpec>,
        correction: CorrectionSpec,
    ) -> RigorResult<Self> {
        Self::lock(PlanDraft {
            project_id: project_id.into(),
            hypotheses,
            tests,
            correction,
        })
    }

    /// Validate and lock a draft.
    pub fn lock(draft: PlanDraft) -> RigorResult<Self> {
        draft.check()?;
        let canonical = serde_json::to_vec(&draft)?;
        let fingerprint = Sha256::digest(&canonical)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Ok(Self {
            content: draft,
            locked_at: Utc::now(),
            registered_at: None,
            locked: true,
            fingerprint,
        })
    }

    pub fn from_json(json: &str) -> RigorResult<Self> {
        Self::lock(serde_json::from_str(json)?)
    }

    pub fn project_id(&self) -> &str {
        &self.content.project_id
    }

    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.content.hypotheses
    }

    pub fn hypothesis(&self, id: &str) -> Option<&Hypothesis> {
        self.content.hypotheses.iter().find(|h| h.id == id)
    }

    /// Test specs in hypothesis order.
    pub fn tests(&self) -> impl Iterator<Item = &TestSpec> + '_ {
        self.content
            .hypotheses
            .iter()
            .filter_map(move |h| self.test_spec(&h.id))
    }

    pub fn test_spec(&self, hypothesis_id: &str) -> Option<&TestSpec> {
        self.content
            .tests
            .iter()
            .find(|t| t.hypothesis_id == hypothesis_id)
    }

    pub fn correction(&self) -> CorrectionSpec {
        self.content.correction
    }

    pub fn locked_at(&self) -> DateTime<Utc> {
        self.locked_at
    }

    /// `None` until a registry accepts the plan.
    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// SHA-256 of the canonical JSON content, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn to_json(&self) -> RigorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Observations keyed by hypothesis id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisData(BTreeMap<String, TestData>);

impl AnalysisData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hypothesis_id: impl Into<String>, data: TestData) -> Self {
        self.0.insert(hypothesis_id.into(), data);
        self
    }

    pub fn insert(&mut self, hypothesis_id: impl Into<String>, data: TestData) {
        self.0.insert(hypothesis_id.into(), data);
    }

    pub fn get(&self, hypothesis_id: &str) -> Option<&TestData> {
        self.0.get(hypothesis_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Outcome of one declared test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub hypothesis_id: String,
    pub declared_test: TestKind,
    /// The test actually run: the primary, or its pre-declared backup.
    pub test: TestKind,
    #[serde(with = "nan_as_null")]
    pub statistic: f64,
    pub df: Option<f64>,
    #[serde(with = "nan_as_null")]
    pub p_value: f64,
    pub effect_size: EffectSize,
    pub interval: ConfidenceInterval,
    pub assumption_checks: Vec<AssumptionCheck>,
    /// An assumption failed and no backup was declared.
    pub assumption_violated: bool,
    pub used_backup: bool,
    pub tail: Tail,
    pub alpha: f64,
    pub exploratory: bool,
}

impl TestResult {
    #[allow(clippy::too_many_arguments)]
    fn from_outcome(
        hypothesis: &Hypothesis,
        alpha: f64,
        declared_test: TestKind,
        test: TestKind,
        outcome: TestOutcome,
        assumption_checks: Vec<AssumptionCheck>,
        assumption_violated: bool,
        exploratory: bool,
    ) -> Self {
        Self {
            hypothesis_id: hypothesis.id.clone(),
            used_backup: declared_test != test,
            declared_test,
            test,
            statistic: outcome.statistic,
            df: outcome.df,
            p_value: outcome.p_value,
            effect_size: outcome.effect_size,
            interval: outcome.interval,
            assumption_checks,
            assumption_violated,
            tail: hypothesis.tail,
            alpha,
            exploratory,
        }
    }
}

/// Confirmatory results of a locked plan, corrected as the plan declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanExecution {
    pub project_id: String,
    pub plan_fingerprint: String,
    pub backend: String,
    pub executed_at: DateTime<Utc>,
    pub results: Vec<CorrectedResult>,
}

/// An analysis outside the locked plan. Never corrected together with,
/// or merged into, the confirmatory results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploratoryAnalysis {
    pub project_id: String,
    pub label: String,
    pub rationale: String,
    pub result: TestResult,
    pub recorded_at: DateTime<Utc>,
}

pub struct AnalysisPlanRegistry {
    plans: RwLock<HashMap<String, Arc<AnalysisPlan>>>,
    exploratory: Mutex<HashMap<String, Vec<ExploratoryAnalysis>>>,
    backend: Arc<dyn StatBackend>,
    config: RigorConfig,
}

impl AnalysisPlanRegistry {
    /// Registry over the native backend.
    pub fn new(config: &RigorConfig) -> Self {
        Self::with_backend(Arc::new(NativeBackend), config)
    }

    pub fn with_backend(backend: Arc<dyn StatBackend>, config: &RigorConfig) -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
            exploratory: Mutex::new(HashMap::new()),
            backend,
            config: config.clone(),
        }
    }

    /// Register a locked plan. One plan per project identifier, ever.
    pub fn register(&self, mut plan: AnalysisPlan) -> RigorResult<Arc<AnalysisPlan>> {
        let mut plans = self.plans.write();
        if let Some(existing) = plans.get(plan.project_id()) {
            let registered_at = existing.registered_at().unwrap_or(existing.locked_at());
            log::error!(
                "second plan for project '{}' refused; first registered at {registered_at}",
                plan.project_id()
            );
            return Err(RigorError::OneShotRegistration {
                project_id: plan.project_id().to_string(),
                registered_at,
            });
        }
        plan.registered_at = Some(Utc::now());
        let plan = Arc::new(plan);
        plans.insert(plan.project_id().to_string(), Arc::clone(&plan));
        log::info!(
            "plan registered for project '{}' ({} hypotheses, sha256 {})",
            plan.project_id(),
            plan.hypotheses().len(),
            &plan.fingerprint()[..12]
        );
        Ok(plan)
    }

    pub fn plan(&self, project_id: &str) -> Option<Arc<AnalysisPlan>> {
        self.plans.read().get(project_id).cloned()
    }

    fn require_plan(&self, project_id: &str) -> RigorResult<Arc<AnalysisPlan>> {
        self.plan(project_id)
            .ok_or_else(|| RigorError::UnknownPlan(project_id.to_string()))
    }

    /// Execute the registered plan with the configured backend deadline.
    pub fn execute(&self, project_id: &str, data: &AnalysisData) -> RigorResult<PlanExecution> {
        self.execute_with_deadline(
            project_id,
            data,
            Duration::from_millis(self.config.backend_deadline_ms),
        )
    }

    /// Execute every declared test exactly once, then apply the plan's
    /// correction. `deadline` bounds the whole execution.
    pub fn execute_with_deadline(
        &self,
        project_id: &str,
        data: &AnalysisData,
        deadline: Duration,
    ) -> RigorResult<PlanExecution> {
        let plan = self.require_plan(project_id)?;
        for key in data.keys() {
            if plan.hypothesis(key).is_none() {
                log::warn!("data for '{key}' ignored: not a hypothesis of plan '{project_id}'");
            }
        }

        let mut jobs = Vec::with_capacity(plan.hypotheses().len());
        for hypothesis in plan.hypotheses() {
            let spec = plan.test_spec(&hypothesis.id).ok_or_else(|| {
                RigorError::InvalidPlan(format!("no test for hypothesis '{}'", hypothesis.id))
            })?;
            let observations = data.get(&hypothesis.id).ok_or_else(|| {
                RigorError::MissingData(format!(
                    "no data for hypothesis '{}' of plan '{project_id}'",
                    hypothesis.id
                ))
            })?;
            if observations.shape() != spec.test.shape() {
                return Err(RigorError::Validation(format!(
                    "hypothesis '{}' declares {} ({}), data is {}",
                    hypothesis.id,
                    spec.test,
                    spec.test.shape(),
                    observations.shape()
                )));
            }
            jobs.push((hypothesis, spec, observations));
        }

        let correction = plan.correction();
        let started = Instant::now();
        let mut results = Vec::with_capacity(jobs.len());
        for (hypothesis, spec, observations) in jobs {
            results.push(self.run_spec(
                hypothesis,
                correction.alpha,
                spec,
                observations,
                started,
                deadline,
            )?);
        }

        let results = CorrectionEngine::new(correction.method, correction.alpha)?.apply(results)?;
        log::info!(
            "plan '{project_id}' executed: {} tests, {} rejected after {} correction",
            results.len(),
            results.iter().filter(|r| r.reject).count(),
            correction.method
        );
        Ok(PlanExecution {
            project_id: project_id.to_string(),
            plan_fingerprint: plan.fingerprint().to_string(),
            backend: self.backend.name().to_string(),
            executed_at: Utc::now(),
            results,
        })
    }

    fn run_spec(
        &self,
        hypothesis: &Hypothesis,
        alpha: f64,
        spec: &TestSpec,
        data: &TestData,
        started: Instant,
        deadline: Duration,
    ) -> RigorResult<TestResult> {
        let mut checks = Vec::with_capacity(spec.assumptions.len());
        for assumption in &spec.assumptions {
            let (assumption, owned) = (*assumption, data.clone());
            let check = self.call(started, deadline, move |b, _| b.check(&assumption, &owned))?;
            checks.push(check);
        }
        let failed = checks.iter().any(|c| !c.passed);

        let test = match (&spec.backup, failed) {
            (Some(backup), true) => {
                log::warn!(
                    "'{}': assumption failed, running pre-declared backup {backup}",
                    hypothesis.id
                );
                backup.clone()
            }
            (None, true) => {
                log::warn!(
                    "'{}': assumption failed and no backup declared; result flagged",
                    hypothesis.id
                );
                spec.test.clone()
            }
            (_, false) => spec.test.clone(),
        };
        let violated = failed && spec.backup.is_none();

        let outcome = {
            let (test, owned, tail, level) = (
                test.clone(),
                data.clone(),
                hypothesis.tail,
                self.config.confidence_level,
            );
            self.call(started, deadline, move |b, cancel| {
                b.run_cancellable(&test, &owned, tail, level, cancel)
            })?
        };
        Ok(TestResult::from_outcome(
            hypothesis,
            alpha,
            spec.test.clone(),
            test,
            outcome,
            checks,
            violated,
            false,
        ))
    }

    /// Run one backend call on a worker thread, bounded by what remains
    /// of `deadline`.
    ///
    /// Threads cannot be killed: on timeout the worker is detached and its
    /// result dropped. The call's `CancelToken` is raised at that point so
    /// cooperative backends can stop early.
    fn call<T, F>(&self, started: Instant, deadline: Duration, f: F) -> RigorResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StatBackend, &CancelToken) -> RigorResult<T> + Send + 'static,
    {
        let deadline_ms = deadline.as_millis() as u64;
        let remaining = deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            log::error!("statistical backend deadline of {deadline_ms}ms exhausted");
            return Err(RigorError::Timeout { deadline_ms });
        }

        let backend = Arc::clone(&self.backend);
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("rigor-stat-backend".to_string())
            .spawn(move || {
                let _ = tx.send(f(&*backend, &worker_cancel));
            })
            .map_err(|e| RigorError::Backend(format!("failed to spawn backend worker: {e}")))?;

        match rx.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                log::error!(
                    "statistical backend '{}' exceeded {deadline_ms}ms deadline",
                    self.backend.name()
                );
                Err(RigorError::Timeout { deadline_ms })
            }
            Err(RecvTimeoutError::Disconnected) => Err(RigorError::Backend(format!(
                "statistical backend '{}' worker terminated without a result",
                self.backend.name()
            ))),
        }
    }

    /// Run and store an analysis outside the locked plan.
    pub fn record_exploratory(
        &self,
        project_id: &str,
        label: impl Into<String>,
        rationale: impl Into<String>,
        test: TestKind,
        tail: Tail,
        data: TestData,
    ) -> RigorResult<ExploratoryAnalysis> {
        self.require_plan(project_id)?;
        let label = label.into();
        let hypothesis = Hypothesis::new(label.clone(), "exploratory").with_tail(tail);
        let level = self.config.confidence_level;
        let deadline = Duration::from_millis(self.config.backend_deadline_ms);
        let outcome = {
            let (test, data) = (test.clone(), data);
            self.call(Instant::now(), deadline, move |b, cancel| {
                b.run_cancellable(&test, &data, tail, level, cancel)
            })?
        };
        let analysis = ExploratoryAnalysis {
            project_id: project_id.to_string(),
            label,
            rationale: rationale.into(),
            result: TestResult::from_outcome(
                &hypothesis,
                self.config.correction_alpha,
                test.clone(),
                test,
                outcome,
                Vec::new(),
                false,
                true,
            ),
            recorded_at: Utc::now(),
        };
        log::info!(
            "exploratory analysis '{}' recorded for '{project_id}'",
            analysis.label
        );
        self.exploratory
            .lock()
            .entry(project_id.to_string())
            .or_default()
            .push(analysis.clone());
        Ok(analysis)
    }

    pub fn exploratory(&self, project_id: &str) -> Vec<ExploratoryAnalysis> {
        self.exploratory
            .lock()
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn plan(project: &str) -> AnalysisPlan {
        AnalysisPlan::new(
            project,
            vec![
                Hypothesis::new("H1", "treated group scores higher").with_tail(Tail::Greater),
                Hypothesis::new("H2", "scores correlate with ratings"),
            ],
            vec![
                TestSpec::new("H1", TestKind::WelchT)
                    .assuming(Assumption::Normality { alpha: 0.05 })
                    .with_backup(TestKind::MannWhitneyU),
                TestSpec::new("H2", TestKind::Pearson),
            ],
            CorrectionSpec {
                method: CorrectionMethod::Holm,
                alpha: 0.05,
            },
        )
        .unwrap()
    }

    fn normalish(n: usize, shift: f64) -> Vec<f64> {
        (0..n)
            .map(|i| shift + crate::stats::normal_quantile((i as f64 + 0.5) / n as f64))
            .collect()
    }

    fn data() -> AnalysisData {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * 0.5 + ((v * 1.7).sin())).collect();
        AnalysisData::new()
            .with(
                "H1",
                TestData::TwoSample {
                    a: normalish(60, 1.0),
                    b: normalish(60, 0.0),
                },
            )
            .with("H2", TestData::Bivariate { x, y })
    }

    /// Records which tests it was asked to run.
    struct Recording {
        calls: Arc<Mutex<Vec<String>>>,
        checks: AtomicUsize,
    }

    impl StatBackend for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn run(&self, test: &TestKind, data: &TestData, tail: Tail, level: f64) -> RigorResult<TestOutcome> {
            self.calls.lock().push(test.name().to_string());
            NativeBackend.run(test, data, tail, level)
        }

        fn check(&self, assumption: &Assumption, data: &TestData) -> RigorResult<AssumptionCheck> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            NativeBackend.check(assumption, data)
        }
    }

    struct Stalled;

    impl StatBackend for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn run(&self, _: &TestKind, _: &TestData, _: Tail, _: f64) -> RigorResult<TestOutcome> {
            thread::sleep(Duration::from_millis(500));
            Err(RigorError::Backend("unreachable".to_string()))
        }

        fn check(&self, _: &Assumption, _: &TestData) -> RigorResult<AssumptionCheck> {
            thread::sleep(Duration::from_millis(500));
            Err(RigorError::Backend("unreachable".to_string()))
        }
    }

    /// Spins until the registry raises the cancellation flag.
    struct Cooperative {
        stopped: Arc<AtomicBool>,
    }

    impl StatBackend for Cooperative {
        fn name(&self) -> &str {
            "cooperative"
        }

        fn run(&self, _: &TestKind, _: &TestData, _: Tail, _: f64) -> RigorResult<TestOutcome> {
            Err(RigorError::Backend("uncancellable path".to_string()))
        }

        fn run_cancellable(
            &self,
            _: &TestKind,
            _: &TestData,
            _: Tail,
            _: f64,
            cancel: &CancelToken,
        ) -> RigorResult<TestOutcome> {
            let spin = Instant::now();
            while !cancel.is_cancelled() && spin.elapsed() < Duration::from_secs(5) {
                thread::sleep(Duration::from_millis(2));
            }
            self.stopped.store(cancel.is_cancelled(), Ordering::SeqCst);
            Err(RigorError::Backend("cancelled".to_string()))
        }

        fn check(&self, assumption: &Assumption, _: &TestData) -> RigorResult<AssumptionCheck> {
            Ok(AssumptionCheck {
                assumption: *assumption,
                statistic: 0.0,
                p_value: 1.0,
                passed: true,
            })
        }
    }

    #[test]
    fn test_plan_locked_at_creation() {
        let p = plan("study-1");
        assert!(p.is_locked());
        assert_eq!(p.fingerprint().len(), 64);
        assert_eq!(p.fingerprint(), plan("study-1").fingerprint());
        assert_ne!(p.fingerprint(), plan("study-2").fingerprint());
        assert_eq!(p.tests().count(), 2);
    }

    #[test]
    fn test_plan_validation() {
        let dup = AnalysisPlan::new(
            "p",
            vec![Hypothesis::new("H1", "a"), Hypothesis::new("H1", "b")],
            vec![TestSpec::new("H1", TestKind::WelchT)],
            CorrectionSpec { method: CorrectionMethod::Holm, alpha: 0.05 },
        );
        assert!(matches!(dup, Err(RigorError::InvalidPlan(_))));

        let untested = AnalysisPlan::new(
            "p",
            vec![Hypothesis::new("H1", "a"), Hypothesis::new("H2", "b")],
            vec![TestSpec::new("H1", TestKind::WelchT)],
            CorrectionSpec { method: CorrectionMethod::Holm, alpha: 0.05 },
        );
        assert!(matches!(untested, Err(RigorError::InvalidPlan(_))));

        let bad_backup = AnalysisPlan::new(
            "p",
            vec![Hypothesis::new("H1", "a")],
            vec![TestSpec::new("H1", TestKind::WelchT)
                .assuming(Assumption::Normality { alpha: 0.05 })
                .with_backup(TestKind::WilcoxonSignedRank)],
            CorrectionSpec { method: CorrectionMethod::Holm, alpha: 0.05 },
        );
        assert!(matches!(bad_backup, Err(RigorError::InvalidPlan(_))));

        let bad_assumption = AnalysisPlan::new(
            "p",
            vec![Hypothesis::new("H1", "a")],
            vec![TestSpec::new("H1", TestKind::Pearson)
                .assuming(Assumption::EqualVariance { alpha: 0.05 })],
            CorrectionSpec { method: CorrectionMethod::Holm, alpha: 0.05 },
        );
        assert!(matches!(bad_assumption, Err(RigorError::InvalidPlan(_))));

        let bad_alpha = AnalysisPlan::new(
            "p",
            vec![Hypothesis::new("H1", "a").with_alpha(1.5)],
            vec![TestSpec::new("H1", TestKind::WelchT)],
            CorrectionSpec { method: CorrectionMethod::Holm, alpha: 0.05 },
        );
        assert!(matches!(bad_alpha, Err(RigorError::InvalidPlan(_))));
    }

    #[test]
    fn test_hypothesis_alpha_must_match_correction() {
        let reg = AnalysisPlanRegistry::new(&RigorConfig::default());
        let mismatched = AnalysisPlan::new(
            "alpha-study",
            vec![Hypothesis::new("H1", "a").with_alpha(0.01)],
            vec![TestSpec::new("H1", TestKind::WelchT)],
            CorrectionSpec { method: CorrectionMethod::Holm, alpha: 0.05 },
        )
        .and_then(|p| reg.register(p));
        assert!(matches!(mismatched, Err(RigorError::Config(_))));
        assert!(reg.plan("alpha-study").is_none());

        let restated = AnalysisPlan::new(
            "alpha-study",
            vec![Hypothesis::new("H1", "a").with_alpha(0.01)],
            vec![TestSpec::new("H1", TestKind::WelchT)],
            CorrectionSpec { method: CorrectionMethod::Holm, alpha: 0.01 },
        )
        .unwrap();
        assert_eq!(restated.hypothesis("H1").unwrap().alpha, Some(0.01));
        assert!(reg.register(restated).is_ok());

        let json = r#"{
            "project_id": "json-alpha",
            "hypotheses": [{"id": "H1", "statement": "x", "alpha": 0.01}],
            "tests": [{"hypothesis_id": "H1", "test": {"test": "welch_t"}}],
            "correction": {"method": "holm", "alpha": 0.05}
        }"#;
        assert!(matches!(AnalysisPlan::from_json(json), Err(RigorError::Config(_))));
    }

    #[test]
    fn test_plan_from_json() {
        let json = r#"{
            "project_id": "json-study",
            "hypotheses": [{"id": "H1", "statement": "x", "tail": "less"}],
            "tests": [{"hypothesis_id": "H1", "test": {"test": "one_sample_t", "mu": 3.0}}],
            "correction": {"method": "bonferroni", "alpha": 0.05}
        }"#;
        let p = AnalysisPlan::from_json(json).unwrap();
        assert_eq!(p.hypothesis("H1").unwrap().tail, Tail::Less);
        assert_eq!(p.hypothesis("H1").unwrap().alpha, None);
        assert_eq!(p.correction().method, CorrectionMethod::Bonferroni);
        let exported = p.to_json().unwrap();
        assert!(exported.contains("\"locked\": true"));
        assert!(exported.contains(p.fingerprint()));
    }

    #[test]
    fn test_second_registration_raises() {
        let reg = AnalysisPlanRegistry::new(&RigorConfig::default());
        let draft = plan("study");
        assert!(draft.registered_at().is_none());
        thread::sleep(Duration::from_millis(5));
        let first = reg.register(draft).unwrap();
        let stamped = first.registered_at().unwrap();
        assert!(stamped > first.locked_at());
        assert!(first.to_json().unwrap().contains("\"registered_at\""));
        let err = reg.register(plan("study"));
        match err {
            Err(RigorError::OneShotRegistration {
                project_id,
                registered_at,
            }) => {
                assert_eq!(project_id, "study");
                assert_eq!(registered_at, stamped);
            }
            other => panic!("expected OneShotRegistration, got {other:?}"),
        }
        assert!(reg.register(plan("other")).is_ok());
    }

    #[test]
    fn test_execute_runs_only_declared_tests() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let backend = Arc::new(Recording {
            calls: Arc::clone(&calls),
            checks: AtomicUsize::new(0),
        });
        let reg = AnalysisPlanRegistry::with_backend(backend.clone(), &RigorConfig::default());
        reg.register(plan("study")).unwrap();

        let extra = data().with(
            "H99",
            TestData::OneSample {
                values: vec![1.0, 2.0, 3.0],
            },
        );
        let exec = reg.execute("study", &extra).unwrap();
        assert_eq!(exec.results.len(), 2);
        assert_eq!(*calls.lock(), vec!["welch_t".to_string(), "pearson".to_string()]);
        assert_eq!(backend.checks.load(Ordering::SeqCst), 1);
        assert_eq!(exec.backend, "recording");
        assert_eq!(exec.plan_fingerprint, reg.plan("study").unwrap().fingerprint());

        let h1 = &exec.results[0];
        assert_eq!(h1.result.hypothesis_id, "H1");
        assert!(!h1.result.used_backup);
        assert!(!h1.result.assumption_violated);
        assert!(h1.result.p_value < 0.001);
        assert!(h1.reject);
        assert_eq!(h1.method, CorrectionMethod::Holm);
    }

    #[test]
    fn test_failed_assumption_runs_declared_backup() {
        let reg = AnalysisPlanRegistry::new(&RigorConfig::default());
        reg.register(plan("study")).unwrap();
        let skewed: Vec<f64> = (0..60).map(|i| ((i as f64) / 6.0).exp()).collect();
        let d = data().with(
            "H1",
            TestData::TwoSample {
                a: skewed.iter().map(|v| v * 2.0).collect(),
                b: skewed,
            },
        );
        let exec = reg.execute("study", &d).unwrap();
        let h1 = &exec.results[0].result;
        assert!(h1.used_backup);
        assert_eq!(h1.test, TestKind::MannWhitneyU);
        assert_eq!(h1.declared_test, TestKind::WelchT);
        assert!(!h1.assumption_violated);
        assert!(!h1.assumption_checks[0].passed);
    }

    #[test]
    fn test_failed_assumption_without_backup_is_flagged() {
        let reg = AnalysisPlanRegistry::new(&RigorConfig::default());
        let p = AnalysisPlan::new(
            "nobackup",
            vec![Hypothesis::new("H1", "a")],
            vec![TestSpec::new("H1", TestKind::StudentT)
                .assuming(Assumption::EqualVariance { alpha: 0.05 })],
            CorrectionSpec { method: CorrectionMethod::Bonferroni, alpha: 0.05 },
        )
        .unwrap();
        reg.register(p).unwrap();
        let a: Vec<f64> = (0..30).map(|i| (i % 5) as f64).collect();
        let b: Vec<f64> = (0..30).map(|i| (i % 5) as f64 * 10.0).collect();
        let exec = reg
            .execute("nobackup", &AnalysisData::new().with("H1", TestData::TwoSample { a, b }))
            .unwrap();
        let r = &exec.results[0].result;
        assert!(r.assumption_violated);
        assert!(!r.used_backup);
        assert_eq!(r.test, TestKind::StudentT);
    }

    #[test]
    fn test_missing_data_and_unknown_plan() {
        let reg = AnalysisPlanRegistry::new(&RigorConfig::default());
        assert!(matches!(
            reg.execute("nope", &data()),
            Err(RigorError::UnknownPlan(_))
        ));
        reg.register(plan("study")).unwrap();
        let partial = AnalysisData::new().with(
            "H1",
            TestData::TwoSample {
                a: normalish(10, 0.0),
                b: normalish(10, 0.0),
            },
        );
        assert!(matches!(
            reg.execute("study", &partial),
            Err(RigorError::MissingData(_))
        ));
        let wrong_shape = data().with("H2", TestData::OneSample { values: vec![1.0; 8] });
        assert!(matches!(
            reg.execute("study", &wrong_shape),
            Err(RigorError::Validation(_))
        ));
    }

    #[test]
    fn test_backend_deadline_surfaces_timeout() {
        let reg = AnalysisPlanRegistry::with_backend(Arc::new(Stalled), &RigorConfig::default());
        reg.register(plan("slow")).unwrap();
        let started = Instant::now();
        let err = reg.execute_with_deadline("slow", &data(), Duration::from_millis(50));
        assert!(matches!(err, Err(RigorError::Timeout { deadline_ms: 50 })));
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_timed_out_worker_sees_cancellation() {
        let stopped = Arc::new(AtomicBool::new(false));
        let backend = Arc::new(Cooperative {
            stopped: Arc::clone(&stopped),
        });
        let reg = AnalysisPlanRegistry::with_backend(backend, &RigorConfig::default());
        reg.register(plan("spin")).unwrap();
        let err = reg.execute_with_deadline("spin", &data(), Duration::from_millis(50));
        assert!(matches!(err, Err(RigorError::Timeout { deadline_ms: 50 })));

        let waited = Instant::now();
        while !stopped.load(Ordering::SeqCst) && waited.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_exploratory_kept_separate() {
        let reg = AnalysisPlanRegistry::new(&RigorConfig::default());
        assert!(matches!(
            reg.record_exploratory(
                "study",
                "post-hoc",
                "",
                TestKind::Spearman,
                Tail::TwoSided,
                TestData::Bivariate { x: vec![], y: vec![] },
            ),
            Err(RigorError::UnknownPlan(_))
        ));
        reg.register(plan("study")).unwrap();
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let e = reg
            .record_exploratory(
                "study",
                "length-quadratic",
                "noticed after unblinding",
                TestKind::Spearman,
                Tail::TwoSided,
                TestData::Bivariate { x, y },
            )
            .unwrap();
        assert!(e.result.exploratory);
        assert_eq!(reg.exploratory("study").len(), 1);

        let exec = reg.execute("study", &data()).unwrap();
        assert_eq!(exec.results.len(), 2);
        assert!(exec.results.iter().all(|r| !r.result.exploratory));
        assert_eq!(reg.plan("study").unwrap().hypotheses().len(), 2);
    }
}
