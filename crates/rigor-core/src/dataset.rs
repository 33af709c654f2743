// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Ground Truth Dataset
// Mirrors: skills/research-methodology-validator/scripts/validated_measure.py
// ─────────────────────────────────────────────────────────────────────
//! Immutable labelled sample collection with split management.
//!
//! Samples, labels and annotations are fixed at `build()`. The only
//! mutable piece after the dataset is shared is the test-split seal:
//! the first `FinalEvaluation` read records a `SealRecord` under a
//! mutex, and every later `Tuning` read of the test split checks that
//! record under the same mutex, so the two cannot race.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use rigor_types::{
    AccessPurpose, ConfusionMatrix, RatioMetric, RigorConfig, RigorError, RigorResult, Split,
};

use crate::metrics::cohen_kappa;

const SPLIT_TOLERANCE: f64 = 1e-9;
const UNLABELED_STRATUM: &str = "<unlabeled>";

/// One record in the ground-truth supply shape.
#[derive(Debug, Clone)]
pub struct GroundTruthRecord<S> {
    pub id: String,
    pub sample: S,
    pub label: Option<String>,
    /// annotator → label
    pub annotations: BTreeMap<String, String>,
    pub split_hint: Option<Split>,
    /// Stratification key; the label is used when absent.
    pub stratum: Option<String>,
}

impl<S> GroundTruthRecord<S> {
    pub fn new(id: impl Into<String>, sample: S) -> Self {
        Self {
            id: id.into(),
            sample,
            label: None,
            annotations: BTreeMap::new(),
            split_hint: None,
            stratum: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_annotation(mut self, annotator: impl Into<String>, label: impl Into<String>) -> Self {
        self.annotations.insert(annotator.into(), label.into());
        self
    }

    pub fn with_split_hint(mut self, split: Split) -> Self {
        self.split_hint = Some(split);
        self
    }

    pub fn with_stratum(mut self, stratum: impl Into<String>) -> Self {
        self.stratum = Some(stratum.into());
        self
    }
}

/// Provenance of a ground-truth dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub source: String,
    pub description: String,
    pub has_annotation_guidelines: bool,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DatasetMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }
}

/// Collects samples, labels and annotations, then checks the dataset
/// invariants once in `build()`.
pub struct DatasetBuilder<S> {
    samples: Vec<(String, S)>,
    labels: Vec<(String, String)>,
    annotations: Vec<(String, String, String)>,
    split_hints: Vec<(String, Split)>,
    strata: Vec<(String, String)>,
    label_domain: Option<Vec<String>>,
    metadata: DatasetMetadata,
}

impl<S> Default for DatasetBuilder<S> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            labels: Vec::new(),
            annotations: Vec::new(),
            split_hints: Vec::new(),
            strata: Vec::new(),
            label_domain: None,
            metadata: DatasetMetadata::default(),
        }
    }
}

impl<S> DatasetBuilder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(mut self, metadata: DatasetMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Fix the label domain explicitly. Otherwise it is inferred from the
    /// labels and annotations at build time.
    pub fn label_domain<I, L>(mut self, domain: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.label_domain = Some(domain.into_iter().map(Into::into).collect());
        self
    }

    pub fn sample(mut self, id: impl Into<String>, sample: S) -> Self {
        self.samples.push((id.into(), sample));
        self
    }

    pub fn label(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.push((id.into(), label.into()));
        self
    }

    pub fn annotate(
        mut self,
        id: impl Into<String>,
        annotator: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.annotations
            .push((id.into(), annotator.into(), label.into()));
        self
    }

    pub fn split_hint(mut self, id: impl Into<String>, split: Split) -> Self {
        self.split_hints.push((id.into(), split));
        self
    }

    pub fn stratum(mut self, id: impl Into<String>, stratum: impl Into<String>) -> Self {
        self.strata.push((id.into(), stratum.into()));
        self
    }

    /// Add a full supply record.
    pub fn record(mut self, record: GroundTruthRecord<S>) -> Self {
        let id = record.id;
        if let Some(label) = record.label {
            self.labels.push((id.clone(), label));
        }
        for (annotator, label) in record.annotations {
            self.annotations.push((id.clone(), annotator, label));
        }
        if let Some(split) = record.split_hint {
            self.split_hints.push((id.clone(), split));
        }
        if let Some(stratum) = record.stratum {
            self.strata.push((id.clone(), stratum));
        }
        self.samples.push((id, record.sample));
        self
    }

    pub fn records<I>(self, records: I) -> Self
    where
        I: IntoIterator<Item = GroundTruthRecord<S>>,
    {
        records.into_iter().fold(self, |b, r| b.record(r))
    }

    pub fn build(self) -> RigorResult<GroundTruthDataset<S>> {
        let n = self.samples.len();
        let mut index = HashMap::with_capacity(n);
        let mut ids = Vec::with_capacity(n);
        let mut samples = Vec::with_capacity(n);
        for (i, (id, sample)) in self.samples.into_iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(RigorError::Validation(format!(
                    "duplicate sample id '{id}'"
                )));
            }
            ids.push(id);
            samples.push(sample);
        }

        let lookup = |id: &str, what: &str| -> RigorResult<usize> {
            index.get(id).copied().ok_or_else(|| {
                RigorError::Validation(format!("{what} refers to unknown sample id '{id}'"))
            })
        };

        let mut labels: Vec<Option<String>> = vec![None; n];
        for (id, label) in self.labels {
            let i = lookup(&id, "label")?;
            labels[i] = Some(label);
        }

        let mut annotations: Vec<BTreeMap<String, String>> = vec![BTreeMap::new(); n];
        for (id, annotator, label) in self.annotations {
            let i = lookup(&id, "annotation")?;
            annotations[i].insert(annotator, label);
        }

        let mut split_hints: Vec<Option<Split>> = vec![None; n];
        for (id, split) in self.split_hints {
            let i = lookup(&id, "split hint")?;
            split_hints[i] = Some(split);
        }

        let mut strata: Vec<Option<String>> = vec![None; n];
        for (id, stratum) in self.strata {
            let i = lookup(&id, "stratum")?;
            strata[i] = Some(stratum);
        }

        let label_domain = match self.label_domain {
            Some(domain) => {
                let unique: BTreeSet<&String> = domain.iter().collect();
                if unique.len() != domain.len() {
                    return Err(RigorError::Validation(
                        "label domain contains duplicates".to_string(),
                    ));
                }
                domain
            }
            None => {
                let inferred: BTreeSet<String> = labels
                    .iter()
                    .flatten()
                    .chain(annotations.iter().flat_map(|a| a.values()))
                    .cloned()
                    .collect();
                inferred.into_iter().collect()
            }
        };

        let in_domain = |label: &str| label_domain.iter().any(|d| d == label);
        for (i, label) in labels.iter().enumerate() {
            if let Some(label) = label {
                if !in_domain(label) {
                    return Err(RigorError::Validation(format!(
                        "label '{label}' of sample '{}' is outside the label domain",
                        ids[i]
                    )));
                }
            }
        }
        for (i, per_sample) in annotations.iter().enumerate() {
            for (annotator, label) in per_sample {
                if !in_domain(label) {
                    return Err(RigorError::Validation(format!(
                        "annotation '{label}' by '{annotator}' on sample '{}' is outside the label domain",
                        ids[i]
                    )));
                }
            }
        }

        log::debug!(
            "ground truth built: {n} samples, {} labelled, domain {:?}",
            labels.iter().flatten().count(),
            label_domain
        );

        Ok(GroundTruthDataset {
            ids,
            samples,
            index,
            labels,
            annotations,
            split_hints,
            strata,
            label_domain,
            metadata: self.metadata,
            assignment: None,
            seal: Mutex::new(None),
        })
    }
}

/// How the current split was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SplitProvenance {
    Stratified {
        seed: u64,
        train_ratio: f64,
        val_ratio: f64,
        test_ratio: f64,
    },
    Hints,
}

#[derive(Debug, Clone)]
struct SplitAssignment {
    provenance: SplitProvenance,
    members: BTreeMap<Split, Vec<usize>>,
}

/// When, and for which split, the final-evaluation seal was set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SealRecord {
    pub split: Split,
    pub sealed_at: DateTime<Utc>,
}

/// Which agreement statistic was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatistic {
    CohenKappa,
    FleissKappa,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementReport {
    pub statistic: AgreementStatistic,
    pub kappa: RatioMetric,
    pub annotators: usize,
    /// Samples carrying at least two annotations.
    pub items: usize,
}

/// Outcome of the ground-truth quality audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub acceptable: bool,
    pub issues: Vec<String>,
    pub agreement: Option<AgreementReport>,
    pub sample_size: usize,
    pub annotators: usize,
}

/// Immutable labelled sample collection with split management.
pub struct GroundTruthDataset<S> {
    ids: Vec<String>,
    samples: Vec<S>,
    index: HashMap<String, usize>,
    labels: Vec<Option<String>>,
    annotations: Vec<BTreeMap<String, String>>,
    split_hints: Vec<Option<Split>>,
    strata: Vec<Option<String>>,
    label_domain: Vec<String>,
    metadata: DatasetMetadata,
    assignment: Option<SplitAssignment>,
    seal: Mutex<Option<SealRecord>>,
}

impl<S> GroundTruthDataset<S> {
    pub fn builder() -> DatasetBuilder<S> {
        DatasetBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn sample(&self, id: &str) -> Option<&S> {
        self.index.get(id).map(|&i| &self.samples[i])
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.index
            .get(id)
            .and_then(|&i| self.labels[i].as_deref())
    }

    pub fn annotations(&self, id: &str) -> Option<&BTreeMap<String, String>> {
        self.index.get(id).map(|&i| &self.annotations[i])
    }

    pub fn label_domain(&self) -> &[String] {
        &self.label_domain
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn labeled_count(&self) -> usize {
        self.labels.iter().flatten().count()
    }

    pub fn is_split(&self) -> bool {
        self.assignment.is_some()
    }

    pub fn split_provenance(&self) -> Option<&SplitProvenance> {
        self.assignment.as_ref().map(|a| &a.provenance)
    }

    /// Sizes of the three partitions; all zero before `split()`.
    pub fn split_sizes(&self) -> BTreeMap<Split, usize> {
        Split::ALL
            .iter()
            .map(|&s| {
                let n = self
                    .assignment
                    .as_ref()
                    .and_then(|a| a.members.get(&s))
                    .map_or(0, Vec::len);
                (s, n)
            })
            .collect()
    }

    pub fn seal_record(&self) -> Option<SealRecord> {
        *self.seal.lock()
    }

    pub fn is_sealed(&self) -> bool {
        self.seal.lock().is_some()
    }

    fn ensure_unsealed(&mut self) -> RigorResult<()> {
        if let Some(record) = *self.seal.get_mut() {
            log::error!(
                "refusing to re-split: {} split sealed at {}",
                record.split,
                record.sealed_at
            );
            return Err(RigorError::SealedSplitViolation {
                split: record.split,
                sealed_at: record.sealed_at,
            });
        }
        Ok(())
    }

    fn stratum_key(&self, i: usize) -> &str {
        self.strata[i]
            .as_deref()
            .or(self.labels[i].as_deref())
            .unwrap_or(UNLABELED_STRATUM)
    }

    /// Assign every sample to train/val/test.
    ///
    /// Each stratification key (explicit stratum, else the label) is
    /// shuffled with a seeded RNG and cut by rounding, so per-key
    /// proportions land within one sample of the requested ratios.
    pub fn split(
        &mut self,
        train_ratio: f64,
        val_ratio: f64,
        test_ratio: f64,
        seed: u64,
    ) -> RigorResult<()> {
        let ratios = [train_ratio, val_ratio, test_ratio];
        if ratios.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(RigorError::InvalidSplit(format!(
                "ratios must be finite and non-negative, got {ratios:?}"
            )));
        }
        let sum: f64 = ratios.iter().sum();
        if (sum - 1.0).abs() > SPLIT_TOLERANCE {
            return Err(RigorError::InvalidSplit(format!(
                "ratios must sum to 1.0, got {train_ratio} + {val_ratio} + {test_ratio} = {sum}"
            )));
        }
        self.ensure_unsealed()?;

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for i in 0..self.samples.len() {
            groups.entry(self.stratum_key(i)).or_default().push(i);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut members: BTreeMap<Split, Vec<usize>> =
            Split::ALL.iter().map(|&s| (s, Vec::new())).collect();

        for (_, mut group) in groups {
            group.shuffle(&mut rng);
            let n = group.len();
            let n_train = ((n as f64 * train_ratio).round() as usize).min(n);
            let n_val = ((n as f64 * val_ratio).round() as usize).min(n - n_train);
            for (pos, idx) in group.into_iter().enumerate() {
                let split = if pos < n_train {
                    Split::Train
                } else if pos < n_train + n_val {
                    Split::Val
                } else {
                    Split::Test
                };
                members.entry(split).or_default().push(idx);
            }
        }
        for list in members.values_mut() {
            list.sort_unstable();
        }

        log::debug!(
            "split seed={seed}: train={} val={} test={}",
            members[&Split::Train].len(),
            members[&Split::Val].len(),
            members[&Split::Test].len()
        );

        self.assignment = Some(SplitAssignment {
            provenance: SplitProvenance::Stratified {
                seed,
                train_ratio,
                val_ratio,
                test_ratio,
            },
            members,
        });
        Ok(())
    }

    /// Split with the configured seed.
    pub fn split_with_config(
        &mut self,
        train_ratio: f64,
        val_ratio: f64,
        test_ratio: f64,
        config: &RigorConfig,
    ) -> RigorResult<()> {
        self.split(train_ratio, val_ratio, test_ratio, config.split_seed)
    }

    /// Assign splits from the supplied hints. Every sample needs one.
    pub fn apply_split_hints(&mut self) -> RigorResult<()> {
        self.ensure_unsealed()?;
        let mut members: BTreeMap<Split, Vec<usize>> =
            Split::ALL.iter().map(|&s| (s, Vec::new())).collect();
        for (i, hint) in self.split_hints.iter().enumerate() {
            match hint {
                Some(split) => members.entry(*split).or_default().push(i),
                None => {
                    return Err(RigorError::InvalidSplit(format!(
                        "sample '{}' carries no split hint",
                        self.ids[i]
                    )))
                }
            }
        }
        self.assignment = Some(SplitAssignment {
            provenance: SplitProvenance::Hints,
            members,
        });
        Ok(())
    }

    /// Read a split under a declared purpose.
    pub fn access(&self, split: Split, purpose: AccessPurpose) -> RigorResult<SplitView<'_, S>> {
        let assignment = self.assignment.as_ref().ok_or_else(|| {
            RigorError::InvalidSplit("dataset has not been split".to_string())
        })?;

        if split == Split::Test {
            let mut seal = self.seal.lock();
            match (purpose, *seal) {
                (AccessPurpose::Tuning, Some(record)) => {
                    log::error!(
                        "LEAKAGE BLOCKED: tuning read of {} split sealed at {}",
                        record.split,
                        record.sealed_at
                    );
                    return Err(RigorError::SealedSplitViolation {
                        split: record.split,
                        sealed_at: record.sealed_at,
                    });
                }
                (AccessPurpose::FinalEvaluation, None) => {
                    let record = SealRecord {
                        split,
                        sealed_at: Utc::now(),
                    };
                    log::info!("{} split sealed for final evaluation", split);
                    *seal = Some(record);
                }
                _ => {}
            }
        }

        let indices = assignment
            .members
            .get(&split)
            .cloned()
            .unwrap_or_default();
        Ok(SplitView {
            dataset: self,
            split: Some(split),
            purpose,
            indices,
        })
    }

    /// Every labelled sample, regardless of split.
    pub fn labeled_view(&self, purpose: AccessPurpose) -> SplitView<'_, S> {
        let indices = (0..self.samples.len())
            .filter(|&i| self.labels[i].is_some())
            .collect();
        SplitView {
            dataset: self,
            split: None,
            purpose,
            indices,
        }
    }

    /// The samples a measure is judged on: the test split under
    /// final-evaluation purpose when split, otherwise all labelled samples.
    pub fn evaluation_view(&self) -> RigorResult<SplitView<'_, S>> {
        if self.is_split() {
            self.access(Split::Test, AccessPurpose::FinalEvaluation)
        } else {
            Ok(self.labeled_view(AccessPurpose::FinalEvaluation))
        }
    }

    fn annotators(&self) -> BTreeSet<&str> {
        self.annotations
            .iter()
            .flat_map(|a| a.keys().map(String::as_str))
            .collect()
    }

    /// Chance-corrected agreement among annotators.
    ///
    /// Cohen's kappa when exactly two annotators exist, Fleiss' kappa
    /// (variable raters per item) otherwise. Items with fewer than two
    /// annotations are ignored.
    pub fn inter_annotator_agreement(&self) -> RigorResult<AgreementReport> {
        let annotators = self.annotators();
        let rated: Vec<&BTreeMap<String, String>> = self
            .annotations
            .iter()
            .filter(|a| a.len() >= 2)
            .collect();
        if annotators.len() < 2 || rated.is_empty() {
            return Err(RigorError::InsufficientAnnotators(format!(
                "need >= 2 annotators on >= 1 sample, found {} annotators and {} multiply-annotated samples",
                annotators.len(),
                rated.len()
            )));
        }

        if annotators.len() == 2 {
            let names: Vec<&str> = annotators.iter().copied().collect();
            let mut cm = ConfusionMatrix::zeros(self.label_domain.clone());
            for item in &rated {
                let (Some(a), Some(b)) = (item.get(names[0]), item.get(names[1])) else {
                    continue;
                };
                if let (Some(r), Some(c)) = (cm.index_of(a), cm.index_of(b)) {
                    cm.counts[r][c] += 1;
                }
            }
            return Ok(AgreementReport {
                statistic: AgreementStatistic::CohenKappa,
                kappa: cohen_kappa(&cm),
                annotators: 2,
                items: rated.len(),
            });
        }

        let k = self.label_domain.len();
        let mut category_totals = vec![0.0_f64; k];
        let mut total_ratings = 0.0_f64;
        let mut p_sum = 0.0_f64;
        for item in &rated {
            let mut counts = vec![0.0_f64; k];
            for label in item.values() {
                if let Some(j) = self.label_domain.iter().position(|d| d == label) {
                    counts[j] += 1.0;
                }
            }
            let n_i: f64 = counts.iter().sum();
            let agreeing: f64 = counts.iter().map(|c| c * (c - 1.0)).sum();
            p_sum += agreeing / (n_i * (n_i - 1.0));
            for (t, c) in category_totals.iter_mut().zip(&counts) {
                *t += c;
            }
            total_ratings += n_i;
        }
        let p_bar = p_sum / rated.len() as f64;
        let p_e: f64 = category_totals
            .iter()
            .map(|t| (t / total_ratings).powi(2))
            .sum();
        let kappa = if (1.0 - p_e).abs() < 1e-15 {
            RatioMetric::undefined()
        } else {
            RatioMetric::defined((p_bar - p_e) / (1.0 - p_e))
        };

        Ok(AgreementReport {
            statistic: AgreementStatistic::FleissKappa,
            kappa,
            annotators: annotators.len(),
            items: rated.len(),
        })
    }

    /// Audit ground-truth quality against the configured floors.
    pub fn quality_assessment(&self, config: &RigorConfig) -> QualityAssessment {
        let mut issues = Vec::new();
        let annotators = self.annotators().len();
        let sample_size = self.labeled_count();

        let agreement = match self.inter_annotator_agreement() {
            Ok(report) => {
                if !report.kappa.meets(config.min_inter_rater_kappa) {
                    issues.push(format!(
                        "Inter-rater reliability (kappa={}) below threshold {}",
                        report.kappa, config.min_inter_rater_kappa
                    ));
                }
                Some(report)
            }
            Err(e) => {
                issues.push(format!("Inter-rater reliability not computable: {e}"));
                None
            }
        };

        if sample_size < config.min_ground_truth_samples {
            issues.push(format!(
                "Sample size (n={sample_size}) below recommended minimum of {}",
                config.min_ground_truth_samples
            ));
        }
        if annotators < config.min_annotators {
            issues.push(format!(
                "Number of annotators ({annotators}) below minimum of {}",
                config.min_annotators
            ));
        }
        if !self.metadata.has_annotation_guidelines {
            issues.push("Annotation guidelines not documented".to_string());
        }

        QualityAssessment {
            acceptable: issues.is_empty(),
            issues,
            agreement,
            sample_size,
            annotators,
        }
    }
}

/// Read-only window onto one partition (or all labelled samples).
pub struct SplitView<'a, S> {
    dataset: &'a GroundTruthDataset<S>,
    split: Option<Split>,
    purpose: AccessPurpose,
    indices: Vec<usize>,
}

impl<'a, S> SplitView<'a, S> {
    pub fn split(&self) -> Option<Split> {
        self.split
    }

    pub fn purpose(&self) -> AccessPurpose {
        self.purpose
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.indices
            .iter()
            .map(move |&i| self.dataset.ids[i].as_str())
    }

    /// `(id, sample, label)` in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a S, Option<&'a str>)> + '_ {
        let ds = self.dataset;
        self.indices
            .iter()
            .map(move |&i| (ds.ids[i].as_str(), &ds.samples[i], ds.labels[i].as_deref()))
    }

    /// Only the labelled entries, as `(sample, label)`.
    pub fn labeled(&self) -> impl Iterator<Item = (&'a S, &'a str)> + '_ {
        let ds = self.dataset;
        self.indices
            .iter()
            .filter_map(move |&i| ds.labels[i].as_deref().map(|l| (&ds.samples[i], l)))
    }

    pub fn labeled_count(&self) -> usize {
        self.labeled().count()
    }

    /// Count of entries per stratification key.
    pub fn strata_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for &i in &self.indices {
            *counts
                .entry(self.dataset.stratum_key(i).to_string())
                .or_insert(0) += 1;
        }
        counts
    }
}
