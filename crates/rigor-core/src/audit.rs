// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Methodology Auditor
// Mirrors: skills/research-methodology-validator/scripts/methodology_auditor.py
// ─────────────────────────────────────────────────────────────────────
//! Line-oriented static audit of research source text.
//!
//! Heuristic: flags circular validation, measurement routines with no
//! validation, p-values without effect sizes, bare significance claims,
//! unseeded randomness and undocumented hyperparameters. Findings are
//! advisories for a reviewer, not proof.
//!
//! Types are recovered from `class` and `impl` blocks by indentation;
//! methods of every block naming the same type are pooled.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use rigor_types::{RigorError, RigorResult};

/// Lines after a validation routine's signature treated as its body.
const BODY_WINDOW: usize = 20;
/// Lines either side of a p-value searched for an effect size.
const EFFECT_WINDOW: usize = 5;

const MEASURE_WORDS: [&str; 4] = ["measure", "detect", "score", "evaluate"];
const VALIDATE_WORDS: [&str; 3] = ["validate", "verify", "check"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must fix before publication.
    Critical,
    Major,
    Minor,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL ISSUES (must fix before publication)",
            Self::Major => "MAJOR ISSUES (should fix)",
            Self::Minor => "MINOR ISSUES (nice to fix)",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    CircularLogic,
    MissingValidation,
    StatisticalIssue,
    Reproducibility,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CircularLogic => "circular_logic",
            Self::MissingValidation => "missing_validation",
            Self::StatisticalIssue => "statistical_issue",
            Self::Reproducibility => "reproducibility",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodologyIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub file: String,
    /// 1-based; `None` for file-level findings.
    pub line: Option<usize>,
    pub description: String,
    pub recommendation: String,
}

impl MethodologyIssue {
    pub fn location(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{line}", self.file),
            None => self.file.clone(),
        }
    }
}

impl fmt::Display for MethodologyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}\n  {}\n  -> {}",
            self.severity.as_str().to_uppercase(),
            self.category.as_str(),
            self.location(),
            self.description,
            self.recommendation
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub files_audited: usize,
    pub files_with_issues: usize,
    pub total: usize,
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub files_audited: usize,
    pub issues: Vec<MethodologyIssue>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn summary(&self) -> AuditSummary {
        let mut files: Vec<&str> = self.issues.iter().map(|i| i.file.as_str()).collect();
        files.sort_unstable();
        files.dedup();
        AuditSummary {
            files_audited: self.files_audited,
            files_with_issues: files.len(),
            total: self.issues.len(),
            critical: self.count(Severity::Critical),
            major: self.count(Severity::Major),
            minor: self.count(Severity::Minor),
        }
    }

    /// Issues grouped by severity, most severe first.
    pub fn by_severity(&self) -> BTreeMap<Severity, Vec<&MethodologyIssue>> {
        let mut groups: BTreeMap<Severity, Vec<&MethodologyIssue>> = BTreeMap::new();
        for issue in &self.issues {
            groups.entry(issue.severity).or_default().push(issue);
        }
        groups
    }

    pub fn render(&self) -> String {
        if self.is_clean() {
            return format!(
                "No methodological issues found ({} files audited).\n",
                self.files_audited
            );
        }
        let rule = "=".repeat(72);
        let s = self.summary();
        let mut out = format!(
            "{rule}\nMETHODOLOGY AUDIT REPORT\n{rule}\n\n\
             Files audited: {}\nTotal issues: {}\n  Critical: {}\n  Major: {}\n  Minor: {}\n\n",
            s.files_audited, s.total, s.critical, s.major, s.minor
        );
        for (severity, issues) in self.by_severity() {
            out.push_str(severity.heading());
            out.push('\n');
            out.push_str(&"-".repeat(72));
            out.push('\n');
            for issue in issues {
                out.push_str(&issue.to_string());
                out.push_str("\n\n");
            }
        }
        out
    }
}

pub struct MethodologyAuditor {
    validation_def: Regex,
    self_measure_call: Regex,
    pattern_word: Regex,
    measurement_def: Regex,
    validation_anywhere: Regex,
    p_value: Regex,
    effect_size: Regex,
    significance: Regex,
    random_op: Regex,
    seed: Regex,
    hyperparameter: Regex,
    comment: Regex,
    type_def: Regex,
    method_def: Regex,
}

struct Method<'a> {
    name: String,
    line: usize,
    /// Signature line through the last line of the body.
    body: &'a [&'a str],
}

struct TypeBlock<'a> {
    name: String,
    line: usize,
    methods: Vec<Method<'a>>,
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Index one past the block opened at `start`: the next non-blank line
/// indented no deeper than `indent`.
fn block_end(lines: &[&str], start: usize, indent: usize) -> usize {
    lines[start + 1..]
        .iter()
        .position(|l| !l.trim().is_empty() && indent_of(l) <= indent)
        .map_or(lines.len(), |offset| start + 1 + offset)
}

fn named(name: &str, words: &[&str]) -> bool {
    let name = name.to_lowercase();
    words.iter().any(|w| name.contains(w))
}

fn calls(line: &str, method: &str) -> bool {
    line.contains(&format!(".{method}(")) || line.contains(&format!("::{method}("))
}

fn compile(pattern: &str) -> RigorResult<Regex> {
    Regex::new(pattern).map_err(|e| RigorError::Config(format!("audit rule '{pattern}': {e}")))
}

impl MethodologyAuditor {
    pub fn new() -> RigorResult<Self> {
        Ok(Self {
            validation_def: compile(r"(?i)\b(def|fn|function)\s+\w*(validat|verif)\w*")?,
            self_measure_call: compile(r"(?i)\b(self|this)\.(detect|measure|score)\w*\s*\(")?,
            pattern_word: compile(r"(?i)pattern")?,
            measurement_def: compile(r"\b(def|fn|function)\s+(measure|detect|score|evaluate)\s*[(<]")?,
            validation_anywhere: compile(r"(?i)(validate|validation|ground.truth)")?,
            p_value: compile(r"(?i)\bp(?:[-_ ]?val(?:ue)?)?\s*(?:<=|>=|==|<|>|=)\s*0?\.\d")?,
            effect_size: compile(r"(?i)(cohen|effect.size|confidence.interval|\bci\b)")?,
            significance: compile(r"(?i)\bsignificant(ly)?\b")?,
            random_op: compile(r"(?i)(random|shuffle|sample|choice)")?,
            seed: compile(r"(?i)(seed|random_state)")?,
            hyperparameter: compile(
                r"(?i)\b(threshold|alpha|beta|learning_rate|lr)\s*[:=]\s*[0-9]*\.?[0-9]+",
            )?,
            comment: compile(r"(#|//)")?,
            type_def: compile(
                r"^\s*(?:class\s+(\w+)|impl(?:<[^>]*>)?\s+(?:[\w:]+(?:<[^>]*>)?\s+for\s+)?(\w+))",
            )?,
            method_def: compile(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:def|fn)\s+(\w+)")?,
        })
    }

    /// Audit one file's text. `file` is used only for locations.
    pub fn audit_source(&self, file: &str, text: &str) -> Vec<MethodologyIssue> {
        let lines: Vec<&str> = text.lines().collect();
        let mut issues = Vec::new();
        self.check_circular(file, &lines, &mut issues);
        self.check_types(file, &lines, &mut issues);
        self.check_missing_validation(file, text, &lines, &mut issues);
        self.check_statistics(file, &lines, &mut issues);
        self.check_reproducibility(file, &lines, &mut issues);
        issues.sort_by(|a, b| (a.severity, a.line).cmp(&(b.severity, b.line)));
        issues
    }

    pub fn audit_file(&self, path: &Path) -> RigorResult<Vec<MethodologyIssue>> {
        let text = fs::read_to_string(path)?;
        Ok(self.audit_source(&path.display().to_string(), &text))
    }

    /// Recursively audit files under `dir` whose extension is in
    /// `extensions` (without the dot). Files are visited in sorted order.
    pub fn audit_directory(&self, dir: &Path, extensions: &[&str]) -> RigorResult<AuditReport> {
        let mut files = Vec::new();
        collect_files(dir, extensions, &mut files)?;
        files.sort();
        let mut report = AuditReport {
            files_audited: files.len(),
            issues: Vec::new(),
        };
        for path in &files {
            report.issues.extend(self.audit_file(path)?);
        }
        log::info!(
            "audited {} files under {}: {} issues",
            report.files_audited,
            dir.display(),
            report.issues.len()
        );
        Ok(report)
    }

    fn check_circular(&self, file: &str, lines: &[&str], issues: &mut Vec<MethodologyIssue>) {
        for (idx, line) in lines.iter().enumerate() {
            if !self.validation_def.is_match(line) {
                continue;
            }
            let end = (idx + 1 + BODY_WINDOW).min(lines.len());
            let body = &lines[idx + 1..end];
            if body.iter().any(|l| self.self_measure_call.is_match(l)) {
                issues.push(MethodologyIssue {
                    severity: Severity::Critical,
                    category: IssueCategory::CircularLogic,
                    file: file.to_string(),
                    line: Some(idx + 1),
                    description: "validation routine calls a measurement routine of the same unit"
                        .to_string(),
                    recommendation:
                        "validate against independent ground truth, not self-generated data"
                            .to_string(),
                });
            }
            if self.pattern_word.is_match(line) && body.iter().any(|l| self.pattern_word.is_match(l)) {
                issues.push(MethodologyIssue {
                    severity: Severity::Critical,
                    category: IssueCategory::CircularLogic,
                    file: file.to_string(),
                    line: Some(idx + 1),
                    description: "pattern matching appears to validate pattern matching".to_string(),
                    recommendation: "validate against expert annotations, not pattern presence"
                        .to_string(),
                });
            }
        }
    }

    fn type_blocks<'a>(&self, lines: &'a [&'a str]) -> Vec<TypeBlock<'a>> {
        let mut types: Vec<TypeBlock<'a>> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            let Some(caps) = self.type_def.captures(line) else {
                continue;
            };
            let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let indent = indent_of(line);
            let methods = self.methods_in(lines, idx, block_end(lines, idx, indent), indent);
            match types.iter_mut().find(|t| t.name == name.as_str()) {
                Some(existing) => existing.methods.extend(methods),
                None => types.push(TypeBlock {
                    name: name.as_str().to_string(),
                    line: idx + 1,
                    methods,
                }),
            }
        }
        types
    }

    /// Methods declared directly inside the block spanning `start..end`.
    fn methods_in<'a>(
        &self,
        lines: &'a [&'a str],
        start: usize,
        end: usize,
        outer: usize,
    ) -> Vec<Method<'a>> {
        let mut level = None;
        let mut methods = Vec::new();
        for idx in start + 1..end {
            let Some(name) = self.method_def.captures(lines[idx]).and_then(|c| c.get(1)) else {
                continue;
            };
            let indent = indent_of(lines[idx]);
            if indent <= outer || *level.get_or_insert(indent) != indent {
                continue;
            }
            let body_end = block_end(lines, idx, indent).min(end);
            methods.push(Method {
                name: name.as_str().to_string(),
                line: idx + 1,
                body: &lines[idx..body_end],
            });
        }
        methods
    }

    fn check_types(&self, file: &str, lines: &[&str], issues: &mut Vec<MethodologyIssue>) {
        for ty in self.type_blocks(lines) {
            let measures: Vec<&Method> =
                ty.methods.iter().filter(|m| named(&m.name, &MEASURE_WORDS)).collect();
            let validators: Vec<&Method> =
                ty.methods.iter().filter(|m| named(&m.name, &VALIDATE_WORDS)).collect();

            if !measures.is_empty() && validators.is_empty() {
                issues.push(MethodologyIssue {
                    severity: Severity::Critical,
                    category: IssueCategory::MissingValidation,
                    file: file.to_string(),
                    line: Some(ty.line),
                    description: format!(
                        "type {} has measurement methods but no validation method",
                        ty.name
                    ),
                    recommendation:
                        "add a validation method that checks against independent ground truth"
                            .to_string(),
                });
            }

            for v in validators {
                let line = Some(v.line);
                if issues
                    .iter()
                    .any(|i| i.category == IssueCategory::CircularLogic && i.line == line)
                {
                    continue;
                }
                let called = measures
                    .iter()
                    .find(|m| m.name != v.name && v.body.iter().any(|l| calls(l, &m.name)));
                if let Some(m) = called {
                    issues.push(MethodologyIssue {
                        severity: Severity::Critical,
                        category: IssueCategory::CircularLogic,
                        file: file.to_string(),
                        line,
                        description: format!(
                            "validation method {} calls measurement method {}",
                            v.name, m.name
                        ),
                        recommendation:
                            "validate against independent ground truth, not self-generated measurements"
                                .to_string(),
                    });
                }
            }
        }
    }

    fn check_missing_validation(
        &self,
        file: &str,
        text: &str,
        lines: &[&str],
        issues: &mut Vec<MethodologyIssue>,
    ) {
        if self.validation_anywhere.is_match(text) {
            return;
        }
        for (idx, line) in lines.iter().enumerate() {
            if self.measurement_def.is_match(line) {
                issues.push(MethodologyIssue {
                    severity: Severity::Critical,
                    category: IssueCategory::MissingValidation,
                    file: file.to_string(),
                    line: Some(idx + 1),
                    description: "measurement routine with no validation against ground truth"
                        .to_string(),
                    recommendation:
                        "validate against independent ground truth before using the measure"
                            .to_string(),
                });
            }
        }
    }

    fn check_statistics(&self, file: &str, lines: &[&str], issues: &mut Vec<MethodologyIssue>) {
        for (idx, line) in lines.iter().enumerate() {
            if self.p_value.is_match(line) {
                let lo = idx.saturating_sub(EFFECT_WINDOW);
                let hi = (idx + EFFECT_WINDOW + 1).min(lines.len());
                if !lines[lo..hi].iter().any(|l| self.effect_size.is_match(l)) {
                    issues.push(MethodologyIssue {
                        severity: Severity::Major,
                        category: IssueCategory::StatisticalIssue,
                        file: file.to_string(),
                        line: Some(idx + 1),
                        description: "p-value reported without effect size or confidence interval"
                            .to_string(),
                        recommendation:
                            "report effect sizes with confidence intervals alongside p-values"
                                .to_string(),
                    });
                }
            }
            if self.significance.is_match(line) && !self.comment.is_match(line) {
                issues.push(MethodologyIssue {
                    severity: Severity::Major,
                    category: IssueCategory::StatisticalIssue,
                    file: file.to_string(),
                    line: Some(idx + 1),
                    description: "significance claim without statistical details".to_string(),
                    recommendation: "state the test, p-value, effect size and interval".to_string(),
                });
            }
        }
    }

    fn check_reproducibility(&self, file: &str, lines: &[&str], issues: &mut Vec<MethodologyIssue>) {
        let has_random = lines.iter().any(|l| self.random_op.is_match(l));
        let has_seed = lines.iter().any(|l| self.seed.is_match(l));
        if has_random && !has_seed {
            issues.push(MethodologyIssue {
                severity: Severity::Major,
                category: IssueCategory::Reproducibility,
                file: file.to_string(),
                line: None,
                description: "random operations without a seed".to_string(),
                recommendation: "fix and record the random seed".to_string(),
            });
        }
        for (idx, line) in lines.iter().enumerate() {
            if self.hyperparameter.is_match(line) && !self.comment.is_match(line) {
                issues.push(MethodologyIssue {
                    severity: Severity::Minor,
                    category: IssueCategory::Reproducibility,
                    file: file.to_string(),
                    line: Some(idx + 1),
                    description: "hyperparameter without documentation".to_string(),
                    recommendation: "document why this value was chosen".to_string(),
                });
            }
        }
    }
}

fn collect_files(dir: &Path, extensions: &[&str], out: &mut Vec<PathBuf>) -> RigorResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, extensions, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e))
        {
            out.push(path);
        }
    }
    Ok(())
}
