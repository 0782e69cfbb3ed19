use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    CodeChunk, ComplexityDelta, ComplexityReport, ComplexityViolation, DeltaSeverity,
    FileComplexityReport, LienError, MetricKind, ReportSummary, RiskLevel, Severity,
};

/// Dependent count at which violations escalate the file's risk level.
const HIGH_DEPENDENT_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ComplexityThresholds {
    /// Cyclomatic threshold per function/method.
    pub method: f64,
    pub cognitive: f64,
    pub halstead_effort: f64,
    pub halstead_difficulty: f64,
    pub halstead_bugs: f64,
    /// Per-file rollup thresholds (summed cyclomatic, mean cyclomatic).
    pub file: f64,
    pub average: f64,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            method: 15.0,
            cognitive: 15.0,
            halstead_effort: 10_000.0,
            halstead_difficulty: 20.0,
            halstead_bugs: 1.0,
            file: 50.0,
            average: 8.0,
        }
    }
}

impl ComplexityThresholds {
    pub fn validate(&self) -> Result<(), LienError> {
        let values = [
            ("method", self.method),
            ("cognitive", self.cognitive),
            ("halsteadEffort", self.halstead_effort),
            ("halsteadDifficulty", self.halstead_difficulty),
            ("halsteadBugs", self.halstead_bugs),
            ("file", self.file),
            ("average", self.average),
        ];
        for (name, value) in values {
            if !value.is_finite() || value <= 0.0 {
                return Err(LienError::config(format!(
                    "complexity.thresholds.{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }

    fn for_metric(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Cyclomatic => self.method,
            MetricKind::Cognitive => self.cognitive,
            MetricKind::HalsteadEffort => self.halstead_effort,
            MetricKind::HalsteadDifficulty => self.halstead_difficulty,
            MetricKind::HalsteadBugs => self.halstead_bugs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SeverityMultipliers {
    pub warning: f64,
    pub error: f64,
}

impl Default for SeverityMultipliers {
    fn default() -> Self {
        Self {
            warning: 1.0,
            error: 2.0,
        }
    }
}

/// Joins chunk metrics with reverse-dependency counts into a report.
pub struct ComplexityAnalyzer {
    thresholds: ComplexityThresholds,
    multipliers: SeverityMultipliers,
}

impl ComplexityAnalyzer {
    pub fn new(thresholds: ComplexityThresholds, multipliers: SeverityMultipliers) -> Self {
        Self {
            thresholds,
            multipliers,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ComplexityThresholds::default(), SeverityMultipliers::default())
    }

    /// Builds the report. `dependents` maps file path to its
    /// reverse-dependency count; missing entries count as zero.
    pub fn analyze(
        &self,
        chunks: &[CodeChunk],
        dependents: &BTreeMap<String, usize>,
    ) -> ComplexityReport {
        let mut by_file: BTreeMap<String, Vec<&CodeChunk>> = BTreeMap::new();
        for chunk in chunks {
            by_file
                .entry(chunk.metadata().file.clone())
                .or_default()
                .push(chunk);
        }

        let mut files = Vec::with_capacity(by_file.len());
        let mut total_complexity = 0u64;
        let mut measured_chunks = 0u64;
        let mut max_complexity = 0u32;

        for (file, file_chunks) in by_file {
            let mut violations = Vec::new();
            let mut file_max = 0u32;
            for chunk in &file_chunks {
                violations.extend(self.chunk_violations(chunk));
                let complexity = chunk.metadata().complexity;
                file_max = file_max.max(complexity);
                if complexity > 0 {
                    total_complexity += complexity as u64;
                    measured_chunks += 1;
                }
            }
            max_complexity = max_complexity.max(file_max);

            let measured: Vec<u32> = file_chunks
                .iter()
                .map(|c| c.metadata().complexity)
                .filter(|&c| c > 0)
                .collect();
            let average = if measured.is_empty() {
                0.0
            } else {
                measured.iter().map(|&c| c as f64).sum::<f64>() / measured.len() as f64
            };

            let dependent_count = dependents.get(&file).copied().unwrap_or(0);
            let risk_level = risk_level(&violations, dependent_count);
            files.push(FileComplexityReport {
                file,
                violations,
                dependent_count,
                risk_level,
                max_complexity: file_max,
                average_complexity: average,
            });
        }

        let total_violations: usize = files.iter().map(|f| f.violations.len()).sum();
        let warning_count = files
            .iter()
            .flat_map(|f| &f.violations)
            .filter(|v| v.severity == Severity::Warning)
            .count();
        let error_count = total_violations - warning_count;

        let summary = ReportSummary {
            files_analyzed: files.len(),
            total_violations,
            warning_count,
            error_count,
            average_complexity: if measured_chunks == 0 {
                0.0
            } else {
                total_complexity as f64 / measured_chunks as f64
            },
            max_complexity,
        };

        ComplexityReport { files, summary }
    }

    fn chunk_violations(&self, chunk: &CodeChunk) -> Vec<ComplexityViolation> {
        let m = chunk.metadata();
        // Line-chunked blocks carry no metrics (complexity 0 = absent).
        if m.complexity == 0 {
            return Vec::new();
        }
        let values = [
            (MetricKind::Cyclomatic, m.complexity as f64),
            (MetricKind::Cognitive, m.cognitive_complexity as f64),
            (MetricKind::HalsteadEffort, m.halstead_effort),
            (MetricKind::HalsteadDifficulty, m.halstead_difficulty),
            (MetricKind::HalsteadBugs, m.halstead_bugs),
        ];

        let mut violations = Vec::new();
        for (metric, value) in values {
            let threshold = self.thresholds.for_metric(metric);
            let severity = if value > threshold * self.multipliers.error {
                Some(Severity::Error)
            } else if value > threshold * self.multipliers.warning {
                Some(Severity::Warning)
            } else {
                None
            };
            if let Some(severity) = severity {
                violations.push(ComplexityViolation {
                    file: m.file.clone(),
                    symbol_name: m.symbol_name.clone(),
                    line: m.start_line,
                    metric,
                    value,
                    threshold,
                    severity,
                });
            }
        }
        violations
    }

    /// Diffs two reports restricted to `changed_files` (empty = all files).
    /// One delta per `(filepath, symbolName, metricType)` key; errors sort
    /// first, then decreasing positive delta.
    pub fn diff(
        base: &ComplexityReport,
        head: &ComplexityReport,
        changed_files: &[String],
    ) -> Vec<ComplexityDelta> {
        type Key = (String, String, MetricKind);
        let in_scope = |file: &str| changed_files.is_empty() || changed_files.iter().any(|f| f == file);

        let collect = |report: &ComplexityReport| -> BTreeMap<Key, (f64, Severity)> {
            report
                .violations()
                .filter(|v| in_scope(&v.file))
                .map(|v| {
                    (
                        (v.file.clone(), v.symbol_name.clone(), v.metric),
                        (v.value, v.severity),
                    )
                })
                .collect()
        };

        let base_map = collect(base);
        let head_map = collect(head);

        let mut deltas = Vec::new();
        for (key, (head_value, head_severity)) in &head_map {
            match base_map.get(key) {
                None => deltas.push(ComplexityDelta {
                    file: key.0.clone(),
                    symbol_name: key.1.clone(),
                    metric: key.2,
                    base_value: None,
                    head_value: Some(*head_value),
                    delta: *head_value,
                    severity: DeltaSeverity::New,
                }),
                Some((base_value, _)) => {
                    let delta = head_value - base_value;
                    if delta == 0.0 {
                        continue;
                    }
                    let severity = if delta < 0.0 {
                        DeltaSeverity::Improved
                    } else {
                        match head_severity {
                            Severity::Error => DeltaSeverity::Error,
                            Severity::Warning => DeltaSeverity::Warning,
                        }
                    };
                    deltas.push(ComplexityDelta {
                        file: key.0.clone(),
                        symbol_name: key.1.clone(),
                        metric: key.2,
                        base_value: Some(*base_value),
                        head_value: Some(*head_value),
                        delta,
                        severity,
                    });
                }
            }
        }
        for (key, (base_value, _)) in &base_map {
            if !head_map.contains_key(key) {
                deltas.push(ComplexityDelta {
                    file: key.0.clone(),
                    symbol_name: key.1.clone(),
                    metric: key.2,
                    base_value: Some(*base_value),
                    head_value: None,
                    delta: -*base_value,
                    severity: DeltaSeverity::Deleted,
                });
            }
        }

        deltas.sort_by(|a, b| {
            let a_error = a.severity == DeltaSeverity::Error;
            let b_error = b.severity == DeltaSeverity::Error;
            b_error
                .cmp(&a_error)
                .then(b.delta.partial_cmp(&a.delta).unwrap_or(std::cmp::Ordering::Equal))
        });
        deltas
    }
}

fn risk_level(violations: &[ComplexityViolation], dependent_count: usize) -> RiskLevel {
    let has_error = violations.iter().any(|v| v.severity == Severity::Error);
    let has_warning = violations.iter().any(|v| v.severity == Severity::Warning);
    let widely_depended = dependent_count >= HIGH_DEPENDENT_COUNT;

    if has_error && widely_depended {
        RiskLevel::Critical
    } else if has_error || (has_warning && widely_depended) {
        RiskLevel::High
    } else if has_warning {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkKind, ChunkMetadata, Language};

    fn chunk_with(complexity: u32, cognitive: u32, file: &str, name: &str) -> CodeChunk {
        let mut metadata =
            ChunkMetadata::new(file, 10, 30, ChunkKind::Function, Language::TypeScript);
        metadata.symbol_name = name.to_string();
        metadata.symbol_type = "function".to_string();
        metadata.complexity = complexity;
        metadata.cognitive_complexity = cognitive;
        CodeChunk::new("body", metadata)
    }

    #[test]
    fn test_seventeen_over_fifteen_is_a_warning() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let report = analyzer.analyze(&[chunk_with(17, 0, "a.ts", "f")], &BTreeMap::new());

        let violations: Vec<_> = report.violations().collect();
        assert_eq!(violations.len(), 1);
        let v = violations[0];
        assert_eq!(v.metric, MetricKind::Cyclomatic);
        assert_eq!(v.severity, Severity::Warning);
        assert_eq!(v.file, "a.ts");
        assert_eq!(v.line, 10);
        assert_eq!(v.value, 17.0);
    }

    #[test]
    fn test_double_threshold_is_an_error() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let report = analyzer.analyze(&[chunk_with(31, 0, "a.ts", "f")], &BTreeMap::new());
        let violations: Vec<_> = report.violations().collect();
        assert_eq!(violations[0].severity, Severity::Error);
    }

    #[test]
    fn test_under_threshold_is_clean() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let report = analyzer.analyze(&[chunk_with(15, 10, "a.ts", "f")], &BTreeMap::new());
        assert_eq!(report.summary.total_violations, 0);
        assert_eq!(report.files[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_escalates_with_dependents() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let mut dependents = BTreeMap::new();
        dependents.insert("a.ts".to_string(), 8usize);

        let warning_report = analyzer.analyze(&[chunk_with(17, 0, "a.ts", "f")], &dependents);
        assert_eq!(warning_report.files[0].risk_level, RiskLevel::High);

        let error_report = analyzer.analyze(&[chunk_with(40, 0, "a.ts", "f")], &dependents);
        assert_eq!(error_report.files[0].risk_level, RiskLevel::Critical);

        let error_isolated =
            analyzer.analyze(&[chunk_with(40, 0, "a.ts", "f")], &BTreeMap::new());
        assert_eq!(error_isolated.files[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn test_summary_counts() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let report = analyzer.analyze(
            &[
                chunk_with(17, 0, "a.ts", "warn_me"),
                chunk_with(40, 0, "b.ts", "error_me"),
                chunk_with(2, 0, "c.ts", "fine"),
            ],
            &BTreeMap::new(),
        );
        assert_eq!(report.summary.files_analyzed, 3);
        assert_eq!(report.summary.warning_count, 1);
        assert_eq!(report.summary.error_count, 1);
        assert_eq!(report.summary.max_complexity, 40);
    }

    #[test]
    fn test_line_chunks_are_not_flagged() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let mut metadata = ChunkMetadata::new("big.txt", 1, 75, ChunkKind::Block, Language::Unknown);
        metadata.complexity = 0;
        let report = analyzer.analyze(&[CodeChunk::new("text", metadata)], &BTreeMap::new());
        assert_eq!(report.summary.total_violations, 0);
    }

    #[test]
    fn test_diff_severities_and_order() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let none = BTreeMap::new();
        let base = analyzer.analyze(
            &[
                chunk_with(20, 0, "a.ts", "improves"),
                chunk_with(18, 0, "a.ts", "vanishes"),
                chunk_with(17, 0, "a.ts", "grows"),
            ],
            &none,
        );
        let head = analyzer.analyze(
            &[
                chunk_with(16, 0, "a.ts", "improves"),
                chunk_with(17, 0, "a.ts", "appears"),
                chunk_with(40, 0, "a.ts", "grows"),
            ],
            &none,
        );

        let deltas = ComplexityAnalyzer::diff(&base, &head, &[]);
        // The error-severity delta sorts first.
        assert_eq!(deltas[0].symbol_name, "grows");
        assert_eq!(deltas[0].severity, DeltaSeverity::Error);

        let by_name = |name: &str| deltas.iter().find(|d| d.symbol_name == name).unwrap();
        assert_eq!(by_name("improves").severity, DeltaSeverity::Improved);
        assert!(by_name("improves").delta < 0.0);
        assert_eq!(by_name("appears").severity, DeltaSeverity::New);
        assert_eq!(by_name("vanishes").severity, DeltaSeverity::Deleted);
    }

    #[test]
    fn test_diff_restricts_to_changed_files() {
        let analyzer = ComplexityAnalyzer::with_defaults();
        let none = BTreeMap::new();
        let base = analyzer.analyze(&[chunk_with(17, 0, "a.ts", "f")], &none);
        let head = analyzer.analyze(
            &[chunk_with(40, 0, "a.ts", "f"), chunk_with(40, 0, "b.ts", "g")],
            &none,
        );

        let deltas = ComplexityAnalyzer::diff(&base, &head, &["b.ts".to_string()]);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].file, "b.ts");
    }

    #[test]
    fn test_threshold_validation() {
        let mut thresholds = ComplexityThresholds::default();
        assert!(thresholds.validate().is_ok());
        thresholds.cognitive = 0.0;
        let err = thresholds.validate().unwrap_err();
        assert_eq!(err.code(), "config_error");
    }
}
