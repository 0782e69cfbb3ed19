use serde::{Deserialize, Serialize};

/// The metrics the complexity analyzer can gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Cyclomatic,
    Cognitive,
    HalsteadEffort,
    HalsteadDifficulty,
    HalsteadBugs,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cyclomatic => "cyclomatic",
            MetricKind::Cognitive => "cognitive",
            MetricKind::HalsteadEffort => "halsteadEffort",
            MetricKind::HalsteadDifficulty => "halsteadDifficulty",
            MetricKind::HalsteadBugs => "halsteadBugs",
        }
    }

    /// SARIF rule id, one per metric.
    pub fn rule_id(&self) -> &'static str {
        match self {
            MetricKind::Cyclomatic => "lien/high-cyclomatic-complexity",
            MetricKind::Cognitive => "lien/high-cognitive-complexity",
            MetricKind::HalsteadEffort => "lien/high-halstead-effort",
            MetricKind::HalsteadDifficulty => "lien/high-halstead-difficulty",
            MetricKind::HalsteadBugs => "lien/high-halstead-bugs",
        }
    }

    pub fn all() -> &'static [MetricKind] {
        &[
            MetricKind::Cyclomatic,
            MetricKind::Cognitive,
            MetricKind::HalsteadEffort,
            MetricKind::HalsteadDifficulty,
            MetricKind::HalsteadBugs,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One metric exceeding its threshold in one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityViolation {
    pub file: String,
    pub symbol_name: String,
    pub line: u32,
    pub metric: MetricKind,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
}

/// Qualitative rollup of a file's violations weighted by dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Per-file aggregation: violations, dependents, risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileComplexityReport {
    pub file: String,
    pub violations: Vec<ComplexityViolation>,
    pub dependent_count: usize,
    pub risk_level: RiskLevel,
    pub max_complexity: u32,
    pub average_complexity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub files_analyzed: usize,
    pub total_violations: usize,
    pub warning_count: usize,
    pub error_count: usize,
    pub average_complexity: f64,
    pub max_complexity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub files: Vec<FileComplexityReport>,
    pub summary: ReportSummary,
}

impl ComplexityReport {
    pub fn violations(&self) -> impl Iterator<Item = &ComplexityViolation> {
        self.files.iter().flat_map(|f| f.violations.iter())
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.violations().filter(|v| v.severity == severity).count()
    }
}

/// Severity of one complexity delta between a base and a head report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaSeverity {
    Improved,
    New,
    Deleted,
    Error,
    Warning,
}

/// One `(filepath, symbol, metric)` difference between two reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityDelta {
    pub file: String,
    pub symbol_name: String,
    pub metric: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_value: Option<f64>,
    pub delta: f64,
    pub severity: DeltaSeverity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_ids_are_namespaced() {
        for metric in MetricKind::all() {
            assert!(metric.rule_id().starts_with("lien/high-"));
        }
        assert_eq!(
            MetricKind::Cognitive.rule_id(),
            "lien/high-cognitive-complexity"
        );
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_report_severity_counts() {
        let violation = |severity| ComplexityViolation {
            file: "a.ts".to_string(),
            symbol_name: "f".to_string(),
            line: 1,
            metric: MetricKind::Cyclomatic,
            value: 20.0,
            threshold: 15.0,
            severity,
        };
        let report = ComplexityReport {
            files: vec![FileComplexityReport {
                file: "a.ts".to_string(),
                violations: vec![violation(Severity::Warning), violation(Severity::Error)],
                dependent_count: 0,
                risk_level: RiskLevel::Medium,
                max_complexity: 20,
                average_complexity: 20.0,
            }],
            summary: ReportSummary::default(),
        };
        assert_eq!(report.count_by_severity(Severity::Warning), 1);
        assert_eq!(report.count_by_severity(Severity::Error), 1);
    }
}
