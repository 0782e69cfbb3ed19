use serde_json::{json, Value};

use crate::domain::{ComplexityReport, MetricKind, Severity};

/// Renders a complexity report as SARIF 2.1.0 with one rule per metric.
pub fn to_sarif(report: &ComplexityReport) -> Value {
    let rules: Vec<Value> = MetricKind::all()
        .iter()
        .map(|metric| {
            json!({
                "id": metric.rule_id(),
                "name": rule_name(*metric),
                "shortDescription": { "text": rule_description(*metric) },
            })
        })
        .collect();

    let results: Vec<Value> = report
        .violations()
        .map(|violation| {
            let level = match violation.severity {
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            let symbol = if violation.symbol_name.is_empty() {
                "<file>".to_string()
            } else {
                violation.symbol_name.clone()
            };
            json!({
                "ruleId": violation.metric.rule_id(),
                "level": level,
                "message": {
                    "text": format!(
                        "{symbol} has {} {:.1} (threshold {:.1})",
                        violation.metric.as_str(),
                        violation.value,
                        violation.threshold
                    )
                },
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": { "uri": violation.file.clone() },
                        "region": { "startLine": violation.line }
                    }
                }]
            })
        })
        .collect();

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "lien",
                    "informationUri": "https://github.com/getlien/lien",
                    "rules": rules
                }
            },
            "results": results
        }]
    })
}

fn rule_name(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::Cyclomatic => "HighCyclomaticComplexity",
        MetricKind::Cognitive => "HighCognitiveComplexity",
        MetricKind::HalsteadEffort => "HighHalsteadEffort",
        MetricKind::HalsteadDifficulty => "HighHalsteadDifficulty",
        MetricKind::HalsteadBugs => "HighHalsteadBugs",
    }
}

fn rule_description(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::Cyclomatic => "Cyclomatic complexity exceeds the configured threshold",
        MetricKind::Cognitive => "Cognitive complexity exceeds the configured threshold",
        MetricKind::HalsteadEffort => "Halstead effort exceeds the configured threshold",
        MetricKind::HalsteadDifficulty => "Halstead difficulty exceeds the configured threshold",
        MetricKind::HalsteadBugs => "Estimated Halstead bugs exceed the configured threshold",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComplexityViolation, FileComplexityReport, ReportSummary, RiskLevel};

    #[test]
    fn test_cognitive_violation_maps_to_rule_and_level() {
        let report = ComplexityReport {
            files: vec![FileComplexityReport {
                file: "src/parse.ts".to_string(),
                violations: vec![ComplexityViolation {
                    file: "src/parse.ts".to_string(),
                    symbol_name: "walk".to_string(),
                    line: 42,
                    metric: MetricKind::Cognitive,
                    value: 22.0,
                    threshold: 15.0,
                    severity: Severity::Warning,
                }],
                dependent_count: 1,
                risk_level: RiskLevel::Medium,
                max_complexity: 9,
                average_complexity: 9.0,
            }],
            summary: ReportSummary::default(),
        };

        let sarif = to_sarif(&report);
        assert_eq!(sarif["version"], "2.1.0");

        let results = sarif["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["ruleId"], "lien/high-cognitive-complexity");
        assert_eq!(results[0]["level"], "warning");
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "src/parse.ts"
        );
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["region"]["startLine"],
            42
        );

        // One rule per metric type.
        let rules = sarif["runs"][0]["tool"]["driver"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), MetricKind::all().len());
    }
}
