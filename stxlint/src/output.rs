//! Terminal and JSON rendering of findings.

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::rules::{Finding, Severity};

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "E",
        Severity::Warning => "W",
        Severity::Info => "I",
    }
}

fn severity_paint(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::Error => text.bright_red(),
        Severity::Warning => text.bright_yellow(),
        Severity::Info => text.bright_blue(),
    }
}

/// Renders one finding as an indented multi-line block.
#[must_use]
pub fn format_finding(finding: &Finding, filepath: &str, color: bool) -> String {
    if !color {
        return format_plain(finding, filepath);
    }

    let icon = severity_paint(finding.severity, severity_icon(finding.severity));
    let location = format!("{filepath}:{}:{}", finding.line, finding.col).bold();
    let rule_id = severity_paint(finding.severity, finding.rule_id);

    let mut lines = vec![format!("  {icon} {location}  {rule_id}")];
    if !finding.source_line.is_empty() {
        lines.push(format!("    {}", finding.source_line.bright_black()));
    }
    lines.push(format!(
        "    {}",
        severity_paint(finding.severity, &finding.message)
    ));
    lines.push(format!("    {}", finding.suggestion.bright_green()));
    lines.join("\n")
}

fn format_plain(finding: &Finding, filepath: &str) -> String {
    let mut lines = vec![format!(
        "  {} {filepath}:{}:{}  {}",
        severity_icon(finding.severity),
        finding.line,
        finding.col,
        finding.rule_id
    )];
    if !finding.source_line.is_empty() {
        lines.push(format!("    {}", finding.source_line));
    }
    lines.push(format!("    {}", finding.message));
    lines.push(format!("    {}", finding.suggestion));
    lines.join("\n")
}

/// Renders the per-file count line, or an `OK` marker when clean.
#[must_use]
pub fn format_summary(findings: &[Finding], filepath: &str, color: bool) -> String {
    if findings.is_empty() {
        return if color {
            format!("{} {filepath}", "OK".bright_green())
        } else {
            format!("OK {filepath}")
        };
    }

    let summary = Summary::count(findings);
    let mut parts = Vec::new();
    if summary.errors > 0 {
        let label = format!(
            "{} error{}",
            summary.errors,
            if summary.errors == 1 { "" } else { "s" }
        );
        parts.push(if color {
            label.bright_red().to_string()
        } else {
            label
        });
    }
    if summary.warnings > 0 {
        let label = format!(
            "{} warning{}",
            summary.warnings,
            if summary.warnings == 1 { "" } else { "s" }
        );
        parts.push(if color {
            label.bright_yellow().to_string()
        } else {
            label
        });
    }
    if summary.infos > 0 {
        let label = format!("{} info", summary.infos);
        parts.push(if color {
            label.bright_blue().to_string()
        } else {
            label
        });
    }

    let fp = if color {
        filepath.bold().to_string()
    } else {
        filepath.to_owned()
    };
    format!("  {} in {fp}", parts.join(", "))
}

/// Finding counts by severity.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Summary {
    /// Error-severity findings.
    pub errors: usize,
    /// Warning-severity findings.
    pub warnings: usize,
    /// Info-severity findings.
    pub infos: usize,
}

impl Summary {
    /// Tallies findings by severity.
    #[must_use]
    pub fn count(findings: &[Finding]) -> Self {
        Self {
            errors: findings
                .iter()
                .filter(|f| f.severity == Severity::Error)
                .count(),
            warnings: findings
                .iter()
                .filter(|f| f.severity == Severity::Warning)
                .count(),
            infos: findings
                .iter()
                .filter(|f| f.severity == Severity::Info)
                .count(),
        }
    }
}

/// JSON report for a single file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// Display path of the linted file.
    pub file: String,
    /// Findings, already filtered and sorted.
    pub issues: Vec<Finding>,
    /// Counts by severity.
    pub summary: Summary,
}

impl FileReport {
    /// Builds the report, taking ownership of the findings.
    #[must_use]
    pub fn new(file: String, issues: Vec<Finding>) -> Self {
        let summary = Summary::count(&issues);
        Self {
            file,
            issues,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules;

    fn sample_finding() -> Finding {
        Finding::new(&rules::P004, 12, 4, "plt.show()".to_owned())
    }

    #[test]
    fn plain_finding_layout() {
        let rendered = format_finding(&sample_finding(), "script.py", false);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "  I script.py:12:4  STX-P004");
        assert_eq!(lines[1], "    plt.show()");
        assert!(lines[2].starts_with("    "));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn plain_finding_skips_empty_source_line() {
        let finding = Finding::new(&rules::S002, 1, 0, String::new());
        let rendered = format_finding(&finding, "script.py", false);
        assert_eq!(rendered.lines().count(), 3);
    }

    #[test]
    fn summary_counts_and_pluralization() {
        let findings = vec![
            Finding::new(&rules::S002, 1, 0, String::new()),
            Finding::new(&rules::P004, 5, 0, String::new()),
            Finding::new(&rules::P004, 9, 0, String::new()),
            Finding::new(&rules::I001, 2, 0, String::new()),
        ];
        let rendered = format_summary(&findings, "script.py", false);
        assert_eq!(rendered, "  1 error, 1 warning, 2 info in script.py");
    }

    #[test]
    fn clean_file_summary() {
        assert_eq!(format_summary(&[], "script.py", false), "OK script.py");
    }

    #[test]
    fn report_serializes_expected_shape() {
        let report = FileReport::new("script.py".to_owned(), vec![sample_finding()]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["file"], "script.py");
        assert_eq!(value["issues"][0]["rule_id"], "STX-P004");
        assert_eq!(value["issues"][0]["severity"], "info");
        assert_eq!(value["issues"][0]["category"], "plot");
        assert_eq!(value["issues"][0]["line"], 12);
        assert_eq!(value["summary"]["infos"], 1);
        assert_eq!(value["summary"]["errors"], 0);
    }
}
