//! Subcommand implementations.
//!
//! Each command takes a writer for its stdout stream so tests can capture
//! output; diagnostics go to stderr directly.

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets, Table};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::checker::lint_file;
use crate::config::LinterConfig;
use crate::fixer::fix_source;
use crate::output::{format_finding, format_summary, FileReport};
use crate::rules::{Finding, Rule, Severity, CATALOG};
use crate::utils::{collect_python_files, normalize_display_path};

/// Options for the `check` subcommand.
pub struct CheckOptions {
    /// Emit a JSON report instead of terminal output.
    pub json: bool,
    /// Suppress ANSI colors.
    pub no_color: bool,
    /// Minimum severity to report.
    pub severity: Severity,
    /// Comma-separated category filter.
    pub category: Option<String>,
}

/// Lints a file or directory tree. Exit code: 0 clean, 1 findings,
/// 2 errors present or target missing.
pub fn run_check<W: Write>(
    path: &Path,
    options: &CheckOptions,
    config: &LinterConfig,
    writer: &mut W,
) -> Result<i32> {
    let use_color = !options.no_color && std::io::stdout().is_terminal();
    let categories = parse_category_filter(options.category.as_deref());

    if !path.exists() {
        eprintln!("Error: {} not found", path.display());
        return Ok(2);
    }

    let files = collect_python_files(path, &config.exclude_dirs);
    if files.is_empty() {
        eprintln!("No Python files found in {}", path.display());
        return Ok(0);
    }

    let min_severity = options.severity;
    let results: Vec<(PathBuf, Vec<Finding>)> = files
        .par_iter()
        .map(|file| {
            let findings: Vec<Finding> = lint_file(file, config)
                .into_iter()
                .filter(|f| f.severity >= min_severity)
                .filter(|f| {
                    categories
                        .as_ref()
                        .is_none_or(|set| set.contains(f.category.as_str()))
                })
                .collect();
            (file.clone(), findings)
        })
        .filter(|(_, findings)| !findings.is_empty())
        .collect();

    let has_errors = results
        .iter()
        .any(|(_, findings)| findings.iter().any(|f| f.severity == Severity::Error));

    if options.json {
        let mut combined = serde_json::Map::new();
        for (file, findings) in results {
            let display = normalize_display_path(&file);
            let report = FileReport::new(display.clone(), findings);
            combined.insert(display, serde_json::to_value(report)?);
        }
        let empty = combined.is_empty();
        writeln!(writer, "{}", serde_json::to_string_pretty(&combined)?)?;
        return Ok(if has_errors {
            2
        } else {
            i32::from(!empty)
        });
    }

    if results.is_empty() {
        let message = "All files clean";
        if use_color {
            writeln!(writer, "{}", message.bright_green())?;
        } else {
            writeln!(writer, "{message}")?;
        }
        return Ok(0);
    }

    for (file, findings) in &results {
        let display = normalize_display_path(file);
        for finding in findings {
            writeln!(writer, "{}", format_finding(finding, &display, use_color))?;
        }
        writeln!(writer, "{}", format_summary(findings, &display, use_color))?;
        writeln!(writer)?;
    }

    Ok(if has_errors { 2 } else { 1 })
}

/// Applies (or previews) signature fixes. Exit code: 0 done, 1 when
/// `--check` found pending changes, 2 when the target is missing.
pub fn run_format<W: Write>(
    path: &Path,
    check_only: bool,
    show_diff: bool,
    config: &LinterConfig,
    writer: &mut W,
) -> Result<i32> {
    if !path.exists() {
        eprintln!("Error: {} not found", path.display());
        return Ok(2);
    }

    let files = collect_python_files(path, &config.exclude_dirs);
    if files.is_empty() {
        eprintln!("No Python files found in {}", path.display());
        return Ok(0);
    }

    let mut changed_count = 0usize;
    for file in &files {
        let original = std::fs::read_to_string(file)?;
        let fixed = fix_source(&original, config);
        if fixed == original {
            continue;
        }
        changed_count += 1;
        let display = normalize_display_path(file);
        if show_diff {
            write!(writer, "{}", unified_diff(&original, &fixed, &display))?;
        }
        if check_only {
            writeln!(writer, "Would fix {display}")?;
        } else {
            std::fs::write(file, &fixed)?;
            writeln!(writer, "Fixed {display}")?;
        }
    }

    if changed_count == 0 {
        writeln!(writer, "All files clean")?;
        return Ok(0);
    }
    if check_only {
        writeln!(writer, "\n{changed_count} file(s) would be changed")?;
        return Ok(1);
    }
    writeln!(writer, "\n{changed_count} file(s) fixed")?;
    Ok(0)
}

/// Lists the rule catalog, optionally filtered.
pub fn run_rules<W: Write>(
    json: bool,
    category: Option<&str>,
    severity: Option<Severity>,
    writer: &mut W,
) -> Result<i32> {
    let categories = parse_category_filter(category);
    let rules: Vec<&'static Rule> = CATALOG
        .iter()
        .copied()
        .filter(|rule| {
            categories
                .as_ref()
                .is_none_or(|set| set.contains(rule.category.as_str()))
        })
        .filter(|rule| severity.is_none_or(|s| rule.severity == s))
        .collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rules)?)?;
        return Ok(0);
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_header(["ID", "Severity", "Category", "Message"]);
    for rule in &rules {
        table.add_row([
            rule.id,
            rule.severity.as_str(),
            rule.category.as_str(),
            rule.message,
        ]);
    }
    writeln!(writer, "{table}")?;
    writeln!(writer, "\n  {} rules", rules.len())?;
    Ok(0)
}

/// Lints a script to stderr, then executes it with the Python interpreter.
///
/// Returns the script's exit code, or 2 when `--strict` blocks execution.
pub fn run_script(
    script: &Path,
    strict: bool,
    script_args: &[String],
    config: &LinterConfig,
) -> Result<i32> {
    let use_color = std::io::stderr().is_terminal();
    let display = normalize_display_path(script);

    if !Path::new(".git").is_dir() {
        let cwd = std::env::current_dir()?;
        let hint = if use_color {
            "Info".bright_blue().to_string()
        } else {
            "Info".to_owned()
        };
        eprintln!(
            "{hint}: not running from a git root directory (cwd: {})",
            cwd.display()
        );
    }

    let findings = lint_file(script, config);
    let has_errors = findings.iter().any(|f| f.severity == Severity::Error);
    let has_warnings = findings.iter().any(|f| f.severity >= Severity::Warning);

    if !findings.is_empty() {
        let header = if use_color {
            "SciTeX Lint".bold().to_string()
        } else {
            "SciTeX Lint".to_owned()
        };
        eprintln!("\n{header}\n");
        for finding in &findings {
            eprintln!("{}", format_finding(finding, &display, use_color));
        }
        eprintln!("{}", format_summary(&findings, &display, use_color));
        eprintln!();
    }

    if strict && has_errors {
        let label = if use_color {
            "Aborted".bright_red().to_string()
        } else {
            "Aborted".to_owned()
        };
        eprintln!("{label}: errors found (--strict mode)\n");
        return Ok(2);
    }

    if !has_errors && !has_warnings {
        let label = if use_color {
            "OK".bright_green().to_string()
        } else {
            "OK".to_owned()
        };
        eprintln!("{label} {display}");
    }

    let separator = "\u{2500}".repeat(60);
    if use_color {
        eprintln!("\n{}", separator.bright_black());
    } else {
        eprintln!("\n{separator}");
    }

    for python in ["python3", "python"] {
        match std::process::Command::new(python)
            .arg(script)
            .args(script_args)
            .status()
        {
            Ok(status) => return Ok(status.code().unwrap_or(1)),
            Err(_) => continue, // interpreter not on PATH, try the next
        }
    }
    anyhow::bail!("no Python interpreter found on PATH (tried python3, python)")
}

fn parse_category_filter(category: Option<&str>) -> Option<FxHashSet<String>> {
    category.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    })
}

/// Single-hunk unified diff: shared prefix and suffix lines are elided,
/// the changed middle is emitted as removals then additions.
fn unified_diff(original: &str, fixed: &str, path: &str) -> String {
    let old_lines: Vec<&str> = original.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = fixed.split_inclusive('\n').collect();

    let mut prefix = 0;
    while prefix < old_lines.len()
        && prefix < new_lines.len()
        && old_lines[prefix] == new_lines[prefix]
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < old_lines.len() - prefix
        && suffix < new_lines.len() - prefix
        && old_lines[old_lines.len() - 1 - suffix] == new_lines[new_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let old_hunk = &old_lines[prefix..old_lines.len() - suffix];
    let new_hunk = &new_lines[prefix..new_lines.len() - suffix];
    if old_hunk.is_empty() && new_hunk.is_empty() {
        return String::new();
    }

    let mut out = format!("--- {path}\n+++ {path}\n");
    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        prefix + 1,
        old_hunk.len(),
        prefix + 1,
        new_hunk.len()
    ));
    for line in old_hunk {
        out.push('-');
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
    for line in new_hunk {
        out.push('+');
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_parsing() {
        assert!(parse_category_filter(None).is_none());
        let set = parse_category_filter(Some("io, plot,")).unwrap();
        assert!(set.contains("io"));
        assert!(set.contains("plot"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn unified_diff_elides_common_lines() {
        let original = "a\nb\nc\n";
        let fixed = "a\nB\nc\n";
        let diff = unified_diff(original, fixed, "f.py");
        assert_eq!(diff, "--- f.py\n+++ f.py\n@@ -2,1 +2,1 @@\n-b\n+B\n");
    }

    #[test]
    fn unified_diff_handles_insertion() {
        let original = "a\nc\n";
        let fixed = "a\nb\nc\n";
        let diff = unified_diff(original, fixed, "f.py");
        assert_eq!(diff, "--- f.py\n+++ f.py\n@@ -2,0 +2,1 @@\n+b\n");
    }

    #[test]
    fn identical_sources_produce_empty_diff() {
        assert_eq!(unified_diff("same\n", "same\n", "f.py"), "");
    }

    #[test]
    fn rules_listing_counts_catalog() {
        let mut buffer = Vec::new();
        let code = run_rules(false, None, None, &mut buffer).unwrap();
        assert_eq!(code, 0);
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("44 rules"));
        assert!(text.contains("STX-S001"));
    }

    #[test]
    fn rules_listing_filters_by_severity_json() {
        let mut buffer = Vec::new();
        run_rules(true, Some("structure"), Some(Severity::Error), &mut buffer).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&buffer).unwrap();
        let items = value.as_array().unwrap();
        assert!(!items.is_empty());
        assert!(items
            .iter()
            .all(|r| r["severity"] == "error" && r["category"] == "structure"));
    }
}
