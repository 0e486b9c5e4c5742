//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::rules::Severity;

/// SciTeX convention linter for Python research code.
#[derive(Parser, Debug)]
#[command(
    name = "stxlint",
    version,
    about = "Enforce reproducible research patterns in Python code"
)]
pub struct Cli {
    /// Subcommand to run; help is printed when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check Python files for convention compliance
    Check {
        /// Python file or directory to check
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Minimum severity to report
        #[arg(long, value_name = "LEVEL", default_value = "info")]
        severity: Severity,

        /// Filter by category (comma-separated: structure,import,io,plot,stats,path,figure)
        #[arg(long, value_name = "LIST")]
        category: Option<String>,
    },

    /// Auto-fix signature issues (insert missing injected parameters)
    Format {
        /// Python file or directory to format
        path: PathBuf,

        /// Report whether changes are needed without writing (exit 1 if so)
        #[arg(long)]
        check: bool,

        /// Show a unified diff of the changes
        #[arg(long)]
        diff: bool,
    },

    /// List the rule catalog
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Filter by category (comma-separated)
        #[arg(long, value_name = "LIST")]
        category: Option<String>,

        /// Filter by severity
        #[arg(long, value_name = "LEVEL")]
        severity: Option<Severity>,
    },

    /// Lint a script, then execute it with the Python interpreter
    Run {
        /// Python script to run
        script: PathBuf,

        /// Abort before execution when lint errors are found
        #[arg(long)]
        strict: bool,

        /// Arguments passed through to the script (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_with_filters() {
        let cli = Cli::try_parse_from([
            "stxlint", "check", "scripts/", "--json", "--severity", "warning", "--category",
            "io,plot",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Check {
                json,
                severity,
                category,
                ..
            }) => {
                assert!(json);
                assert_eq!(severity, Severity::Warning);
                assert_eq!(category.as_deref(), Some("io,plot"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_severity() {
        let result = Cli::try_parse_from(["stxlint", "check", "a.py", "--severity", "fatal"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_collects_trailing_script_args() {
        let cli = Cli::try_parse_from([
            "stxlint", "run", "train.py", "--strict", "--", "--epochs", "10",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                script,
                strict,
                args,
            }) => {
                assert_eq!(script, PathBuf::from("train.py"));
                assert!(strict);
                assert_eq!(args, vec!["--epochs", "10"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
