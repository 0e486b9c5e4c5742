//! Shared entry point for the binary and for tests.

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::{self, CheckOptions};
use crate::config::LinterConfig;

/// Runs stxlint with the given arguments, writing to stdout.
///
/// # Errors
///
/// Returns an error if command execution fails.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Runs stxlint with the given arguments, writing output to the specified
/// writer. This is the testable version of [`run_with_args`].
///
/// # Errors
///
/// Returns an error if command execution fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["stxlint".to_owned()];
    program_args.extend(args);
    let cli = match Cli::try_parse_from(program_args) {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                write!(writer, "{e}")?;
                writer.flush()?;
                return Ok(0);
            }
            _ => {
                eprint!("{e}");
                return Ok(2);
            }
        },
    };

    match cli.command {
        Some(Commands::Check {
            path,
            json,
            no_color,
            severity,
            category,
        }) => {
            let config = LinterConfig::load_from_path(&path);
            let options = CheckOptions {
                json,
                no_color,
                severity,
                category,
            };
            commands::run_check(&path, &options, &config, writer)
        }
        Some(Commands::Format { path, check, diff }) => {
            let config = LinterConfig::load_from_path(&path);
            commands::run_format(&path, check, diff, &config, writer)
        }
        Some(Commands::Rules {
            json,
            category,
            severity,
        }) => commands::run_rules(json, category.as_deref(), severity, writer),
        Some(Commands::Run {
            script,
            strict,
            args,
        }) => {
            let config = LinterConfig::load_from_path(&script);
            commands::run_script(&script, strict, &args, &config)
        }
        None => {
            let help = <Cli as clap::CommandFactory>::command().render_help();
            write!(writer, "{help}")?;
            Ok(0)
        }
    }
}
