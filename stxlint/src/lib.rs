//! stxlint: a linter and auto-fixer for SciTeX research-code conventions.
//!
//! Parses Python with the ruff parser and checks scripts against a catalog
//! of structure, import, I/O, plotting, statistics, path, and figure-sizing
//! rules. The fixer rewrites `@stx.session` function signatures so required
//! injected parameters carry the canonical `stx.session.INJECTED` default.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// AST walk producing findings.
pub mod checker;
/// Clap command-line definition.
pub mod cli;
/// Subcommand implementations.
pub mod commands;
/// Configuration loading and merging.
pub mod config;
/// Shared entry point for the binary and tests.
pub mod entry_point;
/// Session-signature auto-fixer.
pub mod fixer;
/// Opt-in figure-sizing pass.
pub mod fm;
/// Terminal and JSON rendering.
pub mod output;
/// Package availability probing.
pub mod packages;
/// Rule catalog and finding types.
pub mod rules;
/// Line indexing and file collection helpers.
pub mod utils;
