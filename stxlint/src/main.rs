//! Binary entry point for the stxlint CLI.
//!
//! Delegates to the shared `entry_point::run_with_args()` so the binary and
//! the test harness exercise the same code path.

use anyhow::Result;

fn main() -> Result<()> {
    let code = stxlint::entry_point::run_with_args(std::env::args().skip(1).collect())?;
    std::process::exit(code);
}
