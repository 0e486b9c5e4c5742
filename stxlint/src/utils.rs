//! Shared helpers: byte-offset to line/column mapping and file collection.

use ruff_text_size::TextSize;
use std::path::{Path, PathBuf};

/// A utility struct to convert byte offsets to line and column numbers.
///
/// The parser works with byte offsets, but findings are reported with
/// 1-based line numbers and 0-based byte columns.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for newlines.
    /// Uses byte iteration since '\n' is always a single byte in UTF-8.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, byte) in source.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a `TextSize` to a (1-based line, 0-based byte column) pair.
    #[must_use]
    pub fn line_col(&self, offset: TextSize) -> (usize, usize) {
        let offset = offset.to_usize();
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        };
        (line, offset - self.line_starts[line - 1])
    }
}

/// Returns the trimmed text of a 1-based source line, or `""` out of range.
#[must_use]
pub fn source_line<'a>(lines: &[&'a str], line: usize) -> &'a str {
    if line >= 1 && line <= lines.len() {
        lines[line - 1].trim_end()
    } else {
        ""
    }
}

/// Checks if a name matches any exclusion pattern.
/// Supports exact matching and wildcard patterns starting with `*.`.
#[must_use]
pub fn is_excluded(name: &str, excludes: &[String]) -> bool {
    for exclude in excludes {
        if exclude.starts_with("*.") {
            if name.ends_with(&exclude[1..]) {
                return true;
            }
        } else if name == exclude {
            return true;
        }
    }
    false
}

/// Collects Python files from a path with gitignore support.
///
/// Uses the `ignore` crate to respect .gitignore, .git/info/exclude, and the
/// global gitignore in addition to the configured directory exclusions.
/// A file path is returned as-is; directories are walked recursively.
/// Results are sorted for deterministic output.
#[must_use]
pub fn collect_python_files(root: &Path, exclude_dirs: &[String]) -> Vec<PathBuf> {
    use ignore::WalkBuilder;

    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let excludes = exclude_dirs.to_vec();
    let root_for_filter = root.to_path_buf();

    // filter_entry skips excluded directories at traversal time, preventing
    // descent into venv, node_modules, __pycache__, etc.
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(move |entry| {
            if entry.path() == root_for_filter {
                return true;
            }
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_excluded(name, &excludes) {
                    return false;
                }
            }
            true
        })
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_type().is_some_and(|ft| ft.is_dir()))
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| path.extension().is_some_and(|ext| ext == "py"))
        .collect();
    files.sort();
    files
}

/// Normalizes a path for CLI display.
///
/// - Converts backslashes to forward slashes (for cross-platform consistency)
/// - Strips leading "./" prefix (for cleaner output)
#[must_use]
pub fn normalize_display_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    let normalized = s.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .unwrap_or(&normalized)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn line_col_maps_offsets() {
        let source = "a = 1\nbb = 2\n";
        let index = LineIndex::new(source);
        assert_eq!(index.line_col(TextSize::new(0)), (1, 0));
        assert_eq!(index.line_col(TextSize::new(4)), (1, 4));
        assert_eq!(index.line_col(TextSize::new(6)), (2, 0));
        assert_eq!(index.line_col(TextSize::new(11)), (2, 5));
    }

    #[test]
    fn source_line_is_trimmed_and_bounded() {
        let lines: Vec<&str> = "x = 1  \ny = 2".lines().collect();
        assert_eq!(source_line(&lines, 1), "x = 1");
        assert_eq!(source_line(&lines, 2), "y = 2");
        assert_eq!(source_line(&lines, 0), "");
        assert_eq!(source_line(&lines, 3), "");
    }

    #[test]
    fn collect_skips_excluded_dirs() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        fs::write(root.join("a.py"), "x = 1")?;
        fs::write(root.join("notes.txt"), "not python")?;
        let venv = root.join("venv");
        fs::create_dir(&venv)?;
        fs::write(venv.join("b.py"), "x = 2")?;

        let files = collect_python_files(root, &["venv".to_owned()]);
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        assert_eq!(names, vec!["a.py".to_owned()]);
        Ok(())
    }

    #[test]
    fn collect_accepts_single_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("script.py");
        fs::write(&file, "x = 1")?;
        assert_eq!(collect_python_files(&file, &[]), vec![file]);
        Ok(())
    }
}
