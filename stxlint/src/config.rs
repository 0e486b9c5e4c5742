//! Configuration loading and merging.
//!
//! Precedence, lowest to highest: built-in defaults, the nearest
//! `.stxlint.toml` or `pyproject.toml` `[tool.stxlint]` table found by
//! walking up from the start path, then `STXLINT_*` environment variables.

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::rules::Severity;

/// Standalone config filename, searched before pyproject.toml.
pub const CONFIG_FILENAME: &str = ".stxlint.toml";
/// Python project manifest carrying the `[tool.stxlint]` table.
pub const PYPROJECT_FILENAME: &str = "pyproject.toml";

/// Linter configuration, read-only after loading.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    /// Minimum severity to report.
    pub severity: Severity,
    /// Directory names skipped during file collection.
    #[serde(alias = "exclude-dirs")]
    pub exclude_dirs: Vec<String>,
    /// Filename patterns (fnmatch-style) classified as library units.
    #[serde(alias = "library-patterns")]
    pub library_patterns: Vec<String>,
    /// Directory names whose contents are classified as library units.
    #[serde(alias = "library-dirs")]
    pub library_dirs: Vec<String>,
    /// Rule ids that never produce findings.
    pub disable: Vec<String>,
    /// Opt-in rule groups (`FM` or `figure` enables the figure pass).
    pub enable: Vec<String>,
    /// Per-rule severity overrides applied at finding construction.
    #[serde(alias = "per-rule-severity")]
    pub per_rule_severity: FxHashMap<String, Severity>,
    /// Parameter names every session function must declare, canonical order.
    #[serde(alias = "required-injected")]
    pub required_injected: Vec<String>,
    /// Optional `[ ... .session]` sub-table (pyproject layout).
    #[serde(default)]
    session: SessionSection,
    /// The config file this was loaded from, `None` for defaults.
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SessionSection {
    #[serde(alias = "required-injected")]
    required_injected: Option<Vec<String>>,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            severity: Severity::Info,
            exclude_dirs: vec![
                "__pycache__".to_owned(),
                ".git".to_owned(),
                "node_modules".to_owned(),
                ".tox".to_owned(),
                "venv".to_owned(),
                ".venv".to_owned(),
            ],
            library_patterns: vec![
                "__*__.py".to_owned(),
                "test_*.py".to_owned(),
                "conftest.py".to_owned(),
                "setup.py".to_owned(),
                "manage.py".to_owned(),
            ],
            library_dirs: vec!["src".to_owned()],
            disable: Vec::new(),
            enable: Vec::new(),
            per_rule_severity: FxHashMap::default(),
            required_injected: vec![
                "CONFIG".to_owned(),
                "plt".to_owned(),
                "COLORS".to_owned(),
                "rngg".to_owned(),
                "logger".to_owned(),
            ],
            session: SessionSection::default(),
            config_file_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StxlintToml {
    stxlint: LinterConfig,
}

#[derive(Debug, Deserialize)]
struct PyProject {
    tool: Option<ToolSection>,
}

#[derive(Debug, Deserialize)]
struct ToolSection {
    stxlint: Option<LinterConfig>,
}

impl LinterConfig {
    /// Loads configuration starting from the current directory.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(Path::new("."))
    }

    /// Loads configuration starting from a specific path and traversing up.
    ///
    /// A `pyproject.toml` without a `[tool.stxlint]` table does not stop the
    /// walk. Environment overrides are applied last.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut config = Self::discover(path).unwrap_or_default();
        if let Some(required) = config.session.required_injected.take() {
            config.required_injected = required;
        }
        config.apply_env();
        config
    }

    fn discover(path: &Path) -> Option<Self> {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let stxlint_toml = current.join(CONFIG_FILENAME);
            if stxlint_toml.exists() {
                if let Ok(content) = fs::read_to_string(&stxlint_toml) {
                    if let Ok(mut parsed) = toml::from_str::<StxlintToml>(&content) {
                        parsed.stxlint.config_file_path = Some(stxlint_toml);
                        return Some(parsed.stxlint);
                    }
                }
            }

            let pyproject_toml = current.join(PYPROJECT_FILENAME);
            if pyproject_toml.exists() {
                if let Ok(content) = fs::read_to_string(&pyproject_toml) {
                    if let Ok(parsed) = toml::from_str::<PyProject>(&content) {
                        if let Some(mut config) = parsed.tool.and_then(|t| t.stxlint) {
                            config.config_file_path = Some(pyproject_toml);
                            return Some(config);
                        }
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("STXLINT_SEVERITY") {
            if let Ok(severity) = value.parse() {
                self.severity = severity;
            }
        }
        if let Some(list) = env_list("STXLINT_DISABLE") {
            self.disable = list;
        }
        if let Some(list) = env_list("STXLINT_ENABLE") {
            self.enable = list;
        }
        if let Some(list) = env_list("STXLINT_EXCLUDE_DIRS") {
            self.exclude_dirs = list;
        }
        if let Some(list) = env_list("STXLINT_LIBRARY_DIRS") {
            self.library_dirs = list;
        }
        if let Some(list) = env_list("STXLINT_LIBRARY_PATTERNS") {
            self.library_patterns = list;
        }
        if let Some(list) = env_list("STXLINT_REQUIRED_INJECTED") {
            self.required_injected = list;
        }
    }

    /// Whether a rule id is disabled. Disable beats severity overrides.
    #[must_use]
    pub fn is_disabled(&self, rule_id: &str) -> bool {
        self.disable.iter().any(|d| d == rule_id)
    }

    /// Whether the opt-in figure pass is enabled.
    #[must_use]
    pub fn fm_enabled(&self) -> bool {
        self.enable.iter().any(|e| e == "FM" || e == "figure")
    }

    /// Checks if a filename matches any library pattern.
    #[must_use]
    pub fn matches_library_pattern(&self, filename: &str) -> bool {
        self.library_patterns
            .iter()
            .any(|pattern| fnmatch(pattern, filename))
    }

    /// Classifies a unit as a library module (exempt from script-only rules).
    ///
    /// True when the filename matches a library pattern or any path
    /// component is a configured library directory.
    #[must_use]
    pub fn is_library_unit(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.matches_library_pattern(name) {
                return true;
            }
        }
        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| self.library_dirs.iter().any(|d| d == name))
        })
    }
}

/// fnmatch-style glob matching: `*` matches any run, `?` a single character.
fn fnmatch(pattern: &str, name: &str) -> bool {
    let translated = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    Regex::new(&format!("^{translated}$")).is_ok_and(|re| re.is_match(name))
}

fn env_list(var: &str) -> Option<Vec<String>> {
    let value = std::env::var(var).ok()?;
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let config = LinterConfig::default();
        assert_eq!(config.severity, Severity::Info);
        assert!(config.library_dirs.contains(&"src".to_owned()));
        assert_eq!(
            config.required_injected,
            vec!["CONFIG", "plt", "COLORS", "rngg", "logger"]
        );
        assert!(!config.fm_enabled());
    }

    #[test]
    fn library_pattern_classification() {
        let config = LinterConfig::default();
        assert!(config.matches_library_pattern("__init__.py"));
        assert!(config.matches_library_pattern("test_foo.py"));
        assert!(config.matches_library_pattern("conftest.py"));
        assert!(!config.matches_library_pattern("my_script.py"));

        assert!(config.is_library_unit(Path::new("src/pkg/module.py")));
        assert!(!config.is_library_unit(Path::new("scripts/analysis.py")));
    }

    #[test]
    fn custom_pattern_with_wildcard() {
        let mut config = LinterConfig::default();
        config.library_patterns.push("util_*.py".to_owned());
        assert!(config.matches_library_pattern("util_helpers.py"));
        assert!(!config.matches_library_pattern("other.py"));
    }

    #[test]
    fn load_from_stxlint_toml() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(
            file,
            r#"[stxlint]
severity = "warning"
disable = ["STX-P004"]
enable = ["FM"]
"#
        )
        .unwrap();

        let config = LinterConfig::load_from_path(dir.path());
        assert_eq!(config.severity, Severity::Warning);
        assert!(config.is_disabled("STX-P004"));
        assert!(config.fm_enabled());
        assert!(config.config_file_path.is_some());
    }

    #[test]
    fn load_from_pyproject_with_session_table() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(PYPROJECT_FILENAME)).unwrap();
        writeln!(
            file,
            r#"[tool.stxlint]
severity = "error"

[tool.stxlint.per-rule-severity]
"STX-P004" = "error"

[tool.stxlint.session]
required_injected = ["CONFIG", "logger"]
"#
        )
        .unwrap();

        let config = LinterConfig::load_from_path(dir.path());
        assert_eq!(config.severity, Severity::Error);
        assert_eq!(
            config.per_rule_severity.get("STX-P004"),
            Some(&Severity::Error)
        );
        assert_eq!(config.required_injected, vec!["CONFIG", "logger"]);
    }

    #[test]
    fn load_traverses_up_from_nested_path() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("scripts").join("plots");
        std::fs::create_dir_all(&nested).unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(
            file,
            r#"[stxlint]
severity = "warning"
"#
        )
        .unwrap();

        let config = LinterConfig::load_from_path(&nested);
        assert_eq!(config.severity, Severity::Warning);
    }

    #[test]
    fn pyproject_without_table_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(PYPROJECT_FILENAME)).unwrap();
        writeln!(
            file,
            r#"[project]
name = "unrelated"
"#
        )
        .unwrap();

        let config = LinterConfig::load_from_path(dir.path());
        assert_eq!(config.severity, Severity::Info);
    }
}
