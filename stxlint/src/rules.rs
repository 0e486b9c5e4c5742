//! Rule catalog: the fixed set of SciTeX convention rules.
//!
//! Rules are immutable statics. Severity overrides and suggestion variants
//! are applied when a [`Finding`] is constructed, never to the catalog.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Severity level of a rule, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational hint.
    #[default]
    Info,
    /// Likely problem worth fixing.
    Warning,
    /// Violation that should block execution.
    Error,
}

impl Severity {
    /// Lowercase name as it appears in output and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown severity '{other}' (expected error, warning, or info)"
            )),
        }
    }
}

/// Rule category, a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Script structure (session decorator, main guard, imports).
    Structure,
    /// Module-level import patterns.
    Import,
    /// Call-level file I/O patterns.
    Io,
    /// Plotting calls.
    Plot,
    /// Statistical test calls.
    Stats,
    /// Path handling in `stx.io` calls.
    Path,
    /// Figure sizing and layout (opt-in, mm-based alternatives).
    Figure,
}

impl Category {
    /// Lowercase name as it appears in output and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Import => "import",
            Self::Io => "io",
            Self::Plot => "plot",
            Self::Stats => "stats",
            Self::Path => "path",
            Self::Figure => "figure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable rule descriptor.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Rule {
    /// Stable identifier, e.g. `STX-S001`.
    pub id: &'static str,
    /// Default severity (overridable per finding via config).
    pub severity: Severity,
    /// Category the rule belongs to.
    pub category: Category,
    /// Human-readable description of the detected pattern.
    pub message: &'static str,
    /// Suggested replacement.
    pub suggestion: &'static str,
    /// External Python package that must be importable for the rule to apply.
    #[serde(skip)]
    pub requires: Option<&'static str>,
}

/// A single lint finding, ready for serialization.
///
/// Field order matters: it defines the JSON shape.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Rule identifier, always present in the catalog.
    pub rule_id: &'static str,
    /// Effective severity (after per-rule overrides).
    pub severity: Severity,
    /// Rule category.
    pub category: Category,
    /// 1-based line number.
    pub line: usize,
    /// 0-based byte column.
    pub col: usize,
    /// Message text (may extend the catalog text, e.g. missing param names).
    pub message: String,
    /// Suggestion text (may be a context-specific variant).
    pub suggestion: String,
    /// The trimmed source line the finding points at, empty for file-level.
    pub source_line: String,
}

impl Finding {
    /// Builds a finding from a catalog rule with its default texts.
    #[must_use]
    pub fn new(rule: &'static Rule, line: usize, col: usize, source_line: String) -> Self {
        Self {
            rule_id: rule.id,
            severity: rule.severity,
            category: rule.category,
            line,
            col,
            message: rule.message.to_owned(),
            suggestion: rule.suggestion.to_owned(),
            source_line,
        }
    }
}

// ---------------------------------------------------------------------------
// Category S: Structure
// ---------------------------------------------------------------------------

/// Missing session decorator on the main function.
pub static S001: Rule = Rule {
    id: "STX-S001",
    severity: Severity::Error,
    category: Category::Structure,
    message: "Missing @stx.session decorator on main function",
    suggestion: "Add @stx.session to enable reproducible session tracking, auto-CLI, and provenance.\n  @stx.session\n  def main(...):\n      return 0",
    requires: None,
};

/// Missing entry guard.
pub static S002: Rule = Rule {
    id: "STX-S002",
    severity: Severity::Error,
    category: Category::Structure,
    message: "Missing `if __name__ == '__main__'` guard",
    suggestion: "Add `if __name__ == '__main__': main()` at the end of the script.",
    requires: None,
};

/// Hand-rolled argparse CLI.
pub static S003: Rule = Rule {
    id: "STX-S003",
    severity: Severity::Error,
    category: Category::Structure,
    message: "argparse detected — @stx.session auto-generates CLI from function signature",
    suggestion: "Remove `import argparse` and define parameters as function arguments:\n  @stx.session\n  def main(data_path: str, threshold: float = 0.5):\n      # Auto-generates: --data-path, --threshold",
    requires: None,
};

/// Session function without an integer exit code.
pub static S004: Rule = Rule {
    id: "STX-S004",
    severity: Severity::Warning,
    category: Category::Structure,
    message: "@stx.session function should return an integer exit code",
    suggestion: "Add `return 0` for success at the end of your session function.",
    requires: None,
};

/// Missing scitex import.
pub static S005: Rule = Rule {
    id: "STX-S005",
    severity: Severity::Warning,
    category: Category::Structure,
    message: "Missing `import scitex as stx`",
    suggestion: "Add `import scitex as stx` to use SciTeX modules.",
    requires: None,
};

/// Session function with undeclared injected parameters.
pub static S006: Rule = Rule {
    id: "STX-S006",
    severity: Severity::Warning,
    category: Category::Structure,
    message: "@stx.session function missing explicit INJECTED parameters",
    suggestion: "Declare auto-injected values explicitly in the function signature:\n  @stx.session\n  def main(\n      CONFIG=stx.session.INJECTED,\n      plt=stx.session.INJECTED,\n      COLORS=stx.session.INJECTED,\n      rngg=stx.session.INJECTED,\n      logger=stx.session.INJECTED,\n  ):\n      return 0",
    requires: None,
};

// ---------------------------------------------------------------------------
// Category I: Imports
// ---------------------------------------------------------------------------

/// Direct matplotlib.pyplot import.
pub static I001: Rule = Rule {
    id: "STX-I001",
    severity: Severity::Warning,
    category: Category::Import,
    message: "Use `stx.plt` instead of importing matplotlib.pyplot directly",
    suggestion: "Replace with `stx.plt` (or `plt` injected by @stx.session).",
    requires: None,
};

/// Direct scipy.stats import.
pub static I002: Rule = Rule {
    id: "STX-I002",
    severity: Severity::Warning,
    category: Category::Import,
    message: "Use `stx.stats` instead of importing scipy.stats directly",
    suggestion: "Replace with `stx.stats` which adds effect sizes, CI, and power analysis.",
    requires: None,
};

/// pickle import.
pub static I003: Rule = Rule {
    id: "STX-I003",
    severity: Severity::Warning,
    category: Category::Import,
    message: "Use `stx.io` instead of pickle for file I/O",
    suggestion: "Replace with `stx.io.save(obj, 'file.pkl')` / `stx.io.load('file.pkl')`.",
    requires: None,
};

/// pandas I/O functions.
pub static I004: Rule = Rule {
    id: "STX-I004",
    severity: Severity::Warning,
    category: Category::Import,
    message: "Use `stx.io` for CSV/DataFrame I/O instead of pandas I/O functions",
    suggestion: "Replace `pd.read_csv()` with `stx.io.load()`, `df.to_csv()` with `stx.io.save()`.",
    requires: None,
};

/// numpy save/load.
pub static I005: Rule = Rule {
    id: "STX-I005",
    severity: Severity::Warning,
    category: Category::Import,
    message: "Use `stx.io` for array I/O instead of numpy save/load",
    suggestion: "Replace `np.save()`/`np.load()` with `stx.io.save()`/`stx.io.load()`.",
    requires: None,
};

/// random import.
pub static I006: Rule = Rule {
    id: "STX-I006",
    severity: Severity::Info,
    category: Category::Import,
    message: "Use `rngg` (injected by @stx.session) for reproducible randomness",
    suggestion: "Remove `import random` and use `rngg` from @stx.session injection.",
    requires: None,
};

/// logging import.
pub static I007: Rule = Rule {
    id: "STX-I007",
    severity: Severity::Warning,
    category: Category::Import,
    message: "Use `logger` (injected by @stx.session) instead of logging module",
    suggestion: "Remove `import logging` and use `logger` from @stx.session injection.",
    requires: None,
};

// ---------------------------------------------------------------------------
// Category IO: Call-level I/O
// ---------------------------------------------------------------------------

/// np.save call.
pub static IO001: Rule = Rule {
    id: "STX-IO001",
    severity: Severity::Warning,
    category: Category::Io,
    message: "`np.save()` detected — use `stx.io.save()` for provenance tracking",
    suggestion: "Replace `np.save(path, arr)` with `stx.io.save(arr, path)`.",
    requires: None,
};

/// np.load call.
pub static IO002: Rule = Rule {
    id: "STX-IO002",
    severity: Severity::Warning,
    category: Category::Io,
    message: "`np.load()` detected — use `stx.io.load()` for provenance tracking",
    suggestion: "Replace `np.load(path)` with `stx.io.load(path)`.",
    requires: None,
};

/// pd.read_csv call.
pub static IO003: Rule = Rule {
    id: "STX-IO003",
    severity: Severity::Warning,
    category: Category::Io,
    message: "`pd.read_csv()` detected — use `stx.io.load()` for provenance tracking",
    suggestion: "Replace `pd.read_csv(path)` with `stx.io.load(path)`.",
    requires: None,
};

/// DataFrame to_csv call.
pub static IO004: Rule = Rule {
    id: "STX-IO004",
    severity: Severity::Warning,
    category: Category::Io,
    message: "`.to_csv()` detected — use `stx.io.save()` for provenance tracking",
    suggestion: "Replace `df.to_csv(path)` with `stx.io.save(df, path)`.",
    requires: None,
};

/// pickle.dump call.
pub static IO005: Rule = Rule {
    id: "STX-IO005",
    severity: Severity::Warning,
    category: Category::Io,
    message: "`pickle.dump()` detected — use `stx.io.save()` for provenance tracking",
    suggestion: "Replace `pickle.dump(obj, f)` with `stx.io.save(obj, 'file.pkl')`.",
    requires: None,
};

/// json.dump call.
pub static IO006: Rule = Rule {
    id: "STX-IO006",
    severity: Severity::Warning,
    category: Category::Io,
    message: "`json.dump()` detected — use `stx.io.save()` for provenance tracking",
    suggestion: "Replace `json.dump(obj, f)` with `stx.io.save(obj, 'file.json')`.",
    requires: None,
};

/// plt.savefig call.
pub static IO007: Rule = Rule {
    id: "STX-IO007",
    severity: Severity::Warning,
    category: Category::Io,
    message: "`plt.savefig()` detected — use `stx.io.save(fig, path)` for metadata embedding",
    suggestion: "Replace `plt.savefig(path)` with `stx.io.save(fig, path)`.",
    requires: None,
};

// ---------------------------------------------------------------------------
// Category P: Plotting
// ---------------------------------------------------------------------------

/// ax.plot hint.
pub static P001: Rule = Rule {
    id: "STX-P001",
    severity: Severity::Info,
    category: Category::Plot,
    message: "`ax.plot()` — consider `ax.stx_line()` for automatic CSV data export",
    suggestion: "Replace `ax.plot(x, y)` with `ax.stx_line(x, y)` for tracked plotting.",
    requires: None,
};

/// ax.scatter hint.
pub static P002: Rule = Rule {
    id: "STX-P002",
    severity: Severity::Info,
    category: Category::Plot,
    message: "`ax.scatter()` — consider `ax.stx_scatter()` for automatic CSV data export",
    suggestion: "Replace `ax.scatter(x, y)` with `ax.stx_scatter(x, y)` for tracked plotting.",
    requires: None,
};

/// ax.bar hint.
pub static P003: Rule = Rule {
    id: "STX-P003",
    severity: Severity::Info,
    category: Category::Plot,
    message: "`ax.bar()` — consider `ax.stx_bar()` for automatic sample size annotation",
    suggestion: "Replace `ax.bar(x, y)` with `ax.stx_bar(x, y)` for tracked plotting.",
    requires: None,
};

/// plt.show call.
pub static P004: Rule = Rule {
    id: "STX-P004",
    severity: Severity::Info,
    category: Category::Plot,
    message: "`plt.show()` is non-reproducible in batch/CI environments",
    suggestion: "Remove `plt.show()` — figures are auto-saved in session output directory.",
    requires: None,
};

/// print inside a session function.
pub static P005: Rule = Rule {
    id: "STX-P005",
    severity: Severity::Info,
    category: Category::Plot,
    message: "`print()` inside @stx.session — use `logger` for tracked logging",
    suggestion: "Replace `print(msg)` with `logger.info(msg)` (injected by @stx.session).",
    requires: None,
};

// ---------------------------------------------------------------------------
// Category ST: Statistics
// ---------------------------------------------------------------------------

/// scipy.stats.ttest_ind call.
pub static ST001: Rule = Rule {
    id: "STX-ST001",
    severity: Severity::Warning,
    category: Category::Stats,
    message: "`scipy.stats.ttest_ind()` — use `stx.stats.ttest_ind()` for auto effect size + CI",
    suggestion: "Replace with `stx.stats.ttest_ind(a, b)` which includes Cohen's d and CI.",
    requires: None,
};

/// scipy.stats.mannwhitneyu call.
pub static ST002: Rule = Rule {
    id: "STX-ST002",
    severity: Severity::Warning,
    category: Category::Stats,
    message: "`scipy.stats.mannwhitneyu()` — use `stx.stats.mannwhitneyu()` for auto effect size",
    suggestion: "Replace with `stx.stats.mannwhitneyu(a, b)` which includes Cliff's delta.",
    requires: None,
};

/// scipy.stats.pearsonr call.
pub static ST003: Rule = Rule {
    id: "STX-ST003",
    severity: Severity::Warning,
    category: Category::Stats,
    message: "`scipy.stats.pearsonr()` — use `stx.stats.pearsonr()` for auto CI + power",
    suggestion: "Replace with `stx.stats.pearsonr(a, b)` which includes CI and power analysis.",
    requires: None,
};

/// scipy.stats.f_oneway call.
pub static ST004: Rule = Rule {
    id: "STX-ST004",
    severity: Severity::Warning,
    category: Category::Stats,
    message: "`scipy.stats.f_oneway()` — use `stx.stats.anova_oneway()` for post-hoc + effect sizes",
    suggestion: "Replace with `stx.stats.anova_oneway(*groups)` which includes eta-squared.",
    requires: None,
};

/// scipy.stats.wilcoxon call.
pub static ST005: Rule = Rule {
    id: "STX-ST005",
    severity: Severity::Warning,
    category: Category::Stats,
    message: "`scipy.stats.wilcoxon()` — use `stx.stats.wilcoxon()` for auto effect size",
    suggestion: "Replace with `stx.stats.wilcoxon(a, b)` which includes effect size and CI.",
    requires: None,
};

/// scipy.stats.kruskal call.
pub static ST006: Rule = Rule {
    id: "STX-ST006",
    severity: Severity::Warning,
    category: Category::Stats,
    message: "`scipy.stats.kruskal()` — use `stx.stats.kruskal()` for post-hoc + effect sizes",
    suggestion: "Replace with `stx.stats.kruskal(*groups)` which includes epsilon-squared.",
    requires: None,
};

// ---------------------------------------------------------------------------
// Category PA: Path Handling
// ---------------------------------------------------------------------------

/// Absolute path literal in a stx.io call.
pub static PA001: Rule = Rule {
    id: "STX-PA001",
    severity: Severity::Warning,
    category: Category::Path,
    message: "Absolute path in `stx.io` call — use relative paths for reproducibility",
    suggestion: "Use `stx.io.save(obj, './relative/path.ext')` — paths resolve to script_out/.",
    requires: None,
};

/// open() inside a session function.
pub static PA002: Rule = Rule {
    id: "STX-PA002",
    severity: Severity::Warning,
    category: Category::Path,
    message: "`open()` detected — use `stx.io.save()`/`stx.io.load()` which includes auto-logging",
    suggestion: "Replace `open(path)` with `stx.io.load(path)` or `stx.io.save(obj, path)`.\n  stx.io automatically logs all I/O operations for provenance tracking.",
    requires: None,
};

/// Manual directory creation.
pub static PA003: Rule = Rule {
    id: "STX-PA003",
    severity: Severity::Info,
    category: Category::Path,
    message: "`os.makedirs()`/`mkdir()` detected — `stx.io.save()` creates directories automatically",
    suggestion: "Remove manual directory creation.\n  `stx.io.save(obj, './subdir/file.ext')` auto-creates `subdir/` inside script_out/.",
    requires: None,
};

/// os.chdir call.
pub static PA004: Rule = Rule {
    id: "STX-PA004",
    severity: Severity::Warning,
    category: Category::Path,
    message: "`os.chdir()` detected — scripts should be run from project root",
    suggestion: "Remove `os.chdir()` and run scripts from the project root directory.",
    requires: None,
};

/// Bare relative path in a stx.io call.
pub static PA005: Rule = Rule {
    id: "STX-PA005",
    severity: Severity::Info,
    category: Category::Path,
    message: "Path without `./` prefix in `stx.io` call — use `./` for explicit relative intent",
    suggestion: "Use `./filename.ext` instead of `filename.ext` to clarify relative path intent.",
    requires: None,
};

// ---------------------------------------------------------------------------
// Category FM: Figure/Millimeter (opt-in)
// ---------------------------------------------------------------------------

/// Inch-based figsize kwarg.
pub static FM001: Rule = Rule {
    id: "STX-FM001",
    severity: Severity::Warning,
    category: Category::Figure,
    message: "`figsize=` detected — inch-based figure sizing is imprecise for publications",
    suggestion: "Use mm-based sizing: `stx.plt.subplots(axes_width_mm=40, axes_height_mm=28)` or `fig, ax = fr.subplots(axes_width_mm=40, axes_height_mm=28)` for precise control.",
    requires: Some("figrecipe"),
};

/// tight_layout call.
pub static FM002: Rule = Rule {
    id: "STX-FM002",
    severity: Severity::Warning,
    category: Category::Figure,
    message: "`tight_layout()` detected — layout is unpredictable across plot types",
    suggestion: "Use mm-based margins: `stx.plt.subplots(margin_left_mm=15, margin_bottom_mm=12)` for deterministic layout control.",
    requires: Some("figrecipe"),
};

/// bbox_inches="tight" kwarg.
pub static FM003: Rule = Rule {
    id: "STX-FM003",
    severity: Severity::Warning,
    category: Category::Figure,
    message: "`bbox_inches=\"tight\"` detected — can crop important elements unpredictably",
    suggestion: "Use `fr.save(fig, './plot.png')` or `stx.io.save(fig, './plot.png')` which handle cropping intelligently.",
    requires: Some("figrecipe"),
};

/// constrained_layout kwarg.
pub static FM004: Rule = Rule {
    id: "STX-FM004",
    severity: Severity::Info,
    category: Category::Figure,
    message: "`constrained_layout=True` detected — conflicts with mm-based layout control",
    suggestion: "Use mm-based layout from `stx.plt.subplots()` instead of constrained_layout.",
    requires: Some("figrecipe"),
};

/// subplots_adjust call.
pub static FM005: Rule = Rule {
    id: "STX-FM005",
    severity: Severity::Info,
    category: Category::Figure,
    message: "`subplots_adjust()` with hardcoded fractions — fragile across figure sizes",
    suggestion: "Use mm-based spacing: `stx.plt.subplots(space_w_mm=8, space_h_mm=10)` for size-independent layout.",
    requires: Some("figrecipe"),
};

/// savefig without provenance.
pub static FM006: Rule = Rule {
    id: "STX-FM006",
    severity: Severity::Info,
    category: Category::Figure,
    message: "`plt.savefig()` detected — no provenance tracking",
    suggestion: "Use `fr.save(fig, './plot.png')` or `stx.io.save(fig, './plot.png')` for recipe tracking and provenance.",
    requires: Some("figrecipe"),
};

/// rcParams direct modification.
pub static FM007: Rule = Rule {
    id: "STX-FM007",
    severity: Severity::Info,
    category: Category::Figure,
    message: "`rcParams` direct modification detected — hard to maintain across figures",
    suggestion: "Use figrecipe style presets: `fr.load_style('SCITEX')` for consistent styling.",
    requires: Some("figrecipe"),
};

/// set_size_inches call.
pub static FM008: Rule = Rule {
    id: "STX-FM008",
    severity: Severity::Warning,
    category: Category::Figure,
    message: "`set_size_inches()` detected — bypasses mm-based layout control",
    suggestion: "Use mm-based sizing: `fr.subplots(axes_width_mm=40, axes_height_mm=28)` or `stx.plt.subplots(axes_width_mm=40, axes_height_mm=28)` for precise control.",
    requires: Some("figrecipe"),
};

/// ax.set_position call.
pub static FM009: Rule = Rule {
    id: "STX-FM009",
    severity: Severity::Warning,
    category: Category::Figure,
    message: "`ax.set_position()` detected — conflicts with mm-based layout control",
    suggestion: "Use mm-based margins: `fr.subplots(margin_left_mm=15, margin_bottom_mm=12)` or `stx.plt.subplots(margin_left_mm=15, margin_bottom_mm=12)` for deterministic layout.",
    requires: Some("figrecipe"),
};

/// The full catalog in catalog order (categories grouped, ids ascending).
pub static CATALOG: [&Rule; 45] = [
    &S001, &S002, &S003, &S004, &S005, &S006, &I001, &I002, &I003, &I004, &I005, &I006, &I007,
    &IO001, &IO002, &IO003, &IO004, &IO005, &IO006, &IO007, &P001, &P002, &P003, &P004, &P005,
    &ST001, &ST002, &ST003, &ST004, &ST005, &ST006, &PA001, &PA002, &PA003, &PA004, &PA005,
    &FM001, &FM002, &FM003, &FM004, &FM005, &FM006, &FM007, &FM008, &FM009,
];

/// Looks up a rule by its id (e.g. `STX-S001`).
#[must_use]
pub fn lookup(id: &str) -> Option<&'static Rule> {
    static BY_ID: OnceLock<FxHashMap<&'static str, &'static Rule>> = OnceLock::new();
    BY_ID
        .get_or_init(|| CATALOG.iter().map(|r| (r.id, *r)).collect())
        .get(id)
        .copied()
}
