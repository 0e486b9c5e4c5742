//! Tests for the lint checker across rule categories.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use stxlint::checker::{lint_source, lint_source_with_probe};
use stxlint::config::LinterConfig;
use stxlint::packages::StaticProbe;
use stxlint::rules::{Finding, Severity};

/// Lints at a script path, where structure rules apply.
fn lint_script(source: &str) -> Vec<Finding> {
    lint_source(source, Path::new("analysis.py"), &LinterConfig::default())
}

/// Lints at a library path, where script-only structure rules are exempt.
fn lint_library(source: &str) -> Vec<Finding> {
    lint_source(
        source,
        Path::new("src/mylib/module.py"),
        &LinterConfig::default(),
    )
}

fn ids(findings: &[Finding]) -> Vec<&'static str> {
    findings.iter().map(|f| f.rule_id).collect()
}

const COMPLIANT_SCRIPT: &str = r#"import scitex as stx


@stx.session
def main(
    CONFIG=stx.session.INJECTED,
    plt=stx.session.INJECTED,
    COLORS=stx.session.INJECTED,
    rngg=stx.session.INJECTED,
    logger=stx.session.INJECTED,
):
    return 0


if __name__ == "__main__":
    main()
"#;

#[test]
fn compliant_script_is_clean() {
    assert!(lint_script(COMPLIANT_SCRIPT).is_empty());
}

#[test]
fn unparseable_source_yields_no_findings() {
    assert!(lint_script("def broken(:\n").is_empty());
}

// -------------------------------------------------------------------------
// Structure rules
// -------------------------------------------------------------------------

#[test]
fn missing_main_guard_is_an_error_at_line_one() {
    let findings = lint_script("x = 1\n");
    assert_eq!(ids(&findings), vec!["STX-S002"]);
    assert_eq!(findings[0].severity, Severity::Error);
    assert_eq!((findings[0].line, findings[0].col), (1, 0));
}

#[test]
fn guard_without_session_or_import_flags_both() {
    let source = "if __name__ == \"__main__\":\n    pass\n";
    let found = ids(&lint_script(source));
    assert!(found.contains(&"STX-S001"));
    assert!(found.contains(&"STX-S005"));
    assert!(!found.contains(&"STX-S002"));
}

#[test]
fn reversed_main_guard_is_recognized() {
    let source = "if \"__main__\" == __name__:\n    pass\n";
    assert!(!ids(&lint_script(source)).contains(&"STX-S002"));
}

#[test]
fn library_units_skip_structure_rules() {
    assert!(lint_library("x = 1\n").is_empty());
}

#[test]
fn argparse_import_flagged() {
    let found = ids(&lint_library("import argparse\n"));
    assert_eq!(found, vec!["STX-S003"]);
    let found = ids(&lint_library("from argparse import ArgumentParser\n"));
    assert_eq!(found, vec!["STX-S003"]);
}

#[test]
fn session_without_int_return_flags_s004() {
    let source = r"@stx.session
def main(CONFIG=stx.session.INJECTED, plt=stx.session.INJECTED, COLORS=stx.session.INJECTED, rngg=stx.session.INJECTED, logger=stx.session.INJECTED):
    pass
";
    let findings = lint_library(source);
    assert_eq!(ids(&findings), vec!["STX-S004"]);
    // reported at the def line, not the decorator line
    assert_eq!(findings[0].line, 2);
}

#[test]
fn session_missing_injected_params_enumerates_them() {
    let source = r"@stx.session
def main(plt=stx.session.INJECTED):
    return 0
";
    let findings = lint_library(source);
    let s006 = findings.iter().find(|f| f.rule_id == "STX-S006").unwrap();
    assert!(s006.message.contains("missing: CONFIG, COLORS, rngg, logger"));
}

#[test]
fn bare_session_decorator_also_counts() {
    let source = r"@session
def main():
    return 0
";
    let found = ids(&lint_library(source));
    assert!(found.contains(&"STX-S006"));
}

// -------------------------------------------------------------------------
// Import rules
// -------------------------------------------------------------------------

#[test]
fn import_rules_fire_for_direct_and_from_imports() {
    let cases = [
        ("import matplotlib.pyplot as plt\n", "STX-I001"),
        ("from matplotlib import pyplot as plt\n", "STX-I001"),
        ("from scipy import stats\n", "STX-I002"),
        ("from scipy.stats import ttest_ind\n", "STX-I002"),
        ("import pickle\n", "STX-I003"),
        ("import random\n", "STX-I006"),
        ("import logging\n", "STX-I007"),
    ];
    for (source, expected) in cases {
        let found = ids(&lint_library(source));
        assert_eq!(found, vec![expected], "source: {source:?}");
    }
}

#[test]
fn plain_matplotlib_import_is_fine() {
    assert!(lint_library("import matplotlib\n").is_empty());
}

// -------------------------------------------------------------------------
// I/O call rules
// -------------------------------------------------------------------------

#[test]
fn numpy_and_pandas_io_calls_flagged() {
    let source = r"np.save('out.npy', arr)
np.load('in.npy')
pd.read_csv('data.csv')
df.to_csv('out.csv')
";
    let found = ids(&lint_library(source));
    assert_eq!(found, vec!["STX-IO001", "STX-IO002", "STX-IO003", "STX-IO004"]);
}

#[test]
fn aliased_import_resolves_to_module_rule() {
    let source = "import numpy as n\nn.save('out.npy', arr)\n";
    assert!(ids(&lint_library(source)).contains(&"STX-IO001"));
}

#[test]
fn to_csv_on_exempt_receivers_is_ignored() {
    for receiver in ["stx", "os", "sys", "Path"] {
        let source = format!("{receiver}.to_csv('x.csv')\n");
        assert!(
            !ids(&lint_library(&source)).contains(&"STX-IO004"),
            "receiver: {receiver}"
        );
    }
}

#[test]
fn pickle_and_json_dump_flagged() {
    let source = "pickle.dump(obj, f)\npickle.dumps(obj)\njson.dump(data, f)\n";
    let found = ids(&lint_library(source));
    assert_eq!(found, vec!["STX-IO005", "STX-IO005", "STX-IO006"]);
}

#[test]
fn savefig_flagged_only_for_plt() {
    assert_eq!(
        ids(&lint_library("plt.savefig('fig.png')\n")),
        vec!["STX-IO007"]
    );
    assert!(lint_library("fig.savefig('fig.png')\n").is_empty());
}

// -------------------------------------------------------------------------
// Plot rules
// -------------------------------------------------------------------------

#[test]
fn show_flagged_only_on_pyplot_receivers() {
    assert_eq!(ids(&lint_library("plt.show()\n")), vec!["STX-P004"]);
    assert_eq!(ids(&lint_library("pyplot.show()\n")), vec!["STX-P004"]);
    assert!(lint_library("window.show()\n").is_empty());
}

#[test]
fn axes_method_hints() {
    let source = "ax.plot(x, y)\naxes.scatter(x, y)\nax2.bar(x, y)\n";
    let found = ids(&lint_library(source));
    assert_eq!(found, vec!["STX-P001", "STX-P002", "STX-P003"]);
}

#[test]
fn module_receivers_do_not_trigger_axes_hints() {
    let source = "np.bar(x, y)\nmath.plot(x)\n";
    assert!(lint_library(source).is_empty());
}

#[test]
fn print_and_open_flagged_inside_session_only() {
    let outside = "print('hello')\nf = open('data.txt')\n";
    assert!(lint_library(outside).is_empty());

    let inside = r"@stx.session
def main(CONFIG=stx.session.INJECTED, plt=stx.session.INJECTED, COLORS=stx.session.INJECTED, rngg=stx.session.INJECTED, logger=stx.session.INJECTED):
    print('hello')
    f = open('data.txt')
    return 0
";
    let found = ids(&lint_library(inside));
    assert!(found.contains(&"STX-P005"));
    assert!(found.contains(&"STX-PA002"));
}

// -------------------------------------------------------------------------
// Stats rules
// -------------------------------------------------------------------------

#[test]
fn scipy_stats_calls_map_to_rules() {
    let cases = [
        ("stats.ttest_ind(a, b)", "STX-ST001"),
        ("stats.mannwhitneyu(a, b)", "STX-ST002"),
        ("stats.pearsonr(a, b)", "STX-ST003"),
        ("stats.f_oneway(a, b, c)", "STX-ST004"),
        ("stats.wilcoxon(a, b)", "STX-ST005"),
        ("stats.kruskal(a, b)", "STX-ST006"),
    ];
    for (call, expected) in cases {
        let found = ids(&lint_library(&format!("{call}\n")));
        assert_eq!(found, vec![expected], "call: {call}");
    }
}

#[test]
fn fully_qualified_scipy_stats_call_flagged() {
    let found = ids(&lint_library("scipy.stats.ttest_ind(a, b)\n"));
    assert_eq!(found, vec!["STX-ST001"]);
}

// -------------------------------------------------------------------------
// Path rules
// -------------------------------------------------------------------------

#[test]
fn os_path_mutations_flagged() {
    let source = "os.makedirs('out')\nos.mkdir('out')\nos.chdir('/tmp')\n";
    let found = ids(&lint_library(source));
    assert_eq!(found, vec!["STX-PA003", "STX-PA003", "STX-PA004"]);
}

#[test]
fn pathlib_mkdir_heuristic() {
    let found = ids(&lint_library("Path('out').mkdir(exist_ok=True)\n"));
    assert_eq!(found, vec!["STX-PA003"]);
}

#[test]
fn stx_io_save_path_conventions() {
    assert_eq!(
        ids(&lint_library("stx.io.save(obj, '/abs/out.csv')\n")),
        vec!["STX-PA001"]
    );
    assert_eq!(
        ids(&lint_library("stx.io.save(obj, 'out.csv')\n")),
        vec!["STX-PA005"]
    );
    assert!(lint_library("stx.io.save(obj, './out.csv')\n").is_empty());
    assert!(lint_library("stx.io.save(obj, '../shared/out.csv')\n").is_empty());
}

#[test]
fn stx_io_load_checks_first_argument() {
    assert_eq!(
        ids(&lint_library("stx.io.load('data.csv')\n")),
        vec!["STX-PA005"]
    );
    assert!(lint_library("stx.io.load('./data.csv')\n").is_empty());
}

#[test]
fn stx_io_save_path_keyword_fallback() {
    let found = ids(&lint_library("stx.io.save(obj, path='/abs/out.csv')\n"));
    assert_eq!(found, vec!["STX-PA001"]);
}

#[test]
fn stx_calls_exempt_from_migration_rules() {
    let source = "stx.io.save(obj, './out.npy')\nstx.plt.show()\n";
    assert!(lint_library(source).is_empty());
}

// -------------------------------------------------------------------------
// Configuration interaction
// -------------------------------------------------------------------------

#[test]
fn disabled_rules_are_dropped() {
    let mut config = LinterConfig::default();
    config.disable.push("STX-S002".to_owned());
    let findings = lint_source("x = 1\n", Path::new("analysis.py"), &config);
    assert!(findings.is_empty());
}

#[test]
fn per_rule_severity_override_applies() {
    let mut config = LinterConfig::default();
    config
        .per_rule_severity
        .insert("STX-P004".to_owned(), Severity::Error);
    let findings = lint_source("plt.show()\n", Path::new("src/m.py"), &config);
    assert_eq!(findings[0].severity, Severity::Error);
}

#[test]
fn findings_sorted_by_severity_then_line() {
    let source = "plt.show()\nimport pickle\n";
    let findings = lint_script(source);
    // STX-S002 (error, line 1) first, then STX-I003 (warning, line 2),
    // then STX-P004 (info, line 1)
    assert_eq!(ids(&findings), vec!["STX-S002", "STX-I003", "STX-P004"]);
}

#[test]
fn custom_required_injected_changes_s006() {
    let mut config = LinterConfig::default();
    config.required_injected = vec!["CONFIG".to_owned()];
    let source = "@stx.session\ndef main(CONFIG=stx.session.INJECTED):\n    return 0\n";
    let findings = lint_source(source, Path::new("src/m.py"), &config);
    assert!(findings.is_empty());
}

// -------------------------------------------------------------------------
// Figure pass gating
// -------------------------------------------------------------------------

#[test]
fn fm_pass_runs_when_enabled_and_installed() {
    let mut config = LinterConfig::default();
    config.enable.push("FM".to_owned());
    let probe = StaticProbe::new(&["figrecipe"]);
    let findings = lint_source_with_probe(
        "plt.tight_layout()\n",
        Path::new("src/m.py"),
        &config,
        &probe,
    );
    assert_eq!(ids(&findings), vec!["STX-FM002"]);
}

#[test]
fn fm_pass_skipped_when_disabled() {
    let probe = StaticProbe::new(&["figrecipe"]);
    let findings = lint_source_with_probe(
        "plt.tight_layout()\n",
        Path::new("src/m.py"),
        &LinterConfig::default(),
        &probe,
    );
    assert!(findings.is_empty());
}

#[test]
fn fm_findings_respect_disable_and_severity_overrides() {
    let mut config = LinterConfig::default();
    config.enable.push("figure".to_owned());
    config.disable.push("STX-FM006".to_owned());
    config
        .per_rule_severity
        .insert("STX-FM003".to_owned(), Severity::Error);
    let probe = StaticProbe::new(&["figrecipe", "scitex"]);
    let findings = lint_source_with_probe(
        "fig.savefig('out.png', bbox_inches='tight')\n",
        Path::new("src/m.py"),
        &config,
        &probe,
    );
    assert_eq!(ids(&findings), vec!["STX-FM003"]);
    assert_eq!(findings[0].severity, Severity::Error);
}
