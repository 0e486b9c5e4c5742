//! Opt-in figure-sizing pass: flags inch-based matplotlib layout patterns
//! and suggests millimeter-based alternatives.
//!
//! Runs as a second walk over the module when `FM`/`figure` is enabled and
//! the figrecipe stack is actually importable; without it the suggestions
//! would point at APIs the user cannot call.

use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_text_size::Ranged;

use crate::packages::{PackageContext, PackageProbe, SuggestionContext};
use crate::rules::{self, Finding, Rule};
use crate::utils::{source_line, LineIndex};

/// Runs the figure-sizing pass over a parsed module body.
#[must_use]
pub fn check(
    body: &[Stmt],
    lines: &[&str],
    index: &LineIndex,
    probe: &dyn PackageProbe,
) -> Vec<Finding> {
    let packages = PackageContext::detect(probe);
    if !packages.figrecipe {
        return Vec::new();
    }

    let mut checker = FmChecker {
        lines,
        index,
        context: packages.suggestion_context(),
        findings: Vec::new(),
    };
    for stmt in body {
        checker.visit_stmt(stmt);
    }
    checker.findings
}

struct FmChecker<'a> {
    lines: &'a [&'a str],
    index: &'a LineIndex,
    context: SuggestionContext,
    findings: Vec<Finding>,
}

impl FmChecker<'_> {
    fn add(&mut self, rule: &'static Rule, node: &impl Ranged) {
        let (line, col) = self.index.line_col(node.range().start());
        let text = source_line(self.lines, line).to_owned();
        let mut finding = Finding::new(rule, line, col, text);
        if let Some(variant) = suggestion_variant(rule.id, self.context) {
            finding.suggestion = variant.to_owned();
        }
        self.findings.push(finding);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => {
                for s in &node.body {
                    self.visit_stmt(s);
                }
            }
            Stmt::ClassDef(node) => {
                for s in &node.body {
                    self.visit_stmt(s);
                }
            }
            Stmt::If(node) => {
                self.visit_expr(&node.test);
                for s in &node.body {
                    self.visit_stmt(s);
                }
                for clause in &node.elif_else_clauses {
                    if let Some(test) = &clause.test {
                        self.visit_expr(test);
                    }
                    for s in &clause.body {
                        self.visit_stmt(s);
                    }
                }
            }
            Stmt::For(node) => {
                self.visit_expr(&node.iter);
                for s in &node.body {
                    self.visit_stmt(s);
                }
                for s in &node.orelse {
                    self.visit_stmt(s);
                }
            }
            Stmt::While(node) => {
                self.visit_expr(&node.test);
                for s in &node.body {
                    self.visit_stmt(s);
                }
                for s in &node.orelse {
                    self.visit_stmt(s);
                }
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                }
                for s in &node.body {
                    self.visit_stmt(s);
                }
            }
            Stmt::Try(node) => {
                for s in &node.body {
                    self.visit_stmt(s);
                }
                for ast::ExceptHandler::ExceptHandler(handler) in &node.handlers {
                    for s in &handler.body {
                        self.visit_stmt(s);
                    }
                }
                for s in &node.orelse {
                    self.visit_stmt(s);
                }
                for s in &node.finalbody {
                    self.visit_stmt(s);
                }
            }
            Stmt::Match(node) => {
                self.visit_expr(&node.subject);
                for case in &node.cases {
                    for s in &case.body {
                        self.visit_stmt(s);
                    }
                }
            }
            Stmt::Expr(node) => self.visit_expr(&node.value),
            Stmt::Assign(node) => {
                self.check_assign(node);
                self.visit_expr(&node.value);
            }
            Stmt::AugAssign(node) => self.visit_expr(&node.value),
            Stmt::AnnAssign(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call(node) => {
                self.check_call(node);
                self.visit_expr(&node.func);
                for arg in &node.arguments.args {
                    self.visit_expr(arg);
                }
                for keyword in &node.arguments.keywords {
                    self.visit_expr(&keyword.value);
                }
            }
            Expr::Attribute(node) => self.visit_expr(&node.value),
            Expr::Subscript(node) => {
                self.visit_expr(&node.value);
                self.visit_expr(&node.slice);
            }
            Expr::BinOp(node) => {
                self.visit_expr(&node.left);
                self.visit_expr(&node.right);
            }
            Expr::BoolOp(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::UnaryOp(node) => self.visit_expr(&node.operand),
            Expr::Compare(node) => {
                self.visit_expr(&node.left);
                for comparator in &node.comparators {
                    self.visit_expr(comparator);
                }
            }
            Expr::If(node) => {
                self.visit_expr(&node.test);
                self.visit_expr(&node.body);
                self.visit_expr(&node.orelse);
            }
            Expr::List(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Tuple(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Dict(node) => {
                for item in &node.items {
                    if let Some(key) = &item.key {
                        self.visit_expr(key);
                    }
                    self.visit_expr(&item.value);
                }
            }
            Expr::Starred(node) => self.visit_expr(&node.value),
            Expr::Await(node) => self.visit_expr(&node.value),
            Expr::Lambda(node) => self.visit_expr(&node.body),
            _ => {}
        }
    }

    fn check_call(&mut self, call: &ast::ExprCall) {
        if is_exempt_call(call) {
            return;
        }
        let Expr::Attribute(attr) = &*call.func else {
            return;
        };

        match attr.attr.as_str() {
            "tight_layout" => self.add(&rules::FM002, call),
            "subplots_adjust" => self.add(&rules::FM005, call),
            "savefig" => {
                if has_string_kwarg(call, "bbox_inches", "tight") {
                    self.add(&rules::FM003, call);
                }
                self.add(&rules::FM006, call);
            }
            "set_size_inches" => self.add(&rules::FM008, call),
            "set_position" => self.add(&rules::FM009, call),
            "figure" | "subplots" | "Figure" => {
                if has_kwarg(call, "figsize") {
                    self.add(&rules::FM001, call);
                }
                if has_bool_kwarg(call, "constrained_layout", true) {
                    self.add(&rules::FM004, call);
                }
            }
            _ => {}
        }
    }

    /// `plt.rcParams[...] = ...` and friends.
    fn check_assign(&mut self, assign: &ast::StmtAssign) {
        for target in &assign.targets {
            let Expr::Subscript(subscript) = target else {
                continue;
            };
            let Expr::Attribute(attr) = &*subscript.value else {
                continue;
            };
            if attr.attr.as_str() != "rcParams" {
                continue;
            }
            if matches!(&*attr.value, Expr::Name(n) if matches!(n.id.as_str(), "plt" | "mpl" | "matplotlib"))
            {
                self.add(&rules::FM007, assign);
                break;
            }
        }
    }
}

/// Calls on `stx.*` or `fr.*` objects already use the mm-based stack.
fn is_exempt_call(call: &ast::ExprCall) -> bool {
    let Expr::Attribute(attr) = &*call.func else {
        return false;
    };
    match &*attr.value {
        Expr::Name(name) => matches!(name.id.as_str(), "stx" | "fr"),
        Expr::Attribute(inner) => {
            matches!(&*inner.value, Expr::Name(n) if matches!(n.id.as_str(), "stx" | "fr"))
        }
        _ => false,
    }
}

fn find_kwarg<'a>(call: &'a ast::ExprCall, name: &str) -> Option<&'a Expr> {
    call.arguments
        .keywords
        .iter()
        .find(|kw| kw.arg.as_ref().is_some_and(|arg| arg.as_str() == name))
        .map(|kw| &kw.value)
}

fn has_kwarg(call: &ast::ExprCall, name: &str) -> bool {
    find_kwarg(call, name).is_some()
}

fn has_string_kwarg(call: &ast::ExprCall, name: &str, value: &str) -> bool {
    matches!(find_kwarg(call, name), Some(Expr::StringLiteral(lit)) if lit.value.to_string() == value)
}

fn has_bool_kwarg(call: &ast::ExprCall, name: &str, value: bool) -> bool {
    matches!(find_kwarg(call, name), Some(Expr::BooleanLiteral(lit)) if lit.value == value)
}

/// Installation-dependent suggestion text. Rules without a variant keep the
/// catalog suggestion.
fn suggestion_variant(rule_id: &str, context: SuggestionContext) -> Option<&'static str> {
    use SuggestionContext::{Both, Fr, Stx};
    let text = match (rule_id, context) {
        ("STX-FM001" | "STX-FM008", Both) => {
            "Use mm-based sizing: `stx.plt.subplots(axes_width_mm=40, axes_height_mm=28)` \
             or `fr.subplots(axes_width_mm=40, axes_height_mm=28)`."
        }
        ("STX-FM001" | "STX-FM008", Stx) => {
            "Use mm-based sizing: `stx.plt.subplots(axes_width_mm=40, axes_height_mm=28)`."
        }
        ("STX-FM001" | "STX-FM008", Fr) => {
            "Use mm-based sizing: `fr.subplots(axes_width_mm=40, axes_height_mm=28)`."
        }
        ("STX-FM002" | "STX-FM009", Both) => {
            "Use mm-based margins: `stx.plt.subplots(margin_left_mm=15, margin_bottom_mm=12)` \
             or `fr.subplots(margin_left_mm=15, margin_bottom_mm=12)`."
        }
        ("STX-FM002" | "STX-FM009", Stx) => {
            "Use mm-based margins: `stx.plt.subplots(margin_left_mm=15, margin_bottom_mm=12)`."
        }
        ("STX-FM002" | "STX-FM009", Fr) => {
            "Use mm-based margins: `fr.subplots(margin_left_mm=15, margin_bottom_mm=12)`."
        }
        ("STX-FM005", Both) => {
            "Use mm-based spacing: `stx.plt.subplots(space_w_mm=8, space_h_mm=10)` \
             or `fr.subplots(space_w_mm=8, space_h_mm=10)`."
        }
        ("STX-FM005", Stx) => {
            "Use mm-based spacing: `stx.plt.subplots(space_w_mm=8, space_h_mm=10)`."
        }
        ("STX-FM005", Fr) => {
            "Use mm-based spacing: `fr.subplots(space_w_mm=8, space_h_mm=10)`."
        }
        ("STX-FM003", Both) => {
            "Use `stx.io.save(fig, './plot.png')` or `fr.save(fig, './plot.png')` for intelligent cropping."
        }
        ("STX-FM003", Stx) => {
            "Use `stx.io.save(fig, './plot.png')` which handles cropping intelligently."
        }
        ("STX-FM003", Fr) => {
            "Use `fr.save(fig, './plot.png')` which handles cropping intelligently."
        }
        ("STX-FM004", Both) => {
            "Use mm-based layout from `stx.plt.subplots()` or `fr.subplots()` instead."
        }
        ("STX-FM004", Stx) => {
            "Use mm-based layout from `stx.plt.subplots()` instead of constrained_layout."
        }
        ("STX-FM004", Fr) => {
            "Use mm-based layout from `fr.subplots()` instead of constrained_layout."
        }
        ("STX-FM006", Both) => {
            "Use `stx.io.save(fig, './plot.png')` or `fr.save(fig, './plot.png')` for provenance tracking."
        }
        ("STX-FM006", Stx) => "Use `stx.io.save(fig, './plot.png')` for provenance tracking.",
        ("STX-FM006", Fr) => "Use `fr.save(fig, './plot.png')` for recipe tracking.",
        ("STX-FM007", Both) => {
            "Use `stx.plt` style presets or `fr.load_style('SCITEX')` for consistent styling."
        }
        ("STX-FM007", Stx) => "Use `stx.plt` style presets for consistent styling.",
        ("STX-FM007", Fr) => "Use `fr.load_style('SCITEX')` for consistent styling.",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::StaticProbe;
    use ruff_python_parser::parse_module;

    fn run(source: &str, available: &[&str]) -> Vec<Finding> {
        let parsed = parse_module(source).unwrap();
        let body = parsed.into_syntax().body;
        let lines: Vec<&str> = source.lines().collect();
        let index = LineIndex::new(source);
        check(&body, &lines, &index, &StaticProbe::new(available))
    }

    #[test]
    fn inactive_without_figrecipe() {
        let findings = run("plt.tight_layout()\n", &["scitex"]);
        assert!(findings.is_empty());
    }

    #[test]
    fn detects_tight_layout_and_figsize() {
        let source = "fig, ax = plt.subplots(figsize=(8, 6))\nplt.tight_layout()\n";
        let findings = run(source, &["figrecipe"]);
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id).collect();
        assert!(ids.contains(&"STX-FM001"));
        assert!(ids.contains(&"STX-FM002"));
    }

    #[test]
    fn savefig_with_tight_bbox_fires_both() {
        let source = "fig.savefig('out.png', bbox_inches='tight')\n";
        let findings = run(source, &["figrecipe"]);
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id).collect();
        assert_eq!(ids, vec!["STX-FM003", "STX-FM006"]);
    }

    #[test]
    fn constrained_layout_true_only() {
        let on = run("plt.subplots(constrained_layout=True)\n", &["figrecipe"]);
        assert!(on.iter().any(|f| f.rule_id == "STX-FM004"));
        let off = run("plt.subplots(constrained_layout=False)\n", &["figrecipe"]);
        assert!(!off.iter().any(|f| f.rule_id == "STX-FM004"));
    }

    #[test]
    fn rcparams_assignment() {
        let source = "plt.rcParams['font.size'] = 8\n";
        let findings = run(source, &["figrecipe"]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "STX-FM007");
    }

    #[test]
    fn stx_and_fr_calls_exempt() {
        let source = "stx.plt.subplots(figsize=(8, 6))\nfr.save(fig, './plot.png')\n";
        let findings = run(source, &["figrecipe"]);
        assert!(findings.is_empty());
    }

    #[test]
    fn subplots_adjust_suggestion_tracks_installed_packages() {
        let source = "plt.subplots_adjust(left=0.1)\n";

        let fr_only = run(source, &["figrecipe"]);
        assert_eq!(fr_only[0].rule_id, "STX-FM005");
        assert_eq!(
            fr_only[0].suggestion,
            "Use mm-based spacing: `fr.subplots(space_w_mm=8, space_h_mm=10)`."
        );

        let both = run(source, &["figrecipe", "scitex"]);
        assert!(both[0].suggestion.contains("`stx.plt.subplots(space_w_mm=8"));
        assert!(both[0].suggestion.contains("or `fr.subplots(space_w_mm=8"));
    }

    #[test]
    fn suggestion_variant_tracks_installed_packages() {
        let source = "fig.set_size_inches(8, 6)\n";

        let fr_only = run(source, &["figrecipe"]);
        assert!(fr_only[0].suggestion.starts_with("Use mm-based sizing: `fr."));

        let both = run(source, &["figrecipe", "scitex"]);
        assert!(both[0].suggestion.contains("or `fr.subplots"));
    }
}
