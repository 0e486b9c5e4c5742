//! AST-based pattern matcher that detects SciTeX convention violations.
//!
//! A single top-down walk over the module classifies imports, calls,
//! function definitions, and the entry guard, recording findings against the
//! rule catalog. Structural script-only checks run after the walk. Findings
//! are finalized (disable filter, severity overrides, stable sort) before
//! being returned.

use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_python_parser::parse_module;
use ruff_text_size::Ranged;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::path::Path;

use crate::config::LinterConfig;
use crate::packages::{InterpreterProbe, PackageProbe};
use crate::rules::{self, Finding, Rule};
use crate::utils::{source_line, LineIndex};

/// Lints Python source and returns sorted findings.
///
/// Unparseable source yields an empty vec by contract; parse failure is not
/// an error at this layer.
#[must_use]
pub fn lint_source(source: &str, path: &Path, config: &LinterConfig) -> Vec<Finding> {
    lint_source_with_probe(source, path, config, InterpreterProbe::global())
}

/// [`lint_source`] with an explicit package probe (test seam for FM gating).
#[must_use]
pub fn lint_source_with_probe(
    source: &str,
    path: &Path,
    config: &LinterConfig,
    probe: &dyn PackageProbe,
) -> Vec<Finding> {
    let Ok(parsed) = parse_module(source) else {
        return Vec::new();
    };
    let body = parsed.into_syntax().body;

    let lines: Vec<&str> = source.lines().collect();
    let index = LineIndex::new(source);

    let mut checker = Checker::new(&lines, &index, config, config.is_library_unit(path));
    for stmt in &body {
        checker.visit_stmt(stmt);
    }
    let mut findings = checker.into_findings();

    if config.fm_enabled() {
        findings.extend(crate::fm::check(&body, &lines, &index, probe));
    }

    finalize(findings, config)
}

/// Lints a file from disk. Missing or unreadable files yield no findings.
#[must_use]
pub fn lint_file(path: &Path, config: &LinterConfig) -> Vec<Finding> {
    match std::fs::read_to_string(path) {
        Ok(source) => lint_source(&source, path, config),
        Err(_) => Vec::new(),
    }
}

/// Applies the disable filter and per-rule severity overrides, then sorts by
/// (severity descending, line ascending), stable for ties.
#[must_use]
pub fn finalize(mut findings: Vec<Finding>, config: &LinterConfig) -> Vec<Finding> {
    findings.retain(|f| !config.is_disabled(f.rule_id));
    for finding in &mut findings {
        if let Some(severity) = config.per_rule_severity.get(finding.rule_id) {
            finding.severity = *severity;
        }
    }
    findings.sort_by_key(|f| (Reverse(f.severity), f.line));
    findings
}

struct Checker<'a> {
    lines: &'a [&'a str],
    index: &'a LineIndex,
    config: &'a LinterConfig,
    is_library: bool,
    findings: Vec<Finding>,
    /// alias -> full module path, from import statements
    imports: FxHashMap<String, String>,
    has_stx_import: bool,
    has_main_guard: bool,
    has_session_decorator: bool,
    /// nesting depth of session-decorated functions currently being walked
    session_depth: usize,
}

impl<'a> Checker<'a> {
    fn new(
        lines: &'a [&'a str],
        index: &'a LineIndex,
        config: &'a LinterConfig,
        is_library: bool,
    ) -> Self {
        Self {
            lines,
            index,
            config,
            is_library,
            findings: Vec::new(),
            imports: FxHashMap::default(),
            has_stx_import: false,
            has_main_guard: false,
            has_session_decorator: false,
            session_depth: 0,
        }
    }

    fn add(&mut self, rule: &'static Rule, line: usize, col: usize) {
        let text = source_line(self.lines, line).to_owned();
        self.findings.push(Finding::new(rule, line, col, text));
    }

    fn add_at(&mut self, rule: &'static Rule, node: &impl Ranged) {
        let (line, col) = self.index.line_col(node.range().start());
        self.add(rule, line, col);
    }

    // -----------------------------------------------------------------
    // Statement walk
    // -----------------------------------------------------------------

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import(node) => self.handle_import(node),
            Stmt::ImportFrom(node) => self.handle_import_from(node),
            Stmt::FunctionDef(node) => self.handle_function_def(node),
            Stmt::ClassDef(node) => {
                for deco in &node.decorator_list {
                    self.visit_expr(&deco.expression);
                }
                for s in &node.body {
                    self.visit_stmt(s);
                }
            }
            Stmt::If(node) => {
                if is_main_guard(node) {
                    self.has_main_guard = true;
                }
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
                    if let Some(guard) = &case.guard {
                        self.visit_expr(guard);
                    }
                    for s in &case.body {
                        self.visit_stmt(s);
                    }
                }
            }
            Stmt::Expr(node) => self.visit_expr(&node.value),
            Stmt::Assign(node) => self.visit_expr(&node.value),
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
            Stmt::Raise(node) => {
                if let Some(exc) = &node.exc {
                    self.visit_expr(exc);
                }
                if let Some(cause) = &node.cause {
                    self.visit_expr(cause);
                }
            }
            Stmt::Assert(node) => {
                self.visit_expr(&node.test);
                if let Some(msg) = &node.msg {
                    self.visit_expr(msg);
                }
            }
            Stmt::Delete(node) => {
                for target in &node.targets {
                    self.visit_expr(target);
                }
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Expression walk
    // -----------------------------------------------------------------

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Call(call) = expr {
            self.check_call(call);
        }
        match expr {
            Expr::Call(node) => {
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
            Expr::UnaryOp(node) => self.visit_expr(&node.operand),
            Expr::BoolOp(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::Compare(node) => {
                self.visit_expr(&node.left);
                for comparator in &node.comparators {
                    self.visit_expr(comparator);
                }
            }
            Expr::Named(node) => self.visit_expr(&node.value),
            Expr::If(node) => {
                self.visit_expr(&node.test);
                self.visit_expr(&node.body);
                self.visit_expr(&node.orelse);
            }
            Expr::Lambda(node) => self.visit_expr(&node.body),
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
            Expr::Set(node) => {
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
            Expr::Yield(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Expr::YieldFrom(node) => self.visit_expr(&node.value),
            Expr::ListComp(node) => {
                for gen in &node.generators {
                    self.visit_expr(&gen.iter);
                    for cond in &gen.ifs {
                        self.visit_expr(cond);
                    }
                }
                self.visit_expr(&node.elt);
            }
            Expr::SetComp(node) => {
                for gen in &node.generators {
                    self.visit_expr(&gen.iter);
                    for cond in &gen.ifs {
                        self.visit_expr(cond);
                    }
                }
                self.visit_expr(&node.elt);
            }
            Expr::DictComp(node) => {
                for gen in &node.generators {
                    self.visit_expr(&gen.iter);
                    for cond in &gen.ifs {
                        self.visit_expr(cond);
                    }
                }
                if let Some(key) = &node.key {
                    self.visit_expr(key);
                }
                self.visit_expr(&node.value);
            }
            Expr::Generator(node) => {
                for gen in &node.generators {
                    self.visit_expr(&gen.iter);
                    for cond in &gen.ifs {
                        self.visit_expr(cond);
                    }
                }
                self.visit_expr(&node.elt);
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Imports
    // -----------------------------------------------------------------

    fn handle_import(&mut self, node: &ast::StmtImport) {
        for alias in &node.names {
            let module = alias.name.as_str();
            let bound = alias
                .asname
                .as_ref()
                .map_or(module, ruff_python_ast::Identifier::as_str);
            self.imports.insert(bound.to_owned(), module.to_owned());

            if module == "scitex" {
                self.has_stx_import = true;
            }

            if module.contains("matplotlib.pyplot") {
                self.add_at(&rules::I001, node);
            }
            match module {
                "argparse" => self.add_at(&rules::S003, node),
                "pickle" => self.add_at(&rules::I003, node),
                "random" => self.add_at(&rules::I006, node),
                "logging" => self.add_at(&rules::I007, node),
                _ => {}
            }
        }
    }

    fn handle_import_from(&mut self, node: &ast::StmtImportFrom) {
        let module = node.module.as_ref().map_or("", |m| m.as_str());
        for alias in &node.names {
            let name = alias.name.as_str();
            let bound = alias
                .asname
                .as_ref()
                .map_or(name, ruff_python_ast::Identifier::as_str);
            self.imports
                .insert(bound.to_owned(), format!("{module}.{name}"));
        }

        if module == "matplotlib" {
            if node.names.iter().any(|a| a.name.as_str() == "pyplot") {
                self.add_at(&rules::I001, node);
            }
        } else if !module.is_empty() && module.contains("matplotlib.pyplot") {
            self.add_at(&rules::I001, node);
        }

        if module == "scipy" {
            if node.names.iter().any(|a| a.name.as_str() == "stats") {
                self.add_at(&rules::I002, node);
            }
        } else if module == "scipy.stats" {
            self.add_at(&rules::I002, node);
        }

        if module == "argparse" {
            self.add_at(&rules::S003, node);
        }
    }

    // -----------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------

    fn check_call(&mut self, call: &ast::ExprCall) {
        match &*call.func {
            Expr::Attribute(attr) => self.check_method_call(call, attr),
            Expr::Name(name) => {
                // Bare calls only matter lexically inside a session function.
                if self.session_depth > 0 {
                    match name.id.as_str() {
                        "print" => self.add_at(&rules::P005, call),
                        "open" => self.add_at(&rules::PA002, call),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn check_method_call(&mut self, call: &ast::ExprCall, attr: &ast::ExprAttribute) {
        let method = attr.attr.as_str();

        // Receiver name: either a bare name (np.save) or the middle
        // attribute of a two-level chain (scipy.stats.ttest_ind -> "stats").
        let receiver: Option<&str> = match &*attr.value {
            Expr::Name(name) => Some(name.id.as_str()),
            Expr::Attribute(inner) => {
                if matches!(&*inner.value, Expr::Name(_)) {
                    Some(inner.attr.as_str())
                } else {
                    None
                }
            }
            _ => None,
        };

        let resolved = receiver.and_then(|r| self.imports.get(r)).cloned();

        // Calls on scitex objects are exempt from migration hints; they get
        // path checks instead.
        if self.is_scitex_receiver(attr, receiver, resolved.as_deref()) {
            self.check_stx_io_path(call, attr);
            return;
        }

        let rule = receiver
            .and_then(|r| call_rule(r, method))
            .or_else(|| {
                resolved
                    .as_deref()
                    .filter(|r| Some(*r) != receiver)
                    .and_then(|r| call_rule(r, method))
            })
            .or_else(|| call_rule_any_receiver(method));

        if let Some(rule) = rule {
            // plt.show() only counts when the receiver is actually pyplot.
            if std::ptr::eq(rule, &rules::P004)
                && !matches!(receiver, Some("plt" | "pyplot"))
                && resolved.as_deref() != Some("matplotlib.pyplot")
            {
                return;
            }
            // to_csv on scitex/os/sys/Path objects is not DataFrame I/O.
            if std::ptr::eq(rule, &rules::IO004)
                && matches!(receiver, Some("stx" | "os" | "sys" | "Path"))
            {
                return;
            }
            self.add_at(rule, call);
            return;
        }

        // Axes hints: receiver looks like an axes variable, not a module.
        if let Some(axes_rule) = axes_hint(method) {
            if let Some(name) = receiver {
                if !matches!(
                    name,
                    "stx" | "os" | "sys" | "Path" | "math" | "np" | "numpy" | "pd" | "pandas"
                ) && (name.starts_with("ax") || matches!(name, "axes" | "subplot"))
                {
                    self.add_at(axes_rule, call);
                }
            }
            return;
        }

        // Path(...).mkdir() has no module receiver; fall back to a line
        // text heuristic.
        if method == "mkdir" && !matches!(receiver, Some("os" | "stx" | "sys")) {
            let (line, col) = self.index.line_col(call.range().start());
            let text = source_line(self.lines, line);
            if text.contains("Path") || text.to_lowercase().contains("path") {
                self.add(&rules::PA003, line, col);
            }
        }
    }

    fn is_scitex_receiver(
        &self,
        attr: &ast::ExprAttribute,
        receiver: Option<&str>,
        resolved: Option<&str>,
    ) -> bool {
        if receiver == Some("stx") {
            return true;
        }
        // stx.io.save(...): the chain bottoms out at the name `stx`
        if let Expr::Attribute(inner) = &*attr.value {
            if matches!(&*inner.value, Expr::Name(n) if n.id.as_str() == "stx") {
                return true;
            }
        }
        // io.save(...) where `io` was imported from scitex
        resolved.is_some_and(|r| r == "scitex" || r.starts_with("scitex."))
    }

    // -----------------------------------------------------------------
    // stx.io path checking
    // -----------------------------------------------------------------

    fn check_stx_io_path(&mut self, call: &ast::ExprCall, attr: &ast::ExprAttribute) {
        let path_idx = match attr.attr.as_str() {
            "save" => 1,
            "load" => 0,
            _ => return,
        };

        let is_stx_io = match &*attr.value {
            Expr::Attribute(inner) => {
                inner.attr.as_str() == "io"
                    && matches!(&*inner.value, Expr::Name(n) if n.id.as_str() == "stx")
            }
            Expr::Name(name) => self
                .imports
                .get(name.id.as_str())
                .is_some_and(|r| r.contains("scitex") && r.contains("io")),
            _ => false,
        };
        if !is_stx_io {
            return;
        }

        let path_str = if call.arguments.args.len() > path_idx {
            string_literal(&call.arguments.args[path_idx])
        } else {
            call.arguments
                .keywords
                .iter()
                .find(|kw| kw.arg.as_ref().map(ruff_python_ast::Identifier::as_str) == Some("path"))
                .and_then(|kw| string_literal(&kw.value))
        };
        let Some(path_str) = path_str else {
            return;
        };

        if path_str.starts_with('/') {
            self.add_at(&rules::PA001, call);
        } else if !path_str.starts_with("./") && !path_str.starts_with("../") {
            self.add_at(&rules::PA005, call);
        }
    }

    // -----------------------------------------------------------------
    // Function definitions
    // -----------------------------------------------------------------

    fn handle_function_def(&mut self, def: &ast::StmtFunctionDef) {
        let is_session = has_session_decorator(def);
        if is_session {
            self.has_session_decorator = true;
            self.check_session_return(def);
            self.check_injected_params(def);
            self.session_depth += 1;
        }

        for deco in &def.decorator_list {
            self.visit_expr(&deco.expression);
        }
        for arg in def
            .parameters
            .posonlyargs
            .iter()
            .chain(&def.parameters.args)
            .chain(&def.parameters.kwonlyargs)
        {
            if let Some(default) = &arg.default {
                self.visit_expr(default);
            }
        }
        for stmt in &def.body {
            self.visit_stmt(stmt);
        }

        if is_session {
            self.session_depth -= 1;
        }
    }

    /// (line, col) of the `def` keyword. The node range includes decorators,
    /// so the def line is derived from the function name identifier instead.
    fn def_location(&self, def: &ast::StmtFunctionDef) -> (usize, usize) {
        let (line, _) = self.index.line_col(def.name.range().start());
        let text = source_line(self.lines, line);
        let col = text.len() - text.trim_start().len();
        (line, col)
    }

    fn check_session_return(&mut self, def: &ast::StmtFunctionDef) {
        if !body_returns_int(&def.body) {
            let (line, col) = self.def_location(def);
            self.add(&rules::S004, line, col);
        }
    }

    fn check_injected_params(&mut self, def: &ast::StmtFunctionDef) {
        let declared: Vec<&str> = def
            .parameters
            .args
            .iter()
            .map(|arg| arg.parameter.name.as_str())
            .collect();
        let missing: Vec<&str> = self
            .config
            .required_injected
            .iter()
            .map(String::as_str)
            .filter(|required| !declared.contains(required))
            .collect();
        if missing.is_empty() {
            return;
        }

        let (line, col) = self.def_location(def);
        let text = source_line(self.lines, line).to_owned();
        let mut finding = Finding::new(&rules::S006, line, col, text);
        finding.message = format!("{} (missing: {})", rules::S006.message, missing.join(", "));
        self.findings.push(finding);
    }

    // -----------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------

    fn into_findings(mut self) -> Vec<Finding> {
        if self.is_library {
            return self.findings;
        }

        if !self.has_main_guard {
            self.add(&rules::S002, 1, 0);
        }
        if self.has_main_guard && !self.has_session_decorator {
            self.add(&rules::S001, 1, 0);
        }
        if self.has_main_guard && !self.has_stx_import {
            self.add(&rules::S005, 1, 0);
        }
        self.findings
    }
}

// ---------------------------------------------------------------------------
// Call rule tables
// ---------------------------------------------------------------------------

fn call_rule(receiver: &str, method: &str) -> Option<&'static Rule> {
    match (receiver, method) {
        ("np" | "numpy", "save") => Some(&rules::IO001),
        ("np" | "numpy", "load") => Some(&rules::IO002),
        ("pd" | "pandas", "read_csv") => Some(&rules::IO003),
        ("pickle", "dump" | "dumps") => Some(&rules::IO005),
        ("json", "dump") => Some(&rules::IO006),
        ("plt", "savefig") => Some(&rules::IO007),
        ("stats", "ttest_ind") => Some(&rules::ST001),
        ("stats", "mannwhitneyu") => Some(&rules::ST002),
        ("stats", "pearsonr") => Some(&rules::ST003),
        ("stats", "f_oneway") => Some(&rules::ST004),
        ("stats", "wilcoxon") => Some(&rules::ST005),
        ("stats", "kruskal") => Some(&rules::ST006),
        ("os", "makedirs" | "mkdir") => Some(&rules::PA003),
        ("os", "chdir") => Some(&rules::PA004),
        _ => None,
    }
}

/// Rules matched on method name alone, regardless of receiver.
fn call_rule_any_receiver(method: &str) -> Option<&'static Rule> {
    match method {
        "to_csv" => Some(&rules::IO004),
        "show" => Some(&rules::P004),
        _ => None,
    }
}

fn axes_hint(method: &str) -> Option<&'static Rule> {
    match method {
        "plot" => Some(&rules::P001),
        "scatter" => Some(&rules::P002),
        "bar" => Some(&rules::P003),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// AST predicates
// ---------------------------------------------------------------------------

/// Checks if a function carries `@stx.session` or a bare `@session`.
#[must_use]
pub fn has_session_decorator(def: &ast::StmtFunctionDef) -> bool {
    def.decorator_list.iter().any(|deco| match &deco.expression {
        Expr::Attribute(attr) => {
            attr.attr.as_str() == "session"
                && matches!(&*attr.value, Expr::Name(n) if n.id.as_str() == "stx")
        }
        Expr::Name(name) => name.id.as_str() == "session",
        _ => false,
    })
}

/// Checks if this statement is an `if __name__ == "__main__"` guard,
/// accepting either operand order.
#[must_use]
pub fn is_main_guard(if_stmt: &ast::StmtIf) -> bool {
    if let Expr::Compare(compare) = &*if_stmt.test {
        if compare.ops.len() == 1 && compare.comparators.len() == 1 {
            let left = &*compare.left;
            let right = &compare.comparators[0];
            return is_name_dunder(left) && is_main_string(right)
                || is_name_dunder(right) && is_main_string(left);
        }
    }
    false
}

fn is_name_dunder(expr: &Expr) -> bool {
    matches!(expr, Expr::Name(name) if name.id.as_str() == "__name__")
}

fn is_main_string(expr: &Expr) -> bool {
    matches!(expr, Expr::StringLiteral(lit) if lit.value.to_string() == "__main__")
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::StringLiteral(lit) => Some(lit.value.to_string()),
        _ => None,
    }
}

/// Recursively scans a body (including nested scopes) for a
/// `return <int literal>`.
fn body_returns_int(body: &[Stmt]) -> bool {
    body.iter().any(stmt_returns_int)
}

fn stmt_returns_int(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(node) => node
            .value
            .as_deref()
            .is_some_and(|v| matches!(v, Expr::NumberLiteral(n) if matches!(n.value, ast::Number::Int(_)))),
        Stmt::FunctionDef(node) => body_returns_int(&node.body),
        Stmt::ClassDef(node) => body_returns_int(&node.body),
        Stmt::If(node) => {
            body_returns_int(&node.body)
                || node
                    .elif_else_clauses
                    .iter()
                    .any(|clause| body_returns_int(&clause.body))
        }
        Stmt::For(node) => body_returns_int(&node.body) || body_returns_int(&node.orelse),
        Stmt::While(node) => body_returns_int(&node.body) || body_returns_int(&node.orelse),
        Stmt::With(node) => body_returns_int(&node.body),
        Stmt::Try(node) => {
            body_returns_int(&node.body)
                || node.handlers.iter().any(|handler| {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    body_returns_int(&h.body)
                })
                || body_returns_int(&node.orelse)
                || body_returns_int(&node.finalbody)
        }
        Stmt::Match(node) => node.cases.iter().any(|case| body_returns_int(&case.body)),
        _ => false,
    }
}
