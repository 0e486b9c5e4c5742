//! Auto-fixes session-function signatures.
//!
//! Rewrites `@stx.session` function definitions so that every required
//! injected parameter is declared with the canonical
//! `stx.session.INJECTED` default. User parameters keep their source text
//! verbatim; injected parameters are emitted one per line in canonical
//! order. Fixes are applied bottom-up so earlier line indices stay valid.

use anyhow::Context;
use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_python_parser::parse_module;
use ruff_text_size::Ranged;
use std::path::Path;

use crate::checker::has_session_decorator;
use crate::config::LinterConfig;
use crate::utils::LineIndex;

/// Canonical default expression for injected parameters.
pub const INJECTED_DEFAULT: &str = "stx.session.INJECTED";

/// Fixes all session functions in the source. Unparseable source is
/// returned unchanged.
#[must_use]
pub fn fix_source(source: &str, config: &LinterConfig) -> String {
    let Ok(parsed) = parse_module(source) else {
        return source.to_owned();
    };
    let body = parsed.into_syntax().body;
    let index = LineIndex::new(source);
    let required: Vec<&str> = config.required_injected.iter().map(String::as_str).collect();

    let mut sessions = Vec::new();
    collect_session_defs(&body, &mut sessions);

    // (0-based def line, plan) for every function that needs editing
    let mut fixes: Vec<(usize, FixPlan)> = sessions
        .into_iter()
        .filter_map(|def| {
            let plan = plan_fix(def, &required)?;
            let (line, _) = index.line_col(def.name.range().start());
            let body_line = def
                .body
                .first()
                .map_or(line + 1, |stmt| index.line_col(stmt.range().start()).0);
            Some((line - 1, FixPlan { body_line_idx: body_line - 1, ..plan }))
        })
        .collect();
    if fixes.is_empty() {
        return source.to_owned();
    }
    fixes.sort_by(|a, b| b.0.cmp(&a.0));

    let mut lines: Vec<String> = source.split_inclusive('\n').map(str::to_owned).collect();
    if let Some(last) = lines.last_mut() {
        if !last.ends_with('\n') {
            last.push('\n');
        }
    }

    for (def_idx, plan) in fixes {
        apply_fix(&mut lines, def_idx, &plan, &required);
    }

    lines.concat()
}

/// Fixes a file, optionally writing the result back. Returns the fixed
/// source and whether it differs from the original.
pub fn fix_file(path: &Path, write: bool, config: &LinterConfig) -> anyhow::Result<(String, bool)> {
    let original = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let fixed = fix_source(&original, config);
    let changed = fixed != original;
    if write && changed {
        std::fs::write(path, &fixed)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok((fixed, changed))
}

struct FixPlan {
    is_async: bool,
    name: String,
    missing: Vec<String>,
    /// 0-based line index of the first body statement
    body_line_idx: usize,
}

fn collect_session_defs<'a>(body: &'a [Stmt], out: &mut Vec<&'a ast::StmtFunctionDef>) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(def) => {
                if has_session_decorator(def) {
                    out.push(def);
                }
                collect_session_defs(&def.body, out);
            }
            Stmt::ClassDef(node) => collect_session_defs(&node.body, out),
            Stmt::If(node) => {
                collect_session_defs(&node.body, out);
                for clause in &node.elif_else_clauses {
                    collect_session_defs(&clause.body, out);
                }
            }
            Stmt::For(node) => {
                collect_session_defs(&node.body, out);
                collect_session_defs(&node.orelse, out);
            }
            Stmt::While(node) => {
                collect_session_defs(&node.body, out);
                collect_session_defs(&node.orelse, out);
            }
            Stmt::With(node) => collect_session_defs(&node.body, out),
            Stmt::Try(node) => {
                collect_session_defs(&node.body, out);
                for ast::ExceptHandler::ExceptHandler(handler) in &node.handlers {
                    collect_session_defs(&handler.body, out);
                }
                collect_session_defs(&node.orelse, out);
                collect_session_defs(&node.finalbody, out);
            }
            Stmt::Match(node) => {
                for case in &node.cases {
                    collect_session_defs(&case.body, out);
                }
            }
            _ => {}
        }
    }
}

/// Decides whether a session function needs editing: missing injected
/// parameters, or a declared one with a non-canonical `stx.INJECTED` default.
fn plan_fix(def: &ast::StmtFunctionDef, required: &[&str]) -> Option<FixPlan> {
    let declared: Vec<&str> = def
        .parameters
        .args
        .iter()
        .map(|arg| arg.parameter.name.as_str())
        .collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|r| !declared.contains(r))
        .map(|r| (*r).to_owned())
        .collect();

    let needs_normalize = def.parameters.args.iter().any(|arg| {
        required.contains(&arg.parameter.name.as_str())
            && arg.default.as_deref().is_some_and(|default| {
                is_injected_value(default) && !is_canonical_injected(default)
            })
    });

    if missing.is_empty() && !needs_normalize {
        return None;
    }
    Some(FixPlan {
        is_async: def.is_async,
        name: def.name.to_string(),
        missing,
        body_line_idx: 0,
    })
}

/// `stx.session.INJECTED` or the shorthand `stx.INJECTED`.
fn is_injected_value(expr: &Expr) -> bool {
    let Expr::Attribute(attr) = expr else {
        return false;
    };
    if attr.attr.as_str() != "INJECTED" {
        return false;
    }
    match &*attr.value {
        Expr::Attribute(inner) => {
            inner.attr.as_str() == "session"
                && matches!(&*inner.value, Expr::Name(n) if n.id.as_str() == "stx")
        }
        Expr::Name(name) => name.id.as_str() == "stx",
        _ => false,
    }
}

fn is_canonical_injected(expr: &Expr) -> bool {
    let Expr::Attribute(attr) = expr else {
        return false;
    };
    attr.attr.as_str() == "INJECTED"
        && matches!(&*attr.value, Expr::Attribute(inner)
            if inner.attr.as_str() == "session"
                && matches!(&*inner.value, Expr::Name(n) if n.id.as_str() == "stx"))
}

/// Rewrites one signature in place: `lines[def_idx..=colon_idx]` is replaced
/// by a multi-line def with user params first, then injected params.
fn apply_fix(lines: &mut Vec<String>, def_idx: usize, plan: &FixPlan, required: &[&str]) {
    // The colon that opens the body sits between the def line and the first
    // body line; scan backwards for it.
    let mut colon_idx = def_idx;
    let upper = plan.body_line_idx.min(lines.len()).max(def_idx + 1);
    for i in (def_idx..upper).rev() {
        if lines[i].trim_end().ends_with(':') {
            colon_idx = i;
            break;
        }
    }

    let def_line = &lines[def_idx];
    let def_indent: String = def_line.chars().take_while(|c| c.is_whitespace()).collect();
    let param_indent = format!("{def_indent}    ");
    let keyword = if plan.is_async { "async def" } else { "def" };

    let sig_text: String = lines[def_idx..=colon_idx].concat();
    let Some(paren_open) = sig_text.find('(') else {
        return;
    };
    let Some(paren_close) = sig_text.rfind(')') else {
        return;
    };
    if paren_close <= paren_open {
        return;
    }
    let params_text = sig_text[paren_open + 1..paren_close].trim();
    // Inline bodies (`def f(): return 0`) live after the colon; keep them.
    let trailing = sig_text[paren_close + 1..]
        .trim_start()
        .trim_start_matches(':')
        .trim();

    let mut user_params = Vec::new();
    let mut existing_injected = Vec::new();
    for param in split_params(params_text) {
        let name = param_name(&param);
        if required.contains(&name) {
            existing_injected.push(name.to_owned());
        } else if !name.is_empty() {
            user_params.push(param);
        }
    }

    let mut new_lines = Vec::new();
    new_lines.push(format!("{def_indent}{keyword} {}(\n", plan.name));
    for param in &user_params {
        new_lines.push(format!("{param_indent}{param},\n"));
    }
    for name in required {
        if existing_injected.iter().any(|p| p == name)
            || plan.missing.iter().any(|m| m == name)
        {
            new_lines.push(format!("{param_indent}{name}={INJECTED_DEFAULT},\n"));
        }
    }
    new_lines.push(format!("{def_indent}):\n"));
    if !trailing.is_empty() {
        new_lines.push(format!("{param_indent}{trailing}\n"));
    }

    lines.splice(def_idx..=colon_idx, new_lines);
}

/// Parameter name, ignoring any default or annotation.
fn param_name(param: &str) -> &str {
    param
        .split('=')
        .next()
        .and_then(|s| s.split(':').next())
        .unwrap_or("")
        .trim()
}

/// Splits a parameter list on top-level commas, respecting brackets and
/// string literals so `x=dict(a=1, b=2)` stays one parameter.
fn split_params(params_text: &str) -> Vec<String> {
    if params_text.trim().is_empty() {
        return Vec::new();
    }

    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;

    for ch in params_text.chars() {
        if let Some(quote) = in_string {
            current.push(ch);
            if ch == quote {
                in_string = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                in_string = Some(ch);
                current.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                let param = current.trim();
                if !param.is_empty() {
                    params.push(param.to_owned());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    let param = current.trim();
    if !param.is_empty() {
        params.push(param.to_owned());
    }
    params
}
