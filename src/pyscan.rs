//! Static scan of embedded Python function bodies.
//!
//! This is text-only: literals and comments are blanked, then call sites are
//! matched. It never evaluates anything.

use regex::Regex;
use std::{collections::BTreeSet, sync::LazyLock};

static CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\b(?:def|class)\s+)?\b([A-Za-z_][A-Za-z0-9_]*(?:\s*\.\s*[A-Za-z_][A-Za-z0-9_]*)*)\s*\(\s*(?:__lit(\d+)__)?",
    )
    .expect("call pattern is valid")
});

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "await", "del", "elif", "else", "except", "for", "from", "if",
    "import", "in", "is", "lambda", "not", "or", "raise", "return", "while", "with", "yield",
];

// Accessors whose first literal argument is a variable reference.
const GETVARS: &[&str] = &[".getVar", ".appendVar", ".prependVar", ".setVar", ".delVar"];
const GETVARFLAGS: &[&str] = &[".getVarFlag", ".getVarFlags", ".appendVarFlag", ".prependVarFlag", ".setVarFlag"];
const CONTAINS: &[&str] = &["bb.utils.contains", "bb.utils.contains_any", "bb.utils.filter", "base_contains"];

// Calls whose first literal argument names a function that gets executed.
const EXECFUNCS: &[&str] = &["bb.build.exec_func", "bb.build.exec_task", "exec_func", "exec_task"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PyDeps {
    /// Names the body calls or executes.
    pub execs: BTreeSet<String>,
    /// Variables read or written through datastore accessors.
    pub references: BTreeSet<String>,
}

pub fn scan(body: &str) -> PyDeps {
    let (code, literals) = blank_literals(body);
    let mut deps = PyDeps::default();

    for caps in CALL.captures_iter(&code) {
        if caps.get(1).is_some() {
            continue;
        }
        let Some(m) = caps.get(2) else { continue };
        let name: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
        if KEYWORDS.contains(&name.as_str()) {
            continue;
        }

        let literal = caps
            .get(3)
            .and_then(|i| i.as_str().parse::<usize>().ok())
            .and_then(|i| literals.get(i))
            .cloned();

        if GETVARS.iter().chain(GETVARFLAGS).any(|s| name.ends_with(s)) || CONTAINS.contains(&name.as_str()) {
            if let Some(var) = literal {
                deps.references.insert(var);
            }
        } else if EXECFUNCS.iter().any(|s| name == *s || name.ends_with(&format!(".{s}"))) {
            if let Some(func) = literal {
                deps.execs.insert(func);
            }
        } else {
            deps.execs.insert(name);
        }
    }

    deps
}

/// Replace string literals with `__litN__` placeholders and drop comments.
fn blank_literals(body: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = body.chars().collect();
    let mut code = String::with_capacity(body.len());
    let mut literals = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c != '"' && c != '\'' {
            code.push(c);
            i += 1;
            continue;
        }

        strip_string_prefix(&mut code);

        let triple = i + 2 < chars.len() && chars[i + 1] == c && chars[i + 2] == c;
        let quote_len = if triple { 3 } else { 1 };
        i += quote_len;

        let mut text = String::new();
        while i < chars.len() {
            if chars[i] == '\\' && i + 1 < chars.len() {
                text.push(chars[i + 1]);
                i += 2;
                continue;
            }
            let closes = if triple {
                i + 2 < chars.len() && chars[i] == c && chars[i + 1] == c && chars[i + 2] == c
            } else {
                chars[i] == c || chars[i] == '\n'
            };
            if closes {
                i += if triple || chars[i] == c { quote_len } else { 0 };
                break;
            }
            text.push(chars[i]);
            i += 1;
        }

        code.push_str(&format!("__lit{}__", literals.len()));
        literals.push(text);
    }

    (code, literals)
}

// r"", b'', f"", rb"" ... the prefix letters would otherwise glue onto the placeholder.
fn strip_string_prefix(code: &mut String) {
    let prefix_len = code
        .chars()
        .rev()
        .take_while(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'))
        .count();
    if prefix_len == 0 || prefix_len > 2 {
        return;
    }

    let cut = code.len() - prefix_len;
    let before = code[..cut].chars().next_back();
    if before.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false) {
        return;
    }
    code.truncate(cut);
}
