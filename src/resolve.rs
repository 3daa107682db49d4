use std::collections::BTreeMap;

use thiserror::Error;

use crate::store::{Entry, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("undefined reference ${{{0}}}")]
    Undefined(String),

    #[error("unclosed reference in: {0}")]
    Unclosed(String),

    #[error("recursive reference to ${{{0}}}")]
    Recursive(String),

    #[error("inline expression ${{@{0}}} cannot be evaluated here")]
    InlineExpression(String),
}

/// Expands `${NAME}` references against a set of entries.
pub struct Resolver<'a> {
    pub vars: &'a BTreeMap<String, Entry>,
    pub strict: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(vars: &'a BTreeMap<String, Entry>) -> Self {
        Self { vars, strict: true }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Non-string values pass through unchanged.
    pub fn expand(&self, value: &Value) -> Result<Value, ExpansionError> {
        match value {
            Value::Str(s) => Ok(Value::Str(self.resolve(s)?)),
            other => Ok(other.clone()),
        }
    }

    pub fn resolve(&self, input: &str) -> Result<String, ExpansionError> {
        let mut active = Vec::new();
        self.resolve_inner(input, &mut active)
    }

    fn resolve_inner(&self, input: &str, active: &mut Vec<String>) -> Result<String, ExpansionError> {
        // Fast path
        if !input.contains("${") {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);

            let after = &rest[start + 2..];
            let Some(end) = closing_brace(after) else {
                return Err(ExpansionError::Unclosed(input.to_string()));
            };
            let token = &after[..end];

            if let Some(expr) = token.strip_prefix('@') {
                return Err(ExpansionError::InlineExpression(expr.to_string()));
            }

            // inner references compose the outer name
            let token = if token.contains("${") {
                self.resolve_inner(token, active)?
            } else {
                token.to_string()
            };

            if is_var_name(&token) {
                out.push_str(&self.lookup(&token, active)?);
            } else {
                // shell parameter expansion or similar; not ours to touch
                out.push_str("${");
                out.push_str(&token);
                out.push('}');
            }

            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn lookup(&self, name: &str, active: &mut Vec<String>) -> Result<String, ExpansionError> {
        if active.iter().any(|n| n == name) {
            return Err(ExpansionError::Recursive(name.to_string()));
        }

        match self.vars.get(name).and_then(|e| e.raw.as_ref()) {
            Some(Value::Str(s)) => {
                active.push(name.to_string());
                let resolved = self.resolve_inner(s, active);
                active.pop();
                resolved
            }
            Some(structured) => Ok(structured.to_string()),
            None if self.strict => Err(ExpansionError::Undefined(name.to_string())),
            None => Ok(format!("${{{name}}}")),
        }
    }
}

/// Names referenced as `${NAME}` in `input`, in order of appearance.
///
/// Only the inner names of a nested `${A_${B}}` are listed; the composed
/// outer name is not known statically.
pub fn references(input: &str) -> Vec<&str> {
    let mut out = Vec::new();
    collect_references(input, &mut out);
    out
}

fn collect_references<'a>(input: &'a str, out: &mut Vec<&'a str>) {
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = closing_brace(after) else { break };
        let token = &after[..end];
        if is_var_name(token) {
            out.push(token);
        } else if token.contains("${") {
            collect_references(token, out);
        }
        rest = &after[end + 1..];
    }
}

/// Offset of the `}` closing a reference whose body starts at `s[0]`,
/// skipping over nested `${...}`.
fn closing_brace(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 1;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }

    None
}

fn is_var_name(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'.' | b'/' | b'~' | b':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, Entry> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Entry::new(*k, *v)))
            .collect()
    }

    #[test]
    fn expands_nested_references() {
        let v = vars(&[("A", "${B}/a"), ("B", "${C}-b"), ("C", "c")]);
        let r = Resolver::new(&v);
        assert_eq!(r.resolve("x=${A}").unwrap(), "x=c-b/a");
    }

    #[test]
    fn undefined_reference_fails_in_strict_mode() {
        let v = vars(&[]);
        let err = Resolver::new(&v).resolve("${NOPE}").unwrap_err();
        assert_eq!(err, ExpansionError::Undefined("NOPE".into()));
    }

    #[test]
    fn undefined_reference_kept_in_lenient_mode() {
        let v = vars(&[("A", "a")]);
        let r = Resolver::new(&v).with_strict(false);
        assert_eq!(r.resolve("${A}:${NOPE}").unwrap(), "a:${NOPE}");
    }

    #[test]
    fn cycles_are_reported_not_followed() {
        let v = vars(&[("A", "${B}"), ("B", "${A}")]);
        let err = Resolver::new(&v).resolve("${A}").unwrap_err();
        assert_eq!(err, ExpansionError::Recursive("A".into()));
    }

    #[test]
    fn malformed_and_inline_expressions_fail() {
        let v = vars(&[]);
        let r = Resolver::new(&v);
        assert!(matches!(r.resolve("${OPEN"), Err(ExpansionError::Unclosed(_))));
        assert_eq!(
            r.resolve("${@d.getVar('X')}").unwrap_err(),
            ExpansionError::InlineExpression("d.getVar('X')".into())
        );
    }

    #[test]
    fn shell_parameter_expansions_left_alone() {
        let v = vars(&[]);
        let r = Resolver::new(&v);
        assert_eq!(r.resolve("${x#prefix} $HOME").unwrap(), "${x#prefix} $HOME");
    }

    #[test]
    fn nested_reference_expands_inner_name_first() {
        let v = vars(&[("B", "b"), ("A_b", "ok"), ("SUF", "${B}")]);
        let r = Resolver::new(&v);
        assert_eq!(r.resolve("${A_${B}}").unwrap(), "ok");
        assert_eq!(r.resolve("[${A_${SUF}}]").unwrap(), "[ok]");
        assert_eq!(
            r.resolve("${C_${B}}").unwrap_err(),
            ExpansionError::Undefined("C_b".into())
        );
        assert!(matches!(r.resolve("${A_${B}"), Err(ExpansionError::Unclosed(_))));
    }

    #[test]
    fn nested_reference_kept_in_lenient_mode() {
        let v = vars(&[]);
        let r = Resolver::new(&v).with_strict(false);
        assert_eq!(r.resolve("${A_${B}}").unwrap(), "${A_${B}}");
    }

    #[test]
    fn structured_values_are_not_expanded() {
        let v = vars(&[]);
        let value = Value::Structured(toml::Value::Integer(3));
        assert_eq!(Resolver::new(&v).expand(&value).unwrap(), value);
    }

    #[test]
    fn references_lists_names_in_order() {
        assert_eq!(references("${A} ${x#y} ${B}${A}"), vec!["A", "B", "A"]);
        assert_eq!(references("${A_${B}} ${C}"), vec!["B", "C"]);
    }
}
