use crate::{
    diag::{Diagnostic, DiagnosticSink},
    store::{
        ConfigStore, Flags, Value, FLAG_EMBEDDED, FLAG_EXPORT, FLAG_EXPORT_FUNC, FLAG_FUNC,
        FLAG_PYTHON,
    },
};

const IGNORED_FLAGS: &[&str] = &[
    FLAG_FUNC,
    FLAG_PYTHON,
    FLAG_EMBEDDED,
    FLAG_EXPORT,
    FLAG_EXPORT_FUNC,
];

/// Turns store entries into shell-consumable text.
pub struct Emitter<'a, S: ConfigStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ConfigStore + ?Sized> Emitter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Text for one entry; `None` when the entry has no value.
    pub fn entry(&self, name: &str, sink: &mut dyn DiagnosticSink) -> Option<String> {
        let raw = self.store.raw(name)?;
        let default = Flags::default();
        let flags = self.store.get_flags(name).unwrap_or(&default);

        if flags.is_func() {
            Some(self.function(name, raw, flags, sink))
        } else {
            Some(self.assignment(name, None, raw, flags, sink))
        }
    }

    /// One `name[flag]=value` line per user-facing flag, ordered by flag name.
    pub fn flags(&self, name: &str, sink: &mut dyn DiagnosticSink) -> Vec<String> {
        let Some(flags) = self.store.get_flags(name) else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        for (flag, value) in flags.iter() {
            if is_ignored_flag(flag) {
                continue;
            }
            lines.push(self.assignment(name, Some(flag), value, flags, sink));
        }
        lines
    }

    fn assignment(
        &self,
        name: &str,
        flag: Option<&str>,
        raw: &Value,
        flags: &Flags,
        sink: &mut dyn DiagnosticSink,
    ) -> String {
        let lhs = match flag {
            Some(f) => format!("{name}[{f}]"),
            None => name.to_string(),
        };

        if flags.is_unexport() {
            return match flag {
                Some(_) => format!("{lhs}={}", shell_value(raw)),
                None => format!("# {lhs}={}", shell_value(raw)),
            };
        }

        let expanded = match self.store.expand(raw) {
            Ok(v) => v,
            Err(error) => {
                sink.report(Diagnostic::ExpansionFailed {
                    name: name.to_string(),
                    flag: flag.map(str::to_string),
                    error,
                });
                return format!("# {lhs}={}", shell_value(raw));
            }
        };

        let mut out = String::new();
        if &expanded != raw {
            out.push_str("# ");
            out.push_str(&lhs);
            out.push('=');
            out.push_str(&shell_value(raw));
            out.push('\n');
        }

        if flag.is_none() && flags.is_export() {
            out.push_str("export ");
        }
        out.push_str(&lhs);
        out.push('=');
        out.push_str(&shell_value(&expanded));
        out
    }

    fn function(&self, name: &str, raw: &Value, flags: &Flags, sink: &mut dyn DiagnosticSink) -> String {
        let python = flags.is_python();

        if flags.is_unexport() {
            return comment_block(&function_block(name, &raw.to_string(), python));
        }

        let body = match self.store.expand(raw) {
            Ok(v) => v.to_string(),
            Err(error) => {
                sink.report(Diagnostic::ExpansionFailed {
                    name: name.to_string(),
                    flag: None,
                    error,
                });
                return comment_block(&function_block(name, &raw.to_string(), python));
            }
        };

        if python && self.store.is_materialized(name) {
            return body;
        }
        function_block(name, &body, python)
    }
}

fn is_ignored_flag(flag: &str) -> bool {
    flag.starts_with('_') || IGNORED_FLAGS.contains(&flag)
}

// -------------------- formatting helpers --------------------

/// Strings are double-quoted with `"` and `` ` `` escaped; anything else
/// renders as its literal.
pub fn shell_value(v: &Value) -> String {
    match v {
        Value::Str(s) => quote_shell(s),
        Value::Structured(_) => v.to_string(),
    }
}

fn quote_shell(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' | '`' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn function_block(name: &str, body: &str, python: bool) -> String {
    let mut out = String::new();
    if python {
        out.push_str("python ");
    }
    out.push_str(name);
    out.push_str(" () {\n");
    out.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

fn comment_block(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for line in text.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    out
}
