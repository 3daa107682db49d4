use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use crate::{
    deps::DepMap,
    resolve::{references, ExpansionError, Resolver},
    store::{ConfigStore, Entry, Flags, Value},
};

#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    vars: BTreeMap<String, VarDef>,

    #[serde(default)]
    deps: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    methodpool: MethodPool,
}

#[derive(Debug, Deserialize)]
struct VarDef {
    #[serde(default)]
    value: Option<toml::Value>,

    #[serde(default)]
    flags: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct MethodPool {
    #[serde(default)]
    parsed: Vec<String>,
}

/// A finalized, read-only configuration snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: BTreeMap<String, Entry>,
    declared_deps: DepMap,
    materialized: BTreeSet<String>,
    strict: bool,
}

impl Snapshot {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot at {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse snapshot at {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: SnapshotFile = toml::from_str(text)?;

        let entries = file.vars.into_iter().map(|(name, def)| Entry {
            name,
            raw: def.value.map(Value::from),
            flags: Flags::from_map(def.flags),
        });

        let mut snap = Self::from_entries(entries);
        for (name, deps) in file.deps {
            snap.declared_deps.insert(name, deps.into_iter().collect());
        }
        snap.materialized = file.methodpool.parsed.into_iter().collect();
        Ok(snap)
    }

    pub fn from_entries<I: IntoIterator<Item = Entry>>(entries: I) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
            declared_deps: DepMap::new(),
            materialized: BTreeSet::new(),
            strict: true,
        }
    }

    pub fn with_deps<I, T>(mut self, name: &str, deps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.declared_deps
            .insert(name.to_string(), deps.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_materialized(mut self, name: &str) -> Self {
        self.materialized.insert(name.to_string());
        self
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn has_declared_deps(&self, name: &str) -> bool {
        self.declared_deps.contains_key(name)
    }

    pub fn materialized_count(&self) -> usize {
        self.materialized.len()
    }

    /// Static dependency map for every entry.
    ///
    /// Declared `[deps]` sets win. Otherwise a value depends on every
    /// `${NAME}` it references, and a shell function additionally on every
    /// function entry it invokes as a command.
    pub fn static_dependency_map(&self) -> DepMap {
        let mut map = self.declared_deps.clone();

        for entry in self.entries.values() {
            if map.contains_key(&entry.name) {
                continue;
            }
            let Some(body) = entry.raw.as_ref().and_then(Value::as_str) else {
                continue;
            };

            let mut found: BTreeSet<String> = references(body).into_iter().map(str::to_string).collect();
            if entry.flags.is_func() && !entry.flags.is_python() {
                found.extend(
                    shell_command_words(body)
                        .into_iter()
                        .filter(|w| self.is_function(w)),
                );
            }

            if !found.is_empty() {
                map.insert(entry.name.clone(), found);
            }
        }

        tracing::debug!(entries = map.len(), "built static dependency map");
        map
    }
}

impl ConfigStore for Snapshot {
    fn raw(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).and_then(|e| e.raw.as_ref())
    }

    fn get_flags(&self, name: &str) -> Option<&Flags> {
        self.entries.get(name).map(|e| &e.flags)
    }

    fn all_names(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    fn expand(&self, raw: &Value) -> Result<Value, ExpansionError> {
        Resolver::new(&self.entries).with_strict(self.strict).expand(raw)
    }

    fn is_materialized(&self, name: &str) -> bool {
        self.materialized.contains(name)
    }
}

// -------------------- shell scanning --------------------

const SHELL_KEYWORDS: &[&str] = &[
    "!", "if", "then", "else", "elif", "do", "while", "until", "time", "exec", "command",
];

/// First word of every simple command in a shell body.
fn shell_command_words(body: &str) -> Vec<String> {
    let code = blank_inert_text(body);
    let mut words = Vec::new();

    for segment in code.split(['\n', ';', '|', '&', '(', ')', '`', '{', '}']) {
        for tok in segment.split_whitespace() {
            if SHELL_KEYWORDS.contains(&tok) || tok.contains('=') {
                continue;
            }
            words.push(tok.to_string());
            break;
        }
    }

    words
}

/// Replaces quoted text, comments and `${...}` bodies with spaces. Command
/// substitutions survive, also inside double quotes.
fn blank_inert_text(body: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut in_double = false;
    let mut subst_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if subst_depth > 0 {
            match c {
                '(' => subst_depth += 1,
                ')' => subst_depth -= 1,
                _ => {}
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '\\' => {
                out.push_str("  ");
                i += 2;
                continue;
            }
            '$' if next == Some('{') => {
                let end = matching_brace(&chars, i + 2);
                blank(&mut out, end - i);
                i = end;
                continue;
            }
            '$' if next == Some('(') => {
                out.push_str("$(");
                subst_depth = 1;
                i += 2;
                continue;
            }
            '`' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '`')
                    .map(|p| i + p + 2)
                    .unwrap_or(chars.len());
                out.extend(&chars[i..end]);
                i = end;
                continue;
            }
            '"' => {
                in_double = !in_double;
                out.push(' ');
            }
            _ if in_double => out.push(if c == '\n' { '\n' } else { ' ' }),
            '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '\'')
                    .map(|p| i + p + 2)
                    .unwrap_or(chars.len());
                for &ch in &chars[i..end] {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
                i = end;
                continue;
            }
            '#' if i == 0 || chars[i - 1].is_whitespace() || ";|&(){}".contains(chars[i - 1]) => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

/// Index just past the `}` closing a `${` whose body starts at `from`.
fn matching_brace(chars: &[char], from: usize) -> usize {
    let mut depth = 1usize;
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

fn blank(out: &mut String, n: usize) {
    out.extend(std::iter::repeat(' ').take(n));
}
