use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::resolve::ExpansionError;

/// A raw or expanded value held by the store.
///
/// Absence is modelled as `Option<Value>` at the call sites.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Structured(toml::Value),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Structured(_) => None,
        }
    }

    /// Bool-ish reading used for flags.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !matches!(s.trim(), "" | "0" | "false"),
            Value::Structured(v) => structured_truthy(v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<toml::Value> for Value {
    fn from(v: toml::Value) -> Self {
        match v {
            toml::Value::String(s) => Value::Str(s),
            other => Value::Structured(other),
        }
    }
}

/// Strings render as-is, structured values as their TOML literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Structured(v) => write!(f, "{v}"),
        }
    }
}

fn structured_truthy(v: &toml::Value) -> bool {
    match v {
        toml::Value::String(s) => !matches!(s.trim(), "" | "0" | "false"),
        toml::Value::Integer(i) => *i != 0,
        toml::Value::Float(x) => *x != 0.0,
        toml::Value::Boolean(b) => *b,
        toml::Value::Datetime(_) => true,
        toml::Value::Array(a) => !a.is_empty(),
        toml::Value::Table(t) => !t.is_empty(),
    }
}

pub const FLAG_EXPORT: &str = "export";
pub const FLAG_UNEXPORT: &str = "unexport";
pub const FLAG_FUNC: &str = "func";
pub const FLAG_PYTHON: &str = "python";
pub const FLAG_EMBEDDED: &str = "embedded";
pub const FLAG_EXPORT_FUNC: &str = "export_func";

/// Per-entry flags: the recognized ones are typed fields, everything else
/// lands in `other`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flags {
    pub export: Option<Value>,
    pub unexport: Option<Value>,
    pub func: Option<Value>,
    pub python: Option<Value>,
    pub embedded: Option<Value>,
    pub export_func: Option<Value>,
    pub other: BTreeMap<String, Value>,
}

impl Flags {
    pub fn from_map<I, K, V>(map: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut flags = Flags::default();
        for (k, v) in map {
            flags.set(k.into(), v.into());
        }
        flags
    }

    pub fn set(&mut self, flag: String, value: Value) {
        match flag.as_str() {
            FLAG_EXPORT => self.export = Some(value),
            FLAG_UNEXPORT => self.unexport = Some(value),
            FLAG_FUNC => self.func = Some(value),
            FLAG_PYTHON => self.python = Some(value),
            FLAG_EMBEDDED => self.embedded = Some(value),
            FLAG_EXPORT_FUNC => self.export_func = Some(value),
            _ => {
                self.other.insert(flag, value);
            }
        }
    }

    pub fn get(&self, flag: &str) -> Option<&Value> {
        match flag {
            FLAG_EXPORT => self.export.as_ref(),
            FLAG_UNEXPORT => self.unexport.as_ref(),
            FLAG_FUNC => self.func.as_ref(),
            FLAG_PYTHON => self.python.as_ref(),
            FLAG_EMBEDDED => self.embedded.as_ref(),
            FLAG_EXPORT_FUNC => self.export_func.as_ref(),
            _ => self.other.get(flag),
        }
    }

    pub fn is_export(&self) -> bool {
        truthy(&self.export)
    }

    pub fn is_unexport(&self) -> bool {
        truthy(&self.unexport)
    }

    pub fn is_func(&self) -> bool {
        truthy(&self.func)
    }

    /// `python` and `embedded` both mark an embedded-language body.
    pub fn is_python(&self) -> bool {
        truthy(&self.python) || truthy(&self.embedded)
    }

    /// Every set flag, ordered by flag name.
    pub fn iter(&self) -> Vec<(&str, &Value)> {
        let typed = [
            (FLAG_EXPORT, &self.export),
            (FLAG_UNEXPORT, &self.unexport),
            (FLAG_FUNC, &self.func),
            (FLAG_PYTHON, &self.python),
            (FLAG_EMBEDDED, &self.embedded),
            (FLAG_EXPORT_FUNC, &self.export_func),
        ];

        let mut all: Vec<(&str, &Value)> = typed
            .into_iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k, v)))
            .chain(self.other.iter().map(|(k, v)| (k.as_str(), v)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

fn truthy(v: &Option<Value>) -> bool {
    v.as_ref().map(Value::is_truthy).unwrap_or(false)
}

/// One named, flagged value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub raw: Option<Value>,
    pub flags: Flags,
}

impl Entry {
    pub fn new(name: impl Into<String>, raw: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            raw: Some(raw.into()),
            flags: Flags::default(),
        }
    }

    pub fn flag(mut self, flag: &str, value: impl Into<Value>) -> Self {
        self.flags.set(flag.to_string(), value.into());
        self
    }
}

/// Read-only view of a finalized configuration snapshot.
pub trait ConfigStore {
    /// Unexpanded value of `name`.
    fn raw(&self, name: &str) -> Option<&Value>;

    fn get_flags(&self, name: &str) -> Option<&Flags>;

    fn all_names(&self) -> BTreeSet<String>;

    /// Expand a raw value against this snapshot. Must be deterministic.
    fn expand(&self, raw: &Value) -> Result<Value, ExpansionError>;

    /// Embedded-language functions already materialized by a method cache.
    fn is_materialized(&self, _name: &str) -> bool {
        false
    }

    fn contains(&self, name: &str) -> bool {
        self.get_flags(name).is_some()
    }

    fn get(&self, name: &str, expand: bool) -> Result<Option<Value>, ExpansionError> {
        match self.raw(name) {
            Some(raw) if expand => self.expand(raw).map(Some),
            Some(raw) => Ok(Some(raw.clone())),
            None => Ok(None),
        }
    }

    fn get_flag(&self, name: &str, flag: &str) -> Option<&Value> {
        self.get_flags(name).and_then(|f| f.get(flag))
    }

    fn is_function(&self, name: &str) -> bool {
        self.get_flags(name).map(Flags::is_func).unwrap_or(false)
    }

    fn is_python(&self, name: &str) -> bool {
        self.get_flags(name).map(Flags::is_python).unwrap_or(false)
    }

    fn is_exported(&self, name: &str) -> bool {
        self.get_flags(name).map(Flags::is_export).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_boolish_conventions() {
        assert!(Value::from("1").is_truthy());
        assert!(Value::from("yes").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from("0").is_truthy());
        assert!(!Value::from("false").is_truthy());
        assert!(Value::from(toml::Value::Boolean(true)).is_truthy());
        assert!(!Value::from(toml::Value::Integer(0)).is_truthy());
        assert!(!Value::from(toml::Value::Array(vec![])).is_truthy());
    }

    #[test]
    fn recognized_flags_are_typed() {
        let flags = Flags::from_map([("export", "1"), ("func", "1"), ("doc", "hello")]);
        assert!(flags.is_export());
        assert!(flags.is_func());
        assert!(!flags.is_python());
        assert_eq!(flags.other.len(), 1);
        assert_eq!(flags.get("doc"), Some(&Value::from("hello")));
    }

    #[test]
    fn embedded_flag_marks_python_body() {
        let flags = Flags::from_map([("func", "1"), ("embedded", "1")]);
        assert!(flags.is_python());
        assert!(flags.other.is_empty());
        assert_eq!(flags.get("embedded"), Some(&Value::from("1")));
        assert!(!Flags::from_map([("embedded", "0")]).is_python());
    }

    #[test]
    fn iter_is_sorted_by_flag_name() {
        let flags = Flags::from_map([("zeta", "1"), ("export", "1"), ("doc", "x")]);
        let names: Vec<&str> = flags.iter().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["doc", "export", "zeta"]);
    }

    #[test]
    fn toml_strings_become_plain_strings() {
        assert_eq!(
            Value::from(toml::Value::String("a".into())),
            Value::Str("a".into())
        );
        let v = Value::from(toml::Value::Integer(42));
        assert_eq!(v.to_string(), "42");
        assert_eq!(v.as_str(), None);
    }
}
