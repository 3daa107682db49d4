use std::fmt;

use crate::resolve::ExpansionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Per-entry problems found while listing. None of them stop the listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    MissingRequestedName {
        name: String,
    },
    ExpansionFailed {
        name: String,
        flag: Option<String>,
        error: ExpansionError,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::MissingRequestedName { .. } => Severity::Warning,
            Diagnostic::ExpansionFailed { .. } => Severity::Error,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Diagnostic::MissingRequestedName { name } => name,
            Diagnostic::ExpansionFailed { name, .. } => name,
        }
    }

    pub fn flag(&self) -> Option<&str> {
        match self {
            Diagnostic::ExpansionFailed { flag, .. } => flag.as_deref(),
            Diagnostic::MissingRequestedName { .. } => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingRequestedName { name } => {
                write!(f, "Requested variable '{name}' does not exist")
            }
            Diagnostic::ExpansionFailed {
                name,
                flag: Some(flag),
                error,
            } => write!(f, "Expansion of '{name}[{flag}]' failed: {error}"),
            Diagnostic::ExpansionFailed {
                name,
                flag: None,
                error,
            } => write!(f, "Expansion of '{name}' failed: {error}"),
        }
    }
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the installed `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Warning => tracing::warn!(variable = diagnostic.name(), "{diagnostic}"),
            Severity::Error => tracing::error!(
                variable = diagnostic.name(),
                flag = diagnostic.flag(),
                "{diagnostic}"
            ),
        }
    }
}

/// Keeps everything it is handed.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn names(&self) -> Vec<&str> {
        self.diagnostics.iter().map(Diagnostic::name).collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[test]
    fn messages_name_the_variable_and_flag() {
        let missing = Diagnostic::MissingRequestedName { name: "NOPE".into() };
        assert_eq!(missing.severity(), Severity::Warning);
        assert_eq!(missing.to_string(), "Requested variable 'NOPE' does not exist");

        let failed = Diagnostic::ExpansionFailed {
            name: "X".into(),
            flag: Some("doc".into()),
            error: ExpansionError::Undefined("Y".into()),
        };
        assert_eq!(failed.severity(), Severity::Error);
        assert_eq!(
            failed.to_string(),
            "Expansion of 'X[doc]' failed: undefined reference ${Y}"
        );
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tracing_sink_attaches_variable_and_flag_fields() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.report(Diagnostic::ExpansionFailed {
                name: "X".into(),
                flag: Some("doc".into()),
                error: ExpansionError::Undefined("Y".into()),
            });
        });

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("ERROR"), "{out}");
        assert!(out.contains("variable=\"X\""), "{out}");
        assert!(out.contains("flag=\"doc\""), "{out}");
    }

    #[test]
    fn flag_is_only_set_for_flag_failures() {
        let missing = Diagnostic::MissingRequestedName { name: "A".into() };
        assert_eq!(missing.flag(), None);
        let failed = Diagnostic::ExpansionFailed {
            name: "A".into(),
            flag: None,
            error: ExpansionError::Recursive("A".into()),
        };
        assert_eq!(failed.flag(), None);
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let mut sink = CollectingSink::default();
        sink.report(Diagnostic::MissingRequestedName { name: "B".into() });
        sink.report(Diagnostic::MissingRequestedName { name: "A".into() });
        assert_eq!(sink.names(), vec!["B", "A"]);
    }
}
