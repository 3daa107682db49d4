use std::{collections::BTreeSet, fmt};

use crate::{
    deps::{DepMap, DependencyResolver},
    diag::{Diagnostic, DiagnosticSink},
    store::ConfigStore,
};

/// Display priority: unexported vars, exported vars, shell funcs, embedded funcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Unexported = 0,
    Exported = 1,
    ShellFunction = 2,
    EmbeddedFunction = 3,
}

impl Rank {
    pub const ALL: [Rank; 4] = [
        Rank::Unexported,
        Rank::Exported,
        Rank::ShellFunction,
        Rank::EmbeddedFunction,
    ];

    pub fn of<S: ConfigStore + ?Sized>(store: &S, name: &str) -> Self {
        match (store.is_function(name), store.is_python(name), store.is_exported(name)) {
            (true, true, _) => Rank::EmbeddedFunction,
            (true, false, _) => Rank::ShellFunction,
            (false, _, true) => Rank::Exported,
            (false, _, false) => Rank::Unexported,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rank::Unexported => "variable",
            Rank::Exported => "exported",
            Rank::ShellFunction => "shell-function",
            Rank::EmbeddedFunction => "python-function",
        };
        f.write_str(s)
    }
}

pub struct CategorySorter<'a, S: ConfigStore + ?Sized> {
    store: &'a S,
    internal_prefix: &'a str,
}

impl<'a, S: ConfigStore + ?Sized> CategorySorter<'a, S> {
    pub fn new(store: &'a S, internal_prefix: &'a str) -> Self {
        Self {
            store,
            internal_prefix,
        }
    }

    /// Every non-internal name, alphabetical within each rank.
    pub fn all(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .store
            .all_names()
            .into_iter()
            .filter(|n| !self.is_internal(n))
            .collect();
        sort_case_insensitive(&mut names);
        self.by_rank(names)
    }

    /// The requested names (optionally with their function closure), ordered
    /// by rank, then alphabetically, with callees ahead of their callers.
    pub fn requested(
        &self,
        names: &[String],
        follow_deps: bool,
        deps: &mut DepMap,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<String> {
        let mut present = Vec::with_capacity(names.len());
        let mut seen = BTreeSet::new();

        for name in names {
            if !self.store.contains(name) {
                sink.report(Diagnostic::MissingRequestedName { name: name.clone() });
                continue;
            }
            if seen.insert(name.as_str()) {
                present.push(name.clone());
            }
        }

        sort_case_insensitive(&mut present);

        let ordered = if follow_deps {
            DependencyResolver::new(self.store, deps).resolve(&present)
        } else {
            present
        };

        self.by_rank(ordered)
    }

    // Composite key (rank, position): keeps the incoming alphabetical and
    // dependency order inside each rank.
    fn by_rank(&self, names: Vec<String>) -> Vec<String> {
        let mut keyed: Vec<(Rank, usize, String)> = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| (Rank::of(self.store, &n), i, n))
            .collect();
        keyed.sort_by_key(|(rank, i, _)| (*rank, *i));
        keyed.into_iter().map(|(_, _, n)| n).collect()
    }

    fn is_internal(&self, name: &str) -> bool {
        !self.internal_prefix.is_empty() && name.starts_with(self.internal_prefix)
    }
}

fn sort_case_insensitive(names: &mut [String]) {
    names.sort_by_key(|n| n.to_lowercase());
}
