use std::collections::{btree_set, BTreeMap, BTreeSet};

use crate::{pyscan, store::ConfigStore};

/// name -> statically referenced names
pub type DepMap = BTreeMap<String, BTreeSet<String>>;

/// Looks up static dependencies, augmenting embedded-language entries with
/// the calls found in their body text. Augmented sets are written back into
/// the map so later lookups (and later requests sharing the map) reuse them.
pub struct DependencyExtractor<'a, S: ConfigStore + ?Sized> {
    store: &'a S,
    deps: &'a mut DepMap,
    scanned: BTreeSet<String>,
}

impl<'a, S: ConfigStore + ?Sized> DependencyExtractor<'a, S> {
    pub fn new(store: &'a S, deps: &'a mut DepMap) -> Self {
        Self {
            store,
            deps,
            scanned: BTreeSet::new(),
        }
    }

    pub fn static_deps(&mut self, name: &str) -> BTreeSet<String> {
        let mut found = self.deps.get(name).cloned().unwrap_or_default();

        if self.store.is_python(name) && !self.scanned.contains(name) {
            self.scanned.insert(name.to_string());

            if let Some(body) = self.store.raw(name).and_then(|v| v.as_str()) {
                let execs = pyscan::scan(body).execs;
                tracing::debug!(variable = name, execs = execs.len(), "scanned embedded function body");
                found.extend(execs);
            }

            self.deps.insert(name.to_string(), found.clone());
        }

        found
    }
}

struct Frame {
    name: String,
    pending: btree_set::IntoIter<String>,
}

impl Frame {
    fn new(name: String, deps: BTreeSet<String>) -> Self {
        Self {
            name,
            pending: deps.into_iter(),
        }
    }
}

/// Callee-before-caller ordering of a request, deduplicated across the
/// whole request.
///
/// Dependencies are walked depth-first with an explicit stack. A name is
/// marked visited the moment it is discovered, before descending into it, so
/// cycles are cut at the edge that closes them. Only function entries are
/// descended into and yielded; plain variables are visited but never pulled
/// in transitively.
pub struct DependencyResolver<'a, S: ConfigStore + ?Sized> {
    store: &'a S,
    extractor: DependencyExtractor<'a, S>,
    visited: BTreeSet<String>,
    emitted: BTreeSet<String>,
}

impl<'a, S: ConfigStore + ?Sized> DependencyResolver<'a, S> {
    pub fn new(store: &'a S, deps: &'a mut DepMap) -> Self {
        Self {
            store,
            extractor: DependencyExtractor::new(store, deps),
            visited: BTreeSet::new(),
            emitted: BTreeSet::new(),
        }
    }

    pub fn resolve<I, T>(mut self, requested: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut ordered = Vec::new();

        for name in requested {
            let name = name.as_ref();
            if self.emitted.contains(name) {
                continue;
            }
            self.visited.insert(name.to_string());

            for dep in self.function_deps(name) {
                self.emitted.insert(dep.clone());
                ordered.push(dep);
            }

            self.emitted.insert(name.to_string());
            ordered.push(name.to_string());
        }

        ordered
    }

    /// Transitive function dependencies of `root` in post-order, `root` excluded.
    fn function_deps(&mut self, root: &str) -> Vec<String> {
        let mut out = Vec::new();
        let root_deps = self.extractor.static_deps(root);
        let mut stack = vec![Frame::new(root.to_string(), root_deps)];

        while let Some(frame) = stack.last_mut() {
            match frame.pending.next() {
                Some(dep) => {
                    if !self.visited.insert(dep.clone()) {
                        continue;
                    }
                    if self.store.is_function(&dep) {
                        let deps = self.extractor.static_deps(&dep);
                        stack.push(Frame::new(dep, deps));
                    }
                }
                None => {
                    if let Some(done) = stack.pop() {
                        if !stack.is_empty() {
                            out.push(done.name);
                        }
                    }
                }
            }
        }

        out
    }
}
