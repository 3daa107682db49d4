use crate::{
    config::ShowSettings,
    deps::DepMap,
    diag::DiagnosticSink,
    emit::Emitter,
    sort::CategorySorter,
    store::ConfigStore,
};

/// What the caller asked to see.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Empty means "everything".
    pub names: Vec<String>,
    pub follow_deps: bool,
    pub show_flags: bool,
}

/// Final display order for `request`.
pub fn plan<S: ConfigStore + ?Sized>(
    store: &S,
    deps: &mut DepMap,
    request: &Request,
    settings: &ShowSettings,
    sink: &mut dyn DiagnosticSink,
) -> Vec<String> {
    let sorter = CategorySorter::new(store, &settings.internal_prefix);
    if request.names.is_empty() {
        sorter.all()
    } else {
        sorter.requested(&request.names, request.follow_deps, deps, sink)
    }
}

/// Render the full listing. Every block (and flag line) ends with a newline.
pub fn show<S: ConfigStore + ?Sized>(
    store: &S,
    deps: &mut DepMap,
    request: &Request,
    settings: &ShowSettings,
    sink: &mut dyn DiagnosticSink,
) -> String {
    let order = plan(store, deps, request, settings, sink);
    tracing::debug!(entries = order.len(), "rendering listing");

    let em = Emitter::new(store);
    let mut out = String::new();

    for name in &order {
        if let Some(text) = em.entry(name, sink) {
            out.push_str(&text);
            out.push('\n');
        }
        if request.show_flags {
            for line in em.flags(name, sink) {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diag::{CollectingSink, Diagnostic},
        snapshot::Snapshot,
        store::Entry,
    };

    fn run(store: &Snapshot, request: &Request) -> (String, CollectingSink) {
        let mut deps = store.static_dependency_map();
        let mut sink = CollectingSink::default();
        let out = show(store, &mut deps, request, &ShowSettings::default(), &mut sink);
        (out, sink)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn position(out: &str, needle: &str) -> usize {
        out.find(needle).unwrap_or_else(|| panic!("{needle:?} not in output:\n{out}"))
    }

    #[test]
    fn unexported_before_exported_in_full_listing() {
        let store = Snapshot::from_entries([
            Entry::new("FOO", "bar").flag("export", "1"),
            Entry::new("BAZ", "qux"),
        ]);
        let (out, _) = run(&store, &Request::default());
        assert_eq!(out, "BAZ=\"qux\"\nexport FOO=\"bar\"\n");
    }

    #[test]
    fn requested_function_pulls_in_only_function_deps() {
        let store = Snapshot::from_entries([
            Entry::new("do_build", "\tcd ${WORKDIR}\n").flag("func", "1"),
            Entry::new("WORKDIR", "/tmp/x"),
        ]);
        let request = Request {
            names: names(&["do_build"]),
            follow_deps: true,
            show_flags: false,
        };

        let (out, sink) = run(&store, &request);
        assert_eq!(out, "do_build () {\n\tcd /tmp/x\n}\n\n");
        assert!(sink.diagnostics.is_empty());
    }

    #[test]
    fn quoted_function_name_is_not_followed() {
        let store = Snapshot::from_entries([
            Entry::new("do_x", "\techo \"(cleanup)\"\n").flag("func", "1"),
            Entry::new("cleanup", "\trm -rf /\n").flag("func", "1"),
        ]);
        let request = Request {
            names: names(&["do_x"]),
            follow_deps: true,
            show_flags: false,
        };

        let (out, _) = run(&store, &request);
        assert_eq!(out, "do_x () {\n\techo \"(cleanup)\"\n}\n\n");
    }

    #[test]
    fn mutual_recursion_emits_each_function_once() {
        let store = Snapshot::from_entries([
            Entry::new("a", "\tb\n").flag("func", "1"),
            Entry::new("b", "\ta\n").flag("func", "1"),
        ]);
        let request = Request {
            names: names(&["a"]),
            follow_deps: true,
            show_flags: false,
        };

        let (out, _) = run(&store, &request);
        assert_eq!(out, "b () {\n\ta\n}\n\na () {\n\tb\n}\n\n");
    }

    #[test]
    fn missing_name_warns_and_renders_nothing() {
        let store = Snapshot::from_entries([Entry::new("FOO", "bar")]);
        let request = Request {
            names: names(&["MISSING_VAR"]),
            ..Request::default()
        };

        let (out, sink) = run(&store, &request);
        assert!(out.is_empty());
        assert_eq!(
            sink.diagnostics,
            vec![Diagnostic::MissingRequestedName {
                name: "MISSING_VAR".into()
            }]
        );
    }

    #[test]
    fn flags_follow_their_entry() {
        let store = Snapshot::from_entries([
            Entry::new("A", "1").flag("doc", "first"),
            Entry::new("B", "2").flag("doc", "second"),
        ]);
        let request = Request {
            names: names(&["B", "A"]),
            follow_deps: false,
            show_flags: true,
        };

        let (out, _) = run(&store, &request);
        assert_eq!(out, "A=\"1\"\nA[doc]=\"first\"\nB=\"2\"\nB[doc]=\"second\"\n");
    }

    #[test]
    fn expansion_failure_does_not_stop_listing() {
        let store = Snapshot::from_entries([
            Entry::new("BAD", "${NOPE}"),
            Entry::new("GOOD", "ok"),
        ]);
        let (out, sink) = run(&store, &Request::default());
        assert_eq!(out, "# BAD=\"${NOPE}\"\nGOOD=\"ok\"\n");
        assert_eq!(sink.names(), vec!["BAD"]);
    }

    #[test]
    fn deep_chains_keep_dependency_order_and_categories() {
        let store = Snapshot::from_entries([
            Entry::new("do_all", "\tstep_b\n").flag("func", "1"),
            Entry::new("step_b", "\tstep_a\n").flag("func", "1"),
            Entry::new("step_a", "\ttrue\n").flag("func", "1"),
            Entry::new("py_entry", "    step_b()\n").flag("func", "1").flag("python", "1"),
            Entry::new("PLAIN", "v").flag("export", "1"),
        ]);
        let request = Request {
            names: names(&["py_entry", "do_all", "PLAIN"]),
            follow_deps: true,
            show_flags: false,
        };

        let (out, _) = run(&store, &request);
        let plain = position(&out, "export PLAIN=");
        let a = position(&out, "step_a () {");
        let b = position(&out, "step_b () {");
        let all = position(&out, "do_all () {");
        let py = position(&out, "python py_entry () {");

        assert!(plain < a && a < b && b < all && all < py);
        assert_eq!(out.matches("step_b () {").count(), 1);
    }
}
