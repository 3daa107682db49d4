use std::collections::BTreeMap;

use crate::{cli, config::ShowSettings, deps::DepMap, snapshot::Snapshot, sort::Rank};

pub fn build_report(snap: &Snapshot, deps: &DepMap, settings: &ShowSettings, mode: cli::ReportMode) -> String {
    match mode {
        cli::ReportMode::Off => String::new(),
        cli::ReportMode::Summary => summary(snap, deps, settings),
        cli::ReportMode::Full => {
            let mut out = summary(snap, deps, settings);
            out.push_str(&entries(snap, deps));
            out
        }
    }
}

fn summary(snap: &Snapshot, deps: &DepMap, settings: &ShowSettings) -> String {
    let mut per_rank: BTreeMap<Rank, usize> = Rank::ALL.iter().map(|r| (*r, 0)).collect();
    let mut internal = 0;
    let mut declared = 0;

    for e in snap.entries() {
        *per_rank.entry(Rank::of(snap, &e.name)).or_default() += 1;
        if !settings.internal_prefix.is_empty() && e.name.starts_with(&settings.internal_prefix) {
            internal += 1;
        }
        if snap.has_declared_deps(&e.name) {
            declared += 1;
        }
    }

    let mut out = String::new();

    out.push_str("showvars report (summary)\n");
    out.push_str("=========================\n");
    out.push_str(&format!("entries: {}\n", snap.entries().count()));
    for (rank, count) in &per_rank {
        out.push_str(&format!("  {rank}: {count}\n"));
    }
    out.push_str(&format!(
        "internal (prefix {:?}): {}\n",
        settings.internal_prefix, internal
    ));
    out.push_str(&format!("declared deps: {declared}\n"));
    out.push_str(&format!("dependency map entries: {}\n", deps.len()));
    out.push_str(&format!("materialized methods: {}\n", snap.materialized_count()));

    out
}

fn entries(snap: &Snapshot, deps: &DepMap) -> String {
    let mut out = String::from("\nentries\n");
    for e in snap.entries() {
        let list = deps
            .get(&e.name)
            .map(|d| d.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        out.push_str(&format!("  {} {} deps=[{}]\n", Rank::of(snap, &e.name), e.name, list));
    }
    out
}
