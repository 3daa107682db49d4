use anyhow::{Context as _, Result};
use clap::Parser;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use showvars::{cli::Args, report, ConfigStore as _};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let ctx = showvars::ContextEnv::new()?;

    let cfg = match ctx.locate_config(args.config.as_ref())? {
        Some(path) => showvars::Config::load_from_path(&path)?,
        None => showvars::Config::default(),
    };

    let snapshot_path = ctx.locate_snapshot(args.snapshot.as_ref())?;
    let mut snapshot = showvars::Snapshot::load_from_path(&snapshot_path)?;
    snapshot.set_strict(cfg.show.strict_expansion && !args.lenient);
    tracing::debug!(
        path = %snapshot_path.display(),
        entries = snapshot.all_names().len(),
        "loaded snapshot"
    );

    let mut deps = snapshot.static_dependency_map();

    let report_text = report::build_report(&snapshot, &deps, &cfg.show, args.report);
    if !report_text.is_empty() {
        match args.report_out.as_ref() {
            Some(path) => std::fs::write(path, &report_text)
                .with_context(|| format!("failed to write report to {}", path.display()))?,
            None => eprint!("{report_text}"),
        }
    }

    let request = showvars::Request {
        names: args.variables.clone(),
        follow_deps: args.dependencies,
        show_flags: args.flags,
    };

    let mut sink = showvars::TracingSink;
    let out = showvars::show(&snapshot, &mut deps, &request, &cfg.show, &mut sink);

    print!("{out}");
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = match args.log_level() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}
