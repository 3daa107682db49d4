use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "showvars", version, about)]
pub struct Args {
    /// Variables or functions to show (default: everything)
    pub variables: Vec<String>,

    /// Path to the snapshot file (overrides SHOWVARS_SNAPSHOT and ./snapshot.toml)
    #[arg(short, long)]
    pub snapshot: Option<std::path::PathBuf>,

    /// Path to config.toml (overrides SHOWVARS_CONFIG and XDG default)
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Also show the functions the requested entries depend on
    #[arg(short, long, default_value_t = false)]
    pub dependencies: bool,

    /// Show variable flags as well
    #[arg(short, long, default_value_t = false)]
    pub flags: bool,

    /// Leave unresolved ${REF} references as-is instead of failing the entry
    #[arg(long, default_value_t = false)]
    pub lenient: bool,

    /// Print a snapshot report to stderr before the listing
    #[arg(long, value_enum, default_value_t = ReportMode::Off)]
    pub report: ReportMode,

    /// Write the report to a file instead of stderr
    #[arg(long)]
    pub report_out: Option<std::path::PathBuf>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Explicit verbosity wins over RUST_LOG.
    pub fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    Off,
    Summary,
    Full,
}
