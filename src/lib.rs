pub mod cli;
pub mod config;
pub mod context;
pub mod deps;
pub mod diag;
pub mod emit;
pub mod pyscan;
pub mod report;
pub mod resolve;
pub mod show;
pub mod snapshot;
pub mod sort;
pub mod store;

// Convenience re-exports (optional, but nice)
pub use config::{Config, ShowSettings};
pub use context::ContextEnv;
pub use deps::{DepMap, DependencyExtractor, DependencyResolver};
pub use diag::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use emit::Emitter;
pub use resolve::ExpansionError;
pub use show::{show, Request};
pub use snapshot::Snapshot;
pub use sort::{CategorySorter, Rank};
pub use store::{ConfigStore, Entry, Flags, Value};
