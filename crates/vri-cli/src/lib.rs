//! VRI CLI library
//!
//! Command-line interface for instrumenting Verilator output with VRI.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ConfigSource, InstrumentArgs, OutputFormat, RetypeArgs,
    ScanArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult, EXIT_ALREADY_INSTRUMENTED};
pub use output::{render_field_set, render_json, render_retype_report, render_run_report};
