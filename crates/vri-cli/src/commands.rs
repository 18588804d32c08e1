//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// VRI: instrument Verilator output with branch coverage and toggle counting
#[derive(Parser, Debug)]
#[command(name = "vri")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Instrument a Verilator output directory in place
    Instrument(InstrumentArgs),

    /// Give watched header fields counting storage types
    Retype(RetypeArgs),

    /// List the watched fields of every module without modifying anything
    Scan(ScanArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Options shared by commands that load an instrumentation configuration
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigSource {
    /// YAML configuration file
    #[arg(short, long, env = "VRI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Top module name (build list is `<top>_classes.mk`)
    #[arg(long)]
    pub top: Option<String>,

    /// Seed for coverage point identifiers (random when absent)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the instrument command
#[derive(Parser, Debug)]
pub struct InstrumentArgs {
    /// Verilator output directory
    pub dir: PathBuf,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub source: ConfigSource,

    /// Output format for the run report
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the retype command
#[derive(Parser, Debug)]
pub struct RetypeArgs {
    /// Verilator output directory
    pub dir: PathBuf,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub source: ConfigSource,

    /// Output format for the report
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the scan command
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Verilator output directory
    pub dir: PathBuf,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub source: ConfigSource,

    /// Output format for the field list
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub source: ConfigSource,
}

/// Report output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
