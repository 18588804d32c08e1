//! VRI CLI: instrument Verilator output with coverage
//!
//! ## Usage
//!
//! ```bash
//! vri instrument obj_dir               # Instrument in place
//! vri instrument obj_dir --seed 1      # Reproducible coverage ids
//! vri scan obj_dir --format json       # List watched fields
//! vri retype obj_dir                   # Counting storage types in headers
//! vri config                           # Show effective configuration
//! ```

use clap::Parser;
use std::process::ExitCode;
use vri::InstrumentConfig;
use vri_cli::{
    render_field_set, render_json, render_retype_report, render_run_report, Cli, CliConfig,
    CliResult, Commands, ConfigArgs, ConfigSource, InstrumentArgs, OutputFormat, RetypeArgs,
    ScanArgs, Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    console::set_colors_enabled(config.color.should_color());
    config.init_logging();

    match cli.command {
        Commands::Instrument(args) => run_instrument(&config, &args),
        Commands::Retype(args) => run_retype(&config, &args),
        Commands::Scan(args) => run_scan(&args),
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
}

/// Configuration file first, then flag overrides
fn load_config(source: &ConfigSource) -> CliResult<InstrumentConfig> {
    let mut config = match &source.config {
        Some(path) => InstrumentConfig::from_yaml_file(path)?,
        None => InstrumentConfig::new(),
    };
    if let Some(top) = &source.top {
        config = config.with_top(top);
    }
    if let Some(seed) = source.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;
    Ok(config)
}

fn run_instrument(cli: &CliConfig, args: &InstrumentArgs) -> CliResult<()> {
    let config = load_config(&args.source)?;
    let report = vri::run(&args.dir, &config)?;
    match args.format {
        OutputFormat::Json => println!("{}", render_json(&report)?),
        OutputFormat::Text if !cli.verbosity.is_quiet() => print!("{}", render_run_report(&report)),
        OutputFormat::Text => {}
    }
    Ok(())
}

fn run_retype(cli: &CliConfig, args: &RetypeArgs) -> CliResult<()> {
    let config = load_config(&args.source)?;
    let report = vri::retype(&args.dir, &config)?;
    match args.format {
        OutputFormat::Json => println!("{}", render_json(&report)?),
        OutputFormat::Text if !cli.verbosity.is_quiet() => {
            print!("{}", render_retype_report(&report, &args.dir));
        }
        OutputFormat::Text => {}
    }
    Ok(())
}

fn run_scan(args: &ScanArgs) -> CliResult<()> {
    let config = load_config(&args.source)?;
    let fields = vri::scan(&args.dir, &config)?;
    match args.format {
        OutputFormat::Json => println!("{}", render_json(&fields)?),
        OutputFormat::Text => print!("{}", render_field_set(&fields)),
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = load_config(&args.source)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}
