//! Command-line runner for jump history analyses.
//!
//! Reads a TOML configuration (see [jumphistory::config]) and writes the
//! resulting table to the configured output or standard output. Progress
//! and warnings go to standard error.

use anyhow::{Context, Result};
use clap::Parser;
use jumphistory::analysis::run_analysis;
use jumphistory::config::AnalysisConfig;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Reconstruct and summarise Markov jump histories of posterior tree samples
#[derive(Parser, Debug)]
#[command(name = "jumphistory")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the analysis configuration (TOML)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Tree file, overriding `input` of the configuration
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output table, overriding `output` of the configuration
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let mut config = AnalysisConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration {}", args.config.display()))?;
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(output) = args.output {
        config.output = Some(output);
    }
    config.validate().context("Invalid configuration")?;

    let mut analysis = config.build_analysis().context("Failed to set up analysis")?;
    let mut stream = config
        .open_stream()
        .with_context(|| format!("Failed to read trees from {}", config.input.display()))?;

    let mut sink: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let num_trees = run_analysis(&mut stream, analysis.as_mut(), &mut sink).context("Analysis aborted")?;

    log::info!("Done: {num_trees} trees analysed");
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .target(env_logger::Target::Stderr)
        .init();
}
