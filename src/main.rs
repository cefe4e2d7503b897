//! feeder-topo - Distribution Feeder Topology Analyzer
//!
//! Reads a case file describing a solved feeder and prints its topology:
//! distances, voltage bases, interruption sets and secondary networks.
//!
//! # Usage
//!
//! ```bash
//! feeder-topo feeder.case
//! feeder-topo feeder.case --json --device recloser.r1 -v
//! ```

use std::path::PathBuf;

use clap::Parser;
use feeder_topology::{
    error::Result, AnalysisConfig, CaseFile, LengthUnit, TopologyAnalysis, TopologyReport,
};

/// Distribution feeder topology analyzer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the case file
    #[arg(value_name = "CASE_FILE")]
    case_file: PathBuf,

    /// Length unit assumed for lines declared without one
    #[arg(long, default_value_t = LengthUnit::Kilometer)]
    default_unit: LengthUnit,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Only report the interruption set of this protection device (repeatable)
    #[arg(long = "device", value_name = "ID")]
    devices: Vec<String>,

    /// Only report the secondary network of this transformer (repeatable)
    #[arg(long = "transformer", value_name = "ID")]
    transformers: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Parse the case file
    let case = CaseFile::from_path(&args.case_file)?;

    // Run the analysis
    let config = AnalysisConfig::new().with_default_length_unit(args.default_unit);
    let analysis = TopologyAnalysis::run(&case, config)?;

    // Report
    let mut report = TopologyReport::from_analysis(&analysis);
    report.retain_devices(&args.devices);
    report.retain_transformers(&args.transformers);

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_summary());
    }

    Ok(())
}
