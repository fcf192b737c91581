//! Points-to analysis dump CLI
//!
//! # Usage
//!
//! ```bash
//! # Analyze a JSON program with the balanced preset, text output
//! cargo run --bin pta-dump -- program.json
//!
//! # Custom configuration, JSON output, solver logging
//! RUST_LOG=codegraph_pta=debug cargo run --bin pta-dump -- program.json --config pta.yaml --format json
//! ```

use clap::{Parser, ValueEnum};
use codegraph_pta::features::heap_graph::ThreadEscapeAnalysis;
use codegraph_pta::{AnalysisDump, CallGraphBuilder, Preset, Program, PtaConfig};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "pta-dump")]
#[command(about = "Context-sensitive points-to analysis and call graph dump", long_about = None)]
struct Cli {
    /// Program in JSON form
    input: PathBuf,

    /// YAML configuration file (overrides --preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration preset: fast, balanced or thorough
    #[arg(short, long, default_value = "balanced")]
    preset: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Also report objects escaping to other threads
    #[arg(long)]
    escape: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PtaConfig::from_yaml_file(path)?,
        None => PtaConfig::from_preset(cli.preset.parse::<Preset>()?),
    };
    let text = std::fs::read_to_string(&cli.input)?;
    let program = Program::from_json(&text)?;
    info!(input = %cli.input.display(), procedures = program.procedures.len(), "loaded program");

    let analysis = CallGraphBuilder::new(program, config).build()?;
    if !analysis.is_complete() {
        warn!(status = ?analysis.status(), "analysis did not reach a fixpoint");
    }

    let dump = AnalysisDump::from_analysis(&analysis);
    match cli.format {
        Format::Text => print!("{}", dump.to_text()),
        Format::Json => println!("{}", dump.to_json()?),
    }

    if cli.escape {
        let report = ThreadEscapeAnalysis::default().analyze(&analysis);
        for object in &report.objects {
            println!("escapes {}", analysis.instance_name(*object));
        }
    }
    Ok(())
}
