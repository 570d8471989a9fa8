//! Cycler - Battery Cycling Protocol Compiler
//!
//! Compiles a protocol file into the step list consumed by a cell simulator.
//!
//! # Usage
//!
//! ```bash
//! cycler protocol.txt
//! cycler protocol.txt --period "10 seconds" --json > steps.json
//! RUST_LOG=cycler_core=trace cycler protocol.txt
//! ```

use std::path::PathBuf;

use clap::Parser;
use cycler_core::{error::Result, protocol, Experiment};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Battery cycling protocol compiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the protocol file
    #[arg(value_name = "PROTOCOL_FILE")]
    protocol_file: PathBuf,

    /// Global checkpoint period, e.g. "20 seconds" (overrides `.period`)
    #[arg(short, long)]
    period: Option<String>,

    /// Print the compiled experiment as JSON
    #[arg(long)]
    json: bool,

    /// Log compilation details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse the protocol and load its drive cycles
    let (protocol, drive_cycles) = protocol::load_protocol_file(&args.protocol_file)?;

    let mut config = protocol.config(drive_cycles);
    if let Some(period) = args.period {
        config = config.with_period(period);
    }

    // Compile
    let experiment = Experiment::with_config(protocol.instructions, config)?;
    info!(
        file = %args.protocol_file.display(),
        steps = experiment.steps().len(),
        "compiled protocol"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&experiment)?);
    } else {
        print_steps(&experiment);
    }

    Ok(())
}

fn print_steps(experiment: &Experiment) {
    println!("{}", experiment.repr());
    println!("period: {} s", experiment.period());

    let total = experiment.cycle_lengths().len();
    let mut index = 0;
    for (cycle, steps) in experiment.cycles().enumerate() {
        println!("cycle {}/{}", cycle + 1, total);
        for step in steps {
            match step.event() {
                Some(event) => println!("  {:>3}: {} until {} {}", index, step, event.value, event.unit),
                None => println!("  {:>3}: {}", index, step),
            }
            index += 1;
        }
    }
}
