//! episim command-line runner
//!
//! Runs one simulation (or a seed sweep) and prints a one-line summary.
//!
//! # Usage
//!
//! ```bash
//! cargo run --features cli --bin episim -- --steps 200 --grid-size 256 --output run.json
//! RUST_LOG=episim=debug cargo run --features cli --bin episim -- --config params.json --print-grid
//! ```

use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use episim::export::{write_grid_text, write_json};
use episim::{CellState, EpiResult, SeedSweep, Simulation, SimulationConfig, SweepConfig};

/// Coupled SIR / cellular automaton outbreak simulator
#[derive(Parser, Debug)]
#[command(name = "episim")]
#[command(about = "Run the coupled SIR / cellular automaton model and report the similarity dimension")]
struct Args {
    /// JSON configuration file (missing fields take defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of steps
    #[arg(short, long)]
    steps: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the grid size
    #[arg(short, long)]
    grid_size: Option<usize>,

    /// Write the run result as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run N consecutive seeds starting at the configured seed
    #[arg(long)]
    sweep: Option<usize>,

    /// Print every grid snapshot to stdout
    #[arg(long)]
    print_grid: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("episim=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!(error = %e, "episim failed");
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> EpiResult<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            SimulationConfig::from_json_file(path)?
        }
        None => SimulationConfig::default(),
    };
    if let Some(steps) = args.steps {
        config.n_steps = steps;
    }
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    if let Some(grid_size) = args.grid_size {
        config.grid_size = grid_size;
    }

    if let Some(count) = args.sweep {
        let first = config.random_seed;
        let report = SeedSweep::consecutive(config, first, count, SweepConfig::default()).run()?;
        let final_d = report.mean_dimension_series.last().map_or(0.0, |&(_, d)| d);
        println!(
            "sweep runs={} mean_final_recovered_cells={:.2} mean_final_dimension={final_d:.4}",
            report.runs.len(),
            report.mean_final_recovered_cells,
        );
        return Ok(());
    }

    let result = Simulation::new(config)?.run()?;

    if let Some(path) = &args.output {
        write_json(&result, path)?;
        info!(path = %path.display(), "wrote run result");
    }
    if args.print_grid {
        write_grid_text(&result, io::stdout().lock())?;
    }

    let (peak_t, peak_i) = result.peak_prevalence().unwrap_or((0.0, 0.0));
    let final_r = result.final_state().map_or(0.0, |s| s.r);
    let infected = result
        .final_grid()
        .map_or(0, |g| g.count(CellState::Infected));
    let final_d = result.dimensions.last().map_or(0.0, |d| d.dimension);
    println!(
        "run_id={} peak_i={peak_i:.4}@t={peak_t:.2} final_r={final_r:.4} infected_cells={infected} final_dimension={final_d:.4}",
        result.run_id,
    );
    Ok(())
}
