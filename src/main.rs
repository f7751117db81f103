//! SOMA - CLI Entry Point
//!
//! Drives brains in the kinematic sandbox and inspects weight snapshots.

use clap::{Parser, Subcommand};
use soma_brain::checkpoint::WeightSnapshot;
use soma_brain::{benchmark, BrainConfig, Sandbox};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "soma")]
#[command(version)]
#[command(about = "Policy-gradient brains for soft-body organisms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a population of brains in the sandbox
    Demo {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Number of bodies
        #[arg(short, long, default_value = "50")]
        population: usize,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Save the best brain's weights here when done
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Population size
        #[arg(short, long, default_value = "200")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Describe a weight snapshot
    Inspect {
        /// Snapshot file
        snapshot: PathBuf,
    },
}

fn load_config(path: &PathBuf) -> Result<BrainConfig, Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Loading config from: {:?}", path);
        BrainConfig::from_file(path)
    } else {
        println!("Using default configuration");
        Ok(BrainConfig::default())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Demo reads its log level from the config file
    let demo_config = match &cli.command {
        Commands::Demo { config, .. } => Some(load_config(config)?),
        _ => None,
    };
    let log_level = demo_config
        .as_ref()
        .map_or("info", |c| c.logging.log_level.as_str())
        .to_string();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Demo {
            steps,
            population,
            seed,
            snapshot,
            quiet,
            ..
        } => {
            let config = demo_config.unwrap_or_default();
            run_demo(config, steps, population, seed, snapshot, quiet)
        }

        Commands::Benchmark { steps, population } => run_benchmark(steps, population),

        Commands::Init { output } => generate_config(output),

        Commands::Inspect { snapshot } => inspect_snapshot(snapshot),
    }
}

fn run_demo(
    config: BrainConfig,
    steps: u64,
    population: usize,
    seed: Option<u64>,
    snapshot: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats_interval = config.logging.stats_interval;

    let mut sandbox = match seed {
        Some(s) => {
            println!("Using seed: {}", s);
            Sandbox::new_with_seed(config, population, s)
        }
        None => Sandbox::new(config, population),
    };

    println!("Starting demo");
    println!("  Bodies: {}", population);
    println!("  Steps: {}", steps);
    println!();

    let start = Instant::now();
    for _ in 0..steps {
        sandbox.step();
        if !quiet && sandbox.time % stats_interval == 0 {
            println!("{}", sandbox.stats.summary());
        }
    }
    let elapsed = start.elapsed();

    println!();
    println!("=== Demo Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Speed: {:.1} steps/s", steps as f64 / elapsed.as_secs_f64());
    println!("Seed: {}", sandbox.seed());
    println!("{}", sandbox.stats.summary());

    if let Some(path) = snapshot {
        let best = sandbox
            .best_brain()
            .and_then(|i| WeightSnapshot::capture(&sandbox.bodies[i], &sandbox.brains[i]));
        match best {
            Some(weights) => {
                weights.save(&path)?;
                println!("Best brain ({:?}) saved to: {:?}", weights.reward_strategy, path);
            }
            None => eprintln!("No trained brain to save"),
        }
    }

    Ok(())
}

fn run_benchmark(steps: u64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SOMA Benchmark ===");
    println!("Steps: {}", steps);
    println!("Population: {}", population);
    println!();

    let result = benchmark(steps, population);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = BrainConfig::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn inspect_snapshot(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Snapshot ===");
    println!("File: {:?}", path);
    println!();

    let snapshot = WeightSnapshot::load(&path)?;
    let network = &snapshot.network;

    println!("Body: {}", snapshot.body_id);
    println!("Topology: {}", snapshot.topology);
    println!("Parameters: {}", network.parameter_count());
    println!("Reward strategy: {:?}", snapshot.reward_strategy);
    println!("Training cycles: {}", snapshot.training_cycles);
    println!("Last mean return: {:.4}", snapshot.last_avg_reward);
    println!("Weights finite: {}", network.is_valid());

    let max_abs = network
        .hidden
        .weights
        .iter()
        .chain(network.output.weights.iter())
        .fold(0.0f64, |m, w| m.max(w.abs()));
    println!("Largest |weight|: {:.4}", max_abs);
    println!("Snapshot size: {} bytes", snapshot.size_bytes());

    Ok(())
}
