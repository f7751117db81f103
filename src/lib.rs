//! # SOMA BRAIN
//!
//! Per-organism policy-gradient controllers for soft-body artificial life.
//!
//! ## Features
//!
//! - **Phenotype-sized**: network inputs and outputs follow the body's nodes
//! - **Stochastic**: Gaussian actions with learned means and spreads
//! - **Online**: REINFORCE updates from a small rolling experience buffer
//! - **Heritable**: reward strategy and hidden size live on the body
//! - **Configurable**: YAML configuration files
//!
//! ## Quick Start
//!
//! ```rust
//! use soma_brain::body::{Body, Node, NodeKind, Vec2};
//! use soma_brain::brain::{Resting, TickContext};
//! use soma_brain::{Brain, BrainConfig, Environment};
//! use rand::SeedableRng;
//!
//! let config = BrainConfig::default();
//! let env = Environment::empty(100.0, 100.0);
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
//!
//! let mut body = Body::new(0);
//! let core = body.add_node(Node::new(NodeKind::Neuron, Vec2::new(50.0, 50.0)));
//! body.nodes[core].is_brain = true;
//! body.add_node(Node::new(NodeKind::Swimmer, Vec2::new(52.0, 50.0)));
//!
//! let mut brain = Brain::new(&config);
//! for _ in 0..20 {
//!     let ctx = TickContext { env: &env, config: &config };
//!     brain.process(&mut body, ctx, &mut rng, &mut Resting);
//! }
//! println!("{}", brain.diagnostics().summary());
//! ```
//!
//! ## Snapshots
//!
//! ```rust,no_run
//! use soma_brain::checkpoint::WeightSnapshot;
//! # use soma_brain::{Brain, BrainConfig, body::Body};
//! # let body = Body::new(0);
//! # let brain = Brain::new(&BrainConfig::default());
//!
//! if let Some(snapshot) = WeightSnapshot::capture(&body, &brain) {
//!     snapshot.save("brain.bin").unwrap();
//! }
//! let loaded = WeightSnapshot::load("brain.bin").unwrap();
//! ```

pub mod body;
pub mod brain;
pub mod checkpoint;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod neural;
pub mod sandbox;

// Re-export main types
pub use body::Body;
pub use brain::Brain;
pub use config::BrainConfig;
pub use environment::Environment;
pub use sandbox::Sandbox;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(steps: u64, population: usize) -> BenchmarkResult {
    use std::time::Instant;

    let mut sandbox = Sandbox::new_with_seed(BrainConfig::default(), population, 42);

    let start = Instant::now();
    sandbox.run(steps);
    let elapsed = start.elapsed();

    BenchmarkResult {
        steps,
        population,
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64(),
        training_cycles: sandbox.stats.training_cycles,
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub population: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
    pub training_cycles: u64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Population: {}", self.population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        writeln!(f, "Training cycles: {}", self.training_cycles)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(20, 10);

        assert_eq!(result.steps, 20);
        assert_eq!(result.population, 10);
        assert!(result.steps_per_second > 0.0);
        assert!(result.to_string().contains("Training cycles"));
    }
}
