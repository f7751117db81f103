//! Neural controller for organism brains.
//!
//! Implements a two-layer Gaussian policy with:
//! - Phenotype-driven topology sizing
//! - Labeled sensory encoding
//! - Stochastic action sampling
//! - Online REINFORCE training

pub mod actions;
mod network;
pub mod reinforce;
pub mod reward;
pub mod sensors;
pub mod topology;

pub use actions::{ActionChannel, ActionDetail, ActionLabel};
pub use network::{ForwardPass, Layer, PolicyNetwork};
pub use reinforce::{Experience, ExperienceBuffer, ReinforceTrainer, TrainOutcome};
pub use reward::{RewardStrategy, TickFacts};
pub use sensors::{SensorLabel, SensorReading, SensorSnapshot};
pub use topology::{ActuatorKind, Phenotype, Topology};
