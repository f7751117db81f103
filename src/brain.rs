//! Per-organism brain: state and the per-tick decide-and-learn pipeline.

use crate::body::Body;
use crate::config::{BrainConfig, LearningConfig};
use crate::diagnostics::BrainDiagnostics;
use crate::environment::Environment;
use crate::neural::actions;
use crate::neural::reinforce::{Experience, ExperienceBuffer, ReinforceTrainer, TrainOutcome};
use crate::neural::reward::{self, TickFacts};
use crate::neural::sensors::{self, SensorSnapshot};
use crate::neural::topology::{self, Phenotype, Topology};
use crate::neural::{ActionDetail, PolicyNetwork};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Read-only inputs shared by every brain during one simulation tick
#[derive(Clone, Copy, Debug)]
pub struct TickContext<'a> {
    pub env: &'a Environment,
    pub config: &'a BrainConfig,
}

/// Behavior used when the brain cannot drive the body this tick
pub trait FallbackBehavior {
    fn fallback(&mut self, body: &mut Body);
}

/// Fallback that relaxes every actuator
#[derive(Debug, Clone, Copy, Default)]
pub struct Resting;

impl FallbackBehavior for Resting {
    fn fallback(&mut self, body: &mut Body) {
        for node in &mut body.nodes {
            node.exertion = 0.0;
            node.force = crate::body::Vec2::ZERO;
            node.jet_magnitude = 0.0;
            node.is_grabbing = false;
        }
    }
}

/// Why the network was bypassed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoBrainNode,
    InvalidWeights,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Acted {
        actions: usize,
        reward: f64,
        trained: Option<TrainOutcome>,
    },
    Fallback(FallbackReason),
}

/// Learning phase of the brain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningPhase {
    Accumulating,
    Training,
}

/// Everything a brain remembers between ticks
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrainState {
    pub topology: Option<Topology>,
    pub network: Option<PolicyNetwork>,
    pub buffer: ExperienceBuffer,
    pub trainer: ReinforceTrainer,
    pub frames_since_train: u32,
    pub previous_energy: Option<f64>,
    pub previous_energy_delta: f64,
    pub last_avg_reward: f64,
    pub training_cycles: u64,

    // Last tick, for inspection
    pub last_inputs: SensorSnapshot,
    pub last_actions: Vec<ActionDetail>,
}

impl BrainState {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            topology: None,
            network: None,
            buffer: ExperienceBuffer::new(config.buffer_capacity),
            trainer: ReinforceTrainer::from_config(config),
            frames_since_train: 0,
            previous_energy: None,
            previous_energy_delta: 0.0,
            last_avg_reward: 0.0,
            training_cycles: 0,
            last_inputs: SensorSnapshot::default(),
            last_actions: Vec::new(),
        }
    }
}

/// The neural controller owned by one organism
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Brain {
    pub state: BrainState,
}

impl Brain {
    pub fn new(config: &BrainConfig) -> Self {
        Self {
            state: BrainState::new(&config.learning),
        }
    }

    /// Current network dimensions, if a network exists
    #[inline]
    pub fn topology(&self) -> Option<Topology> {
        self.state.topology
    }

    #[inline]
    pub fn network(&self) -> Option<&PolicyNetwork> {
        self.state.network.as_ref()
    }

    /// Replace the network, e.g. from a weight snapshot.
    /// Buffered experiences were produced by other weights and are dropped.
    pub fn install_network(&mut self, network: PolicyNetwork) {
        self.state.topology = Some(network.topology());
        self.state.network = Some(network);
        self.state.buffer.clear();
    }

    /// Phase of the training check at the end of the next `process()`.
    ///
    /// That tick pushes one more experience when the body still has the
    /// actuators it acted with last tick.
    pub fn phase(&self, config: &LearningConfig) -> LearningPhase {
        let buffer = &self.state.buffer;
        let will_push = !self.state.last_actions.is_empty();
        let will_be_full = buffer.is_full() || (will_push && buffer.len() + 1 >= buffer.capacity());
        if self.state.frames_since_train + 1 >= config.train_interval && will_be_full {
            LearningPhase::Training
        } else {
            LearningPhase::Accumulating
        }
    }

    /// Make the network's shapes match the body's current phenotype.
    /// Any reallocation invalidates the experience buffer.
    pub fn ensure_topology<R: Rng + ?Sized>(
        &mut self,
        body: &mut Body,
        config: &BrainConfig,
        rng: &mut R,
    ) -> Topology {
        // A body without the gene keeps the size of the network it already drives
        let inherited = body.hidden_size.or(self.state.topology.map(|t| t.hidden_size));
        let hidden = topology::resolve_hidden_size(inherited, &config.topology, rng);
        body.hidden_size = Some(hidden);
        let wanted = topology::resolve(&Phenotype::of(body), hidden);

        let reallocated = match &mut self.state.network {
            Some(network) => network.ensure_shapes(wanted, rng),
            None => {
                self.state.network = Some(PolicyNetwork::new(wanted, rng));
                true
            }
        };
        if reallocated {
            log::debug!("body {}: brain topology {}", body.id, wanted);
            self.state.buffer.clear();
        }
        self.state.topology = Some(wanted);
        wanted
    }

    /// Run one tick: sense, act, score, remember, and train when due
    pub fn process<R, F>(
        &mut self,
        body: &mut Body,
        ctx: TickContext<'_>,
        rng: &mut R,
        fallback: &mut F,
    ) -> TickOutcome
    where
        R: Rng + ?Sized,
        F: FallbackBehavior + ?Sized,
    {
        let Some(brain_idx) = topology::enforce_single_brain(body) else {
            log::trace!("body {}: no brain node", body.id);
            fallback.fallback(body);
            return TickOutcome::Fallback(FallbackReason::NoBrainNode);
        };

        let topology = self.ensure_topology(body, ctx.config, rng);
        let network = match &self.state.network {
            Some(network) if network.is_valid() => network,
            _ => {
                log::trace!("body {}: brain weights unusable", body.id);
                fallback.fallback(body);
                return TickOutcome::Fallback(FallbackReason::InvalidWeights);
            }
        };

        let energy = body.vitals.energy;
        let (energy_delta, energy_acceleration) = match self.state.previous_energy {
            Some(previous) => {
                let delta = energy - previous;
                (delta, delta - self.state.previous_energy_delta)
            }
            None => (0.0, 0.0),
        };

        let snapshot = sensors::encode(
            body,
            brain_idx,
            ctx.env,
            energy_acceleration,
            &ctx.config.sensors,
            topology.input_size,
        );
        let state = snapshot.values();
        let pass = network.forward(&state);
        let raw = pass.raw_outputs.to_vec();

        let details = actions::sample_and_apply(body, &raw, &ctx.config.actuators, rng);

        let facts = TickFacts {
            energy_delta,
            photosynthesis_gain: body.vitals.photosynthesis_gain,
            reproduced: body.vitals.reproduced,
        };
        let reward = reward::evaluate(body.reward_strategy, &snapshot, &facts);

        if !details.is_empty() {
            self.state.buffer.push(Experience {
                state,
                action_details: details.clone(),
                reward,
            });
        }

        self.state.previous_energy = Some(energy);
        self.state.previous_energy_delta = energy_delta;
        self.state.frames_since_train += 1;

        let trained = self.train_if_due(body.id, &ctx.config.learning);

        self.state.last_inputs = snapshot;
        self.state.last_actions = details;

        TickOutcome::Acted {
            actions: self.state.last_actions.len(),
            reward,
            trained,
        }
    }

    /// Train when the timer has elapsed and the buffer is exactly full
    fn train_if_due(&mut self, body_id: u64, config: &LearningConfig) -> Option<TrainOutcome> {
        if self.state.frames_since_train < config.train_interval || !self.state.buffer.is_full() {
            return None;
        }
        let network = self.state.network.as_mut()?;

        let outcome = self.state.trainer.train(network, self.state.buffer.as_batch());
        match outcome {
            TrainOutcome::Applied { mean_return } => {
                self.state.last_avg_reward = mean_return;
                self.state.frames_since_train = 0;
                self.state.training_cycles += 1;
                log::debug!(
                    "body {}: training cycle {} mean return {:.4}",
                    body_id,
                    self.state.training_cycles,
                    mean_return
                );
            }
            TrainOutcome::Rejected => {
                log::warn!("body {}: discarded non-finite training batch", body_id);
            }
        }
        self.state.buffer.clear();
        Some(outcome)
    }

    /// Read-only view for inspectors
    pub fn diagnostics(&self) -> BrainDiagnostics {
        BrainDiagnostics {
            topology: self.state.topology,
            inputs: self.state.last_inputs.clone(),
            actions: self.state.last_actions.clone(),
            last_avg_reward: self.state.last_avg_reward,
            buffered: self.state.buffer.len(),
            frames_since_train: self.state.frames_since_train,
            training_cycles: self.state.training_cycles,
            parameter_count: self.network().map_or(0, |n| n.parameter_count()),
        }
    }
}
