//! Minimal kinematic host for driving brains outside a full simulation.
//!
//! Bodies drift on a wrapping plane over a dye gradient and a random
//! nutrient field. Physics is a damped point-mass step with no spring forces.

use crate::body::{Body, BodyId, EyeSighting, Node, NodeKind, Vec2};
use crate::brain::{Brain, Resting, TickContext, TickOutcome};
use crate::config::BrainConfig;
use crate::diagnostics::PopulationStats;
use crate::environment::{Environment, FluidField, NutrientField};
use crate::neural::RewardStrategy;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const GRID_SIZE: usize = 32;
const WORLD_SIZE: f64 = 320.0;
const DAMPING: f64 = 0.9;
const EXERTION_COST: f64 = 0.02;
const PHOTOSYNTHESIS_RATE: f64 = 0.05;

/// Actuator and sensor kinds a spawned body may carry
const LIMB_KINDS: [NodeKind; 8] = [
    NodeKind::Emitter,
    NodeKind::Swimmer,
    NodeKind::Eater,
    NodeKind::Jet,
    NodeKind::Eye,
    NodeKind::Photosynthetic,
    NodeKind::Attractor,
    NodeKind::Repulsor,
];

/// A population of bodies, each driven by its own brain
pub struct Sandbox {
    pub bodies: Vec<Body>,
    pub brains: Vec<Brain>,
    pub env: Environment,
    pub config: BrainConfig,
    pub time: u64,
    pub stats: PopulationStats,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl Sandbox {
    /// Create a sandbox with a random seed
    pub fn new(config: BrainConfig, population: usize) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, population, seed)
    }

    /// Create a sandbox with a specific seed for reproducibility
    pub fn new_with_seed(config: BrainConfig, population: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let env = build_environment(&mut rng);

        let bodies: Vec<Body> = (0..population as BodyId)
            .map(|id| spawn_body(id, &mut rng))
            .collect();
        let brains = bodies.iter().map(|_| Brain::new(&config)).collect();

        Self {
            bodies,
            brains,
            env,
            config,
            time: 0,
            stats: PopulationStats::new(),
            rng,
            seed,
        }
    }

    /// Advance every body by one tick
    pub fn step(&mut self) {
        self.update_sightings();

        let ctx = TickContext {
            env: &self.env,
            config: &self.config,
        };
        let mut fallbacks = 0;
        for (body, brain) in self.bodies.iter_mut().zip(self.brains.iter_mut()) {
            let outcome = brain.process(body, ctx, &mut self.rng, &mut Resting);
            if let TickOutcome::Fallback(_) = outcome {
                fallbacks += 1;
            }
            integrate(body);
        }

        self.time += 1;
        self.stats.update(self.time, &self.brains, fallbacks);
    }

    /// Run simulation for specified number of steps
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Index of the brain with the best last batch return
    pub fn best_brain(&self) -> Option<usize> {
        self.brains
            .iter()
            .enumerate()
            .filter(|(_, b)| b.network().is_some())
            .max_by(|(_, a), (_, b)| a.state.last_avg_reward.total_cmp(&b.state.last_avg_reward))
            .map(|(i, _)| i)
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Point every eye at the nearest other body within range
    fn update_sightings(&mut self) {
        let range = self.config.sensors.eye_range;
        let centers: Vec<Vec2> = self.bodies.iter().map(Body::center_of_mass).collect();

        for (i, body) in self.bodies.iter_mut().enumerate() {
            for node in body.nodes.iter_mut().filter(|n| n.kind == NodeKind::Eye) {
                node.sighting = centers
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &c)| c - node.position)
                    .filter(|offset| offset.length() <= range)
                    .min_by(|a, b| a.length().total_cmp(&b.length()))
                    .map(|offset| EyeSighting {
                        distance: offset.length(),
                        bearing: offset.y.atan2(offset.x),
                    });
            }
        }
    }
}

fn build_environment<R: Rng + ?Sized>(rng: &mut R) -> Environment {
    let mut fluid = FluidField::new(GRID_SIZE);
    let mut nutrients = NutrientField::new(GRID_SIZE, 0.0, 0.0, 1.0);
    let cell = WORLD_SIZE / GRID_SIZE as f64;

    for gy in 0..GRID_SIZE {
        for gx in 0..GRID_SIZE {
            let u = gx as f64 / (GRID_SIZE - 1) as f64;
            let v = gy as f64 / (GRID_SIZE - 1) as f64;
            fluid.set_dye(gx, gy, [255.0 * u, 255.0 * v, 255.0 * (1.0 - u)]);
            let angle = (gx as f64 * cell).sin() + (gy as f64 * cell).cos();
            fluid.set_velocity(gx, gy, Vec2::from_polar(0.2, angle));
            nutrients.set(gx, gy, rng.gen::<f64>());
        }
    }

    Environment {
        world_width: WORLD_SIZE,
        world_height: WORLD_SIZE,
        fluid: Some(fluid),
        nutrients: Some(nutrients),
    }
}

/// Brain node plus one to four limbs sprung to it
fn spawn_body<R: Rng + ?Sized>(id: BodyId, rng: &mut R) -> Body {
    let mut body = Body::new(id);
    let origin = Vec2::new(rng.gen_range(0.0..WORLD_SIZE), rng.gen_range(0.0..WORLD_SIZE));
    let brain = body.add_node(Node::new(NodeKind::Neuron, origin));
    body.nodes[brain].is_brain = true;
    body.nodes[brain].can_be_grabber = rng.gen_bool(0.3);

    let limbs = rng.gen_range(1..=4);
    for _ in 0..limbs {
        let kind = LIMB_KINDS[rng.gen_range(0..LIMB_KINDS.len())];
        let offset = Vec2::from_polar(
            rng.gen_range(3.0..8.0),
            rng.gen_range(0.0..std::f64::consts::TAU),
        );
        let limb = body.add_node(Node::new(kind, origin + offset));
        body.connect(brain, limb);
    }

    body.reward_strategy = RewardStrategy::ALL[rng.gen_range(0..RewardStrategy::ALL.len())];
    body
}

/// Apply actuator outputs, move nodes and settle the energy budget
fn integrate(body: &mut Body) {
    let mut spent = 0.0;
    for node in &mut body.nodes {
        let thrust = node.force + Vec2::from_polar(node.jet_magnitude, node.jet_angle);
        node.velocity = (node.velocity + thrust * (1.0 / node.mass)) * DAMPING;
        node.position = node.position + node.velocity;
        node.position.x = node.position.x.rem_euclid(WORLD_SIZE);
        node.position.y = node.position.y.rem_euclid(WORLD_SIZE);
        spent += node.exertion * EXERTION_COST;
    }

    let gain = body.count(NodeKind::Photosynthetic) as f64 * PHOTOSYNTHESIS_RATE;
    let vitals = &mut body.vitals;
    vitals.photosynthesis_gain = gain;
    vitals.energy = (vitals.energy - spent + gain).clamp(0.0, vitals.max_energy);
    vitals.reproduced = false;
}
