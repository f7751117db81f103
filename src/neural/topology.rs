//! Network sizing from body phenotype.

use crate::body::{Body, NodeKind};
use crate::config::TopologyConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inputs present on every brain: dye RGB, energy ratio, relative position (2),
/// relative velocity (2), nutrient, energy acceleration
pub const BASE_INPUTS: usize = 10;
/// Inputs per spring (strain)
pub const SPRING_INPUTS: usize = 1;
/// Inputs per swimmer or jet (fluid velocity x, y)
pub const FLOW_INPUTS: usize = 2;
/// Inputs per eye (sees target, distance, bearing)
pub const EYE_INPUTS: usize = 3;
/// Raw outputs per sampled action (mean, log std)
pub const RAW_PER_ACTION: usize = 2;

/// Actuator node classes, in the order the sampler visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActuatorKind {
    Emitter,
    Swimmer,
    Eater,
    Predator,
    Jet,
    Grabber,
    Attractor,
    Repulsor,
}

impl ActuatorKind {
    /// Visit order shared by the resolver and the sampler
    pub const ORDER: [ActuatorKind; 8] = [
        ActuatorKind::Emitter,
        ActuatorKind::Swimmer,
        ActuatorKind::Eater,
        ActuatorKind::Predator,
        ActuatorKind::Jet,
        ActuatorKind::Grabber,
        ActuatorKind::Attractor,
        ActuatorKind::Repulsor,
    ];

    /// Number of Gaussian actions one node of this kind consumes
    #[inline]
    pub const fn action_count(self) -> usize {
        match self {
            ActuatorKind::Emitter => 4,
            ActuatorKind::Swimmer | ActuatorKind::Jet => 2,
            _ => 1,
        }
    }

    /// Raw output slots one node of this kind consumes
    #[inline]
    pub const fn width(self) -> usize {
        self.action_count() * RAW_PER_ACTION
    }

    /// Node kind that carries this actuator, if it is a kind rather than a flag
    #[inline]
    pub const fn node_kind(self) -> Option<NodeKind> {
        match self {
            ActuatorKind::Emitter => Some(NodeKind::Emitter),
            ActuatorKind::Swimmer => Some(NodeKind::Swimmer),
            ActuatorKind::Eater => Some(NodeKind::Eater),
            ActuatorKind::Predator => Some(NodeKind::Predator),
            ActuatorKind::Jet => Some(NodeKind::Jet),
            ActuatorKind::Grabber => None,
            ActuatorKind::Attractor => Some(NodeKind::Attractor),
            ActuatorKind::Repulsor => Some(NodeKind::Repulsor),
        }
    }

    /// Indices of the body's nodes driven by this actuator, in node order
    pub fn node_indices(self, body: &Body) -> Vec<usize> {
        match self.node_kind() {
            Some(kind) => body.indices_of(kind).collect(),
            None => body.grabber_indices().collect(),
        }
    }
}

/// Per-kind node and spring counts that determine network dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phenotype {
    pub eyes: usize,
    pub swimmers: usize,
    pub jets: usize,
    pub springs: usize,
    pub emitters: usize,
    pub eaters: usize,
    pub predators: usize,
    pub grabbers: usize,
    pub attractors: usize,
    pub repulsors: usize,
}

impl Phenotype {
    /// Count the sensor and actuator nodes of a body
    pub fn of(body: &Body) -> Self {
        let mut p = Phenotype {
            springs: body.springs.len(),
            ..Default::default()
        };
        for node in &body.nodes {
            match node.kind {
                NodeKind::Eye => p.eyes += 1,
                NodeKind::Swimmer => p.swimmers += 1,
                NodeKind::Jet => p.jets += 1,
                NodeKind::Emitter => p.emitters += 1,
                NodeKind::Eater => p.eaters += 1,
                NodeKind::Predator => p.predators += 1,
                NodeKind::Attractor => p.attractors += 1,
                NodeKind::Repulsor => p.repulsors += 1,
                NodeKind::Neuron | NodeKind::Photosynthetic => {}
            }
            if node.can_be_grabber {
                p.grabbers += 1;
            }
        }
        p
    }

    /// Nodes of an actuator kind
    #[inline]
    pub fn actuators(&self, kind: ActuatorKind) -> usize {
        match kind {
            ActuatorKind::Emitter => self.emitters,
            ActuatorKind::Swimmer => self.swimmers,
            ActuatorKind::Eater => self.eaters,
            ActuatorKind::Predator => self.predators,
            ActuatorKind::Jet => self.jets,
            ActuatorKind::Grabber => self.grabbers,
            ActuatorKind::Attractor => self.attractors,
            ActuatorKind::Repulsor => self.repulsors,
        }
    }

    /// Length of the sensory vector
    pub fn input_size(&self) -> usize {
        BASE_INPUTS
            + self.springs * SPRING_INPUTS
            + (self.swimmers + self.jets) * FLOW_INPUTS
            + self.eyes * EYE_INPUTS
    }

    /// Number of Gaussian actions sampled per tick
    pub fn action_count(&self) -> usize {
        ActuatorKind::ORDER
            .iter()
            .map(|&k| self.actuators(k) * k.action_count())
            .sum()
    }

    /// Length of the raw output vector
    #[inline]
    pub fn output_size(&self) -> usize {
        self.action_count() * RAW_PER_ACTION
    }
}

/// Network dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topology {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.input_size, self.hidden_size, self.output_size)
    }
}

/// Resolve network dimensions for a phenotype and an already chosen hidden size
#[inline]
pub fn resolve(phenotype: &Phenotype, hidden_size: usize) -> Topology {
    Topology {
        input_size: phenotype.input_size(),
        hidden_size,
        output_size: phenotype.output_size(),
    }
}

/// Keep a heritable hidden size if it is in range, otherwise draw a new one
pub fn resolve_hidden_size<R: Rng + ?Sized>(
    current: Option<usize>,
    config: &TopologyConfig,
    rng: &mut R,
) -> usize {
    match current {
        Some(hidden) if config.accepts(hidden) => hidden,
        _ => rng.gen_range(config.hidden_min..=config.hidden_max),
    }
}

/// Clear the brain flag on every node after the first flagged one.
/// Returns the index of the surviving brain node.
pub fn enforce_single_brain(body: &mut Body) -> Option<usize> {
    let first = body.brain_index()?;
    for node in body.nodes.iter_mut().skip(first + 1) {
        if node.is_brain {
            log::debug!("body {}: demoting duplicate brain node", body.id);
            node.is_brain = false;
        }
    }
    Some(first)
}
