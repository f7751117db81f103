//! Soft-body organism as seen by its brain.
//!
//! The physics integrator owns positions and velocities; the brain only reads
//! them and writes actuator fields back onto the nodes.

use crate::neural::RewardStrategy;
use serde::{Deserialize, Serialize};

/// Unique organism identifier
pub type BodyId = u64;

/// 2D vector used for positions, velocities and forces
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians scaled by `magnitude`
    #[inline]
    pub fn from_polar(magnitude: f64, angle: f64) -> Self {
        Self::new(magnitude * angle.cos(), magnitude * angle.sin())
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Functional role of a body node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Structural node, the only kind that can host a brain
    Neuron,
    Photosynthetic,
    Emitter,
    Swimmer,
    Eater,
    Predator,
    Jet,
    Eye,
    Attractor,
    Repulsor,
}

/// What an eye node currently sees, filled in by the spatial hash
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeSighting {
    /// World-space distance to the nearest target
    pub distance: f64,
    /// Angle to the target relative to the body, in radians
    pub bearing: f64,
}

/// A point mass in the body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub mass: f64,

    // Designation flags
    pub is_brain: bool,
    pub can_be_grabber: bool,

    // Sensor input (eyes only)
    pub sighting: Option<EyeSighting>,

    // Actuator outputs written by the brain
    pub exertion: f64,
    pub dye_color: [f64; 3],
    pub force: Vec2,
    pub jet_magnitude: f64,
    pub jet_angle: f64,
    pub is_grabbing: bool,
}

impl Node {
    pub fn new(kind: NodeKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            velocity: Vec2::ZERO,
            mass: 1.0,
            is_brain: false,
            can_be_grabber: false,
            sighting: None,
            exertion: 0.0,
            dye_color: [0.0; 3],
            force: Vec2::ZERO,
            jet_magnitude: 0.0,
            jet_angle: 0.0,
            is_grabbing: false,
        }
    }

    /// Swimmers and jets double as fluid velocity sensors
    #[inline]
    pub fn senses_flow(&self) -> bool {
        matches!(self.kind, NodeKind::Swimmer | NodeKind::Jet)
    }
}

/// Elastic link between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spring {
    pub a: usize,
    pub b: usize,
    pub rest_length: f64,
}

impl Spring {
    pub fn new(a: usize, b: usize, rest_length: f64) -> Self {
        Self { a, b, rest_length }
    }

    /// Current length, or None if an endpoint is missing
    pub fn length(&self, nodes: &[Node]) -> Option<f64> {
        let a = nodes.get(self.a)?;
        let b = nodes.get(self.b)?;
        Some((a.position - b.position).length())
    }
}

/// Per-tick energy bookkeeping supplied by the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vitals {
    pub energy: f64,
    pub max_energy: f64,
    /// Energy gained from photosynthesis during this tick
    pub photosynthesis_gain: f64,
    /// Set by the simulation when the organism reproduced this tick
    pub reproduced: bool,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            energy: 100.0,
            max_energy: 100.0,
            photosynthesis_gain: 0.0,
            reproduced: false,
        }
    }
}

impl Vitals {
    /// Energy as a fraction of capacity, clamped to [0, 1]
    #[inline]
    pub fn energy_ratio(&self) -> f64 {
        if self.max_energy > 0.0 {
            (self.energy / self.max_energy).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// An organism body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub nodes: Vec<Node>,
    pub springs: Vec<Spring>,
    pub vitals: Vitals,

    // Heritable brain traits
    pub reward_strategy: RewardStrategy,
    pub hidden_size: Option<usize>,
}

impl Body {
    pub fn new(id: BodyId) -> Self {
        Self {
            id,
            nodes: Vec::new(),
            springs: Vec::new(),
            vitals: Vitals::default(),
            reward_strategy: RewardStrategy::default(),
            hidden_size: None,
        }
    }

    /// Append a node and return its index
    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Connect two nodes with a spring at their current distance
    pub fn connect(&mut self, a: usize, b: usize) {
        let rest = match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(na), Some(nb)) => (na.position - nb.position).length(),
            _ => return,
        };
        self.springs.push(Spring::new(a, b, rest));
    }

    /// Index of the first brain-flagged node
    #[inline]
    pub fn brain_index(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.is_brain)
    }

    /// Mass-weighted center of the body
    pub fn center_of_mass(&self) -> Vec2 {
        let total: f64 = self.nodes.iter().map(|n| n.mass).sum();
        if total <= 0.0 {
            return Vec2::ZERO;
        }
        let sum = self
            .nodes
            .iter()
            .fold(Vec2::ZERO, |acc, n| acc + n.position * n.mass);
        sum * (1.0 / total)
    }

    /// Mass-weighted mean velocity of the body
    pub fn average_velocity(&self) -> Vec2 {
        let total: f64 = self.nodes.iter().map(|n| n.mass).sum();
        if total <= 0.0 {
            return Vec2::ZERO;
        }
        let sum = self
            .nodes
            .iter()
            .fold(Vec2::ZERO, |acc, n| acc + n.velocity * n.mass);
        sum * (1.0 / total)
    }

    /// Indices of nodes of the given kind, in node order
    pub fn indices_of(&self, kind: NodeKind) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.kind == kind)
            .map(|(i, _)| i)
    }

    /// Indices of grabber-capable nodes, in node order
    pub fn grabber_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.can_be_grabber)
            .map(|(i, _)| i)
    }

    /// Number of nodes of the given kind
    #[inline]
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }
}
