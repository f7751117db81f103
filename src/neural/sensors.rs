//! Sensory encoding: body + environment → labeled input vector.

use crate::body::{Body, NodeKind, Vec2};
use crate::config::SensorConfig;
use crate::environment::Environment;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// What a single input slot measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorLabel {
    DyeRed,
    DyeGreen,
    DyeBlue,
    EnergyRatio,
    /// Center of mass minus brain position, x
    ComOffsetX,
    ComOffsetY,
    /// Mass-weighted body velocity, x
    ComVelocityX,
    ComVelocityY,
    Nutrient,
    /// Second discrete derivative of energy
    EnergyAcceleration,
    SpringStrain { spring: usize },
    FluidVelocityX { node: usize },
    FluidVelocityY { node: usize },
    EyeSeesTarget { node: usize },
    EyeDistance { node: usize },
    EyeBearing { node: usize },
    /// Filler when the assembled vector is shorter than the topology
    Padding,
}

/// One labeled input value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub label: SensorLabel,
    pub value: f64,
}

/// The labeled input vector of one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub readings: Vec<SensorReading>,
}

impl SensorSnapshot {
    #[inline]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Plain input vector, in slot order
    pub fn values(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.value).collect()
    }

    /// Value of the first reading with this label
    pub fn get(&self, label: SensorLabel) -> Option<f64> {
        self.readings
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value)
    }

    /// Values of every reading whose label satisfies `pred`
    pub fn matching<'a>(
        &'a self,
        pred: impl Fn(&SensorLabel) -> bool + 'a,
    ) -> impl Iterator<Item = f64> + 'a {
        self.readings
            .iter()
            .filter(move |r| pred(&r.label))
            .map(|r| r.value)
    }

    fn push(&mut self, label: SensorLabel, value: f64) {
        self.readings.push(SensorReading { label, value });
    }

    /// Pad with zeros or drop trailing readings to reach exactly `len`
    fn fit_to(&mut self, len: usize) {
        if self.readings.len() > len {
            log::trace!("truncating {} sensor readings to {}", self.readings.len(), len);
            self.readings.truncate(len);
        }
        while self.readings.len() < len {
            self.push(SensorLabel::Padding, 0.0);
        }
    }
}

/// Wrap an angle into [-π, π] and scale to [-1, 1]
#[inline]
fn normalize_bearing(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    wrapped / PI
}

/// Assemble the input vector for the brain at `brain_idx`.
///
/// Layout: dye RGB, energy ratio, center-of-mass offset (2), center-of-mass
/// velocity (2), nutrient, energy acceleration, one strain per spring, two
/// flow readings per swimmer/jet, three readings per eye. The result is padded
/// or truncated to `input_size`.
pub fn encode(
    body: &Body,
    brain_idx: usize,
    env: &Environment,
    energy_acceleration: f64,
    config: &SensorConfig,
    input_size: usize,
) -> SensorSnapshot {
    let mut snapshot = SensorSnapshot {
        readings: Vec::with_capacity(input_size),
    };
    let brain_pos = body
        .nodes
        .get(brain_idx)
        .map(|n| n.position)
        .unwrap_or(Vec2::ZERO);

    let [r, g, b] = env.sample_dye(brain_pos);
    snapshot.push(SensorLabel::DyeRed, r);
    snapshot.push(SensorLabel::DyeGreen, g);
    snapshot.push(SensorLabel::DyeBlue, b);

    snapshot.push(SensorLabel::EnergyRatio, body.vitals.energy_ratio());

    let offset = (body.center_of_mass() - brain_pos) * config.position_scale;
    snapshot.push(SensorLabel::ComOffsetX, offset.x.tanh());
    snapshot.push(SensorLabel::ComOffsetY, offset.y.tanh());

    let velocity = body.average_velocity() * config.velocity_scale;
    snapshot.push(SensorLabel::ComVelocityX, velocity.x.tanh());
    snapshot.push(SensorLabel::ComVelocityY, velocity.y.tanh());

    snapshot.push(SensorLabel::Nutrient, env.sample_nutrient(brain_pos));
    snapshot.push(SensorLabel::EnergyAcceleration, energy_acceleration.tanh());

    for (i, spring) in body.springs.iter().enumerate() {
        let strain = match spring.length(&body.nodes) {
            Some(len) if spring.rest_length > 0.0 => (len / spring.rest_length - 1.0).tanh(),
            _ => 0.0,
        };
        snapshot.push(SensorLabel::SpringStrain { spring: i }, strain);
    }

    for (i, node) in body.nodes.iter().enumerate() {
        if node.senses_flow() {
            let flow = env.sample_velocity(node.position);
            snapshot.push(SensorLabel::FluidVelocityX { node: i }, flow.x.tanh());
            snapshot.push(SensorLabel::FluidVelocityY { node: i }, flow.y.tanh());
        }
    }

    for i in body.indices_of(NodeKind::Eye) {
        let (seen, distance, bearing) = match body.nodes[i].sighting {
            Some(s) => (
                1.0,
                (s.distance / config.eye_range).clamp(0.0, 1.0),
                normalize_bearing(s.bearing),
            ),
            None => (0.0, 1.0, 0.0),
        };
        snapshot.push(SensorLabel::EyeSeesTarget { node: i }, seen);
        snapshot.push(SensorLabel::EyeDistance { node: i }, distance);
        snapshot.push(SensorLabel::EyeBearing { node: i }, bearing);
    }

    snapshot.fit_to(input_size);
    snapshot
}
