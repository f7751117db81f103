//! Gaussian action sampling and actuator command mapping.

use super::topology::{ActuatorKind, RAW_PER_ACTION};
use crate::body::{Body, Vec2};
use crate::config::ActuatorConfig;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Added to `exp(log_std)` so the standard deviation never reaches zero
pub const STD_FLOOR: f64 = 1e-6;

/// `ln(2π) / 2`
const HALF_LN_TWO_PI: f64 = 0.918_938_533_204_672_8;

/// Which command an action drives on its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionChannel {
    Red,
    Green,
    Blue,
    Exertion,
    Angle,
    Toggle,
}

impl ActionChannel {
    /// Channels consumed by one node of `kind`, in slot order
    pub fn for_actuator(kind: ActuatorKind) -> &'static [ActionChannel] {
        use ActionChannel::*;
        match kind {
            ActuatorKind::Emitter => &[Red, Green, Blue, Exertion],
            ActuatorKind::Swimmer | ActuatorKind::Jet => &[Exertion, Angle],
            ActuatorKind::Grabber => &[Toggle],
            ActuatorKind::Eater
            | ActuatorKind::Predator
            | ActuatorKind::Attractor
            | ActuatorKind::Repulsor => &[Exertion],
        }
    }
}

/// Identifies one sampled action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionLabel {
    pub actuator: ActuatorKind,
    pub node: usize,
    pub channel: ActionChannel,
}

/// Everything the trainer needs about one sampled action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionDetail {
    pub mean: f64,
    pub std_dev: f64,
    pub sampled_value: f64,
    pub log_prob: f64,
    pub label: ActionLabel,
    /// Index of the mean in the raw output vector; log std is `slot + 1`
    pub slot: usize,
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Standard deviation for a raw log-std output
#[inline]
pub fn std_from_raw(raw_log_std: f64) -> f64 {
    raw_log_std.exp() + STD_FLOOR
}

/// Log density of `Normal(mean, std_dev)` at `x`
#[inline]
pub fn gaussian_log_prob(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    -0.5 * z * z - std_dev.ln() - HALF_LN_TWO_PI
}

/// Draw one action from the raw `(mean, log_std)` pair at `slot`
pub fn sample<R: Rng + ?Sized>(
    raw_outputs: &[f64],
    slot: usize,
    label: ActionLabel,
    rng: &mut R,
) -> ActionDetail {
    let mean = raw_outputs[slot];
    let std_dev = std_from_raw(raw_outputs[slot + 1]);
    let z: f64 = rng.sample(StandardNormal);
    let sampled_value = mean + std_dev * z;
    ActionDetail {
        mean,
        std_dev,
        sampled_value,
        log_prob: gaussian_log_prob(sampled_value, mean, std_dev),
        label,
        slot,
    }
}

/// Write one actuator's commands onto its node
fn apply_commands(
    body: &mut Body,
    kind: ActuatorKind,
    node_idx: usize,
    values: &[f64],
    config: &ActuatorConfig,
) {
    let Some(node) = body.nodes.get_mut(node_idx) else {
        return;
    };
    match kind {
        ActuatorKind::Emitter => {
            node.dye_color = [sigmoid(values[0]), sigmoid(values[1]), sigmoid(values[2])];
            node.exertion = sigmoid(values[3]);
        }
        ActuatorKind::Swimmer => {
            node.exertion = sigmoid(values[0]);
            node.force = Vec2::from_polar(node.exertion * config.swim_force, values[1]);
        }
        ActuatorKind::Jet => {
            node.exertion = sigmoid(values[0]);
            node.jet_magnitude = node.exertion * config.jet_force;
            node.jet_angle = values[1];
        }
        ActuatorKind::Grabber => {
            node.is_grabbing = sigmoid(values[0]) > 0.5;
        }
        ActuatorKind::Eater
        | ActuatorKind::Predator
        | ActuatorKind::Attractor
        | ActuatorKind::Repulsor => {
            node.exertion = sigmoid(values[0]);
        }
    }
}

/// Sample every actuator's actions from `raw_outputs` and apply them.
///
/// Actuators are visited in [`ActuatorKind::ORDER`]. Each consumes its width
/// from a shared cursor; when too few raw outputs remain, that actuator is left
/// untouched but the cursor still advances so later ones stay aligned.
pub fn sample_and_apply<R: Rng + ?Sized>(
    body: &mut Body,
    raw_outputs: &[f64],
    config: &ActuatorConfig,
    rng: &mut R,
) -> Vec<ActionDetail> {
    let mut details = Vec::new();
    let mut cursor = 0usize;

    for kind in ActuatorKind::ORDER {
        let channels = ActionChannel::for_actuator(kind);
        for node in kind.node_indices(body) {
            let width = kind.width();
            if cursor + width > raw_outputs.len() {
                log::trace!("body {}: skipping {:?} on node {}", body.id, kind, node);
                cursor += width;
                continue;
            }

            let mut values = [0.0f64; 4];
            for (i, &channel) in channels.iter().enumerate() {
                let label = ActionLabel {
                    actuator: kind,
                    node,
                    channel,
                };
                let detail = sample(raw_outputs, cursor + i * RAW_PER_ACTION, label, rng);
                values[i] = detail.sampled_value;
                details.push(detail);
            }
            apply_commands(body, kind, node, &values[..channels.len()], config);
            cursor += width;
        }
    }

    details
}
