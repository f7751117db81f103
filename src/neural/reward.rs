//! Heritable reward signals.
//!
//! Every strategy reads the labeled snapshot produced by the sensor encoder
//! on the same tick, plus the tick's energy bookkeeping.

use super::sensors::{SensorLabel, SensorSnapshot};
use serde::{Deserialize, Serialize};

/// Reward paid on a tick in which the organism reproduced
pub const REPRODUCTION_BONUS: f64 = 1.0;

/// Reward signal an organism is born with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RewardStrategy {
    /// Net energy change minus photosynthesis gain
    #[default]
    EnergyChange,
    Reproduction,
    /// Closeness of the nearest target any eye sees
    TargetProximity,
    EnergyAcceleration,
    DyeRed,
    DyeGreen,
    DyeBlue,
    AvoidDyeRed,
    AvoidDyeGreen,
    AvoidDyeBlue,
    EnergyRatio,
    EnergyDeficit,
    ComOffsetRight,
    ComOffsetLeft,
    ComOffsetDown,
    ComOffsetUp,
    MoveRight,
    MoveLeft,
    MoveDown,
    MoveUp,
    Nutrient,
    AvoidNutrient,
    SpringCompression,
    SpringExtension,
    FluidFlowX,
    FluidFlowY,
    EyeSeesTarget,
    /// Distance to the nearest seen target, 1.0 when nothing is seen
    TargetDistance,
}

impl RewardStrategy {
    pub const ALL: [RewardStrategy; 28] = [
        RewardStrategy::EnergyChange,
        RewardStrategy::Reproduction,
        RewardStrategy::TargetProximity,
        RewardStrategy::EnergyAcceleration,
        RewardStrategy::DyeRed,
        RewardStrategy::DyeGreen,
        RewardStrategy::DyeBlue,
        RewardStrategy::AvoidDyeRed,
        RewardStrategy::AvoidDyeGreen,
        RewardStrategy::AvoidDyeBlue,
        RewardStrategy::EnergyRatio,
        RewardStrategy::EnergyDeficit,
        RewardStrategy::ComOffsetRight,
        RewardStrategy::ComOffsetLeft,
        RewardStrategy::ComOffsetDown,
        RewardStrategy::ComOffsetUp,
        RewardStrategy::MoveRight,
        RewardStrategy::MoveLeft,
        RewardStrategy::MoveDown,
        RewardStrategy::MoveUp,
        RewardStrategy::Nutrient,
        RewardStrategy::AvoidNutrient,
        RewardStrategy::SpringCompression,
        RewardStrategy::SpringExtension,
        RewardStrategy::FluidFlowX,
        RewardStrategy::FluidFlowY,
        RewardStrategy::EyeSeesTarget,
        RewardStrategy::TargetDistance,
    ];
}

/// Energy bookkeeping for the current tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickFacts {
    /// Energy now minus energy on the previous tick
    pub energy_delta: f64,
    pub photosynthesis_gain: f64,
    pub reproduced: bool,
}

#[inline]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Smallest normalized distance among eyes that currently see a target
fn nearest_seen_target(snapshot: &SensorSnapshot) -> Option<f64> {
    snapshot
        .readings
        .iter()
        .filter_map(|r| match r.label {
            SensorLabel::EyeSeesTarget { node } if r.value > 0.5 => {
                snapshot.get(SensorLabel::EyeDistance { node })
            }
            _ => None,
        })
        .reduce(f64::min)
}

/// Compute this tick's reward
pub fn evaluate(strategy: RewardStrategy, snapshot: &SensorSnapshot, facts: &TickFacts) -> f64 {
    use RewardStrategy::*;

    let sensed = |label: SensorLabel| snapshot.get(label).unwrap_or(0.0);
    let springs = || snapshot.matching(|l| matches!(l, SensorLabel::SpringStrain { .. }));

    match strategy {
        EnergyChange => facts.energy_delta - facts.photosynthesis_gain,
        Reproduction => {
            if facts.reproduced {
                REPRODUCTION_BONUS
            } else {
                0.0
            }
        }
        TargetProximity => nearest_seen_target(snapshot).map_or(0.0, |d| 1.0 - d),
        EnergyAcceleration => sensed(SensorLabel::EnergyAcceleration),
        DyeRed => sensed(SensorLabel::DyeRed),
        DyeGreen => sensed(SensorLabel::DyeGreen),
        DyeBlue => sensed(SensorLabel::DyeBlue),
        AvoidDyeRed => 1.0 - sensed(SensorLabel::DyeRed),
        AvoidDyeGreen => 1.0 - sensed(SensorLabel::DyeGreen),
        AvoidDyeBlue => 1.0 - sensed(SensorLabel::DyeBlue),
        EnergyRatio => sensed(SensorLabel::EnergyRatio),
        EnergyDeficit => 1.0 - sensed(SensorLabel::EnergyRatio),
        ComOffsetRight => sensed(SensorLabel::ComOffsetX).max(0.0),
        ComOffsetLeft => (-sensed(SensorLabel::ComOffsetX)).max(0.0),
        ComOffsetDown => sensed(SensorLabel::ComOffsetY).max(0.0),
        ComOffsetUp => (-sensed(SensorLabel::ComOffsetY)).max(0.0),
        MoveRight => sensed(SensorLabel::ComVelocityX).max(0.0),
        MoveLeft => (-sensed(SensorLabel::ComVelocityX)).max(0.0),
        MoveDown => sensed(SensorLabel::ComVelocityY).max(0.0),
        MoveUp => (-sensed(SensorLabel::ComVelocityY)).max(0.0),
        Nutrient => snapshot.get(SensorLabel::Nutrient).unwrap_or(0.5),
        AvoidNutrient => 1.0 - snapshot.get(SensorLabel::Nutrient).unwrap_or(0.5),
        SpringCompression => mean(springs().map(|s| (-s).max(0.0))).unwrap_or(0.0),
        SpringExtension => mean(springs().map(|s| s.max(0.0))).unwrap_or(0.0),
        FluidFlowX => mean(snapshot.matching(|l| matches!(l, SensorLabel::FluidVelocityX { .. })))
            .unwrap_or(0.0)
            .max(0.0),
        FluidFlowY => mean(snapshot.matching(|l| matches!(l, SensorLabel::FluidVelocityY { .. })))
            .unwrap_or(0.0)
            .max(0.0),
        EyeSeesTarget => {
            let seen = snapshot
                .matching(|l| matches!(l, SensorLabel::EyeSeesTarget { .. }))
                .any(|v| v > 0.5);
            if seen {
                1.0
            } else {
                0.0
            }
        }
        TargetDistance => nearest_seen_target(snapshot).unwrap_or(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::sensors::SensorReading;

    fn snapshot(readings: &[(SensorLabel, f64)]) -> SensorSnapshot {
        SensorSnapshot {
            readings: readings
                .iter()
                .map(|&(label, value)| SensorReading { label, value })
                .collect(),
        }
    }

    #[test]
    fn test_default_is_energy_change() {
        let facts = TickFacts {
            energy_delta: 3.0,
            photosynthesis_gain: 1.25,
            reproduced: false,
        };
        let reward = evaluate(RewardStrategy::default(), &SensorSnapshot::default(), &facts);
        assert_eq!(reward, 1.75);
    }

    #[test]
    fn test_reproduction_bonus() {
        let mut facts = TickFacts::default();
        assert_eq!(evaluate(RewardStrategy::Reproduction, &SensorSnapshot::default(), &facts), 0.0);
        facts.reproduced = true;
        assert_eq!(
            evaluate(RewardStrategy::Reproduction, &SensorSnapshot::default(), &facts),
            REPRODUCTION_BONUS
        );
    }

    #[test]
    fn test_dye_and_inverse() {
        let snap = snapshot(&[(SensorLabel::DyeGreen, 0.3)]);
        let facts = TickFacts::default();
        assert_eq!(evaluate(RewardStrategy::DyeGreen, &snap, &facts), 0.3);
        assert!((evaluate(RewardStrategy::AvoidDyeGreen, &snap, &facts) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_rectified_components() {
        let snap = snapshot(&[
            (SensorLabel::ComOffsetX, -0.4),
            (SensorLabel::ComVelocityY, 0.6),
        ]);
        let facts = TickFacts::default();
        assert_eq!(evaluate(RewardStrategy::ComOffsetRight, &snap, &facts), 0.0);
        assert_eq!(evaluate(RewardStrategy::ComOffsetLeft, &snap, &facts), 0.4);
        assert_eq!(evaluate(RewardStrategy::MoveDown, &snap, &facts), 0.6);
        assert_eq!(evaluate(RewardStrategy::MoveUp, &snap, &facts), 0.0);
    }

    #[test]
    fn test_spring_averages() {
        let snap = snapshot(&[
            (SensorLabel::SpringStrain { spring: 0 }, -0.5),
            (SensorLabel::SpringStrain { spring: 1 }, 0.25),
        ]);
        let facts = TickFacts::default();
        assert_eq!(evaluate(RewardStrategy::SpringCompression, &snap, &facts), 0.25);
        assert_eq!(evaluate(RewardStrategy::SpringExtension, &snap, &facts), 0.125);
    }

    #[test]
    fn test_fluid_flow_rectified_average() {
        let snap = snapshot(&[
            (SensorLabel::FluidVelocityX { node: 1 }, 0.2),
            (SensorLabel::FluidVelocityX { node: 4 }, -0.6),
            (SensorLabel::FluidVelocityY { node: 1 }, 0.5),
        ]);
        let facts = TickFacts::default();
        assert_eq!(evaluate(RewardStrategy::FluidFlowX, &snap, &facts), 0.0);
        assert_eq!(evaluate(RewardStrategy::FluidFlowY, &snap, &facts), 0.5);
    }

    #[test]
    fn test_eye_strategies() {
        let snap = snapshot(&[
            (SensorLabel::EyeSeesTarget { node: 2 }, 0.0),
            (SensorLabel::EyeDistance { node: 2 }, 1.0),
            (SensorLabel::EyeSeesTarget { node: 5 }, 1.0),
            (SensorLabel::EyeDistance { node: 5 }, 0.25),
        ]);
        let facts = TickFacts::default();
        assert_eq!(evaluate(RewardStrategy::EyeSeesTarget, &snap, &facts), 1.0);
        assert_eq!(evaluate(RewardStrategy::TargetProximity, &snap, &facts), 0.75);
        assert_eq!(evaluate(RewardStrategy::TargetDistance, &snap, &facts), 0.25);
    }

    #[test]
    fn test_eye_strategies_without_sightings() {
        let snap = snapshot(&[
            (SensorLabel::EyeSeesTarget { node: 2 }, 0.0),
            (SensorLabel::EyeDistance { node: 2 }, 1.0),
        ]);
        let facts = TickFacts::default();
        assert_eq!(evaluate(RewardStrategy::EyeSeesTarget, &snap, &facts), 0.0);
        assert_eq!(evaluate(RewardStrategy::TargetProximity, &snap, &facts), 0.0);
        assert_eq!(evaluate(RewardStrategy::TargetDistance, &snap, &facts), 1.0);
    }

    #[test]
    fn test_every_strategy_is_finite_on_empty_snapshot() {
        let facts = TickFacts::default();
        for strategy in RewardStrategy::ALL {
            assert!(evaluate(strategy, &SensorSnapshot::default(), &facts).is_finite());
        }
    }
}
