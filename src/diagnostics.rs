//! Read-only brain inspection and population-level learning statistics.

use crate::brain::Brain;
use crate::neural::{ActionDetail, SensorSnapshot, Topology};
use serde::{Deserialize, Serialize};

/// What one brain saw and did on its last tick
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BrainDiagnostics {
    pub topology: Option<Topology>,
    /// Labeled inputs from the last tick
    pub inputs: SensorSnapshot,
    /// Sampled actions from the last tick
    pub actions: Vec<ActionDetail>,
    /// Mean discounted return of the last training batch
    pub last_avg_reward: f64,
    pub buffered: usize,
    pub frames_since_train: u32,
    pub training_cycles: u64,
    pub parameter_count: usize,
}

impl BrainDiagnostics {
    /// Format as a one-line summary
    pub fn summary(&self) -> String {
        let topology = self
            .topology
            .map_or_else(|| "-".to_string(), |t| t.to_string());
        format!(
            "Net:{} | Params:{} | Buf:{} | Frames:{} | Cycles:{} | AvgRet:{:.4}",
            topology,
            self.parameter_count,
            self.buffered,
            self.frames_since_train,
            self.training_cycles,
            self.last_avg_reward,
        )
    }

    /// Pretty JSON for external inspectors
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Learning statistics across a population of brains
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PopulationStats {
    /// Current simulation time
    pub time: u64,
    pub brains: usize,
    /// Brains that have built a network
    pub active: usize,
    pub hidden_mean: f64,
    pub hidden_max: usize,
    pub parameters_total: usize,
    pub training_cycles: u64,
    pub rejected_batches: u64,
    /// Mean of each active brain's last batch return
    pub avg_reward_mean: f64,
    /// Ticks handed to the fallback behavior this step
    pub fallbacks: usize,
}

impl PopulationStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from the current brains
    pub fn update<'a>(
        &mut self,
        time: u64,
        brains: impl IntoIterator<Item = &'a Brain>,
        fallbacks: usize,
    ) {
        *self = Self {
            time,
            fallbacks,
            ..Self::default()
        };

        let mut hidden_sum = 0usize;
        let mut reward_sum = 0.0;
        for brain in brains {
            self.brains += 1;
            self.training_cycles += brain.state.training_cycles;
            self.rejected_batches += brain.state.trainer.rejected_batches;

            let Some(network) = brain.network() else {
                continue;
            };
            let topology = network.topology();
            self.active += 1;
            hidden_sum += topology.hidden_size;
            self.hidden_max = self.hidden_max.max(topology.hidden_size);
            self.parameters_total += network.parameter_count();
            reward_sum += brain.state.last_avg_reward;
        }

        if self.active > 0 {
            self.hidden_mean = hidden_sum as f64 / self.active as f64;
            self.avg_reward_mean = reward_sum / self.active as f64;
        }
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:6} | Brains:{:4} | Active:{:4} | Hidden:{:.1} (max {}) | Cycles:{} | \
             Rwd:{:.4} | Fallback:{}",
            self.time,
            self.brains,
            self.active,
            self.hidden_mean,
            self.hidden_max,
            self.training_cycles,
            self.avg_reward_mean,
            self.fallbacks,
        )
    }

    /// Save stats to JSON file
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load stats from JSON file
    pub fn load_json(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
