//! Weight snapshots for saving and restoring a trained brain.

use crate::body::{Body, BodyId};
use crate::brain::Brain;
use crate::neural::topology::{self, Phenotype};
use crate::neural::{PolicyNetwork, RewardStrategy, Topology};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"SOMA";

/// Trained weights plus the heritable traits needed to reuse them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    /// Version for compatibility checking
    pub version: u32,
    pub body_id: BodyId,
    pub topology: Topology,
    pub reward_strategy: RewardStrategy,
    pub training_cycles: u64,
    pub last_avg_reward: f64,
    pub network: PolicyNetwork,
}

impl WeightSnapshot {
    /// Current snapshot version
    pub const VERSION: u32 = 1;

    /// Capture the brain's current weights; `None` before the first tick
    pub fn capture(body: &Body, brain: &Brain) -> Option<Self> {
        let network = brain.network()?.clone();
        Some(Self {
            version: Self::VERSION,
            body_id: body.id,
            topology: network.topology(),
            reward_strategy: body.reward_strategy,
            training_cycles: brain.state.training_cycles,
            last_avg_reward: brain.state.last_avg_reward,
            network,
        })
    }

    /// Encode with magic bytes in front
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let payload = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| SnapshotError::InvalidFormat("Invalid magic bytes".to_string()))?;
        let snapshot: WeightSnapshot = bincode::deserialize(payload)?;

        if snapshot.version != Self::VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: Self::VERSION,
                found: snapshot.version,
            });
        }
        snapshot.check_shapes()?;
        Ok(snapshot)
    }

    /// Save snapshot to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    /// Load snapshot from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }

    /// The stored network must agree with the stored topology
    fn check_shapes(&self) -> Result<(), SnapshotError> {
        let found = self.network.topology();
        if !self.network.is_consistent() || found != self.topology {
            return Err(SnapshotError::ShapeMismatch {
                expected: self.topology,
                found,
            });
        }
        Ok(())
    }

    /// Install the weights into `brain` for `body`.
    ///
    /// The body's phenotype must resolve to the stored input and output sizes,
    /// and a brain that already has a network only accepts the same topology.
    /// The stored hidden size is written onto the body so the next tick keeps
    /// these weights.
    pub fn restore(&self, body: &mut Body, brain: &mut Brain) -> Result<(), SnapshotError> {
        self.check_shapes()?;
        let wanted = topology::resolve(&Phenotype::of(body), self.topology.hidden_size);
        if wanted != self.topology {
            return Err(SnapshotError::ShapeMismatch {
                expected: wanted,
                found: self.topology,
            });
        }
        if let Some(current) = brain.topology() {
            if current != self.topology {
                return Err(SnapshotError::ShapeMismatch {
                    expected: current,
                    found: self.topology,
                });
            }
        }
        body.hidden_size = Some(self.topology.hidden_size);
        brain.install_network(self.network.clone());
        brain.state.training_cycles = self.training_cycles;
        brain.state.last_avg_reward = self.last_avg_reward;
        log::debug!("restored {} weights for body {}", self.topology, body.id);
        Ok(())
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).map_or(0, |n| n as usize + MAGIC.len())
    }
}

/// Errors that can occur during snapshot operations
#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    Serialization(bincode::Error),
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
    ShapeMismatch { expected: Topology, found: Topology },
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
            Self::ShapeMismatch { expected, found } => {
                write!(f, "Shape mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<std::io::Error> for SnapshotError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for SnapshotError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}
