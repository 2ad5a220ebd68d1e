use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::data_structures::LaneId;
use crate::global_variables::{
    DEFAULT_CAPACITY_PER_LANE, DEFAULT_COUPLING, DEFAULT_HIGH_WATERMARK, DEFAULT_LANES,
    DEFAULT_LOW_WATERMARK, DEFAULT_PRIORITY_LANE, DEFAULT_ROTATION, DEFAULT_TICK_INTERVAL_MS,
};

/// Problems found while loading or validating a [`JunctionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Junction must register at least one lane")]
    NoLanes,

    #[error("Lane {0} is registered more than once")]
    DuplicateLane(LaneId),

    #[error("Lane capacity must be positive")]
    ZeroCapacity,

    #[error("Tick interval must be positive")]
    ZeroTickInterval,

    #[error("Low watermark {low} is above high watermark {high}")]
    InvertedWatermarks { low: usize, high: usize },

    #[error("Rotation subset must contain at least one lane")]
    EmptyRotation,

    #[error("{role} refers to unregistered lane {lane}")]
    UnknownLane { role: &'static str, lane: LaneId },

    #[error("Lane {0} appears more than once in the rotation subset")]
    DuplicateRotationLane(LaneId),

    #[error("Lane {0} cannot both rotate and play another role")]
    RoleConflict(LaneId),

    #[error("Follower {follower} must follow a rotation lane, not {leader}")]
    LeaderNotInRotation { follower: LaneId, leader: LaneId },
}

/// Static description of a junction: which lanes exist and how they are scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JunctionConfig {
    /// Every lane id accepted by the junction.
    pub lanes: Vec<LaneId>,
    pub capacity_per_lane: usize,
    /// Priority switches on at `count >= high_watermark`.
    pub high_watermark: usize,
    /// Priority switches off at `count < low_watermark`.
    pub low_watermark: usize,
    pub tick_interval_ms: u64,
    /// Lanes taking part in fair rotation, in scan order.
    pub rotation: Vec<LaneId>,
    /// Lane held green exclusively when overloaded.
    pub priority_lane: Option<LaneId>,
    /// Follower lane -> leader lane. Followers copy the leader's light in normal mode.
    pub coupling: BTreeMap<LaneId, LaneId>,
    /// Unsignalled lanes drained completely every tick.
    pub free_flow_lanes: Vec<LaneId>,
}

impl Default for JunctionConfig {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES.iter().map(|&id| LaneId::from(id)).collect(),
            capacity_per_lane: DEFAULT_CAPACITY_PER_LANE,
            high_watermark: DEFAULT_HIGH_WATERMARK,
            low_watermark: DEFAULT_LOW_WATERMARK,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            rotation: DEFAULT_ROTATION.iter().map(|&id| LaneId::from(id)).collect(),
            priority_lane: Some(LaneId::from(DEFAULT_PRIORITY_LANE)),
            coupling: DEFAULT_COUPLING
                .iter()
                .map(|&(follower, leader)| (LaneId::from(follower), LaneId::from(leader)))
                .collect(),
            free_flow_lanes: Vec::new(),
        }
    }
}

impl JunctionConfig {
    /// Reads a JSON config file. Missing fields fall back to the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: JunctionConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: JunctionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Checks that the lane roles are consistent with each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes.is_empty() {
            return Err(ConfigError::NoLanes);
        }
        let mut registered = HashSet::new();
        for lane in &self.lanes {
            if !registered.insert(lane) {
                return Err(ConfigError::DuplicateLane(lane.clone()));
            }
        }
        if self.capacity_per_lane == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.low_watermark > self.high_watermark {
            return Err(ConfigError::InvertedWatermarks {
                low: self.low_watermark,
                high: self.high_watermark,
            });
        }
        if self.rotation.is_empty() {
            return Err(ConfigError::EmptyRotation);
        }

        let check = |role: &'static str, lane: &LaneId| {
            if registered.contains(lane) {
                Ok(())
            } else {
                Err(ConfigError::UnknownLane {
                    role,
                    lane: lane.clone(),
                })
            }
        };

        let mut rotating = HashSet::new();
        for lane in &self.rotation {
            check("rotation", lane)?;
            if !rotating.insert(lane) {
                return Err(ConfigError::DuplicateRotationLane(lane.clone()));
            }
        }
        if let Some(priority) = &self.priority_lane {
            check("priority_lane", priority)?;
            if rotating.contains(priority) || self.free_flow_lanes.contains(priority) {
                return Err(ConfigError::RoleConflict(priority.clone()));
            }
        }
        for (follower, leader) in &self.coupling {
            check("coupling follower", follower)?;
            check("coupling leader", leader)?;
            if rotating.contains(follower) || self.free_flow_lanes.contains(follower) {
                return Err(ConfigError::RoleConflict(follower.clone()));
            }
            if !rotating.contains(leader) {
                return Err(ConfigError::LeaderNotInRotation {
                    follower: follower.clone(),
                    leader: leader.clone(),
                });
            }
        }
        for lane in &self.free_flow_lanes {
            check("free_flow_lanes", lane)?;
            if rotating.contains(lane) {
                return Err(ConfigError::RoleConflict(lane.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes(ids: &[&str]) -> Vec<LaneId> {
        ids.iter().map(|&id| LaneId::from(id)).collect()
    }

    #[test]
    fn default_config_is_valid() {
        let config = JunctionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_secs(5));
        assert_eq!(config.coupling.get(&LaneId::from("AL2")), Some(&LaneId::from("AL1")));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = JunctionConfig::from_json_str(r#"{ "capacity_per_lane": 20 }"#).unwrap();
        assert_eq!(config.capacity_per_lane, 20);
        assert_eq!(config.high_watermark, DEFAULT_HIGH_WATERMARK);
        assert_eq!(config.rotation.len(), 4);
    }

    #[test]
    fn rejects_inverted_watermarks() {
        let config = JunctionConfig {
            high_watermark: 3,
            low_watermark: 4,
            ..JunctionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedWatermarks { low: 4, high: 3 })
        ));
    }

    #[test]
    fn rejects_unknown_rotation_lane() {
        let config = JunctionConfig {
            rotation: lanes(&["AL1", "ZZ9"]),
            ..JunctionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownLane { role: "rotation", .. })
        ));
    }

    #[test]
    fn rejects_priority_lane_inside_rotation() {
        let config = JunctionConfig {
            priority_lane: Some(LaneId::from("BL1")),
            ..JunctionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::RoleConflict(_))));
    }

    #[test]
    fn rejects_follower_of_non_rotation_lane() {
        let mut config = JunctionConfig {
            lanes: lanes(&["AL1", "BL1", "AL2", "BL2"]),
            rotation: lanes(&["AL1", "BL1"]),
            ..JunctionConfig::default()
        };
        config.coupling.clear();
        config
            .coupling
            .insert(LaneId::from("BL2"), LaneId::from("AL2"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LeaderNotInRotation { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_and_empty_settings() {
        let duplicate = JunctionConfig {
            lanes: lanes(&["AL1", "AL1"]),
            ..JunctionConfig::default()
        };
        assert!(matches!(duplicate.validate(), Err(ConfigError::DuplicateLane(_))));

        let zero = JunctionConfig {
            capacity_per_lane: 0,
            ..JunctionConfig::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::ZeroCapacity)));

        let no_rotation = JunctionConfig {
            rotation: Vec::new(),
            ..JunctionConfig::default()
        };
        assert!(matches!(no_rotation.validate(), Err(ConfigError::EmptyRotation)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            JunctionConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
