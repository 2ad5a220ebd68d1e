// src/shared_data.rs

use crate::data_structures::{LaneId, LightState, SchedulingMode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Point-in-time view of one lane, for status output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneReport {
    pub lane: LaneId,
    pub count: usize,
    pub capacity: usize,
    pub light: LightState,
    pub priority_flag: bool,
    pub released: u64,
    pub rejected: u64,
    /// Wait of the oldest queued vehicle, in milliseconds.
    pub longest_wait_ms: u64,
}

/// Status of a whole junction (lanes + scheduler state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionReport {
    pub timestamp: u64,
    pub mode: SchedulingMode,
    pub current_green_index: usize,
    pub ticks: u64,
    pub lanes: Vec<LaneReport>,
}

impl JunctionReport {
    pub fn total_queued(&self) -> usize {
        self.lanes.iter().map(|lane| lane.count).sum()
    }
}

/// Seconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
