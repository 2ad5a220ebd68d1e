use std::collections::HashMap;

use crate::config::JunctionConfig;
use crate::data_structures::{LaneId, LightState, SchedulingMode};
use crate::simulation_engine::lane_queue::Watermarks;

/// The lights chosen for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightPlan {
    pub mode: SchedulingMode,
    /// Position in the rotation subset that was turned green, if any.
    pub selected: Option<usize>,
    /// Rotation cursor for the next tick.
    pub next_cursor: usize,
    /// One entry per junction lane, in junction lane order.
    pub lights: Vec<LightState>,
}

impl LightPlan {
    pub fn green_lanes(&self) -> impl Iterator<Item = usize> + '_ {
        self.lights
            .iter()
            .enumerate()
            .filter(|&(_, &state)| state == LightState::Green)
            .map(|(idx, _)| idx)
    }
}

/// Decides which lanes are green from the queue lengths.
///
/// Holds only the lane layout; the mutable scheduler state (priority flag,
/// rotation cursor) is passed in and returned so the caller owns it.
#[derive(Debug, Clone)]
pub struct TrafficLightController {
    lane_count: usize,
    /// Junction lane indices in scan order.
    rotation: Vec<usize>,
    priority_lane: Option<usize>,
    /// (follower, leader) as junction lane indices.
    followers: Vec<(usize, usize)>,
    free_flow: Vec<usize>,
    watermarks: Watermarks,
}

impl TrafficLightController {
    /// Builds the controller for a validated config. `index` maps lane ids
    /// to their position in the junction.
    pub fn initialize(config: &JunctionConfig, index: &HashMap<LaneId, usize>) -> Self {
        let lookup = |lane: &LaneId| index.get(lane).copied();
        Self {
            lane_count: config.lanes.len(),
            rotation: config.rotation.iter().filter_map(lookup).collect(),
            priority_lane: config.priority_lane.as_ref().and_then(lookup),
            followers: config
                .coupling
                .iter()
                .filter_map(|(follower, leader)| Some((lookup(follower)?, lookup(leader)?)))
                .collect(),
            free_flow: config.free_flow_lanes.iter().filter_map(lookup).collect(),
            watermarks: Watermarks {
                high: config.high_watermark,
                low: config.low_watermark,
            },
        }
    }

    pub fn rotation(&self) -> &[usize] {
        &self.rotation
    }

    pub fn is_free_flow(&self, lane: usize) -> bool {
        self.free_flow.contains(&lane)
    }

    /// Whether priority mode holds after observing `counts`.
    pub fn next_priority(&self, counts: &[usize], priority_active: bool) -> bool {
        match self.priority_lane {
            Some(lane) => self.watermarks.next_flag(priority_active, counts[lane]),
            None => false,
        }
    }

    /// Picks the rotation position to turn green, scanning cyclically from `cursor`.
    ///
    /// A lane needs service when its count is at least the subset average.
    /// Lanes are compared as `count * n >= total` so a fractional average is
    /// not rounded down to let an empty lane through.
    pub fn select_rotation_lane(&self, counts: &[usize], cursor: usize) -> Option<usize> {
        let n = self.rotation.len();
        if n == 0 {
            return None;
        }
        let total: usize = self.rotation.iter().map(|&lane| counts[lane]).sum();
        // An empty subset has nothing to serve (average treated as 1).
        let needs_service = |count: usize| count > 0 && count * n >= total;

        let scan = |accept: &dyn Fn(usize) -> bool| {
            (0..n)
                .map(|offset| (cursor + offset) % n)
                .find(|&pos| accept(counts[self.rotation[pos]]))
        };

        scan(&needs_service).or_else(|| scan(&|count: usize| count > 0))
    }

    /// Computes the light plan for one tick.
    pub fn plan(&self, counts: &[usize], priority_active: bool, cursor: usize) -> LightPlan {
        debug_assert_eq!(counts.len(), self.lane_count);
        let mut lights = vec![LightState::Red; self.lane_count];
        for &lane in &self.free_flow {
            lights[lane] = LightState::Green;
        }

        if self.next_priority(counts, priority_active) {
            if let Some(lane) = self.priority_lane {
                lights[lane] = LightState::Green;
            }
            return LightPlan {
                mode: SchedulingMode::Priority,
                selected: None,
                next_cursor: cursor,
                lights,
            };
        }

        let selected = self.select_rotation_lane(counts, cursor);
        if let Some(pos) = selected {
            lights[self.rotation[pos]] = LightState::Green;
        }
        // Leaders are final at this point.
        for &(follower, leader) in &self.followers {
            lights[follower] = lights[leader];
        }

        let next_cursor = match selected {
            Some(pos) => (pos + 1) % self.rotation.len(),
            None => cursor,
        };
        LightPlan {
            mode: SchedulingMode::Normal,
            selected,
            next_cursor,
            lights,
        }
    }
}
