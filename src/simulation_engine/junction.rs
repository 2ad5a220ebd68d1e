use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, JunctionConfig};
use crate::control_system::traffic_light_controller::{LightPlan, TrafficLightController};
use crate::data_structures::{
    Departure, LaneId, LightState, ReleaseKind, SchedulingMode, Vehicle,
};
use crate::shared_data::{current_timestamp, JunctionReport, LaneReport};
use crate::simulation_engine::lane_queue::{EnqueueError, LaneQueue, Watermarks};

const NEVER_TICKED: u64 = u64::MAX;

/// What a single scheduler tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub mode: SchedulingMode,
    pub green: Vec<LaneId>,
    pub released: usize,
}

#[derive(Debug, Default)]
struct LaneCounters {
    released: AtomicU64,
    rejected: AtomicU64,
}

/// A signalled junction: one queue per registered lane plus the scheduler state.
///
/// Producers call [`Junction::enqueue`] from any thread. A single scheduler
/// context calls [`Junction::tick`]. Scheduler state and lights are atomics so
/// presentation can read them without locking; such reads are eventually
/// consistent.
pub struct Junction {
    config: JunctionConfig,
    lanes: Vec<LaneQueue>,
    index: HashMap<LaneId, usize>,
    counters: Vec<LaneCounters>,
    controller: TrafficLightController,
    priority_active: AtomicBool,
    current_green_index: AtomicUsize,
    last_tick_millis: AtomicU64,
    ticks: AtomicU64,
    tick_guard: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl Junction {
    /// Builds a junction on the wall clock.
    pub fn new(config: JunctionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: JunctionConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let watermarks = Watermarks {
            high: config.high_watermark,
            low: config.low_watermark,
        };
        let index: HashMap<LaneId, usize> = config
            .lanes
            .iter()
            .cloned()
            .enumerate()
            .map(|(idx, lane)| (lane, idx))
            .collect();
        let lanes: Vec<LaneQueue> = config
            .lanes
            .iter()
            .map(|id| {
                LaneQueue::new(
                    id.clone(),
                    config.capacity_per_lane,
                    watermarks,
                    Arc::clone(&clock),
                )
            })
            .collect();
        let counters = config.lanes.iter().map(|_| LaneCounters::default()).collect();
        let controller = TrafficLightController::initialize(&config, &index);

        // Unsignalled lanes always show green.
        for (idx, lane) in lanes.iter().enumerate() {
            if controller.is_free_flow(idx) {
                lane.set_light(LightState::Green);
            }
        }

        Ok(Self {
            config,
            lanes,
            index,
            counters,
            controller,
            priority_active: AtomicBool::new(false),
            current_green_index: AtomicUsize::new(0),
            last_tick_millis: AtomicU64::new(NEVER_TICKED),
            ticks: AtomicU64::new(0),
            tick_guard: Mutex::new(()),
            clock,
        })
    }

    pub fn config(&self) -> &JunctionConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn lane_ids(&self) -> impl Iterator<Item = &LaneId> {
        self.lanes.iter().map(|lane| lane.id())
    }

    pub fn lane(&self, lane: &str) -> Option<&LaneQueue> {
        self.index.get(lane).map(|&idx| &self.lanes[idx])
    }

    /// Queues a vehicle on `lane`. The vehicle's `lane` field is overwritten
    /// with the lane it actually joined.
    pub fn enqueue(&self, lane: &str, mut vehicle: Vehicle) -> Result<(), EnqueueError> {
        let idx = *self
            .index
            .get(lane)
            .ok_or_else(|| EnqueueError::UnknownLane(lane.to_string()))?;
        vehicle.lane = self.lanes[idx].id().clone();
        let result = self.lanes[idx].enqueue(vehicle);
        if result.is_err() {
            self.counters[idx].rejected.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    pub fn count(&self, lane: &str) -> Option<usize> {
        self.lane(lane).map(LaneQueue::count)
    }

    pub fn light_state(&self, lane: &str) -> Option<LightState> {
        self.lane(lane).map(LaneQueue::light_state)
    }

    pub fn snapshot(&self, lane: &str) -> Option<Vec<Vehicle>> {
        self.lane(lane).map(LaneQueue::snapshot)
    }

    pub fn is_priority_active(&self) -> bool {
        self.priority_active.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> SchedulingMode {
        if self.is_priority_active() {
            SchedulingMode::Priority
        } else {
            SchedulingMode::Normal
        }
    }

    pub fn current_green_index(&self) -> usize {
        self.current_green_index.load(Ordering::Acquire)
    }

    /// Clock time of the most recent tick, if any.
    pub fn last_tick_time(&self) -> Option<Duration> {
        match self.last_tick_millis.load(Ordering::Acquire) {
            NEVER_TICKED => None,
            millis => Some(Duration::from_millis(millis)),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Runs one scheduling step: recompute the lights, then release vehicles.
    ///
    /// Each green signalled lane releases one vehicle; free-flow lanes drain.
    /// Every released vehicle is passed to `release` in lane order.
    pub fn tick(&self, release: &mut dyn FnMut(Departure)) -> TickOutcome {
        let _guard = self
            .tick_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let counts: Vec<usize> = self.lanes.iter().map(LaneQueue::count).collect();
        let was_priority = self.is_priority_active();
        let plan = self.controller.plan(&counts, was_priority, self.current_green_index());
        self.apply(&plan, was_priority);

        let now = self.clock.now();
        let mut released = 0;
        for (idx, lane) in self.lanes.iter().enumerate() {
            if self.controller.is_free_flow(idx) {
                // Bounded so a producer cannot hold the tick forever.
                for _ in 0..lane.capacity() {
                    let Some(vehicle) = lane.dequeue() else { break };
                    self.depart(idx, vehicle, now, ReleaseKind::FreeFlow, release);
                    released += 1;
                }
            } else if plan.lights[idx] == LightState::Green {
                if let Some(vehicle) = lane.dequeue() {
                    let kind = match plan.mode {
                        SchedulingMode::Priority => ReleaseKind::Priority,
                        SchedulingMode::Normal => ReleaseKind::Normal,
                    };
                    self.depart(idx, vehicle, now, kind, release);
                    released += 1;
                }
            }
        }

        self.last_tick_millis
            .store(now.as_millis() as u64, Ordering::Release);
        self.ticks.fetch_add(1, Ordering::Relaxed);

        TickOutcome {
            mode: plan.mode,
            green: plan
                .green_lanes()
                .map(|idx| self.lanes[idx].id().clone())
                .collect(),
            released,
        }
    }

    fn apply(&self, plan: &LightPlan, was_priority: bool) {
        let priority = plan.mode == SchedulingMode::Priority;
        if priority != was_priority {
            log::info!(
                "Junction switching to {:?} mode (priority lane {:?})",
                plan.mode,
                self.config.priority_lane
            );
        }
        self.priority_active.store(priority, Ordering::Release);
        self.current_green_index
            .store(plan.next_cursor, Ordering::Release);

        for (lane, &state) in self.lanes.iter().zip(&plan.lights) {
            lane.set_light(state);
        }
        if let Some(pos) = plan.selected {
            let lane = self.lanes[self.controller.rotation()[pos]].id();
            log::debug!("Green for lane {} (next scan starts at {})", lane, plan.next_cursor);
        }
    }

    fn depart(
        &self,
        idx: usize,
        vehicle: Vehicle,
        now: Duration,
        kind: ReleaseKind,
        release: &mut dyn FnMut(Departure),
    ) {
        self.counters[idx].released.fetch_add(1, Ordering::Relaxed);
        let waited = vehicle.waited(now);
        log::debug!(
            "Vehicle {} exited from lane {} after {:.1}s",
            vehicle.id,
            vehicle.lane,
            waited.as_secs_f64()
        );
        release(Departure {
            vehicle,
            released_at: now,
            waited,
            kind,
        });
    }

    /// Collects the current state of every lane.
    pub fn report(&self) -> JunctionReport {
        let now = self.clock.now();
        let lanes = self
            .lanes
            .iter()
            .zip(&self.counters)
            .map(|(lane, counters)| {
                let queued = lane.snapshot();
                LaneReport {
                    lane: lane.id().clone(),
                    count: queued.len(),
                    capacity: lane.capacity(),
                    light: lane.light_state(),
                    priority_flag: lane.is_priority(),
                    released: counters.released.load(Ordering::Relaxed),
                    rejected: counters.rejected.load(Ordering::Relaxed),
                    longest_wait_ms: queued
                        .first()
                        .map(|vehicle| vehicle.waited(now).as_millis() as u64)
                        .unwrap_or_default(),
                }
            })
            .collect();

        JunctionReport {
            timestamp: current_timestamp(),
            mode: self.mode(),
            current_green_index: self.current_green_index(),
            ticks: self.ticks(),
            lanes,
        }
    }
}

impl std::fmt::Debug for Junction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Junction")
            .field("lanes", &self.lanes)
            .field("mode", &self.mode())
            .field("current_green_index", &self.current_green_index())
            .finish()
    }
}
