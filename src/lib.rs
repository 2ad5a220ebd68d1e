//! Lane queues and light scheduling for a single road junction.
//!
//! Producers push vehicles into per-lane queues with [`Junction::enqueue`];
//! a scheduler task ticks the junction at a fixed interval, choosing which
//! lanes are green and releasing vehicles from them.

pub mod clock;
pub mod config;
pub mod control_system;
pub mod data_structures;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, JunctionConfig};
pub use data_structures::{
    Departure, LaneId, LightState, ReleaseKind, SchedulingMode, Vehicle, WaitBand,
};
pub use simulation_engine::junction::{Junction, TickOutcome};
pub use simulation_engine::lane_queue::{EnqueueError, LaneQueue, Watermarks};
