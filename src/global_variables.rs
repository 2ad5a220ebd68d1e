// Default junction layout
pub const DEFAULT_LANES: [&str; 5] = ["AL1", "BL1", "CL1", "DL1", "AL2"];
pub const DEFAULT_ROTATION: [&str; 4] = ["AL1", "BL1", "CL1", "DL1"];
pub const DEFAULT_PRIORITY_LANE: &str = "AL2";
// AL2 shares the A approach with AL1
pub const DEFAULT_COUPLING: [(&str, &str); 1] = [("AL2", "AL1")];

// Queue limits
pub const DEFAULT_CAPACITY_PER_LANE: usize = 100;
pub const DEFAULT_HIGH_WATERMARK: usize = 10;
pub const DEFAULT_LOW_WATERMARK: usize = 5;

// Scheduler period
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5_000;

// Wait bands used by presentation (seconds)
pub const ELEVATED_WAIT_SECS: u64 = 15;
pub const LONG_WAIT_SECS: u64 = 30;

// Monitoring output
pub const DEPARTURES_CSV: &str = "departures.csv";
