use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::time::Duration;

use crate::global_variables::{ELEVATED_WAIT_SECS, LONG_WAIT_SECS};

/// Identifier of a lane registered at the junction (e.g. "AL1").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(pub String);

impl LaneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LaneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LaneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The possible states for a lane's signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    Red,
    Green,
}

impl LightState {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            LightState::Red => 0,
            LightState::Green => 1,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LightState::Green,
            _ => LightState::Red,
        }
    }
}

/// Scheduling mode of a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// Fair rotation among the rotation subset.
    Normal,
    /// The priority lane is held green exclusively.
    Priority,
}

/// Why a vehicle left its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseKind {
    Normal,
    Priority,
    FreeFlow,
}

/// How long a queued vehicle has been waiting, bucketed for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitBand {
    Short,
    Elevated,
    Long,
}

impl WaitBand {
    pub fn classify(waited: Duration) -> Self {
        let secs = waited.as_secs();
        if secs > LONG_WAIT_SECS {
            WaitBand::Long
        } else if secs > ELEVATED_WAIT_SECS {
            WaitBand::Elevated
        } else {
            WaitBand::Short
        }
    }
}

/// A vehicle waiting at (or released from) the junction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Plate-style identifier, e.g. "KA12AB1234". Not checked for uniqueness.
    pub id: String,
    /// The lane the vehicle was enqueued into.
    pub lane: LaneId,
    /// Junction clock time at enqueue. Stamped by the lane if left empty.
    pub arrival_time: Option<Duration>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, lane: impl Into<LaneId>) -> Self {
        Self {
            id: id.into(),
            lane: lane.into(),
            arrival_time: None,
        }
    }

    /// Time spent queued as of `now`. Zero if the vehicle was never stamped.
    pub fn waited(&self, now: Duration) -> Duration {
        self.arrival_time
            .map(|arrived| now.saturating_sub(arrived))
            .unwrap_or_default()
    }

    pub fn wait_band(&self, now: Duration) -> WaitBand {
        WaitBand::classify(self.waited(now))
    }
}

/// A vehicle admitted to the junction during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    pub vehicle: Vehicle,
    pub released_at: Duration,
    pub waited: Duration,
    pub kind: ReleaseKind,
}
