use crate::data_structures::{Departure, ReleaseKind};
use crate::shared_data::{current_timestamp, JunctionReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// One row of the departure log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartureRecord {
    pub timestamp: u64,
    pub vehicle_id: String,
    pub lane: String,
    pub kind: ReleaseKind,
    pub released_at_ms: u64,
    pub waited_ms: u64,
}

impl DepartureRecord {
    pub fn from_departure(departure: &Departure) -> Self {
        Self {
            timestamp: current_timestamp(),
            vehicle_id: departure.vehicle.id.clone(),
            lane: departure.vehicle.lane.to_string(),
            kind: departure.kind,
            released_at_ms: departure.released_at.as_millis() as u64,
            waited_ms: departure.waited.as_millis() as u64,
        }
    }
}

/// Per-lane totals read back from a departure log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneSummary {
    pub departures: usize,
    pub priority_releases: usize,
    pub total_wait_ms: u64,
    pub max_wait_ms: u64,
}

impl LaneSummary {
    pub fn mean_wait_ms(&self) -> f64 {
        if self.departures == 0 {
            0.0
        } else {
            self.total_wait_ms as f64 / self.departures as f64
        }
    }
}

/// Generic helper to append a record to a CSV file.
/// The header is only written when the file is new.
pub fn log_to_csv<T: Serialize>(path: impl AsRef<Path>, record: &T) -> Result<(), Box<dyn Error>> {
    let path = path.as_ref();
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn log_departure(path: impl AsRef<Path>, departure: &Departure) {
    if let Err(e) = log_to_csv(path, &DepartureRecord::from_departure(departure)) {
        log::error!("Error logging departure of {}: {}", departure.vehicle.id, e);
    }
}

/// Logs a junction status snapshot as one JSON line.
pub fn log_report(report: &JunctionReport) {
    match serde_json::to_string(report) {
        Ok(json) => log::info!("Junction status: {}", json),
        Err(e) => log::warn!("Could not serialise junction status: {}", e),
    }
}

pub fn read_departures(path: impl AsRef<Path>) -> Result<Vec<DepartureRecord>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: DepartureRecord = result?;
        records.push(record);
    }
    Ok(records)
}

pub fn summarise(records: &[DepartureRecord]) -> BTreeMap<String, LaneSummary> {
    let mut summary: BTreeMap<String, LaneSummary> = BTreeMap::new();
    for record in records {
        let lane = summary.entry(record.lane.clone()).or_default();
        lane.departures += 1;
        if record.kind == ReleaseKind::Priority {
            lane.priority_releases += 1;
        }
        lane.total_wait_ms += record.waited_ms;
        lane.max_wait_ms = lane.max_wait_ms.max(record.waited_ms);
    }
    summary
}

/// Prints per-lane departure counts and waits from a departure log.
pub fn generate_report(path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let records = read_departures(path)?;
    println!("Departure Report ({} vehicles)", records.len());
    for (lane, stats) in summarise(&records) {
        println!(
            "Lane {}: {} departures ({} in priority mode), mean wait {:.1}s, max wait {:.1}s",
            lane,
            stats.departures,
            stats.priority_releases,
            stats.mean_wait_ms() / 1000.0,
            stats.max_wait_ms as f64 / 1000.0
        );
    }
    Ok(())
}
