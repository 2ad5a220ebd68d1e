// simulation.rs
use crate::control_system::scheduler::spawn_scheduler;
use crate::data_structures::{LaneId, Vehicle};
use crate::monitoring::traffic_monitoring_system::{log_departure, log_report};
use crate::simulation_engine::junction::Junction;
use crate::simulation_engine::lane_queue::EnqueueError;

use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

const STATE_CODES: [&str; 5] = ["KA", "MH", "DL", "UP", "TN"];

/// Random plate-style id: state code, district, two letters, four digits.
pub fn generate_vehicle_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    let state = STATE_CODES[rng.random_range(0..STATE_CODES.len())];
    let district: u8 = rng.random_range(0..100);
    let first = rng.random_range(b'A'..=b'Z') as char;
    let second = rng.random_range(b'A'..=b'Z') as char;
    let serial: u16 = rng.random_range(0..10_000);
    format!("{state}{district:02}{first}{second}{serial:04}")
}

/// Feeds random vehicles into random lanes every 100-500 ms, forever.
/// Rejected vehicles are dropped.
pub async fn run_arrivals(junction: Arc<Junction>) {
    let lanes: Vec<LaneId> = junction.lane_ids().cloned().collect();
    if lanes.is_empty() {
        return;
    }
    loop {
        let (vehicle, delay) = {
            let mut rng = rand::rng();
            let lane = lanes[rng.random_range(0..lanes.len())].clone();
            let vehicle = Vehicle::new(generate_vehicle_number(&mut rng), lane);
            (vehicle, rng.random_range(100..500))
        };

        let lane = vehicle.lane.clone();
        let id = vehicle.id.clone();
        match junction.enqueue(lane.as_str(), vehicle) {
            Ok(()) => log::debug!("Vehicle {} added to lane {}", id, lane),
            Err(EnqueueError::CapacityExceeded { .. }) => {
                log::warn!("Vehicle {} dropped: lane {} is full", id, lane)
            }
            Err(e) => log::warn!("Vehicle {} rejected: {}", id, e),
        }
        sleep(Duration::from_millis(delay)).await;
    }
}

/// Runs a junction with a random arrival producer and the scheduler.
/// Departures go to the CSV log at `departures_csv`, and a status report is
/// logged once per tick interval.
pub async fn run_simulation(junction: Arc<Junction>, departures_csv: PathBuf) {
    let scheduler = spawn_scheduler(Arc::clone(&junction), move |departure| {
        log::info!(
            "Vehicle {} exited from lane {}",
            departure.vehicle.id,
            departure.vehicle.lane
        );
        log_departure(&departures_csv, &departure);
    });
    let arrivals = tokio::spawn(run_arrivals(Arc::clone(&junction)));

    let period = junction.config().tick_interval();
    let reporter = tokio::spawn(async move {
        loop {
            sleep(period).await;
            log_report(&junction.report());
        }
    });

    let _ = tokio::join!(scheduler, arrivals, reporter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::JunctionConfig;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn vehicle_numbers_follow_plate_format() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let plate = generate_vehicle_number(&mut rng);
            assert_eq!(plate.len(), 10);
            assert!(STATE_CODES.contains(&&plate[0..2]));
            assert!(plate[2..4].chars().all(|c| c.is_ascii_digit()));
            assert!(plate[4..6].chars().all(|c| c.is_ascii_uppercase()));
            assert!(plate[6..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn arrivals_fill_registered_lanes() {
        let junction = Arc::new(
            Junction::with_clock(JunctionConfig::default(), Arc::new(ManualClock::new())).unwrap(),
        );
        let producer = tokio::spawn(run_arrivals(Arc::clone(&junction)));
        sleep(Duration::from_secs(5)).await;
        producer.abort();

        let queued: usize = junction
            .lane_ids()
            .filter_map(|lane| junction.count(lane.as_str()))
            .sum();
        // At most one arrival every 100 ms, at least one every 500 ms.
        assert!(queued >= 10, "only {queued} vehicles queued");
        assert!(queued <= 51, "{queued} vehicles queued");
    }
}
