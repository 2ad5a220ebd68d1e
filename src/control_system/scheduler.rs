use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::data_structures::Departure;
use crate::simulation_engine::junction::Junction;

/// Drives `Junction::tick` every `period`, forever.
///
/// The first tick fires after one full period. The loop only ends when the
/// task running it is dropped or aborted.
pub async fn run_update_loop<F>(junction: Arc<Junction>, period: Duration, mut release: F)
where
    F: FnMut(Departure) + Send,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // `interval` completes its first tick immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let outcome = junction.tick(&mut release);
        log::debug!(
            "Tick {}: {:?} mode, green {:?}, released {}",
            junction.ticks(),
            outcome.mode,
            outcome.green,
            outcome.released
        );
    }
}

/// Spawns the scheduler loop on the current tokio runtime, using the
/// junction's configured tick interval.
pub fn spawn_scheduler<F>(junction: Arc<Junction>, release: F) -> JoinHandle<()>
where
    F: FnMut(Departure) + Send + 'static,
{
    let period = junction.config().tick_interval();
    log::info!("Starting scheduler with a {:?} tick", period);
    tokio::spawn(run_update_loop(junction, period, release))
}
