// junction_main.rs
use junction_sim::global_variables::DEPARTURES_CSV;
use junction_sim::simulation_engine::simulation::run_simulation;
use junction_sim::{Junction, JunctionConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match JunctionConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid junction config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => JunctionConfig::default(),
    };
    let departures_csv = std::env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEPARTURES_CSV));

    let junction = match Junction::new(config) {
        Ok(junction) => Arc::new(junction),
        Err(e) => {
            eprintln!("Could not build junction: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Starting junction with lanes {:?}, logging departures to {}",
        junction.lane_ids().collect::<Vec<_>>(),
        departures_csv.display()
    );
    run_simulation(junction, departures_csv).await;
}
