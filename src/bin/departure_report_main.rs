use junction_sim::global_variables::DEPARTURES_CSV;
use junction_sim::monitoring::traffic_monitoring_system::generate_report;

fn main() {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEPARTURES_CSV.to_string());
    if let Err(e) = generate_report(&path) {
        eprintln!("Error generating report from {}: {}", path, e);
    }
}
