// benches/bench_junction_tick.rs

use criterion::{black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration};
use junction_sim::{Junction, JunctionConfig, LaneId, ManualClock, Vehicle};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

// A junction with `num_lanes` rotation lanes, each holding `per_lane` vehicles.
fn create_junction(num_lanes: usize, per_lane: usize) -> Junction {
    let lanes: Vec<LaneId> = (0..num_lanes).map(|i| LaneId::new(format!("L{}", i))).collect();
    let config = JunctionConfig {
        lanes: lanes.clone(),
        rotation: lanes,
        priority_lane: None,
        coupling: BTreeMap::new(),
        capacity_per_lane: per_lane * 2,
        ..JunctionConfig::default()
    };
    let junction = Junction::with_clock(config, Arc::new(ManualClock::new())).unwrap();
    refill(&junction, per_lane);
    junction
}

fn refill(junction: &Junction, per_lane: usize) {
    let lanes: Vec<LaneId> = junction.lane_ids().cloned().collect();
    for lane in &lanes {
        while junction.count(lane.as_str()).unwrap_or(per_lane) < per_lane {
            let _ = junction.enqueue(lane.as_str(), Vehicle::new("bench", lane.as_str()));
        }
    }
}

fn bench_junction_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("junction_tick");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    // Run benchmarks for junctions of 4, 8 and 16 lanes.
    for &size in [4, 8, 16].iter() {
        group.bench_function(format!("lanes_{}", size), |b| {
            let junction = create_junction(size, 20);
            b.iter(|| {
                let outcome = junction.tick(&mut |departure| {
                    black_box(departure);
                });
                black_box(outcome);
                refill(&junction, 20);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_junction_tick);
criterion_main!(benches);
