// simulation_engine/mod.rs
pub mod junction;
pub mod lane_queue;
pub mod simulation;
