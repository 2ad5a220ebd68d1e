pub mod scheduler;
pub mod traffic_light_controller;
