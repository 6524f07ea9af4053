pub mod alerts;
pub mod devices;
pub mod facilities;
pub mod occupancy_events;
pub mod telemetry_readings;
pub mod zone_targets;
pub mod zones;
