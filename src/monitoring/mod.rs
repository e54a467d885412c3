pub mod position_log;
pub mod vehicle_tracker;
