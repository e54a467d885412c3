// Reference values of the position simulator.
pub const DEFAULT_ROUTE_DIRECTORY: &str = "./data";
pub const DEFAULT_TOTAL_VEHICLES: usize = 5000;

// Timing: first tick after one second, then 50 ticks per second.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 20;

pub const VEHICLE_ID_PREFIX: &str = "VEH";
