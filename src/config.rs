use crate::error::{Result, SimulationError};
use crate::global_variables::{
    DEFAULT_INITIAL_DELAY_MS, DEFAULT_ROUTE_DIRECTORY, DEFAULT_TICK_INTERVAL_MS,
    DEFAULT_TOTAL_VEHICLES,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings consumed by the simulator at startup.
///
/// Every field is optional in the JSON form; missing fields fall back to the
/// reference values in `global_variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Directory holding one `x,y` CSV file per route.
    pub route_directory: PathBuf,
    pub total_vehicles: usize,
    pub initial_delay_ms: u64,
    pub tick_interval_ms: u64,
    /// Fixed seed for fleet placement. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// How long the binary runs before stopping. `None` runs until Ctrl-C.
    pub run_seconds: Option<u64>,
    /// Optional CSV file receiving every update message.
    pub trace_path: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            route_directory: PathBuf::from(DEFAULT_ROUTE_DIRECTORY),
            total_vehicles: DEFAULT_TOTAL_VEHICLES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            seed: None,
            run_seconds: None,
            trace_path: None,
        }
    }
}

impl SimulationConfig {
    /// Reads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SimulationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SimulationConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(SimulationError::InvalidConfig(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
