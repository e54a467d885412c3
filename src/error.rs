use crate::simulation_engine::routes::RouteId;
use std::path::PathBuf;

/// Errors raised while loading routes, building the fleet or driving the clock.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No route files found in {path}")]
    EmptyRouteDirectory { path: PathBuf },

    #[error("Malformed point in {path} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Route file {path} contains no points")]
    EmptyRoute { path: PathBuf },

    #[error("Route not found: {0}")]
    RouteNotFound(RouteId),

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Update listener panicked: {0}")]
    ListenerPanicked(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration format error: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
