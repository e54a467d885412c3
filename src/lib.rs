pub mod communication;
pub mod config;
pub mod error;
pub mod global_variables;
pub mod monitoring;
pub mod simulation_engine;

pub use communication::messages::{Point, UpdateMessage};
pub use communication::update_channel::UpdateChannel;
pub use config::SimulationConfig;
pub use error::{Result, SimulationError};
pub use simulation_engine::simulation::Simulation;
pub use simulation_engine::vehicles::VehicleStatus;
