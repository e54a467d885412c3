// simulation_engine/mod.rs
pub mod clock;
pub mod fleet;
pub mod routes;
pub mod simulation;
pub mod vehicles;
