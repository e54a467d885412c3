use crate::simulation_engine::vehicles::VehicleStatus;
use serde::{Deserialize, Serialize};

/// A 2D map coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Snapshot of one vehicle taken during a tick.
///
/// Messages own their data, so consumers never observe live vehicle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub vehicle_id: String,
    pub position: Point,
    pub status: VehicleStatus,
}

impl UpdateMessage {
    pub fn new(vehicle_id: impl Into<String>, position: Point, status: VehicleStatus) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            position,
            status,
        }
    }
}
