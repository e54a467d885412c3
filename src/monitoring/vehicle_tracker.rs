// vehicle_tracker.rs
//
// Consumer-side view of the fleet: the latest known position and status of
// every vehicle that has reported at least once, keyed by vehicle id. A map
// client keeps one graphic per entry and moves it on every update.

use crate::communication::messages::{Point, UpdateMessage};
use crate::simulation_engine::vehicles::VehicleStatus;
use std::collections::HashMap;

/// Outcome of applying an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerChange {
    /// First update for this vehicle.
    Added,
    Moved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedVehicle {
    pub position: Point,
    pub status: VehicleStatus,
    pub updates: u64,
}

#[derive(Debug, Default)]
pub struct VehicleTracker {
    vehicles: HashMap<String, TrackedVehicle>,
    total_updates: u64,
}

impl VehicleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: UpdateMessage) -> TrackerChange {
        self.total_updates += 1;
        match self.vehicles.get_mut(&message.vehicle_id) {
            Some(tracked) => {
                tracked.position = message.position;
                tracked.status = message.status;
                tracked.updates += 1;
                TrackerChange::Moved
            }
            None => {
                self.vehicles.insert(
                    message.vehicle_id,
                    TrackedVehicle {
                        position: message.position,
                        status: message.status,
                        updates: 1,
                    },
                );
                TrackerChange::Added
            }
        }
    }

    pub fn get(&self, vehicle_id: &str) -> Option<&TrackedVehicle> {
        self.vehicles.get(vehicle_id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn total_updates(&self) -> u64 {
        self.total_updates
    }

    /// Number of tracked vehicles per status, in `VehicleStatus::ALL` order.
    pub fn status_census(&self) -> Vec<(VehicleStatus, usize)> {
        VehicleStatus::ALL
            .iter()
            .map(|&status| {
                let count = self
                    .vehicles
                    .values()
                    .filter(|tracked| tracked.status == status)
                    .count();
                (status, count)
            })
            .collect()
    }
}
