// fleet.rs
//
// The fixed set of simulated vehicles. Each vehicle gets a random route, a
// random starting point on that route and a random status. Randomness is
// supplied by the caller so placement can be reproduced from a seed.

use crate::communication::update_channel::UpdateChannel;
use crate::error::{Result, SimulationError};
use crate::global_variables::VEHICLE_ID_PREFIX;
use crate::simulation_engine::routes::{RouteId, RouteStore};
use crate::simulation_engine::vehicles::{Vehicle, VehicleStatus};
use rand::Rng;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fleet {
    vehicles: Vec<Vehicle>,
}

impl Fleet {
    /// Creates `total_vehicles` vehicles named `VEH1..=VEHn`.
    pub fn create<R: Rng>(
        total_vehicles: usize,
        routes: &RouteStore,
        rng: &mut R,
    ) -> Result<Self> {
        if routes.is_empty() {
            return Err(SimulationError::InvalidState(
                "cannot place vehicles without routes",
            ));
        }

        let mut vehicles = Vec::with_capacity(total_vehicles);
        for vehicle_number in 1..=total_vehicles {
            let route_id = RouteId(rng.random_range(1..=routes.route_count() as u32));
            let route = routes.route(route_id)?;
            let position = rng.random_range(1..=route.point_count());
            let status = VehicleStatus::ALL[rng.random_range(0..VehicleStatus::ALL.len())];

            vehicles.push(Vehicle::new(
                format!("{}{}", VEHICLE_ID_PREFIX, vehicle_number),
                route_id,
                position,
                status,
            ));
        }

        log::info!(
            "Placed {} vehicles across {} routes",
            vehicles.len(),
            routes.route_count()
        );
        Ok(Self { vehicles })
    }

    /// Wraps an explicit set of vehicles, keeping their order.
    pub fn from_vehicles(vehicles: Vec<Vehicle>) -> Self {
        Self { vehicles }
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn for_each<F: FnMut(&Vehicle)>(&self, visitor: F) {
        self.vehicles.iter().for_each(visitor);
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Moves every vehicle one step and publishes one update per vehicle, in
    /// fleet order. Returns how many updates reached a listener.
    pub fn advance_all(&mut self, routes: &RouteStore, sink: &UpdateChannel) -> Result<usize> {
        self.advance_while(routes, sink, || true)
    }

    /// Like [`Fleet::advance_all`], but checks `keep_going` before each
    /// vehicle and leaves the rest of the fleet untouched once it returns
    /// `false`.
    pub fn advance_while<F>(
        &mut self,
        routes: &RouteStore,
        sink: &UpdateChannel,
        keep_going: F,
    ) -> Result<usize>
    where
        F: Fn() -> bool,
    {
        let mut delivered = 0;
        for vehicle in self.vehicles.iter_mut() {
            if !keep_going() {
                break;
            }
            let route = routes.route(vehicle.route_id)?;
            let position = vehicle.advance(route)?;
            if sink.publish(vehicle.update_message(position)) {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}
