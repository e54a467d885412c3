use crate::communication::messages::{Point, UpdateMessage};
use crate::error::{Result, SimulationError};
use crate::simulation_engine::routes::{Route, RouteId};
use serde::{Deserialize, Serialize};

/// Operational status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Available,
    OffDuty,
    OnRoute,
    AttendingCall,
}

impl VehicleStatus {
    /// All statuses, in declaration order. Random draws index into this.
    pub const ALL: [VehicleStatus; 4] = [
        VehicleStatus::Available,
        VehicleStatus::OffDuty,
        VehicleStatus::OnRoute,
        VehicleStatus::AttendingCall,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VehicleStatus::Available => "Available",
            VehicleStatus::OffDuty => "Off duty",
            VehicleStatus::OnRoute => "On route",
            VehicleStatus::AttendingCall => "Attending call",
        }
    }

    /// ARGB marker colour a map renderer would use for this status.
    pub fn marker_color(self) -> u32 {
        match self {
            VehicleStatus::Available => 0xFF00_AA00,
            VehicleStatus::OffDuty => 0xFF80_8080,
            VehicleStatus::OnRoute => 0xFF00_66FF,
            VehicleStatus::AttendingCall => 0xFFFF_0000,
        }
    }
}

/// A simulated vehicle bound to one route for its whole life.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: String,
    pub route_id: RouteId,
    /// 1-based index into the route's points.
    pub position: usize,
    pub status: VehicleStatus,
}

impl Vehicle {
    pub fn new(
        id: impl Into<String>,
        route_id: RouteId,
        position: usize,
        status: VehicleStatus,
    ) -> Self {
        Self {
            id: id.into(),
            route_id,
            position,
            status,
        }
    }

    /// Moves one step along `route` and returns the point now occupied.
    ///
    /// The next index is kept only while it is strictly below the route's
    /// point count; otherwise the vehicle wraps back to position 1. The final
    /// point of a route is therefore never occupied.
    pub fn advance(&mut self, route: &Route) -> Result<Point> {
        if route.id != self.route_id {
            return Err(SimulationError::InvalidState(
                "vehicle advanced along a route it is not assigned to",
            ));
        }
        let next = self.position + 1;
        self.position = if next < route.point_count() { next } else { 1 };
        route
            .point_at(self.position)
            .ok_or(SimulationError::RouteNotFound(self.route_id))
    }

    /// Snapshot of this vehicle at `position`.
    pub fn update_message(&self, position: Point) -> UpdateMessage {
        UpdateMessage::new(self.id.clone(), position, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::routes::RouteStore;

    fn straight_route(points: usize) -> RouteStore {
        let line: Vec<Point> = (0..points).map(|i| Point::new(i as f64, 0.0)).collect();
        RouteStore::from_point_lists(vec![line]).unwrap()
    }

    #[test]
    fn advances_while_below_point_count() {
        let store = straight_route(5);
        let route = store.route(RouteId(1)).unwrap();
        let mut vehicle = Vehicle::new("VEH1", RouteId(1), 3, VehicleStatus::OnRoute);

        let point = vehicle.advance(route).unwrap();

        assert_eq!(vehicle.position, 4);
        assert_eq!(point, Point::new(3.0, 0.0));
    }

    #[test]
    fn wraps_before_reaching_last_point() {
        let store = straight_route(5);
        let route = store.route(RouteId(1)).unwrap();
        let mut vehicle = Vehicle::new("VEH1", RouteId(1), 4, VehicleStatus::Available);

        let point = vehicle.advance(route).unwrap();

        assert_eq!(vehicle.position, 1);
        assert_eq!(point, Point::new(0.0, 0.0));
    }

    #[test]
    fn vehicle_placed_on_last_point_wraps() {
        let store = straight_route(3);
        let route = store.route(RouteId(1)).unwrap();
        let mut vehicle = Vehicle::new("VEH1", RouteId(1), 3, VehicleStatus::Available);
        vehicle.advance(route).unwrap();
        assert_eq!(vehicle.position, 1);
    }

    #[test]
    fn single_point_route_stays_at_start() {
        let store = straight_route(1);
        let route = store.route(RouteId(1)).unwrap();
        let mut vehicle = Vehicle::new("VEH1", RouteId(1), 1, VehicleStatus::OffDuty);
        for _ in 0..3 {
            assert_eq!(vehicle.advance(route).unwrap(), Point::new(0.0, 0.0));
            assert_eq!(vehicle.position, 1);
        }
    }

    #[test]
    fn full_cycle_skips_final_point() {
        let store = straight_route(4);
        let route = store.route(RouteId(1)).unwrap();
        let mut vehicle = Vehicle::new("VEH1", RouteId(1), 1, VehicleStatus::OnRoute);
        let visited: Vec<usize> = (0..6)
            .map(|_| {
                vehicle.advance(route).unwrap();
                vehicle.position
            })
            .collect();
        assert_eq!(visited, vec![2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn update_message_is_a_snapshot() {
        let mut vehicle = Vehicle::new("VEH9", RouteId(1), 1, VehicleStatus::AttendingCall);
        let message = vehicle.update_message(Point::new(2.0, 3.0));
        vehicle.status = VehicleStatus::Available;

        assert_eq!(message.vehicle_id, "VEH9");
        assert_eq!(message.status, VehicleStatus::AttendingCall);
    }

    #[test]
    fn status_serializes_in_screaming_case() {
        let json = serde_json::to_string(&VehicleStatus::AttendingCall).unwrap();
        assert_eq!(json, "\"ATTENDING_CALL\"");
    }
}
