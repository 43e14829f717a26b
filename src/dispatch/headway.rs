use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::Config,
    shared::{Coordinate, Headway},
    store::{RouteId, RouteMeta, Vehicle},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Route {0} resolved to a vehicle capacity of zero")]
    ZeroCapacity(RouteId),
}

/// How a fractional vehicle requirement becomes a whole number of vehicles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Never run a route over capacity.
    #[default]
    Ceil,
    /// Round to the closest whole vehicle.
    Nearest,
}

impl Rounding {
    /// Vehicles needed to carry `passengers`, at least one when there is any demand.
    pub fn vehicles_for(&self, passengers: u32, capacity: u32) -> u32 {
        if passengers == 0 || capacity == 0 {
            return 0;
        }
        let vehicles = match self {
            Rounding::Ceil => passengers.div_ceil(capacity),
            Rounding::Nearest => (f64::from(passengers) / f64::from(capacity)).round() as u32,
        };
        vehicles.max(1)
    }
}

/// Vehicle requirement and departure interval of one route for the coming hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadwayPlan {
    pub route_id: RouteId,
    pub start: Coordinate,
    pub importance: f64,
    pub predicted_passengers: u32,
    pub capacity: u32,
    /// Vehicles to dispatch after the per route cap.
    pub required: u32,
    /// Vehicles the forecast asked for beyond the cap.
    pub capped: u32,
    pub headway: Option<Headway>,
}

/// Capacity to use for routes that do not configure one: the average of the
/// available fleet, or `default` when the fleet is empty.
pub fn fleet_capacity(vehicles: &[Vehicle], default: u32) -> u32 {
    if vehicles.is_empty() {
        return default;
    }
    let total: u64 = vehicles.iter().map(|vehicle| u64::from(vehicle.capacity)).sum();
    let average = (total / vehicles.len() as u64) as u32;
    if average == 0 { default } else { average }
}

pub fn plan(
    route: &RouteMeta,
    predicted_passengers: u32,
    fleet_capacity: u32,
    config: &Config,
) -> Result<HeadwayPlan, self::Error> {
    let capacity = route.capacity.unwrap_or(fleet_capacity);
    if capacity == 0 {
        return Err(self::Error::ZeroCapacity(route.route_id.clone()));
    }

    let wanted = config.rounding.vehicles_for(predicted_passengers, capacity);
    let required = wanted.min(config.max_vehicles_per_route);
    Ok(HeadwayPlan {
        route_id: route.route_id.clone(),
        start: route.start,
        importance: route.importance,
        predicted_passengers,
        capacity,
        required,
        capped: wanted - required,
        headway: Headway::across_hour(required),
    })
}
