//! Read side consumed by dashboards, never by the engine itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    shared::geo::{Coordinate, Distance, GRID_CELL_SIZE},
    store::{MemoryStore, Prediction, RouteId, TripId, TripStatus, Vehicle, VehicleId},
};

pub const DEFAULT_DISPATCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct RouteOverview {
    pub route_id: RouteId,
    pub short_name: String,
    /// Latest predicted passengers, zero when the route was never forecast.
    pub density: u32,
    /// Vehicles currently committed to the route.
    pub active_vehicles: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchRecord {
    pub trip_id: TripId,
    pub vehicle_id: VehicleId,
    pub route_id: RouteId,
    pub departure: DateTime<Utc>,
    pub status: TripStatus,
    pub predicted_passengers: Option<u32>,
}

impl MemoryStore {
    /// Most recently generated prediction for a route across all hours.
    pub fn latest_prediction(&self, route_id: &str) -> Option<&Prediction> {
        self.predictions
            .values()
            .filter(|prediction| prediction.route_id.as_ref() == route_id)
            .max_by(|a, b| {
                a.generated_at
                    .cmp(&b.generated_at)
                    .then(a.target_hour.cmp(&b.target_hour))
            })
    }

    /// Per route density and number of non terminal trips.
    pub fn route_overview(&self) -> Vec<RouteOverview> {
        let mut active: BTreeMap<&str, u32> = BTreeMap::new();
        self.active_trips().for_each(|trip| {
            *active.entry(trip.route_id.as_ref()).or_default() += 1;
        });
        self.routes
            .iter()
            .map(|route| RouteOverview {
                route_id: route.id.clone(),
                short_name: route.short_name.to_string(),
                density: self
                    .latest_prediction(&route.id)
                    .map(|prediction| prediction.predicted_passengers)
                    .unwrap_or(0),
                active_vehicles: active.get(route.id.as_ref()).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Trips departing at or after `since`, newest first.
    pub fn dispatch_records(&self, since: DateTime<Utc>, limit: usize) -> Vec<DispatchRecord> {
        let mut trips: Vec<_> = self
            .trips
            .iter()
            .filter(|trip| trip.departure >= since)
            .collect();
        trips.sort_by(|a, b| b.departure.cmp(&a.departure).then(a.id.cmp(&b.id)));
        trips
            .into_iter()
            .take(limit)
            .map(|trip| {
                let hour = crate::shared::truncate_to_hour(trip.departure);
                DispatchRecord {
                    trip_id: trip.id.clone(),
                    vehicle_id: trip.vehicle_id.clone(),
                    route_id: trip.route_id.clone(),
                    departure: trip.departure,
                    status: trip.status,
                    predicted_passengers: self
                        .prediction(&trip.route_id, hour)
                        .map(|prediction| prediction.predicted_passengers),
                }
            })
            .collect()
    }

    /// Polyline of every route, falling back to its two terminals.
    pub fn route_geometry(&self) -> BTreeMap<RouteId, Vec<Coordinate>> {
        self.routes
            .iter()
            .map(|route| {
                let line = match self.shapes.get(&route.id) {
                    Some(shape) if shape.len() >= 2 => shape.to_vec(),
                    _ => vec![route.start, route.end],
                };
                (route.id.clone(), line)
            })
            .collect()
    }

    /// Vehicles within `radius` of `coordinate`, nearest first.
    ///
    /// Walks the grid cells around `coordinate`, or every vehicle once the
    /// search area covers more cells than there are vehicles.
    pub fn vehicles_near(&self, coordinate: &Coordinate, radius: Distance) -> Vec<&Vehicle> {
        let candidates: Vec<&Vehicle> = match self.grid_reach(coordinate, radius) {
            Some((reach_x, reach_y)) => {
                let (origin_x, origin_y) = coordinate.to_grid();
                (-reach_x..=reach_x)
                    .flat_map(|x| (-reach_y..=reach_y).map(move |y| (origin_x + x, origin_y + y)))
                    .filter_map(|cell| self.vehicle_grid.get(&cell))
                    .flat_map(|members| members.iter())
                    .map(|index| &self.vehicles[*index as usize])
                    .collect()
            }
            None => self.vehicles.iter().collect(),
        };

        let mut found: Vec<(&Vehicle, Distance)> = candidates
            .into_iter()
            .map(|vehicle| (vehicle, vehicle.location.geodesic_distance(coordinate)))
            .filter(|(_, distance)| *distance <= radius)
            .collect();
        found.sort_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id.cmp(&b.id)));
        found.into_iter().map(|(vehicle, _)| vehicle).collect()
    }

    /// Cells to walk on each side of the origin, or None when a linear scan
    /// over the vehicles is cheaper or the walk would leave the grid.
    fn grid_reach(&self, coordinate: &Coordinate, radius: Distance) -> Option<(i32, i32)> {
        // Longitude cells shrink with latitude, so widen the horizontal reach.
        let lat_scale = coordinate.latitude.to_radians().cos().abs().max(0.01);
        let cells = (radius / GRID_CELL_SIZE).as_meters().abs();
        let reach_y = cells.ceil() + 1.0;
        let reach_x = (cells / lat_scale).ceil() + 1.0;
        let area = (2.0 * reach_x + 1.0) * (2.0 * reach_y + 1.0);
        if !area.is_finite() || area > self.vehicles.len() as f64 {
            return None;
        }
        let (reach_x, reach_y) = (reach_x as i32, reach_y as i32);
        let (origin_x, origin_y) = coordinate.to_grid();
        origin_x.checked_sub(reach_x)?;
        origin_x.checked_add(reach_x)?;
        origin_y.checked_sub(reach_y)?;
        origin_y.checked_add(reach_y)?;
        Some((reach_x, reach_y))
    }
}
