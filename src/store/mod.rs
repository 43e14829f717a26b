use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

mod entities;
pub mod read;
mod source;
pub use entities::*;
pub use read::*;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::{
    demand::{self, DemandForecast, DemandSource},
    shared::geo::Coordinate,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Vehicle id does not match any entry: {0}")]
    UnknownVehicle(VehicleId),
    #[error("Trip id does not match any entry: {0}")]
    UnknownTrip(TripId),
    #[error("Route id does not match any entry: {0}")]
    UnknownRoute(RouteId),
    #[error("Vehicle {id} is {status:?} and cannot be {action}")]
    InvalidVehicleState {
        id: VehicleId,
        status: VehicleStatus,
        action: &'static str,
    },
    #[error("Vehicle {0} is assigned to more than one trip in the same schedule")]
    VehicleClaimedTwice(VehicleId),
    #[error("Trip {0} already exists")]
    DuplicateTrip(TripId),
    #[error("Trip {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: TripId,
        from: TripStatus,
        to: TripStatus,
    },
    #[error("Vehicle {vehicle} cannot be released while trip {trip} is active")]
    TripStillActive { vehicle: VehicleId, trip: TripId },
    #[error("Route {route} importance must be a non negative number, got {importance}")]
    InvalidImportance { route: RouteId, importance: f64 },
    #[error("Commit deadline passed before the schedule could be applied")]
    Timeout,
}

/// Data access contract the dispatch engine runs against.
///
/// Reads return owned rows so an implementation backed by a real database can
/// hand out query results without holding any borrow.
pub trait FleetStore {
    /// Every vehicle regardless of status.
    fn vehicles(&self) -> Result<Vec<Vehicle>, self::Error>;

    fn available_vehicles(&self) -> Result<Vec<Vehicle>, self::Error>;

    fn route_meta(&self) -> Result<Vec<RouteMeta>, self::Error>;

    fn trip(&self, id: &str) -> Result<Option<DispatchTrip>, self::Error>;

    /// Marks an available vehicle as serving `trip_id`.
    fn claim_vehicle(&mut self, id: &str, trip_id: &TripId) -> Result<(), self::Error>;

    /// Returns an in service vehicle to the available pool.
    ///
    /// Rejected with [`Error::TripStillActive`] while the vehicle's trip has not
    /// reached a terminal status.
    fn release_vehicle(&mut self, id: &str) -> Result<(), self::Error>;

    /// Closes a trip whose service window has elapsed.
    fn complete_trip(&mut self, id: &str) -> Result<(), self::Error>;

    /// Keeps forecasts for `hour` produced at `generated_at` so the read side
    /// can report them.
    fn record_forecasts(
        &mut self,
        hour: DateTime<Utc>,
        generated_at: DateTime<Utc>,
        forecasts: &[DemandForecast],
    ) -> Result<(), self::Error>;

    /// Persists a whole schedule or nothing.
    ///
    /// Every trip is checked before anything is written, and nothing is written
    /// once `deadline` has passed.
    fn commit_schedule(
        &mut self,
        trips: &[DispatchTrip],
        deadline: Instant,
    ) -> Result<(), self::Error>;
}

type IdToIndex = HashMap<Arc<str>, u32>;
type CellToVehicles = HashMap<(i32, i32), Vec<u32>>;
type PredictionKey = (DateTime<Utc>, RouteId);

/// In process fleet state store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub(crate) routes: Vec<Route>,
    pub(crate) depots: Vec<Depot>,
    pub(crate) vehicles: Vec<Vehicle>,
    pub(crate) trips: Vec<DispatchTrip>,
    pub(crate) predictions: HashMap<PredictionKey, Prediction>,
    pub(crate) shapes: HashMap<RouteId, Box<[Coordinate]>>,

    route_lookup: IdToIndex,
    depot_lookup: IdToIndex,
    vehicle_lookup: IdToIndex,
    trip_lookup: IdToIndex,
    vehicle_grid: CellToVehicles,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a route, replacing any route with the same id.
    pub fn add_route(&mut self, mut route: Route) -> u32 {
        if let Some(index) = self.route_lookup.get(&route.id).copied() {
            route.index = index;
            self.routes[index as usize] = route;
            return index;
        }
        let index = self.routes.len() as u32;
        route.index = index;
        self.route_lookup.insert(route.id.clone(), index);
        self.routes.push(route);
        index
    }

    pub fn add_depot(&mut self, mut depot: Depot) -> u32 {
        if let Some(index) = self.depot_lookup.get(&depot.id).copied() {
            depot.index = index;
            self.depots[index as usize] = depot;
            return index;
        }
        let index = self.depots.len() as u32;
        depot.index = index;
        self.depot_lookup.insert(depot.id.clone(), index);
        self.depots.push(depot);
        index
    }

    /// Adds a vehicle and places it in the grid index.
    /// A vehicle with an existing id replaces the old entry.
    pub fn add_vehicle(&mut self, mut vehicle: Vehicle) -> u32 {
        if let Some(index) = self.vehicle_lookup.get(&vehicle.id).copied() {
            vehicle.index = index;
            vehicle.cell = self.vehicles[index as usize].cell;
            let location = vehicle.location;
            self.vehicles[index as usize] = vehicle;
            self.relocate_vehicle(index, location);
            return index;
        }
        let index = self.vehicles.len() as u32;
        vehicle.index = index;
        vehicle.cell = vehicle.location.to_grid();
        self.vehicle_lookup.insert(vehicle.id.clone(), index);
        self.vehicle_grid.entry(vehicle.cell).or_default().push(index);
        self.vehicles.push(vehicle);
        index
    }

    /// Stores a prediction unless a newer generation already exists for the
    /// same route and hour. Returns whether the prediction is now active.
    pub fn upsert_prediction(&mut self, prediction: Prediction) -> bool {
        let key = (prediction.target_hour, prediction.route_id.clone());
        match self.predictions.get(&key) {
            Some(current) if current.generated_at > prediction.generated_at => {
                debug!(
                    "Ignoring stale prediction for {} at {}",
                    prediction.route_id, prediction.target_hour
                );
                false
            }
            _ => {
                self.predictions.insert(key, prediction);
                true
            }
        }
    }

    pub fn set_importance(&mut self, route_id: &str, importance: f64) -> Result<(), self::Error> {
        let index = self.route_index(route_id)?;
        if !is_valid_importance(importance) {
            return Err(self::Error::InvalidImportance {
                route: self.routes[index].id.clone(),
                importance,
            });
        }
        self.routes[index].importance = importance;
        Ok(())
    }

    /// Records a new position reported by a vehicle and keeps the grid index
    /// in step with it.
    pub fn record_position(
        &mut self,
        vehicle_id: &str,
        coordinate: Coordinate,
    ) -> Result<(), self::Error> {
        let index = self.vehicle_index(vehicle_id)?;
        self.relocate_vehicle(index as u32, coordinate);
        Ok(())
    }

    /// Applies a telemetry status change to a trip.
    /// Vehicles are not touched here, the next cleanup picks the change up.
    pub fn update_trip_status(&mut self, trip_id: &str, status: TripStatus) -> Result<(), self::Error> {
        let index = self.trip_index(trip_id)?;
        let trip = &mut self.trips[index];
        if !trip.status.can_become(status) {
            return Err(self::Error::InvalidTransition {
                id: trip.id.clone(),
                from: trip.status,
                to: status,
            });
        }
        trip.status = status;
        Ok(())
    }

    /// Takes a vehicle out of rotation. Only idle vehicles can be withdrawn.
    pub fn send_to_maintenance(&mut self, vehicle_id: &str) -> Result<(), self::Error> {
        let index = self.vehicle_index(vehicle_id)?;
        let vehicle = &mut self.vehicles[index];
        match vehicle.status {
            VehicleStatus::Available | VehicleStatus::Maintenance => {
                vehicle.status = VehicleStatus::Maintenance;
                Ok(())
            }
            VehicleStatus::InService => Err(self::Error::InvalidVehicleState {
                id: vehicle.id.clone(),
                status: vehicle.status,
                action: "sent to maintenance",
            }),
        }
    }

    pub fn return_from_maintenance(&mut self, vehicle_id: &str) -> Result<(), self::Error> {
        let index = self.vehicle_index(vehicle_id)?;
        let vehicle = &mut self.vehicles[index];
        match vehicle.status {
            VehicleStatus::Maintenance | VehicleStatus::Available => {
                vehicle.status = VehicleStatus::Available;
                Ok(())
            }
            VehicleStatus::InService => Err(self::Error::InvalidVehicleState {
                id: vehicle.id.clone(),
                status: vehicle.status,
                action: "returned from maintenance",
            }),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn depots(&self) -> &[Depot] {
        &self.depots
    }

    pub fn trips(&self) -> &[DispatchTrip] {
        &self.trips
    }

    /// Get a route with the given id.
    /// If no route is found with the given id None is returned.
    pub fn route_by_id(&self, id: &str) -> Option<&Route> {
        let index = self.route_lookup.get(id)?;
        Some(&self.routes[*index as usize])
    }

    pub fn depot_by_id(&self, id: &str) -> Option<&Depot> {
        let index = self.depot_lookup.get(id)?;
        Some(&self.depots[*index as usize])
    }

    pub fn vehicle_by_id(&self, id: &str) -> Option<&Vehicle> {
        let index = self.vehicle_lookup.get(id)?;
        Some(&self.vehicles[*index as usize])
    }

    pub fn trip_by_id(&self, id: &str) -> Option<&DispatchTrip> {
        let index = self.trip_lookup.get(id)?;
        Some(&self.trips[*index as usize])
    }

    /// The active prediction for a route and hour.
    pub fn prediction(&self, route_id: &str, hour: DateTime<Utc>) -> Option<&Prediction> {
        self.predictions.get(&(hour, Arc::from(route_id)))
    }

    /// Trips that still hold their vehicle.
    pub fn active_trips(&self) -> impl Iterator<Item = &DispatchTrip> {
        self.trips.iter().filter(|trip| !trip.status.is_terminal())
    }

    /// This is the only place a vehicle's location and grid cell change.
    fn relocate_vehicle(&mut self, index: u32, coordinate: Coordinate) {
        let vehicle = &mut self.vehicles[index as usize];
        let old_cell = vehicle.cell;
        vehicle.location = coordinate;
        vehicle.cell = coordinate.to_grid();
        let new_cell = vehicle.cell;

        if let Some(members) = self.vehicle_grid.get_mut(&old_cell) {
            members.retain(|member| *member != index);
            if members.is_empty() {
                self.vehicle_grid.remove(&old_cell);
            }
        }
        self.vehicle_grid.entry(new_cell).or_default().push(index);
    }

    fn route_index(&self, id: &str) -> Result<usize, self::Error> {
        self.route_lookup
            .get(id)
            .map(|index| *index as usize)
            .ok_or_else(|| self::Error::UnknownRoute(id.into()))
    }

    fn vehicle_index(&self, id: &str) -> Result<usize, self::Error> {
        self.vehicle_lookup
            .get(id)
            .map(|index| *index as usize)
            .ok_or_else(|| self::Error::UnknownVehicle(id.into()))
    }

    fn trip_index(&self, id: &str) -> Result<usize, self::Error> {
        self.trip_lookup
            .get(id)
            .map(|index| *index as usize)
            .ok_or_else(|| self::Error::UnknownTrip(id.into()))
    }

    fn check_schedule(&self, trips: &[DispatchTrip]) -> Result<(), self::Error> {
        let mut trip_ids: HashSet<&str> = HashSet::with_capacity(trips.len());
        let mut vehicle_ids: HashSet<&str> = HashSet::with_capacity(trips.len());
        for trip in trips {
            if self.trip_lookup.contains_key(&trip.id) || !trip_ids.insert(trip.id.as_ref()) {
                return Err(self::Error::DuplicateTrip(trip.id.clone()));
            }
            if !self.route_lookup.contains_key(&trip.route_id) {
                return Err(self::Error::UnknownRoute(trip.route_id.clone()));
            }
            let vehicle = &self.vehicles[self.vehicle_index(&trip.vehicle_id)?];
            if !vehicle.is_available() {
                return Err(self::Error::InvalidVehicleState {
                    id: vehicle.id.clone(),
                    status: vehicle.status,
                    action: "assigned",
                });
            }
            if !vehicle_ids.insert(trip.vehicle_id.as_ref()) {
                return Err(self::Error::VehicleClaimedTwice(trip.vehicle_id.clone()));
            }
        }
        Ok(())
    }
}

impl FleetStore for MemoryStore {
    fn vehicles(&self) -> Result<Vec<Vehicle>, self::Error> {
        Ok(self.vehicles.clone())
    }

    fn available_vehicles(&self) -> Result<Vec<Vehicle>, self::Error> {
        Ok(self
            .vehicles
            .iter()
            .filter(|vehicle| vehicle.is_available())
            .cloned()
            .collect())
    }

    fn route_meta(&self) -> Result<Vec<RouteMeta>, self::Error> {
        Ok(self.routes.iter().map(RouteMeta::from).collect())
    }

    fn trip(&self, id: &str) -> Result<Option<DispatchTrip>, self::Error> {
        Ok(self.trip_by_id(id).cloned())
    }

    fn claim_vehicle(&mut self, id: &str, trip_id: &TripId) -> Result<(), self::Error> {
        let index = self.vehicle_index(id)?;
        let vehicle = &mut self.vehicles[index];
        match vehicle.status {
            VehicleStatus::Available => {
                vehicle.status = VehicleStatus::InService;
                vehicle.trip = Some(trip_id.clone());
                Ok(())
            }
            VehicleStatus::InService | VehicleStatus::Maintenance => {
                Err(self::Error::InvalidVehicleState {
                    id: vehicle.id.clone(),
                    status: vehicle.status,
                    action: "claimed",
                })
            }
        }
    }

    fn release_vehicle(&mut self, id: &str) -> Result<(), self::Error> {
        let index = self.vehicle_index(id)?;
        let active = self.vehicles[index]
            .trip
            .as_ref()
            .and_then(|trip_id| self.trip_by_id(trip_id))
            .filter(|trip| !trip.status.is_terminal());
        if let Some(trip) = active {
            return Err(self::Error::TripStillActive {
                vehicle: self.vehicles[index].id.clone(),
                trip: trip.id.clone(),
            });
        }
        let vehicle = &mut self.vehicles[index];
        match vehicle.status {
            VehicleStatus::InService | VehicleStatus::Available => {
                vehicle.status = VehicleStatus::Available;
                vehicle.trip = None;
                Ok(())
            }
            VehicleStatus::Maintenance => Err(self::Error::InvalidVehicleState {
                id: vehicle.id.clone(),
                status: vehicle.status,
                action: "released",
            }),
        }
    }

    fn complete_trip(&mut self, id: &str) -> Result<(), self::Error> {
        let index = self.trip_index(id)?;
        let trip = &mut self.trips[index];
        if !trip.status.is_terminal() {
            trip.status = TripStatus::Completed;
        }
        Ok(())
    }

    fn record_forecasts(
        &mut self,
        hour: DateTime<Utc>,
        generated_at: DateTime<Utc>,
        forecasts: &[DemandForecast],
    ) -> Result<(), self::Error> {
        let mut recorded = 0;
        for forecast in forecasts {
            if self.route_lookup.contains_key(forecast.route_id.as_ref()) {
                let prediction = Prediction {
                    route_id: forecast.route_id.clone(),
                    target_hour: hour,
                    predicted_passengers: forecast.predicted_passengers,
                    generated_at,
                };
                if self.upsert_prediction(prediction) {
                    recorded += 1;
                }
            }
        }
        debug!("Recorded {} forecasts for {}", recorded, hour);
        Ok(())
    }

    fn commit_schedule(
        &mut self,
        trips: &[DispatchTrip],
        deadline: Instant,
    ) -> Result<(), self::Error> {
        self.check_schedule(trips)?;
        if Instant::now() > deadline {
            return Err(self::Error::Timeout);
        }

        // check_schedule guarantees every claim below succeeds.
        for trip in trips {
            self.claim_vehicle(&trip.vehicle_id, &trip.id)?;
            let index = self.trips.len() as u32;
            self.trip_lookup.insert(trip.id.clone(), index);
            self.trips.push(trip.clone());
        }
        debug!("Committed {} trips", trips.len());
        Ok(())
    }
}

impl DemandSource for MemoryStore {
    fn predictions(
        &self,
        hour: DateTime<Utc>,
        _timeout: Duration,
    ) -> Result<Vec<DemandForecast>, demand::Error> {
        let mut forecasts: Vec<_> = self
            .predictions
            .values()
            .filter(|prediction| prediction.target_hour == hour)
            .map(|prediction| DemandForecast {
                route_id: prediction.route_id.clone(),
                predicted_passengers: prediction.predicted_passengers,
            })
            .collect();
        forecasts.sort_by(|a, b| a.route_id.cmp(&b.route_id));
        Ok(forecasts)
    }
}
