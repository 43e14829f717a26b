use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::geo::Coordinate;

pub type RouteId = Arc<str>;
pub type VehicleId = Arc<str>;
pub type DepotId = Arc<str>;
pub type TripId = Arc<str>;

/// A scheduled line served by the fleet between two terminal stops.
#[derive(Debug, Default, Clone)]
pub struct Route {
    /// The global internal index used for O(1) array lookups in the store.
    pub index: u32,
    /// The unique external identifier.
    pub id: RouteId,
    /// Rider facing name (e.g., "B46").
    pub short_name: Arc<str>,
    /// Location of the first stop, where every departure begins.
    pub start: Coordinate,
    /// Location of the last stop.
    pub end: Coordinate,
    /// Operator configured criticality, zero for an ordinary route.
    pub importance: f64,
    /// Passengers one vehicle carries on this route, if configured.
    pub capacity: Option<u32>,
}

/// Importance scales demand by `1 + importance`, so it has to be a finite,
/// non negative weight for scores to grow with demand.
pub fn is_valid_importance(importance: f64) -> bool {
    importance.is_finite() && importance >= 0.0
}

/// A garage vehicles return to and start from.
#[derive(Debug, Default, Clone)]
pub struct Depot {
    pub index: u32,
    pub id: DepotId,
    pub name: Arc<str>,
    pub coordinate: Coordinate,
}

/// Operational state of a vehicle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    #[default]
    Available,
    InService,
    /// Out of rotation, never eligible for assignment.
    Maintenance,
}

#[derive(Debug, Default, Clone)]
pub struct Vehicle {
    pub index: u32,
    pub id: VehicleId,
    pub status: VehicleStatus,
    pub location: Coordinate,
    /// Grid cell of `location`, kept in sync by the store's write path.
    pub cell: (i32, i32),
    pub home_depot: DepotId,
    /// The trip this vehicle is currently serving.
    pub trip: Option<TripId>,
    pub capacity: u32,
}

impl Vehicle {
    pub fn is_available(&self) -> bool {
        matches!(self.status, VehicleStatus::Available)
    }
}

/// Forecast passenger count for one route during one hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub route_id: RouteId,
    /// Start of the hour the forecast covers.
    pub target_hour: DateTime<Utc>,
    pub predicted_passengers: u32,
    /// When the forecaster produced this value, newer generations win.
    pub generated_at: DateTime<Utc>,
}

/// Lifecycle of a scheduled departure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub const fn is_terminal(&self) -> bool {
        match self {
            TripStatus::Pending | TripStatus::InProgress => false,
            TripStatus::Completed | TripStatus::Cancelled => true,
        }
    }

    /// Whether telemetry may move a trip from `self` to `next`.
    pub const fn can_become(&self, next: TripStatus) -> bool {
        match (self, next) {
            (TripStatus::Pending, TripStatus::InProgress)
            | (TripStatus::Pending, TripStatus::Cancelled)
            | (TripStatus::InProgress, TripStatus::Completed)
            | (TripStatus::InProgress, TripStatus::Cancelled) => true,
            (TripStatus::Pending, TripStatus::Pending)
            | (TripStatus::Pending, TripStatus::Completed)
            | (TripStatus::InProgress, TripStatus::Pending)
            | (TripStatus::InProgress, TripStatus::InProgress)
            | (TripStatus::Completed, _)
            | (TripStatus::Cancelled, _) => false,
        }
    }
}

/// One scheduled departure of one vehicle on one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchTrip {
    pub id: TripId,
    pub route_id: RouteId,
    pub vehicle_id: VehicleId,
    pub departure: DateTime<Utc>,
    pub status: TripStatus,
}

/// The slice of route data the scheduling engine needs.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub route_id: RouteId,
    pub start: Coordinate,
    pub importance: f64,
    pub capacity: Option<u32>,
}

impl From<&Route> for RouteMeta {
    fn from(value: &Route) -> Self {
        Self {
            route_id: value.id.clone(),
            start: value.start,
            importance: value.importance,
            capacity: value.capacity,
        }
    }
}

#[test]
fn terminal_statuses() {
    assert!(!TripStatus::Pending.is_terminal());
    assert!(!TripStatus::InProgress.is_terminal());
    assert!(TripStatus::Completed.is_terminal());
    assert!(TripStatus::Cancelled.is_terminal());
}

#[test]
fn terminal_trips_never_move() {
    for next in [
        TripStatus::Pending,
        TripStatus::InProgress,
        TripStatus::Completed,
        TripStatus::Cancelled,
    ] {
        assert!(!TripStatus::Completed.can_become(next));
        assert!(!TripStatus::Cancelled.can_become(next));
    }
}

#[test]
fn pending_cannot_skip_to_completed() {
    assert!(!TripStatus::Pending.can_become(TripStatus::Completed));
    assert!(TripStatus::Pending.can_become(TripStatus::InProgress));
}
