use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    dispatch::{assignment::RouteAssignment, cleanup::CleanupReport, priority::RankedPlan},
    store::{DispatchTrip, RouteId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmetReason {
    /// The forecast asked for more than the per route maximum.
    Capped,
    /// The pool ran dry before the route was fully served.
    FleetExhausted,
}

/// Vehicles a route needed but did not get this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmetDemand {
    pub route_id: RouteId,
    pub reason: UnmetReason,
    pub vehicles: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPrediction,
    ZeroCapacity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRoute {
    pub route_id: RouteId,
    pub reason: SkipReason,
}

/// Everything one committed cycle decided.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Start of the hour the schedule covers.
    pub cycle_start: DateTime<Utc>,
    pub triggered_at: DateTime<Utc>,
    pub scorer: &'static str,
    pub available_vehicles: usize,
    pub scarce: bool,
    pub cleanup: CleanupReport,
    pub ranking: Vec<RankedPlan>,
    pub assignments: Vec<RouteAssignment>,
    pub trips: Vec<DispatchTrip>,
    pub unmet: Vec<UnmetDemand>,
    pub skipped: Vec<SkippedRoute>,
}

impl CycleReport {
    pub fn assigned_vehicles(&self) -> usize {
        self.trips.len()
    }

    pub fn unmet_vehicles(&self) -> u32 {
        self.unmet.iter().map(|unmet| unmet.vehicles).sum()
    }

    /// Trips scheduled for `route_id`, in departure order.
    pub fn trips_for<'a>(&'a self, route_id: &'a str) -> impl Iterator<Item = &'a DispatchTrip> + 'a {
        self.trips
            .iter()
            .filter(move |trip| trip.route_id.as_ref() == route_id)
    }

    pub fn unmet_for(&self, route_id: &str, reason: UnmetReason) -> Option<&UnmetDemand> {
        self.unmet
            .iter()
            .find(|unmet| unmet.route_id.as_ref() == route_id && unmet.reason == reason)
    }
}
