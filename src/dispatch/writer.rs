use chrono::{DateTime, Utc};

use crate::{
    dispatch::assignment::RouteAssignment,
    store::{DispatchTrip, TripId, TripStatus},
};

/// Identifier of the trip serving `slot` on `route_id`, leaving at `departure`.
pub fn trip_id(route_id: &str, departure: DateTime<Utc>, slot: u32) -> TripId {
    format!("SCHED-{}-{}-{}", route_id, departure.format("%Y%m%d%H%M%S"), slot).into()
}

/// Turns assignments into pending trips spaced by each route's headway.
pub fn build(assignments: &[RouteAssignment], start: DateTime<Utc>) -> Vec<DispatchTrip> {
    assignments
        .iter()
        .filter_map(|assignment| assignment.headway.map(|headway| (assignment, headway)))
        .flat_map(|(assignment, headway)| {
            assignment.slots.iter().map(move |slot| {
                let departure = start + headway.offset(slot.slot);
                DispatchTrip {
                    id: trip_id(&assignment.route_id, departure, slot.slot),
                    route_id: assignment.route_id.clone(),
                    vehicle_id: slot.vehicle_id.clone(),
                    departure,
                    status: TripStatus::Pending,
                }
            })
        })
        .collect()
}
