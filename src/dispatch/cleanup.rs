use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::store::{self, FleetStore, TripId, VehicleId, VehicleStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "trip_id", rename_all = "snake_case")]
pub enum Inconsistency {
    /// The vehicle is in service without a trip reference.
    MissingTripReference,
    /// The vehicle points at a trip the store does not know.
    UnknownTrip(TripId),
    /// The referenced trip is assigned to a different vehicle.
    TripBelongsToOtherVehicle(TripId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InconsistentVehicle {
    pub vehicle_id: VehicleId,
    pub reason: Inconsistency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub released: Vec<VehicleId>,
    /// Trips closed because their service window elapsed.
    pub completed_trips: Vec<TripId>,
    pub inconsistent: Vec<InconsistentVehicle>,
}

/// Frees every in service vehicle whose trip is over at `now`.
///
/// A trip is over once it reached a terminal status, or once `trip_duration`
/// has passed since its departure. Vehicles whose trip cannot be found are left
/// in service and reported.
pub fn reconcile<S: FleetStore>(
    store: &mut S,
    now: DateTime<Utc>,
    trip_duration: TimeDelta,
) -> Result<CleanupReport, store::Error> {
    let mut report = CleanupReport::default();
    for vehicle in store.vehicles()? {
        match vehicle.status {
            VehicleStatus::Available | VehicleStatus::Maintenance => continue,
            VehicleStatus::InService => {}
        }

        let Some(trip_id) = vehicle.trip else {
            report.inconsistent.push(inconsistent(vehicle.id, Inconsistency::MissingTripReference));
            continue;
        };
        let Some(trip) = store.trip(&trip_id)? else {
            report.inconsistent.push(inconsistent(vehicle.id, Inconsistency::UnknownTrip(trip_id)));
            continue;
        };
        if trip.vehicle_id != vehicle.id {
            report.inconsistent.push(inconsistent(
                vehicle.id,
                Inconsistency::TripBelongsToOtherVehicle(trip_id),
            ));
            continue;
        }

        let expired = trip.departure + trip_duration <= now;
        if !trip.status.is_terminal() && !expired {
            continue;
        }
        if !trip.status.is_terminal() {
            store.complete_trip(&trip.id)?;
            report.completed_trips.push(trip.id);
        }
        store.release_vehicle(&vehicle.id)?;
        report.released.push(vehicle.id);
    }

    debug!(
        "Cleanup released {} vehicles and completed {} trips",
        report.released.len(),
        report.completed_trips.len()
    );
    Ok(report)
}

fn inconsistent(vehicle_id: VehicleId, reason: Inconsistency) -> InconsistentVehicle {
    warn!("Vehicle {} left in service: {:?}", vehicle_id, reason);
    InconsistentVehicle { vehicle_id, reason }
}
