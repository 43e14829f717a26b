mod common;

use std::time::{Duration, Instant};

use chrono::TimeDelta;
use common::at;
use headway::{
    dispatch::cleanup::{self, Inconsistency},
    store::{DispatchTrip, FleetStore, MemoryStore, TripStatus, VehicleStatus},
};

const TRIP_DURATION: TimeDelta = TimeDelta::minutes(55);

fn committed(vehicle_id: &str, trip_id: &str, minute: u32) -> MemoryStore {
    let mut store = common::scarce_fleet();
    let trip = DispatchTrip {
        id: trip_id.into(),
        route_id: "R1".into(),
        vehicle_id: vehicle_id.into(),
        departure: at(9, minute),
        status: TripStatus::Pending,
    };
    store
        .commit_schedule(&[trip], Instant::now() + Duration::from_secs(5))
        .unwrap();
    store
}

#[test]
fn completed_trip_frees_vehicle() {
    let mut store = committed("V1", "T1", 0);
    store.update_trip_status("T1", TripStatus::InProgress).unwrap();
    store.update_trip_status("T1", TripStatus::Completed).unwrap();

    let report = cleanup::reconcile(&mut store, at(9, 10), TRIP_DURATION).unwrap();
    assert_eq!(report.released.len(), 1);
    assert!(report.completed_trips.is_empty());

    let vehicle = store.vehicle_by_id("V1").unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    assert_eq!(vehicle.trip, None);
}

#[test]
fn cancelled_trip_frees_vehicle() {
    let mut store = committed("V1", "T1", 0);
    store.update_trip_status("T1", TripStatus::Cancelled).unwrap();

    cleanup::reconcile(&mut store, at(9, 1), TRIP_DURATION).unwrap();
    assert!(store.vehicle_by_id("V1").unwrap().is_available());
}

#[test]
fn elapsed_trip_is_completed() {
    let mut store = committed("V1", "T1", 0);

    let report = cleanup::reconcile(&mut store, at(9, 54), TRIP_DURATION).unwrap();
    assert!(report.released.is_empty());
    assert_eq!(store.vehicle_by_id("V1").unwrap().status, VehicleStatus::InService);

    let report = cleanup::reconcile(&mut store, at(9, 55), TRIP_DURATION).unwrap();
    assert_eq!(report.released[0].as_ref(), "V1");
    assert_eq!(report.completed_trips[0].as_ref(), "T1");
    assert_eq!(store.trip_by_id("T1").unwrap().status, TripStatus::Completed);
    assert!(store.vehicle_by_id("V1").unwrap().is_available());
}

#[test]
fn cleanup_is_idempotent() {
    let mut store = committed("V1", "T1", 0);
    cleanup::reconcile(&mut store, at(10, 30), TRIP_DURATION).unwrap();
    let report = cleanup::reconcile(&mut store, at(10, 30), TRIP_DURATION).unwrap();
    assert!(report.released.is_empty());
    assert!(report.completed_trips.is_empty());
}

#[test]
fn vehicle_without_trip_stays_in_service() {
    let mut store = common::scarce_fleet();
    let mut lost = common::vehicle("V3", (40.75, -73.99));
    lost.status = VehicleStatus::InService;
    store.add_vehicle(lost);
    let mut ghost = common::vehicle("V4", (40.75, -73.99));
    ghost.status = VehicleStatus::InService;
    ghost.trip = Some("T-missing".into());
    store.add_vehicle(ghost);

    let report = cleanup::reconcile(&mut store, at(12, 0), TRIP_DURATION).unwrap();
    assert_eq!(report.inconsistent.len(), 2);
    assert_eq!(report.inconsistent[0].reason, Inconsistency::MissingTripReference);
    assert_eq!(
        report.inconsistent[1].reason,
        Inconsistency::UnknownTrip("T-missing".into())
    );
    assert_eq!(store.vehicle_by_id("V3").unwrap().status, VehicleStatus::InService);
    assert_eq!(store.vehicle_by_id("V4").unwrap().status, VehicleStatus::InService);
    assert_eq!(store.available_vehicles().unwrap().len(), 2);
}

#[test]
fn maintenance_is_untouched() {
    let mut store = common::scarce_fleet();
    store.send_to_maintenance("V2").unwrap();
    let report = cleanup::reconcile(&mut store, at(12, 0), TRIP_DURATION).unwrap();
    assert!(report.released.is_empty());
    assert!(report.inconsistent.is_empty());
    assert_eq!(store.vehicle_by_id("V2").unwrap().status, VehicleStatus::Maintenance);
}

#[test]
fn vehicle_pointing_at_foreign_trip_is_reported() {
    let mut store = committed("V1", "T1", 0);
    let mut stray = common::vehicle("V3", (40.75, -73.99));
    stray.status = VehicleStatus::InService;
    stray.trip = Some("T1".into());
    store.add_vehicle(stray);
    store.update_trip_status("T1", TripStatus::Cancelled).unwrap();

    let report = cleanup::reconcile(&mut store, at(9, 10), TRIP_DURATION).unwrap();
    assert_eq!(report.released.len(), 1);
    assert_eq!(report.released[0].as_ref(), "V1");
    assert_eq!(report.inconsistent.len(), 1);
    assert_eq!(report.inconsistent[0].vehicle_id.as_ref(), "V3");
    assert_eq!(
        report.inconsistent[0].reason,
        Inconsistency::TripBelongsToOtherVehicle("T1".into())
    );
    assert_eq!(store.vehicle_by_id("V3").unwrap().status, VehicleStatus::InService);
}
