mod common;

use std::{
    collections::HashSet,
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeDelta, Utc};
use common::at;
use headway::{
    config::Config,
    demand::{self, DemandForecast, DemandSource},
    dispatch::{
        CancelToken, CycleState, Dispatcher, Error, Stage, Trigger,
        priority::DemandOnly,
        report::{SkipReason, UnmetReason},
    },
    store::{
        self, DispatchTrip, FleetStore, MemoryStore, RouteMeta, TripStatus, Vehicle,
        VehicleStatus,
    },
};

fn trigger() -> Trigger {
    Trigger::for_hour(at(8, 30), at(9, 0))
}

fn departures(trips: &[&DispatchTrip]) -> Vec<DateTime<Utc>> {
    trips.iter().map(|trip| trip.departure).collect()
}

struct Unreachable;

impl DemandSource for Unreachable {
    fn predictions(
        &self,
        _hour: DateTime<Utc>,
        _timeout: Duration,
    ) -> Result<Vec<DemandForecast>, demand::Error> {
        Err(demand::Error::Unreachable("connection refused".into()))
    }
}

struct Slow(Duration);

impl DemandSource for Slow {
    fn predictions(
        &self,
        _hour: DateTime<Utc>,
        _timeout: Duration,
    ) -> Result<Vec<DemandForecast>, demand::Error> {
        thread::sleep(self.0);
        Ok(vec![DemandForecast::new("R1", 180)])
    }
}

/// Delegates to a memory store but refuses every commit.
struct ReadOnly(MemoryStore);

impl FleetStore for ReadOnly {
    fn vehicles(&self) -> Result<Vec<Vehicle>, store::Error> {
        self.0.vehicles()
    }

    fn available_vehicles(&self) -> Result<Vec<Vehicle>, store::Error> {
        self.0.available_vehicles()
    }

    fn route_meta(&self) -> Result<Vec<RouteMeta>, store::Error> {
        self.0.route_meta()
    }

    fn trip(&self, id: &str) -> Result<Option<DispatchTrip>, store::Error> {
        self.0.trip(id)
    }

    fn claim_vehicle(&mut self, id: &str, trip_id: &store::TripId) -> Result<(), store::Error> {
        self.0.claim_vehicle(id, trip_id)
    }

    fn release_vehicle(&mut self, id: &str) -> Result<(), store::Error> {
        self.0.release_vehicle(id)
    }

    fn complete_trip(&mut self, id: &str) -> Result<(), store::Error> {
        self.0.complete_trip(id)
    }

    fn record_forecasts(
        &mut self,
        hour: DateTime<Utc>,
        generated_at: DateTime<Utc>,
        forecasts: &[DemandForecast],
    ) -> Result<(), store::Error> {
        self.0.record_forecasts(hour, generated_at, forecasts)
    }

    fn commit_schedule(
        &mut self,
        _trips: &[DispatchTrip],
        _deadline: Instant,
    ) -> Result<(), store::Error> {
        Err(store::Error::Timeout)
    }
}

#[test]
fn worked_example_under_scarcity() {
    let mut store = common::scarce_fleet();
    let mut dispatcher = Dispatcher::default();
    let report = dispatcher
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();

    assert!(report.scarce);
    assert_eq!(report.available_vehicles, 2);

    let r1: Vec<_> = report.trips_for("R1").collect();
    assert_eq!(departures(&r1), vec![at(9, 0), at(9, 20)]);
    assert_eq!(r1[0].vehicle_id.as_ref(), "V1");
    assert_eq!(r1[1].vehicle_id.as_ref(), "V2");
    assert_eq!(report.trips_for("R2").count(), 0);

    let r1_unmet = report.unmet_for("R1", UnmetReason::FleetExhausted).unwrap();
    assert_eq!(r1_unmet.vehicles, 1);
    let r2_unmet = report.unmet_for("R2", UnmetReason::FleetExhausted).unwrap();
    assert_eq!(r2_unmet.vehicles, 1);

    assert_eq!(dispatcher.state(), CycleState::Idle);
    assert_eq!(store.trips().len(), 2);
    assert!(store.available_vehicles().unwrap().is_empty());
}

#[test]
fn trip_ids_name_route_departure_and_slot() {
    let mut store = common::scarce_fleet();
    let report = Dispatcher::default()
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    let ids: Vec<_> = report.trips.iter().map(|trip| trip.id.to_string()).collect();
    assert_eq!(ids, vec!["SCHED-R1-20250314090000-0", "SCHED-R1-20250314092000-1"]);
}

#[test]
fn sufficient_fleet_gets_even_spacing() {
    let mut store = common::scarce_fleet();
    store.add_vehicle(common::vehicle("V3", (40.70, -74.00)));
    store.add_vehicle(common::vehicle("V4", (40.71, -74.00)));

    let report = Dispatcher::default()
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    assert!(!report.scarce);
    assert!(report.unmet.is_empty());

    let r1: Vec<_> = report.trips_for("R1").collect();
    assert_eq!(departures(&r1), vec![at(9, 0), at(9, 20), at(9, 40)]);
    let r2: Vec<_> = report.trips_for("R2").collect();
    assert_eq!(departures(&r2), vec![at(9, 0)]);
}

#[test]
fn no_vehicle_holds_two_active_trips() {
    let mut store = common::scarce_fleet();
    (3..10).for_each(|i| {
        store.add_vehicle(common::vehicle(&format!("V{i}"), (40.72, -73.99)));
    });
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    // Next hour, earlier trips are still in service.
    store.upsert_prediction(common::prediction("R1", at(10, 0), 300));
    dispatcher
        .run_materialized(&mut store, Trigger::for_hour(at(9, 30), at(10, 0)), &CancelToken::new())
        .unwrap();

    let mut seen = HashSet::new();
    for trip in store.active_trips() {
        assert!(seen.insert(trip.vehicle_id.clone()), "{} twice", trip.vehicle_id);
    }
    assert_eq!(seen.len(), 9);
}

#[test]
fn released_vehicle_keeps_single_active_trip() {
    let mut store = common::scarce_fleet();
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();

    assert!(matches!(
        store.release_vehicle("V1"),
        Err(store::Error::TripStillActive { .. })
    ));
    store.upsert_prediction(common::prediction("R1", at(10, 0), 180));
    dispatcher
        .run_materialized(&mut store, Trigger::for_hour(at(9, 30), at(10, 0)), &CancelToken::new())
        .unwrap();

    let v1: Vec<_> = store
        .active_trips()
        .filter(|trip| trip.vehicle_id.as_ref() == "V1")
        .map(|trip| trip.id.to_string())
        .collect();
    assert_eq!(v1, vec!["SCHED-R1-20250314090000-0"]);
}

#[test]
fn external_forecasts_reach_read_surface() {
    let mut store = common::scarce_fleet();
    let forecasts = vec![DemandForecast::new("R1", 120), DemandForecast::new("R9", 5)];
    let report = Dispatcher::default()
        .run(&mut store, &forecasts, Trigger::for_hour(at(9, 30), at(10, 0)))
        .unwrap();
    assert_eq!(report.trips.len(), 2);

    let stored = store.prediction("R1", at(10, 0)).unwrap();
    assert_eq!(stored.predicted_passengers, 120);
    assert_eq!(stored.generated_at, at(9, 30));
    assert!(store.prediction("R9", at(10, 0)).is_none());

    let records = store.dispatch_records(at(10, 0), 50);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.predicted_passengers == Some(120)));
    let r1 = store
        .route_overview()
        .into_iter()
        .find(|route| route.route_id.as_ref() == "R1")
        .unwrap();
    assert_eq!(r1.density, 120);
}

#[test]
fn late_forecasts_are_not_stored() {
    let mut store = common::scarce_fleet();
    let mut dispatcher =
        Dispatcher::new(Config::default().with_demand_timeout(Duration::from_millis(5)));
    let result = dispatcher.run(
        &mut store,
        &Slow(Duration::from_millis(50)),
        Trigger::for_hour(at(9, 30), at(10, 0)),
    );
    assert!(result.is_err());
    assert!(store.prediction("R1", at(10, 0)).is_none());
}

#[test]
fn identical_inputs_give_identical_schedules() {
    let store = common::scarce_fleet();
    let mut first = store.clone();
    let mut second = store;
    let a = Dispatcher::default()
        .run_materialized(&mut first, trigger(), &CancelToken::new())
        .unwrap();
    let b = Dispatcher::default()
        .run_materialized(&mut second, trigger(), &CancelToken::new())
        .unwrap();
    assert_eq!(a.trips, b.trips);
    assert_eq!(a.unmet, b.unmet);
}

#[test]
fn unreachable_source_fails_forecasting() {
    let mut store = common::scarce_fleet();
    let mut dispatcher = Dispatcher::default();
    let result = dispatcher.run(&mut store, &Unreachable, trigger());

    match result {
        Err(Error::Stage { stage, source }) => {
            assert_eq!(stage, Stage::Forecasting);
            assert!(matches!(*source, Error::Demand(demand::Error::Unreachable(_))));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(dispatcher.state(), CycleState::Failed(Stage::Forecasting));
    assert!(store.trips().is_empty());
    assert_eq!(store.available_vehicles().unwrap().len(), 2);

    // The next trigger starts over.
    let report = dispatcher
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    assert_eq!(report.trips.len(), 2);
    assert_eq!(dispatcher.state(), CycleState::Idle);
}

#[test]
fn slow_source_times_out() {
    let mut store = common::scarce_fleet();
    let mut dispatcher =
        Dispatcher::new(Config::default().with_demand_timeout(Duration::from_millis(5)));
    let result = dispatcher.run(&mut store, &Slow(Duration::from_millis(50)), trigger());
    match result {
        Err(Error::Stage { stage, source }) => {
            assert_eq!(stage, Stage::Forecasting);
            assert!(matches!(*source, Error::Demand(demand::Error::Timeout(_))));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(store.trips().is_empty());
}

#[test]
fn failed_commit_persists_nothing() {
    let mut store = ReadOnly(common::scarce_fleet());
    let mut dispatcher = Dispatcher::default();
    let result = dispatcher.run(&mut store, &vec![DemandForecast::new("R1", 180)], trigger());

    assert!(matches!(
        result,
        Err(Error::Stage {
            stage: Stage::Committing,
            ..
        })
    ));
    assert_eq!(dispatcher.state(), CycleState::Failed(Stage::Committing));
    assert!(store.0.trips().is_empty());
    assert_eq!(store.0.available_vehicles().unwrap().len(), 2);
}

#[test]
fn cancelled_cycle_keeps_cleanup_only() {
    let mut store = common::scarce_fleet();
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = dispatcher.run_materialized(
        &mut store,
        Trigger::for_hour(at(10, 30), at(11, 0)),
        &cancel,
    );
    assert!(matches!(result, Err(Error::Cancelled(Stage::Cleanup))));
    assert_eq!(dispatcher.state(), CycleState::Idle);
    // Both 9:00 trips expired by 10:30 and were released.
    assert_eq!(store.available_vehicles().unwrap().len(), 2);
    assert_eq!(store.trips().len(), 2);
    assert!(store.trips().iter().all(|trip| trip.status == TripStatus::Completed));
}

#[test]
fn next_cycle_releases_expired_vehicles() {
    let mut store = common::scarce_fleet();
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();

    store.upsert_prediction(common::prediction("R2", at(10, 0), 40));
    let report = dispatcher
        .run_materialized(&mut store, Trigger::for_hour(at(10, 0), at(10, 0)), &CancelToken::new())
        .unwrap();
    // 9:00 + 55 min has passed, 9:20 + 55 min has not.
    assert_eq!(report.cleanup.released.len(), 1);
    assert_eq!(report.cleanup.released[0].as_ref(), "V1");
    assert_eq!(report.trips.len(), 1);
    assert_eq!(report.trips[0].vehicle_id.as_ref(), "V1");
    assert_eq!(report.trips[0].route_id.as_ref(), "R2");
}

#[test]
fn missing_prediction_skips_route() {
    let mut store = common::scarce_fleet();
    store.add_route(common::route("R3", (40.73, -73.99), 0.0, None));
    let report = Dispatcher::default()
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].route_id.as_ref(), "R3");
    assert_eq!(report.skipped[0].reason, SkipReason::NoPrediction);
    assert_eq!(report.trips.len(), 2);
}

#[test]
fn zero_demand_schedules_nothing() {
    let mut store = common::scarce_fleet();
    let forecasts = vec![DemandForecast::new("R1", 0), DemandForecast::new("R2", 0)];
    let report = Dispatcher::default()
        .run(&mut store, &forecasts, trigger())
        .unwrap();
    assert!(report.trips.is_empty());
    assert!(report.unmet.is_empty());
    assert!(report.skipped.is_empty());
}

#[test]
fn capped_demand_is_reported() {
    let mut store = common::scarce_fleet();
    (3..10).for_each(|i| {
        store.add_vehicle(common::vehicle(&format!("V{i}"), (40.72, -73.99)));
    });
    let mut dispatcher = Dispatcher::new(Config::default().with_max_vehicles_per_route(4));
    let report = dispatcher
        .run(&mut store, &vec![DemandForecast::new("R1", 600)], trigger())
        .unwrap();
    assert_eq!(report.trips_for("R1").count(), 4);
    let capped = report.unmet_for("R1", UnmetReason::Capped).unwrap();
    assert_eq!(capped.vehicles, 6);
    let r1: Vec<_> = report.trips_for("R1").collect();
    assert_eq!(r1[1].departure - r1[0].departure, TimeDelta::minutes(15));
}

#[test]
fn importance_changes_priority() {
    let mut store = common::scarce_fleet();
    store.set_importance("R2", 4.0).unwrap();
    // R2 now scores 40 * 5 = 200 against R1's 180.
    let report = Dispatcher::default()
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    assert_eq!(report.ranking[0].plan.route_id.as_ref(), "R2");
    assert_eq!(report.trips_for("R2").count(), 1);
    assert_eq!(report.trips_for("R1").count(), 1);

    let mut store = common::scarce_fleet();
    store.set_importance("R2", 4.0).unwrap();
    let report = Dispatcher::default()
        .with_scorer(DemandOnly)
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    assert_eq!(report.scorer, "demand-only");
    assert_eq!(report.trips_for("R1").count(), 2);
}

#[test]
fn cycle_cannot_restart_mid_flight() {
    assert!(!CycleState::Committing.can_become(CycleState::Cleanup));
    assert!(!CycleState::Scheduling.can_become(CycleState::Cleanup));
    assert!(CycleState::Failed(Stage::Committing).can_become(CycleState::Cleanup));
    assert!(CycleState::Committing.can_become(CycleState::Idle));
    assert!(CycleState::Idle.can_become(CycleState::Cleanup));
}

#[test]
fn trigger_schedules_following_hour() {
    let trigger = Trigger::at(at(8, 59));
    assert_eq!(trigger.start, at(9, 0));
    let trigger = Trigger::for_hour(at(8, 10), at(11, 45));
    assert_eq!(trigger.start, at(11, 0));
}

#[test]
fn maintenance_vehicle_is_never_assigned() {
    let mut store = common::scarce_fleet();
    store.send_to_maintenance("V1").unwrap();
    let report = Dispatcher::default()
        .run_materialized(&mut store, trigger(), &CancelToken::new())
        .unwrap();
    assert!(report.trips.iter().all(|trip| trip.vehicle_id.as_ref() != "V1"));
    assert_eq!(store.vehicle_by_id("V1").unwrap().status, VehicleStatus::Maintenance);
}
