#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use headway::{
    shared::Coordinate,
    store::{Depot, MemoryStore, Prediction, Route, Vehicle, VehicleStatus},
};

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0)
        .single()
        .unwrap()
}

pub fn route(id: &str, start: (f64, f64), importance: f64, capacity: Option<u32>) -> Route {
    Route {
        id: id.into(),
        short_name: id.into(),
        start: Coordinate::from(start),
        end: Coordinate::from((start.0 + 0.05, start.1 + 0.05)),
        importance,
        capacity,
        ..Default::default()
    }
}

pub fn vehicle(id: &str, location: (f64, f64)) -> Vehicle {
    Vehicle {
        id: id.into(),
        status: VehicleStatus::Available,
        location: Coordinate::from(location),
        home_depot: "D1".into(),
        capacity: 60,
        ..Default::default()
    }
}

pub fn prediction(route_id: &str, hour: DateTime<Utc>, passengers: u32) -> Prediction {
    Prediction {
        route_id: route_id.into(),
        target_hour: hour,
        predicted_passengers: passengers,
        generated_at: hour - chrono::TimeDelta::hours(1),
    }
}

/// Two routes in Manhattan and two vehicles on the R1 side of town.
///
/// R1 needs 180 / 60 = 3 vehicles, R2 needs 40 / 60 = 1.
pub fn scarce_fleet() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.add_depot(Depot {
        id: "D1".into(),
        name: "Midtown".into(),
        coordinate: Coordinate::from((40.750, -73.990)),
        ..Default::default()
    });
    store.add_route(route("R1", (40.758, -73.985), 0.0, Some(60)));
    store.add_route(route("R2", (40.700, -74.010), 0.0, Some(60)));
    store.add_vehicle(vehicle("V1", (40.757, -73.986)));
    store.add_vehicle(vehicle("V2", (40.760, -73.980)));
    store.upsert_prediction(prediction("R1", at(9, 0), 180));
    store.upsert_prediction(prediction("R2", at(9, 0), 40));
    store
}
