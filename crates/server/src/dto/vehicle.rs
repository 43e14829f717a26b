use headway::{
    shared::Coordinate,
    store::{Vehicle, VehicleStatus},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDto {
    pub id: String,
    pub status: VehicleStatus,
    pub coordinate: Coordinate,
    pub distance: f64,
    pub trip_id: Option<String>,
}

impl VehicleDto {
    pub fn from(vehicle: &Vehicle, from: &Coordinate) -> Self {
        Self {
            id: vehicle.id.to_string(),
            status: vehicle.status,
            coordinate: vehicle.location,
            distance: vehicle.location.geodesic_distance(from).as_meters(),
            trip_id: vehicle.trip.as_ref().map(|trip| trip.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<PositionUpdate> for Coordinate {
    fn from(value: PositionUpdate) -> Self {
        Coordinate::from((value.latitude, value.longitude))
    }
}
