use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::VehicleStatus;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedStop {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedRoute {
    pub route_id: String,
    pub route_short_name: String,
    pub start_stop_id: String,
    pub end_stop_id: String,
    pub importance: Option<f64>,
    pub capacity: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedDepot {
    pub depot_id: String,
    pub depot_name: String,
    pub depot_lat: f64,
    pub depot_lon: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedVehicle {
    pub vehicle_id: String,
    pub home_depot_id: String,
    pub capacity: Option<u32>,
    pub status: Option<VehicleStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedShape {
    pub route_id: String,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedPrediction {
    pub route_id: String,
    pub target_hour: DateTime<Utc>,
    pub predicted_passengers: u32,
    pub generated_at: DateTime<Utc>,
}
