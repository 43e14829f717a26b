use chrono::{DateTime, Utc};
use headway::store::{DispatchRecord, TripStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchDto {
    pub trip_id: String,
    pub vehicle_id: String,
    pub route_id: String,
    pub departure: DateTime<Utc>,
    pub status: TripStatus,
    pub predicted_passengers: Option<u32>,
}

impl DispatchDto {
    pub fn from(record: &DispatchRecord) -> Self {
        Self {
            trip_id: record.trip_id.to_string(),
            vehicle_id: record.vehicle_id.to_string(),
            route_id: record.route_id.to_string(),
            departure: record.departure,
            status: record.status,
            predicted_passengers: record.predicted_passengers,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripStatusUpdate {
    pub status: TripStatus,
}
