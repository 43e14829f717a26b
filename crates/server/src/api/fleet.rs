use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use headway::shared::{Coordinate, Distance};

use crate::{
    api::store_status,
    dto::{PositionUpdate, TripStatusUpdate, VehicleDto},
    state::AppState,
};

const DEFAULT_RADIUS_METERS: f64 = 1000.0;
const MAX_RADIUS_METERS: f64 = 50_000.0;

pub async fn near(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, StatusCode> {
    let latitude = parse_param(&params, "lat")?.ok_or(StatusCode::BAD_REQUEST)?;
    let longitude = parse_param(&params, "lon")?.ok_or(StatusCode::BAD_REQUEST)?;
    let radius = parse_param(&params, "radius")?.unwrap_or(DEFAULT_RADIUS_METERS);
    if !radius.is_finite() || radius < 0.0 || !latitude.is_finite() || !longitude.is_finite() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let radius = radius.min(MAX_RADIUS_METERS);

    let coordinate = Coordinate::from((latitude, longitude));
    let store = state.store.read().await;
    let result: Vec<_> = store
        .vehicles_near(&coordinate, Distance::from_meters(radius))
        .into_iter()
        .map(|vehicle| VehicleDto::from(vehicle, &coordinate))
        .collect();
    Ok(Json(result).into_response())
}

pub async fn vehicle_position(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<PositionUpdate>,
) -> Result<Response, StatusCode> {
    let mut store = state.store.write().await;
    store
        .record_position(&id, Coordinate::from(update))
        .map_err(store_status)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn trip_status(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<TripStatusUpdate>,
) -> Result<Response, StatusCode> {
    let mut store = state.store.write().await;
    store
        .update_trip_status(&id, update.status)
        .map_err(store_status)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn parse_param(params: &HashMap<String, String>, name: &str) -> Result<Option<f64>, StatusCode> {
    params
        .get(name)
        .map(|value| value.parse().map_err(|_| StatusCode::BAD_REQUEST))
        .transpose()
}
