use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use headway::{shared::truncate_to_hour, store::DEFAULT_DISPATCH_LIMIT};

use crate::{
    dto::{DispatchDto, GeometryDto, RouteDto},
    state::AppState,
};

pub async fn routes(State(state): State<Arc<AppState>>) -> Result<Response, StatusCode> {
    let store = state.store.read().await;
    let result: Vec<_> = store.route_overview().iter().map(RouteDto::from).collect();
    Ok(Json(result).into_response())
}

/// Trips departing in the current hour or later, newest first.
pub async fn dispatches(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, StatusCode> {
    let limit: usize = match params.get("limit") {
        Some(value) => value.parse().map_err(|_| StatusCode::BAD_REQUEST)?,
        None => DEFAULT_DISPATCH_LIMIT,
    };
    let since = truncate_to_hour(Utc::now());
    let store = state.store.read().await;
    let result: Vec<_> = store
        .dispatch_records(since, limit)
        .iter()
        .map(DispatchDto::from)
        .collect();
    Ok(Json(result).into_response())
}

pub async fn route_geometry(State(state): State<Arc<AppState>>) -> Result<Response, StatusCode> {
    let store = state.store.read().await;
    let result: Vec<_> = store
        .route_geometry()
        .into_iter()
        .map(|(route_id, points)| GeometryDto {
            route_id: route_id.to_string(),
            points,
        })
        .collect();
    Ok(Json(result).into_response())
}
