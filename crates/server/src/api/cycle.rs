use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use headway::dispatch::Trigger;
use tracing::info;

use crate::state::AppState;

/// Queues a cycle for the next hour, or for `hour` when given.
pub async fn trigger_cycle(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, StatusCode> {
    let now = Utc::now();
    let trigger = match params.get("hour") {
        Some(value) => {
            let hour: DateTime<Utc> = value.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
            Trigger::for_hour(now, hour)
        }
        None => Trigger::at(now),
    };
    state.enqueue(trigger).map_err(|_| StatusCode::CONFLICT)?;
    info!("Queued cycle for {}", trigger.start);
    Ok((StatusCode::ACCEPTED, Json(trigger.start)).into_response())
}

pub async fn cycles(State(state): State<Arc<AppState>>) -> Result<Response, StatusCode> {
    Ok(Json(state.history().await).into_response())
}
