mod api;
mod config;
mod cycle;
mod dto;
mod forecast;
mod state;

use std::{process, sync::Arc, time::Instant};

use axum::routing::{get, post};
use headway::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{config::ServerConfig, state::AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting server...");
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    };

    info!("Loading data...");
    let now = Instant::now();
    let feed = if config.feed.is_dir() {
        Feed::default().from_directory(&config.feed)
    } else {
        Feed::default().from_zip(&config.feed)
    };
    let store = match MemoryStore::new().load_feed(feed) {
        Ok(store) => store,
        Err(err) => {
            error!("Failed to load feed {}: {err}", config.feed.display());
            process::exit(1);
        }
    };
    info!("Loading data took {:?}", now.elapsed());

    let dispatcher = Dispatcher::new(
        Config::default()
            .with_max_vehicles_per_route(config.max_vehicles_per_route)
            .with_default_capacity(config.default_capacity),
    );
    let state = Arc::new(AppState::new(config.forecast_url.clone(), store));
    tokio::spawn(cycle::worker(state.clone(), dispatcher));
    tokio::spawn(cycle::clock(state.clone()));

    let app = axum::Router::new()
        .route("/api/routes", get(api::routes))
        .route("/api/dispatches", get(api::dispatches))
        .route("/api/route-geometry", get(api::route_geometry))
        .route("/api/vehicles/near", get(api::near))
        .route("/api/vehicles/{id}/position", post(api::vehicle_position))
        .route("/api/trips/{id}/status", post(api::trip_status))
        .route("/api/cycle", post(api::trigger_cycle))
        .route("/api/cycles", get(api::cycles))
        .with_state(state.clone());

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind port {}: {err}", config.port);
            process::exit(1);
        }
    };
    info!("Listening to port {}", config.port);
    let shutdown = state.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down, cancelling any running cycle");
            shutdown.shutdown.cancel();
        })
        .await;
    if let Err(err) = served {
        error!("Server stopped: {err}");
    }
}
