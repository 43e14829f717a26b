mod cycle;
mod fleet;
mod routes;

pub use cycle::*;
pub use fleet::*;
pub use routes::*;

use axum::http::StatusCode;
use headway::store;
use tracing::warn;

fn store_status(err: store::Error) -> StatusCode {
    warn!("Rejected update: {err}");
    match err {
        store::Error::UnknownVehicle(_)
        | store::Error::UnknownTrip(_)
        | store::Error::UnknownRoute(_) => StatusCode::NOT_FOUND,
        store::Error::InvalidVehicleState { .. }
        | store::Error::InvalidTransition { .. }
        | store::Error::VehicleClaimedTwice(_)
        | store::Error::DuplicateTrip(_)
        | store::Error::TripStillActive { .. } => StatusCode::CONFLICT,
        store::Error::InvalidImportance { .. } => StatusCode::BAD_REQUEST,
        store::Error::Timeout => StatusCode::SERVICE_UNAVAILABLE,
    }
}
