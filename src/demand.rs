//! Contract for the external forecaster.
//!
//! The engine never looks inside the model. It asks for one hour of
//! predictions per cycle and treats anything slower than the configured
//! timeout as an unreachable source.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::RouteId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Demand source unreachable: {0}")]
    Unreachable(String),
    #[error("Demand source did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Demand source answered with an invalid payload: {0}")]
    InvalidResponse(String),
}

/// Predicted passengers for one route during the requested hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub route_id: RouteId,
    pub predicted_passengers: u32,
}

impl DemandForecast {
    pub fn new(route_id: impl Into<RouteId>, predicted_passengers: u32) -> Self {
        Self {
            route_id: route_id.into(),
            predicted_passengers,
        }
    }
}

pub trait DemandSource {
    /// Returns the active prediction of every route for the hour starting at `hour`.
    /// Routes without a prediction are simply absent.
    fn predictions(
        &self,
        hour: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<Vec<DemandForecast>, self::Error>;
}

/// A fixed forecast, answered instantly for any hour.
impl DemandSource for [DemandForecast] {
    fn predictions(
        &self,
        _hour: DateTime<Utc>,
        _timeout: Duration,
    ) -> Result<Vec<DemandForecast>, self::Error> {
        Ok(self.to_vec())
    }
}

impl DemandSource for Vec<DemandForecast> {
    fn predictions(
        &self,
        hour: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<Vec<DemandForecast>, self::Error> {
        self.as_slice().predictions(hour, timeout)
    }
}
