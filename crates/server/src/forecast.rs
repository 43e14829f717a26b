use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use headway::demand::{self, DemandForecast, DemandSource};

/// Fetches predictions from the forecaster over HTTP.
///
/// `GET {url}?hour=<rfc3339>` must answer with a JSON array of
/// `{ "route_id": ..., "predicted_passengers": ... }`.
pub struct HttpForecast {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpForecast {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.into(),
        }
    }
}

impl DemandSource for HttpForecast {
    fn predictions(
        &self,
        hour: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<Vec<DemandForecast>, demand::Error> {
        let hour = hour.to_rfc3339_opts(SecondsFormat::Secs, true);
        let response = self
            .client
            .get(format!("{}?hour={}", self.url, hour))
            .timeout(timeout)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    demand::Error::Timeout(timeout)
                } else {
                    demand::Error::Unreachable(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(demand::Error::Unreachable(format!(
                "forecaster answered {}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|err| demand::Error::InvalidResponse(err.to_string()))
    }
}
