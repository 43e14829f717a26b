use std::{env, path::PathBuf, str::FromStr};

use headway::config::{DEFAULT_CAPACITY, DEFAULT_MAX_VEHICLES_PER_ROUTE};
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required variable {0}")]
    Missing(&'static str),
    #[error("Variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Zip archive or directory holding the static feed.
    pub feed: PathBuf,
    pub port: u16,
    /// Forecaster endpoint, the feed's seed predictions are used when unset.
    pub forecast_url: Option<String>,
    pub max_vehicles_per_route: u32,
    pub default_capacity: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, self::Error> {
        let feed = env::var("HEADWAY_FEED")
            .map(PathBuf::from)
            .map_err(|_| self::Error::Missing("HEADWAY_FEED"))?;
        Ok(Self {
            feed,
            port: parse_or("HEADWAY_PORT", DEFAULT_PORT)?,
            forecast_url: env::var("HEADWAY_FORECAST_URL").ok(),
            max_vehicles_per_route: parse_or(
                "HEADWAY_MAX_PER_ROUTE",
                DEFAULT_MAX_VEHICLES_PER_ROUTE,
            )?,
            default_capacity: parse_or("HEADWAY_DEFAULT_CAPACITY", DEFAULT_CAPACITY)?,
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, self::Error> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| self::Error::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
