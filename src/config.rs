use std::time::Duration;

use chrono::TimeDelta;

use crate::dispatch::Rounding;

/// Passengers per vehicle when neither the route nor the fleet says otherwise.
pub const DEFAULT_CAPACITY: u32 = 50;
/// Upper bound on vehicles a single route may request in one hour.
pub const DEFAULT_MAX_VEHICLES_PER_ROUTE: u32 = 12;
/// How long a vehicle is committed to one departure.
pub const DEFAULT_TRIP_DURATION: TimeDelta = TimeDelta::minutes(55);

#[derive(Debug, Clone)]
pub struct Config {
    pub default_capacity: u32,
    pub max_vehicles_per_route: u32,
    pub trip_duration: TimeDelta,
    pub demand_timeout: Duration,
    pub commit_timeout: Duration,
    pub rounding: Rounding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_CAPACITY,
            max_vehicles_per_route: DEFAULT_MAX_VEHICLES_PER_ROUTE,
            trip_duration: DEFAULT_TRIP_DURATION,
            demand_timeout: Duration::from_secs(30),
            commit_timeout: Duration::from_secs(10),
            rounding: Rounding::default(),
        }
    }
}

impl Config {
    pub fn with_default_capacity(mut self, capacity: u32) -> Self {
        self.default_capacity = capacity;
        self
    }

    pub fn with_max_vehicles_per_route(mut self, max: u32) -> Self {
        self.max_vehicles_per_route = max;
        self
    }

    pub fn with_trip_duration(mut self, duration: TimeDelta) -> Self {
        self.trip_duration = duration;
        self
    }

    pub fn with_demand_timeout(mut self, timeout: Duration) -> Self {
        self.demand_timeout = timeout;
        self
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }
}
