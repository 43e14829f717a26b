use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Serialize;

const MILLIS_PER_HOUR: u32 = 60 * 60 * 1000;

/// Interval between successive departures on a route.
///
/// Stored in milliseconds so an hour divides evenly for every vehicle count a
/// route can realistically need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Headway(u32);

impl Headway {
    /// Spreads `count` departures evenly across one hour.
    pub const fn across_hour(count: u32) -> Option<Self> {
        if count == 0 {
            None
        } else {
            Some(Self(MILLIS_PER_HOUR / count))
        }
    }

    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs * 1000)
    }

    pub const fn as_millis(&self) -> u32 {
        self.0
    }

    pub fn as_seconds(&self) -> f64 {
        f64::from(self.0) / 1000.0
    }

    /// Offset of the given zero based slot from the first departure.
    pub fn offset(&self, slot: u32) -> TimeDelta {
        TimeDelta::milliseconds(i64::from(self.0) * i64::from(slot))
    }
}

/// Start of the hour containing `time`.
pub fn truncate_to_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(TimeDelta::hours(1)).unwrap_or(time)
}

/// Start of the hour following the one containing `time`.
pub fn next_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to_hour(time + TimeDelta::hours(1))
}

#[cfg(test)]
fn at(hms: (u32, u32, u32)) -> DateTime<Utc> {
    use chrono::TimeZone;
    Utc.with_ymd_and_hms(2025, 3, 14, hms.0, hms.1, hms.2)
        .single()
        .unwrap()
}

#[test]
fn headway_single_vehicle() {
    assert_eq!(Headway::across_hour(1), Some(Headway::from_seconds(3600)));
}

#[test]
fn headway_three_vehicles() {
    let headway = Headway::across_hour(3).unwrap();
    assert_eq!(headway.as_seconds(), 1200.0);
    assert_eq!(headway.offset(2), TimeDelta::seconds(2400));
}

#[test]
fn headway_zero_vehicles() {
    assert!(Headway::across_hour(0).is_none());
}

#[test]
fn truncate_mid_hour() {
    assert_eq!(truncate_to_hour(at((7, 42, 19))), at((7, 0, 0)));
}

#[test]
fn next_hour_on_boundary() {
    assert_eq!(next_hour(at((7, 0, 0))), at((8, 0, 0)));
}

#[test]
fn next_hour_mid_hour() {
    assert_eq!(next_hour(at((23, 59, 59))), at((0, 0, 0)) + TimeDelta::days(1));
}
