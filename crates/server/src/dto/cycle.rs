use chrono::{DateTime, Utc};
use headway::{
    dispatch::{
        Error, Trigger,
        report::{CycleReport, UnmetReason},
    },
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Committed,
    Cancelled,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmetDto {
    pub route_id: String,
    pub reason: UnmetReason,
    pub vehicles: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummaryDto {
    pub cycle_start: DateTime<Utc>,
    pub triggered_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: CycleOutcome,
    pub scarce: bool,
    pub trips: usize,
    pub released: usize,
    pub inconsistent: usize,
    pub unmet: Vec<UnmetDto>,
    pub skipped: Vec<String>,
}

impl CycleSummaryDto {
    pub fn from(trigger: Trigger, result: &Result<CycleReport, Error>) -> Self {
        let mut summary = Self {
            cycle_start: trigger.start,
            triggered_at: trigger.now,
            outcome: CycleOutcome::Committed,
            scarce: false,
            trips: 0,
            released: 0,
            inconsistent: 0,
            unmet: Vec::new(),
            skipped: Vec::new(),
        };
        match result {
            Ok(report) => {
                summary.scarce = report.scarce;
                summary.trips = report.trips.len();
                summary.released = report.cleanup.released.len();
                summary.inconsistent = report.cleanup.inconsistent.len();
                summary.unmet = report
                    .unmet
                    .iter()
                    .map(|unmet| UnmetDto {
                        route_id: unmet.route_id.to_string(),
                        reason: unmet.reason,
                        vehicles: unmet.vehicles,
                    })
                    .collect();
                summary.skipped = report
                    .skipped
                    .iter()
                    .map(|skipped| skipped.route_id.to_string())
                    .collect();
            }
            Err(Error::Cancelled(_)) => summary.outcome = CycleOutcome::Cancelled,
            Err(err) => {
                summary.outcome = CycleOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
        summary
    }
}
