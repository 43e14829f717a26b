//! The hourly dispatch cycle.
//!
//! A cycle runs Cleanup, Forecasting, Scheduling and Committing in order
//! against a [`FleetStore`]. The engine owns no timer: something outside calls
//! [`Dispatcher::run`] once per trigger.

pub mod assignment;
pub mod cleanup;
pub mod headway;
pub mod priority;
pub mod report;
pub mod writer;

pub use headway::Rounding;

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    demand::{self, DemandForecast, DemandSource},
    dispatch::{
        assignment::VehiclePool,
        priority::{PriorityScore, WeightedDemand},
        report::{CycleReport, SkipReason, SkippedRoute, UnmetDemand, UnmetReason},
    },
    shared::{next_hour, truncate_to_hour},
    store::{self, FleetStore},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("A cycle cannot start while the dispatcher is {0:?}")]
    NotIdle(CycleState),
    #[error("Cycle cancelled after {0}")]
    Cancelled(Stage),
    #[error("Dispatcher cannot move from {from:?} to {to:?}")]
    InvalidState { from: CycleState, to: CycleState },
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error(transparent)]
    Demand(#[from] demand::Error),
    #[error("Cycle failed during {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cleanup,
    Forecasting,
    Scheduling,
    Committing,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Cleanup => "cleanup",
            Stage::Forecasting => "forecasting",
            Stage::Scheduling => "scheduling",
            Stage::Committing => "committing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    #[default]
    Idle,
    Cleanup,
    Forecasting,
    Scheduling,
    Committing,
    /// The last cycle aborted in the given stage.
    Failed(Stage),
}

impl CycleState {
    pub const fn can_become(&self, next: CycleState) -> bool {
        match (self, next) {
            (CycleState::Idle, CycleState::Cleanup)
            | (CycleState::Failed(_), CycleState::Cleanup)
            | (CycleState::Cleanup, CycleState::Forecasting)
            | (CycleState::Forecasting, CycleState::Scheduling)
            | (CycleState::Scheduling, CycleState::Committing)
            | (CycleState::Committing, CycleState::Idle) => true,
            // Cancellation returns to idle from any stage before committing.
            (CycleState::Cleanup, CycleState::Idle)
            | (CycleState::Forecasting, CycleState::Idle)
            | (CycleState::Scheduling, CycleState::Idle) => true,
            (CycleState::Cleanup, CycleState::Failed(Stage::Cleanup))
            | (CycleState::Forecasting, CycleState::Failed(Stage::Forecasting))
            | (CycleState::Scheduling, CycleState::Failed(Stage::Scheduling))
            | (CycleState::Committing, CycleState::Failed(Stage::Committing)) => true,
            (CycleState::Idle, _)
            | (CycleState::Failed(_), _)
            | (CycleState::Cleanup, _)
            | (CycleState::Forecasting, _)
            | (CycleState::Scheduling, _)
            | (CycleState::Committing, _) => false,
        }
    }

    /// The stage a cycle in this state is executing.
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            CycleState::Cleanup => Some(Stage::Cleanup),
            CycleState::Forecasting => Some(Stage::Forecasting),
            CycleState::Scheduling => Some(Stage::Scheduling),
            CycleState::Committing => Some(Stage::Committing),
            CycleState::Idle | CycleState::Failed(_) => None,
        }
    }
}

/// Aborts an in flight cycle at the next stage boundary before committing.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, stage: Stage) -> Result<(), self::Error> {
        if self.is_cancelled() {
            Err(self::Error::Cancelled(stage))
        } else {
            Ok(())
        }
    }
}

/// The signal that starts one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    /// Wall clock time cleanup reconciles against.
    pub now: DateTime<Utc>,
    /// Start of the hour being scheduled.
    pub start: DateTime<Utc>,
}

impl Trigger {
    /// Schedules the hour following `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            start: next_hour(now),
        }
    }

    pub fn for_hour(now: DateTime<Utc>, hour: DateTime<Utc>) -> Self {
        Self {
            now,
            start: truncate_to_hour(hour),
        }
    }
}

/// Where a cycle reads its predictions from. Externally sourced forecasts are
/// written back to the store.
enum Forecasts<F> {
    Stored(F),
    External(F),
}

#[derive(Debug)]
pub struct Dispatcher {
    config: Config,
    scorer: Box<dyn PriorityScore>,
    state: CycleState,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scorer: Box::new(WeightedDemand),
            state: CycleState::Idle,
        }
    }

    pub fn with_scorer(mut self, scorer: impl PriorityScore + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one cycle with predictions from `demand`.
    pub fn run<S, D>(
        &mut self,
        store: &mut S,
        demand: &D,
        trigger: Trigger,
    ) -> Result<CycleReport, self::Error>
    where
        S: FleetStore,
        D: DemandSource + ?Sized,
    {
        self.run_with_cancel(store, demand, trigger, &CancelToken::new())
    }

    pub fn run_with_cancel<S, D>(
        &mut self,
        store: &mut S,
        demand: &D,
        trigger: Trigger,
        cancel: &CancelToken,
    ) -> Result<CycleReport, self::Error>
    where
        S: FleetStore,
        D: DemandSource + ?Sized,
    {
        self.execute(
            store,
            Forecasts::External(|_: &S, hour, timeout| demand.predictions(hour, timeout)),
            trigger,
            cancel,
        )
    }

    /// Runs one cycle with the predictions the store itself holds.
    pub fn run_materialized<S>(
        &mut self,
        store: &mut S,
        trigger: Trigger,
        cancel: &CancelToken,
    ) -> Result<CycleReport, self::Error>
    where
        S: FleetStore + DemandSource,
    {
        self.execute(
            store,
            Forecasts::Stored(|store: &S, hour, timeout| store.predictions(hour, timeout)),
            trigger,
            cancel,
        )
    }

    fn execute<S, F>(
        &mut self,
        store: &mut S,
        fetch: Forecasts<F>,
        trigger: Trigger,
        cancel: &CancelToken,
    ) -> Result<CycleReport, self::Error>
    where
        S: FleetStore,
        F: FnOnce(&S, DateTime<Utc>, Duration) -> Result<Vec<DemandForecast>, demand::Error>,
    {
        if !self.state.can_become(CycleState::Cleanup) {
            return Err(self::Error::NotIdle(self.state));
        }
        info!("Starting dispatch cycle for {}", trigger.start);
        let now = Instant::now();

        match self.stages(store, fetch, trigger, cancel) {
            Ok(report) => {
                self.transition(CycleState::Idle)?;
                info!(
                    "Dispatch cycle for {} committed {} trips in {:?}",
                    trigger.start,
                    report.trips.len(),
                    now.elapsed()
                );
                Ok(report)
            }
            Err(self::Error::Cancelled(stage)) => {
                self.transition(CycleState::Idle)?;
                info!("Dispatch cycle for {} cancelled after {}", trigger.start, stage);
                Err(self::Error::Cancelled(stage))
            }
            Err(err) => {
                let stage = self.state.stage().unwrap_or(Stage::Cleanup);
                self.state = CycleState::Failed(stage);
                error!("Dispatch cycle for {} failed during {}: {}", trigger.start, stage, err);
                Err(self::Error::Stage {
                    stage,
                    source: Box::new(err),
                })
            }
        }
    }

    fn stages<S, F>(
        &mut self,
        store: &mut S,
        fetch: Forecasts<F>,
        trigger: Trigger,
        cancel: &CancelToken,
    ) -> Result<CycleReport, self::Error>
    where
        S: FleetStore,
        F: FnOnce(&S, DateTime<Utc>, Duration) -> Result<Vec<DemandForecast>, demand::Error>,
    {
        self.transition(CycleState::Cleanup)?;
        let cleanup = cleanup::reconcile(store, trigger.now, self.config.trip_duration)?;
        cancel.check(Stage::Cleanup)?;

        self.transition(CycleState::Forecasting)?;
        debug!("Fetching demand for {}...", trigger.start);
        let now = Instant::now();
        let timeout = self.config.demand_timeout;
        let (forecasts, external) = match fetch {
            Forecasts::Stored(fetch) => (fetch(&*store, trigger.start, timeout)?, false),
            Forecasts::External(fetch) => (fetch(&*store, trigger.start, timeout)?, true),
        };
        if now.elapsed() > timeout {
            return Err(demand::Error::Timeout(timeout).into());
        }
        debug!("Fetching demand took {:?}", now.elapsed());
        if external {
            store.record_forecasts(trigger.start, trigger.now, &forecasts)?;
        }
        cancel.check(Stage::Forecasting)?;

        self.transition(CycleState::Scheduling)?;
        let now = Instant::now();
        let report = self.schedule(store, forecasts, trigger, cleanup)?;
        debug!("Scheduling took {:?}", now.elapsed());
        cancel.check(Stage::Scheduling)?;

        self.transition(CycleState::Committing)?;
        let deadline = Instant::now() + self.config.commit_timeout;
        store.commit_schedule(&report.trips, deadline)?;
        Ok(report)
    }

    fn schedule<S: FleetStore>(
        &self,
        store: &S,
        forecasts: Vec<DemandForecast>,
        trigger: Trigger,
        cleanup: cleanup::CleanupReport,
    ) -> Result<CycleReport, self::Error> {
        let mut pool = VehiclePool::new(store.available_vehicles()?);
        let mut routes = store.route_meta()?;
        routes.sort_by(|a, b| a.route_id.cmp(&b.route_id));

        let mut demand: HashMap<_, _> = forecasts
            .into_iter()
            .map(|forecast| (forecast.route_id, forecast.predicted_passengers))
            .collect();
        let capacity = headway::fleet_capacity(pool.vehicles(), self.config.default_capacity);

        let mut plans = Vec::with_capacity(routes.len());
        let mut skipped = Vec::new();
        let mut unmet = Vec::new();
        for route in &routes {
            let Some(passengers) = demand.remove(&route.route_id) else {
                warn!("No prediction for route {}, skipping", route.route_id);
                skipped.push(SkippedRoute {
                    route_id: route.route_id.clone(),
                    reason: SkipReason::NoPrediction,
                });
                continue;
            };
            match headway::plan(route, passengers, capacity, &self.config) {
                Ok(plan) => {
                    if plan.capped > 0 {
                        unmet.push(UnmetDemand {
                            route_id: plan.route_id.clone(),
                            reason: UnmetReason::Capped,
                            vehicles: plan.capped,
                        });
                    }
                    plans.push(plan);
                }
                Err(err) => {
                    warn!("{}, skipping", err);
                    skipped.push(SkippedRoute {
                        route_id: route.route_id.clone(),
                        reason: SkipReason::ZeroCapacity,
                    });
                }
            }
        }
        for route_id in demand.keys() {
            warn!("Prediction for unknown route {} ignored", route_id);
        }

        let available_vehicles = pool.len();
        let scarce = priority::is_scarce(&plans, available_vehicles);
        if scarce {
            info!(
                "Fleet of {} vehicles cannot cover every route, serving by priority",
                available_vehicles
            );
        }
        let ranking = priority::rank(plans, self.scorer.as_ref());
        let assignments = assignment::assign(&ranking, &mut pool);
        unmet.extend(assignments.iter().filter(|a| a.shortfall() > 0).map(|a| {
            UnmetDemand {
                route_id: a.route_id.clone(),
                reason: UnmetReason::FleetExhausted,
                vehicles: a.shortfall(),
            }
        }));
        let trips = writer::build(&assignments, trigger.start);

        Ok(CycleReport {
            cycle_start: trigger.start,
            triggered_at: trigger.now,
            scorer: self.scorer.name(),
            available_vehicles,
            scarce,
            cleanup,
            ranking,
            assignments,
            trips,
            unmet,
            skipped,
        })
    }

    fn transition(&mut self, next: CycleState) -> Result<(), self::Error> {
        if !self.state.can_become(next) {
            return Err(self::Error::InvalidState {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
