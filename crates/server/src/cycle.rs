use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use headway::{prelude::*, shared::next_hour};
use tracing::{error, info, warn};

use crate::{dto::CycleSummaryDto, forecast::HttpForecast, state::AppState};

/// Runs queued cycles one at a time.
pub async fn worker(state: Arc<AppState>, mut dispatcher: Dispatcher) {
    loop {
        state.wake.notified().await;
        while let Some(trigger) = state.pending.pop() {
            let shared = state.clone();
            let result = tokio::task::spawn_blocking(move || {
                let summary = run_cycle(&shared, &mut dispatcher, trigger);
                (dispatcher, summary)
            })
            .await;
            match result {
                Ok((returned, summary)) => {
                    dispatcher = returned;
                    state.record(summary).await;
                }
                Err(err) => {
                    error!("Cycle worker stopped: {err}");
                    return;
                }
            }
        }
    }
}

/// The write guard is held for the whole cycle.
fn run_cycle(state: &AppState, dispatcher: &mut Dispatcher, trigger: Trigger) -> CycleSummaryDto {
    let mut store = state.store.blocking_write();
    let result = match &state.forecast_url {
        Some(url) => dispatcher.run_with_cancel(
            &mut *store,
            &HttpForecast::new(url),
            trigger,
            &state.shutdown,
        ),
        None => dispatcher.run_materialized(&mut *store, trigger, &state.shutdown),
    };
    CycleSummaryDto::from(trigger, &result)
}

/// Queues one cycle for the following hour at every hour boundary.
pub async fn clock(state: Arc<AppState>) {
    loop {
        let now = Utc::now();
        let boundary = next_hour(now);
        let wait = (boundary - now).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        let trigger = Trigger::for_hour(Utc::now(), boundary + TimeDelta::hours(1));
        info!("Clock queued cycle for {}", trigger.start);
        if state.pending.force_push(trigger).is_some() {
            warn!("Replaced a cycle that was still waiting");
        }
        state.wake.notify_one();
    }
}
