use std::collections::VecDeque;

use crossbeam_queue::ArrayQueue;
use headway::prelude::*;
use tokio::sync::{Notify, RwLock};

use crate::dto::CycleSummaryDto;

/// Summaries kept for `/api/cycles`.
const HISTORY_LEN: usize = 48;

pub struct AppState {
    pub forecast_url: Option<String>,
    pub store: RwLock<MemoryStore>,
    /// At most one cycle waits behind the running one.
    pub pending: ArrayQueue<Trigger>,
    pub wake: Notify,
    pub shutdown: CancelToken,
    history: RwLock<VecDeque<CycleSummaryDto>>,
}

impl AppState {
    pub fn new(forecast_url: Option<String>, store: MemoryStore) -> Self {
        Self {
            forecast_url,
            store: RwLock::new(store),
            pending: ArrayQueue::new(1),
            wake: Notify::new(),
            shutdown: CancelToken::new(),
            history: RwLock::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    /// Queues a cycle, handing the trigger back when one is already waiting.
    pub fn enqueue(&self, trigger: Trigger) -> Result<(), Trigger> {
        self.pending.push(trigger)?;
        self.wake.notify_one();
        Ok(())
    }

    pub async fn record(&self, summary: CycleSummaryDto) {
        let mut history = self.history.write().await;
        if history.len() == HISTORY_LEN {
            history.pop_back();
        }
        history.push_front(summary);
    }

    /// Newest first.
    pub async fn history(&self) -> Vec<CycleSummaryDto> {
        self.history.read().await.iter().cloned().collect()
    }
}
