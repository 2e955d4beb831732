//! Accrual tick driver

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::state::AppState;

/// Background task that fires due timer ticks every `period`
pub async fn accrual_tick_task(state: Arc<AppState>, period: Duration) {
    info!("Starting accrual tick task ({}ms)", period.as_millis());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if let Err(e) = state.poll_ticks() {
            error!("Failed to drive timer ticks: {}", e);
        }
    }
}
