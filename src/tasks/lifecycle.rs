//! Host lifecycle signals: job-control stop/continue and shutdown

use std::sync::Arc;

use futures::stream::StreamExt;
use signal_hook::consts::{SIGCONT, SIGHUP, SIGINT, SIGTERM, SIGTSTP};
use signal_hook_tokio::Signals;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Background task that forwards SIGTSTP and SIGCONT to the timers.
///
/// SIGTSTP suspends and saves every timer, then stops the process the way the
/// default handler would. SIGCONT resumes them and credits the stopped time.
pub async fn lifecycle_signal_task(state: Arc<AppState>) {
    let mut signals = match Signals::new([SIGTSTP, SIGCONT]) {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to register lifecycle signal handlers: {}", e);
            return;
        }
    };
    info!("Starting lifecycle signal task");

    while let Some(signal) = signals.next().await {
        match signal {
            SIGTSTP => {
                info!("Received SIGTSTP, suspending timers");
                if let Err(e) = state.suspend() {
                    error!("Failed to suspend timers: {}", e);
                }
                if let Err(e) = signal_hook::low_level::emulate_default_handler(SIGTSTP) {
                    warn!("Failed to stop process after SIGTSTP: {}", e);
                }
            }
            SIGCONT => {
                info!("Received SIGCONT, resuming timers");
                if let Err(e) = state.resume() {
                    error!("Failed to resume timers: {}", e);
                }
            }
            other => warn!("Ignoring unexpected signal {}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT, SIGHUP)
pub async fn shutdown_signal() {
    let mut signals = match Signals::new([SIGTERM, SIGINT, SIGHUP]) {
        Ok(signals) => signals,
        Err(e) => {
            warn!("Failed to create signal handler, falling back to ctrl-c: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
            }
            return;
        }
    };

    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
}
