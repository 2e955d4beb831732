//! Autosave background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Background task that persists the list after structural edits
pub async fn autosave_task(state: Arc<AppState>) {
    info!("Starting autosave task");

    let mut state_rx = state.subscribe();

    loop {
        match state_rx.recv().await {
            Ok(event) if event.is_structural() => {
                debug!("Autosaving after {:?}", event);
                if let Err(e) = state.save() {
                    error!("Autosave failed: {}", e);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                // Missed events still changed the list; save once to catch up
                warn!("Autosave lagged by {} events", skipped);
                if let Err(e) = state.save() {
                    error!("Autosave failed: {}", e);
                }
            }
            Err(RecvError::Closed) => {
                info!("State channel closed, stopping autosave task");
                break;
            }
        }
    }
}
