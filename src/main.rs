//! Clinic Timer - visit timers with billing complexity codes
//!
//! This is the main entry point for the clinic-timer service.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use clinic_timer::{
    api::create_router,
    clock::SystemClock,
    config::Config,
    state::AppState,
    store::FileStore,
    tasks::{accrual_tick_task, autosave_task, lifecycle_signal_task, shutdown_signal},
};

// Every intent, tick and signal runs on one thread
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("clinic_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting clinic-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_dir={}, autosave={}",
          config.host, config.port, config.data_dir.display(), config.autosave);

    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("cannot open data directory {}", config.data_dir.display()))?;

    // Create application state from whatever was saved last time
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        Arc::new(store),
        Arc::new(SystemClock),
    ));

    // A fresh launch regains foreground execution: credit backgrounded timers
    state.resume()?;

    tokio::spawn(accrual_tick_task(Arc::clone(&state), config.tick_interval()));
    tokio::spawn(lifecycle_signal_task(Arc::clone(&state)));
    if config.autosave {
        tokio::spawn(autosave_task(Arc::clone(&state)));
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers              - List timers");
    info!("  POST   /timers              - Add a timer");
    info!("  DELETE /timers/:id          - Remove a timer");
    info!("  POST   /timers/:id/start    - Start a timer");
    info!("  POST   /timers/:id/pause    - Toggle pause");
    info!("  POST   /timers/:id/stop     - Stop and zero a timer");
    info!("  PUT    /timers/:id/name     - Rename a timer");
    info!("  POST   /reorder             - Move a timer");
    info!("  POST   /reset               - Stop every timer");
    info!("  POST   /lifecycle/suspend   - Suspend and save");
    info!("  POST   /lifecycle/resume    - Resume");
    info!("  GET    /status              - Check current status");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Leaving foreground for good: background running timers and persist
    if let Err(e) = state.suspend() {
        tracing::error!("Failed to save timers on shutdown: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
