//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::state::{AppState, RunState, TimerId};
use super::responses::{
    ApiError, ApiResponse, HealthResponse, MoveRequest, NameRequest, StatusResponse, TimerResponse,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Log a failed intent at a level matching its severity
fn log_failure(action: &str, err: ApiError) -> ApiError {
    if err.status_code().is_server_error() {
        error!("Failed to {}: {}", action, err.0);
    } else {
        warn!("Rejected {}: {}", action, err.0);
    }
    err
}

/// Handle GET /timers - List timers in display order
pub async fn list_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let timers = state
        .list_timers()
        .map_err(|e| log_failure("list timers", e.into()))?;
    Ok(Json(ApiResponse::ok(format!("{} timers", timers.len()), timers)))
}

/// Handle POST /timers - Add a timer at the end of the list
pub async fn add_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NameRequest>,
) -> Result<(StatusCode, Json<TimerResponse>), ApiError> {
    let timer = state
        .add_timer(&request.name)
        .map_err(|e| log_failure("add timer", e.into()))?;
    Ok((
        StatusCode::CREATED,
        Json(TimerResponse::ok(format!("Timer '{}' added", timer.name), timer)),
    ))
}

/// Handle GET /timers/:id - Read one timer
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<TimerResponse> {
    let timer = state
        .get_timer(id)
        .map_err(|e| log_failure("read timer", e.into()))?;
    Ok(Json(TimerResponse::ok(format!("Timer '{}'", timer.name), timer)))
}

/// Handle DELETE /timers/:id - Remove a timer
pub async fn remove_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<ApiResponse> {
    state
        .remove_timer(id)
        .map_err(|e| log_failure("remove timer", e.into()))?;
    let timers = state.list_timers().map_err(ApiError::from)?;
    Ok(Json(ApiResponse::ok("Timer removed".to_string(), timers)))
}

/// Handle POST /timers/:id/start
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<TimerResponse> {
    let timer = state
        .start_timer(id)
        .map_err(|e| log_failure("start timer", e.into()))?;
    info!("Start endpoint called for '{}'", timer.name);
    Ok(Json(TimerResponse::ok(format!("Timer '{}' running", timer.name), timer)))
}

/// Handle POST /timers/:id/pause - Toggle pause
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<TimerResponse> {
    let timer = state
        .pause_timer(id)
        .map_err(|e| log_failure("pause timer", e.into()))?;
    let message = match timer.run_state {
        RunState::Paused => format!("Timer '{}' paused", timer.name),
        RunState::Running => format!("Timer '{}' resumed", timer.name),
        RunState::Idle => format!("Timer '{}' has not been started", timer.name),
    };
    info!("{}", message);
    Ok(Json(TimerResponse::ok(message, timer)))
}

/// Handle POST /timers/:id/stop - Stop and zero a timer
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<TimerResponse> {
    let timer = state
        .stop_timer(id)
        .map_err(|e| log_failure("stop timer", e.into()))?;
    info!("Stop endpoint called for '{}'", timer.name);
    Ok(Json(TimerResponse::ok(format!("Timer '{}' reset", timer.name), timer)))
}

/// Handle PUT /timers/:id/name - Rename a timer
pub async fn rename_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
    Json(request): Json<NameRequest>,
) -> ApiResult<TimerResponse> {
    let timer = state
        .rename_timer(id, &request.name)
        .map_err(|e| log_failure("rename timer", e.into()))?;
    Ok(Json(TimerResponse::ok(format!("Timer renamed to '{}'", timer.name), timer)))
}

/// Handle POST /reorder - Move a timer within the list
pub async fn move_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<ApiResponse> {
    let timers = state
        .move_timer(request.from, request.to)
        .map_err(|e| log_failure("move timer", e.into()))?;
    Ok(Json(ApiResponse::ok(
        format!("Moved timer from {} to {}", request.from, request.to),
        timers,
    )))
}

/// Handle POST /reset - Stop every timer
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let timers = state
        .reset_all()
        .map_err(|e| log_failure("reset timers", e.into()))?;
    Ok(Json(ApiResponse::ok("All timers reset".to_string(), timers)))
}

/// Handle POST /save - Persist the list now
pub async fn save_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    state
        .save()
        .map_err(|e| log_failure("save timers", e.into()))?;
    let timers = state.list_timers().map_err(ApiError::from)?;
    Ok(Json(ApiResponse::ok("Timers saved".to_string(), timers)))
}

/// Handle POST /lifecycle/suspend - The host is about to stop executing
pub async fn suspend_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    state
        .suspend()
        .map_err(|e| log_failure("suspend timers", e.into()))?;
    let timers = state.list_timers().map_err(ApiError::from)?;
    Ok(Json(ApiResponse::ok("Timers suspended".to_string(), timers)))
}

/// Handle POST /lifecycle/resume - The host regained execution
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    state
        .resume()
        .map_err(|e| log_failure("resume timers", e.into()))?;
    let timers = state.list_timers().map_err(ApiError::from)?;
    Ok(Json(ApiResponse::ok("Timers resumed".to_string(), timers)))
}

/// Handle GET /status - Return current status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let timers = state
        .list_timers()
        .map_err(|e| log_failure("read status", e.into()))?;
    let suspended = state
        .is_suspended()
        .map_err(|e| log_failure("read status", e.into()))?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer_count: timers.len(),
        running: timers.iter().filter(|t| t.run_state == RunState::Running).count(),
        paused: timers.iter().filter(|t| t.run_state == RunState::Paused).count(),
        suspended,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
