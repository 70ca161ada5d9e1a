use crate::AppState;
use crate::background;
use crate::error::AppError;
use crate::platform::StatusQuery;
use crate::service::{Maintenance, TimerStatus};
use crate::validation;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::TypedHeader;
use axum_macros::debug_handler;
use headers::Authorization;
use headers::authorization::Bearer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type Auth = Option<TypedHeader<Authorization<Bearer>>>;

/// Run a blocking call against the maintenance service with the request's
/// task timeout.
async fn with_service<T, F>(state: &AppState, name: &'static str, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Maintenance) -> T + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    let result = background::spawn_blocking(name, state.task_timeout, move || f(&service))
        .join()
        .await?;
    Ok(result)
}

fn authorize(state: &AppState, auth: Auth) -> Result<(), AppError> {
    let Some(expected) = &state.admin_token else {
        return Ok(());
    };
    match auth {
        Some(TypedHeader(header)) if header.token() == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

#[derive(Serialize)]
pub(crate) struct TimerResponse {
    seconds_remaining: u64,
    target_state: bool,
    recurring: bool,
}

impl From<TimerStatus> for TimerResponse {
    fn from(status: TimerStatus) -> Self {
        Self {
            seconds_remaining: status.seconds_remaining,
            target_state: status.target_state,
            recurring: status.recurring,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    maintenance: bool,
    timer_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timer: Option<TimerResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ping_message: Option<String>,
    online: usize,
    max: usize,
}

#[derive(Deserialize)]
pub(crate) struct JoinRequest {
    uuid: String,
    name: String,
}

#[derive(Serialize)]
pub(crate) struct JoinResponse {
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LeaveRequest {
    uuid: String,
}

#[derive(Deserialize)]
pub(crate) struct ModeRequest {
    enabled: bool,
}

#[derive(Serialize)]
pub(crate) struct ModeResponse {
    enabled: bool,
}

#[derive(Deserialize)]
pub(crate) struct StartTimerRequest {
    seconds: i64,
    enable: bool,
}

#[derive(Deserialize)]
pub(crate) struct ScheduleRequest {
    delay: i64,
    duration: i64,
}

#[derive(Serialize)]
pub(crate) struct CancelResponse {
    cancelled: bool,
}

#[derive(Deserialize)]
pub(crate) struct WhitelistRequest {
    uuid: String,
    name: String,
}

#[derive(Serialize)]
pub(crate) struct WhitelistEntryResponse {
    uuid: String,
    name: String,
}

#[derive(Serialize)]
pub(crate) struct AddedResponse {
    added: bool,
}

pub(crate) async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let response = with_service(&state, "status", |service| StatusResponse {
        maintenance: service.is_maintenance(),
        timer_message: service.timer_message(),
        timer: service.timer_status().map(TimerResponse::from),
        ping_message: service.ping_message(),
        online: service.platform().online_players(),
        max: service.platform().max_players(),
    })
    .await?;
    Ok(Json(response))
}

#[debug_handler]
pub(crate) async fn join(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let player_id = validation::validate_player_id(&payload.uuid)?;
    let name = validation::validate_player_name(&payload.name)?;

    let (allowed, message) = with_service(&state, "join", move |service| {
        if service.admits(player_id) {
            (true, None)
        } else {
            (false, Some(service.deny_message()))
        }
    })
    .await?;

    if allowed {
        state.sessions.player_join(player_id, name).await;
    } else {
        tracing::info!(%player_id, %name, "refused connection during maintenance");
    }
    Ok(Json(JoinResponse { allowed, message }))
}

pub(crate) async fn leave(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LeaveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let player_id = validation::validate_player_id(&payload.uuid)?;
    state.sessions.player_leave(player_id).await;
    Ok(StatusCode::OK)
}

#[debug_handler]
pub(crate) async fn set_maintenance(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Json(payload): Json<ModeRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let enabled = payload.enabled;
    with_service(&state, "set_maintenance", move |service| {
        service.set_maintenance(enabled)
    })
    .await?;
    Ok(Json(ModeResponse { enabled }))
}

pub(crate) async fn start_timer(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Json(payload): Json<StartTimerRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let seconds = validation::validate_seconds("seconds", payload.seconds)?;
    let enable = payload.enable;

    let status = with_service(&state, "start_timer", move |service| {
        service
            .start_timer(seconds, enable)
            .then(|| service.timer_status())
            .flatten()
    })
    .await?;

    match status {
        Some(status) => Ok(Json(TimerResponse::from(status))),
        None => Err(AppError::Conflict(format!(
            "Maintenance is already {}",
            if enable { "enabled" } else { "disabled" }
        ))),
    }
}

pub(crate) async fn schedule_timer(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Json(payload): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let delay = validation::validate_seconds("delay", payload.delay)?;
    let duration = validation::validate_seconds("duration", payload.duration)?;

    let status = with_service(&state, "schedule_timer", move |service| {
        service
            .schedule_timer(delay, duration)
            .then(|| service.timer_status())
            .flatten()
    })
    .await?;

    status
        .map(|status| Json(TimerResponse::from(status)))
        .ok_or_else(|| AppError::Conflict("Schedule was not accepted".to_string()))
}

pub(crate) async fn cancel_timer(
    State(state): State<Arc<AppState>>,
    auth: Auth,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let cancelled = with_service(&state, "cancel_timer", |service| service.cancel_timer()).await?;
    Ok(Json(CancelResponse { cancelled }))
}

pub(crate) async fn list_whitelist(
    State(state): State<Arc<AppState>>,
    auth: Auth,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let entries = with_service(&state, "list_whitelist", |service| {
        service.whitelist().list_all()
    })
    .await?;
    let entries: Vec<_> = entries
        .into_iter()
        .map(|entry| WhitelistEntryResponse {
            uuid: entry.player_id.to_string(),
            name: entry.display_name.to_string(),
        })
        .collect();
    Ok(Json(entries))
}

pub(crate) async fn add_whitelist(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Json(payload): Json<WhitelistRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let player_id = validation::validate_player_id(&payload.uuid)?;
    let name = validation::validate_player_name(&payload.name)?;

    let added = with_service(&state, "add_whitelist", move |service| {
        service.whitelist().add(player_id, &name)
    })
    .await??;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AddedResponse { added })))
}

pub(crate) async fn remove_whitelist(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let player_id = validation::validate_player_id(&uuid)?;

    let removed = with_service(&state, "remove_whitelist", move |service| {
        service.whitelist().remove(player_id)
    })
    .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("{player_id} is not whitelisted")))
    }
}

pub(crate) async fn reload(
    State(state): State<Arc<AppState>>,
    auth: Auth,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    with_service(&state, "reload", |service| service.reload()).await??;
    Ok(StatusCode::OK)
}
