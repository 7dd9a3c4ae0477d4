use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tokio::sync::oneshot;

use super::{error_response, internal_error, AppState};
use crate::models::global_settings::GlobalSettings;
use crate::models::rewards::BonusRequest;
use crate::services::admin::AdminRequest;
use crate::services::rewards::RewardRequest;

pub async fn read_settings(State(state): State<AppState>) -> impl IntoResponse {
    let (settings_tx, settings_rx) = oneshot::channel();

    let sent = state
        .admin_channel
        .send(AdminRequest::ReadSettings {
            response: settings_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match settings_rx.await {
        Ok(Ok(settings)) => (StatusCode::OK, Json(json!(settings))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn write_settings(
    State(state): State<AppState>,
    Json(req): Json<GlobalSettings>,
) -> impl IntoResponse {
    let (write_tx, write_rx) = oneshot::channel();

    let sent = state
        .admin_channel
        .send(AdminRequest::WriteSettings {
            settings: req,
            response: write_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match write_rx.await {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "settings saved" }))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let (stats_tx, stats_rx) = oneshot::channel();

    let sent = state
        .admin_channel
        .send(AdminRequest::Stats { response: stats_tx })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match stats_rx.await {
        Ok(Ok(report)) => (StatusCode::OK, Json(json!(report))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn grant_bonus(
    State(state): State<AppState>,
    Json(req): Json<BonusRequest>,
) -> impl IntoResponse {
    let (bonus_tx, bonus_rx) = oneshot::channel();

    let sent = state
        .reward_channel
        .send(RewardRequest::GrantBonus {
            user_id: req.user_id,
            amount: req.amount,
            response: bonus_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match bonus_rx.await {
        Ok(Ok(reward)) => (StatusCode::CREATED, Json(json!(reward))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}
