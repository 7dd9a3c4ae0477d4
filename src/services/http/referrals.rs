use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tokio::sync::oneshot;

use super::{error_response, internal_error, AppState};
use crate::services::referrals::ReferralRequest;

/// Growth view payload: upline, direct team and the live valve indicator.
pub async fn get_referrals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (upline_tx, upline_rx) = oneshot::channel();
    let sent = state
        .referral_channel
        .send(ReferralRequest::GetUpline {
            user_id: user_id.clone(),
            response: upline_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }
    let upline = match upline_rx.await {
        Ok(Ok(upline)) => upline,
        Ok(Err(e)) => return error_response(&e),
        Err(_) => return internal_error(),
    };

    let (team_tx, team_rx) = oneshot::channel();
    let sent = state
        .referral_channel
        .send(ReferralRequest::ListTeam {
            user_id: user_id.clone(),
            response: team_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }
    let team = match team_rx.await {
        Ok(Ok(team)) => team,
        Ok(Err(e)) => return error_response(&e),
        Err(_) => return internal_error(),
    };

    let (valve_tx, valve_rx) = oneshot::channel();
    let sent = state
        .referral_channel
        .send(ReferralRequest::ValveStatus {
            user_id,
            response: valve_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }
    let valve = match valve_rx.await {
        Ok(Ok(valve)) => valve,
        Ok(Err(e)) => return error_response(&e),
        Err(_) => return internal_error(),
    };

    (
        StatusCode::OK,
        Json(json!({
            "upline": upline,
            "team": team,
            "valve": valve
        })),
    )
}
