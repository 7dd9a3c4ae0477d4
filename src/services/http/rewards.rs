use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tokio::sync::oneshot;

use super::{error_response, internal_error, AppState};
use crate::models::rewards::UpgradeRequest;
use crate::services::rewards::RewardRequest;

pub async fn upgrade(
    State(state): State<AppState>,
    Json(req): Json<UpgradeRequest>,
) -> impl IntoResponse {
    let (upgrade_tx, upgrade_rx) = oneshot::channel();

    let sent = state
        .reward_channel
        .send(RewardRequest::Upgrade {
            user_id: req.user_id,
            response: upgrade_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match upgrade_rx.await {
        Ok(Ok(outcome)) => (StatusCode::OK, Json(json!(outcome))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}
