use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tokio::sync::oneshot;

use super::{error_response, internal_error, AppState};
use crate::models::users::{
    LoginRequest, NewUser, ResetPinRequest, UpdateProfile, UserView, WithdrawRequest,
};
use crate::services::users::UserRequest;

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::Signup {
            new_user: req,
            response: user_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match user_rx.await {
        Ok(Ok(user)) => (StatusCode::CREATED, Json(json!(UserView::from(user)))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::Login {
            mobile: req.mobile,
            pin: req.pin,
            device_id: req.device_id,
            response: user_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match user_rx.await {
        Ok(Ok(user)) => (StatusCode::OK, Json(json!(UserView::from(user)))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn reset_pin(
    State(state): State<AppState>,
    Json(req): Json<ResetPinRequest>,
) -> impl IntoResponse {
    let (reset_tx, reset_rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::ResetPin {
            mobile: req.mobile,
            recovery_key: req.recovery_key,
            new_pin: req.new_pin,
            response: reset_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match reset_rx.await {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "pin updated" }))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::GetUser {
            id: user_id.clone(),
            response: user_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match user_rx.await {
        Ok(Ok(Some(user))) => (StatusCode::OK, Json(json!(UserView::from(user)))),
        Ok(Ok(None)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("not found: user {}", user_id) })),
        ),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateProfile>,
) -> impl IntoResponse {
    let (update_tx, update_rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::UpdateProfile {
            id: user_id,
            update: req,
            response: update_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match update_rx.await {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "profile updated" }))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn withdraw(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> impl IntoResponse {
    let (withdraw_tx, withdraw_rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::Withdraw {
            user_id: req.user_id,
            amount: req.amount,
            response: withdraw_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match withdraw_rx.await {
        Ok(Ok(remaining)) => (
            StatusCode::OK,
            Json(json!({ "wallet_balance": remaining })),
        ),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}
