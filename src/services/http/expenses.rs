use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use super::{error_response, internal_error, AppState};
use crate::models::expenses::{ExpenseFilter, NewExpense, UpdateExpense};
use crate::services::expenses::ExpenseRequest;
use crate::services::ServiceError;

#[derive(Deserialize)]
pub struct ListQuery {
    filter: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteBody {
    user_id: String,
}

pub async fn create_expense(
    State(state): State<AppState>,
    Json(req): Json<NewExpense>,
) -> impl IntoResponse {
    let (expense_tx, expense_rx) = oneshot::channel();

    let sent = state
        .expense_channel
        .send(ExpenseRequest::Create {
            new_expense: req,
            response: expense_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match expense_rx.await {
        Ok(Ok(expense)) => (StatusCode::CREATED, Json(json!(expense))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

/// The path parameter is the owner here: GET /api/expenses/{user_id}.
pub async fn list_expenses(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let filter = match query.filter.as_deref() {
        Some(raw) => match ExpenseFilter::parse(raw) {
            Some(filter) => Some(filter),
            None => {
                let error =
                    ServiceError::Validation(format!("unknown filter: {}", raw));
                return error_response(&error);
            }
        },
        None => None,
    };

    let (list_tx, list_rx) = oneshot::channel();
    let sent = state
        .expense_channel
        .send(ExpenseRequest::List {
            user_id,
            filter,
            response: list_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match list_rx.await {
        Ok(Ok(listed)) => (StatusCode::OK, Json(json!(listed))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<String>,
    Json(req): Json<UpdateExpense>,
) -> impl IntoResponse {
    let (update_tx, update_rx) = oneshot::channel();

    let sent = state
        .expense_channel
        .send(ExpenseRequest::Update {
            id: expense_id,
            update: req,
            response: update_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match update_rx.await {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "expense updated" }))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<String>,
    Json(req): Json<DeleteBody>,
) -> impl IntoResponse {
    let (delete_tx, delete_rx) = oneshot::channel();

    let sent = state
        .expense_channel
        .send(ExpenseRequest::Delete {
            id: expense_id,
            user_id: req.user_id,
            response: delete_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error();
    }

    match delete_rx.await {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "expense deleted" }))),
        Ok(Err(e)) => error_response(&e),
        Err(_) => internal_error(),
    }
}
