use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::admin::AdminRequest;
use super::expenses::ExpenseRequest;
use super::referrals::ReferralRequest;
use super::rewards::RewardRequest;
use super::users::UserRequest;
use super::ServiceError;

mod admin;
mod expenses;
mod referrals;
mod rewards;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub user_channel: mpsc::Sender<UserRequest>,
    pub expense_channel: mpsc::Sender<ExpenseRequest>,
    pub referral_channel: mpsc::Sender<ReferralRequest>,
    pub reward_channel: mpsc::Sender<RewardRequest>,
    pub admin_channel: mpsc::Sender<AdminRequest>,
}

pub(super) fn error_response(error: &ServiceError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match error {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::InvalidCredentials | ServiceError::SessionExpired => {
            StatusCode::UNAUTHORIZED
        }
        ServiceError::DeviceConflict => StatusCode::CONFLICT,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": error.to_string() })))
}

pub(super) fn internal_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
}

/// Server-side capability check for the admin surface. The acting user comes
/// from the x-user-id header and must carry the admin flag.
async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(acting_user) = request
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing x-user-id header" })),
        )
            .into_response();
    };

    let (user_tx, user_rx) = oneshot::channel();
    let sent = state
        .user_channel
        .send(UserRequest::GetUser {
            id: acting_user,
            response: user_tx,
        })
        .await;
    if sent.is_err() {
        return internal_error().into_response();
    }

    match user_rx.await {
        Ok(Ok(Some(user))) if user.is_admin => next.run(request).await,
        Ok(Ok(_)) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "admin access required" })),
        )
            .into_response(),
        Ok(Err(e)) => error_response(&e).into_response(),
        Err(_) => internal_error().into_response(),
    }
}

pub async fn start_http_server(
    listen: String,
    user_channel: mpsc::Sender<UserRequest>,
    expense_channel: mpsc::Sender<ExpenseRequest>,
    referral_channel: mpsc::Sender<ReferralRequest>,
    reward_channel: mpsc::Sender<RewardRequest>,
    admin_channel: mpsc::Sender<AdminRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        user_channel,
        expense_channel,
        referral_channel,
        reward_channel,
        admin_channel,
    };

    let admin_routes = Router::new()
        .route(
            "/settings",
            get(admin::read_settings).put(admin::write_settings),
        )
        .route("/stats", get(admin::stats))
        .route("/bonus", post(admin::grant_bonus))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ));

    let app = Router::new()
        .route("/api/signup", post(users::signup))
        .route("/api/login", post(users::login))
        .route("/api/reset-pin", post(users::reset_pin))
        .route("/api/users/{id}", get(users::get_user))
        .route("/api/users/{id}/profile", put(users::update_profile))
        .route("/api/withdraw", post(users::withdraw))
        .route(
            "/api/expenses",
            post(expenses::create_expense),
        )
        .route(
            "/api/expenses/{id}",
            get(expenses::list_expenses)
                .put(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        .route("/api/referrals/{user_id}", get(referrals::get_referrals))
        .route("/api/upgrade", post(rewards::upgrade))
        .nest("/api/admin", admin_routes)
        .route("/api/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    println!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
