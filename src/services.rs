use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::repositories::SharedStore;

pub mod admin;
pub mod expenses;
pub mod http;
pub mod referrals;
pub mod reports;
pub mod rewards;
pub mod session;
pub mod users;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is linked to another device")]
    DeviceConflict,
    #[error("session expired")]
    SessionExpired,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(String),
}

pub(crate) fn store_err(e: anyhow::Error) -> ServiceError {
    ServiceError::Store(e.to_string())
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(store: SharedStore, listen: String) -> Result<(), anyhow::Error> {
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (expense_tx, mut expense_rx) = mpsc::channel(512);
    let (referral_tx, mut referral_rx) = mpsc::channel(512);
    let (reward_tx, mut reward_rx) = mpsc::channel(512);
    let (admin_tx, mut admin_rx) = mpsc::channel(512);

    let mut user_service = users::UserService::new();
    let mut expense_service = expenses::ExpenseService::new();
    let mut referral_service = referrals::ReferralService::new();
    let mut reward_service = rewards::RewardService::new();
    let mut admin_service = admin::AdminService::new();

    println!("[*] Starting user service.");
    let user_store = store.clone();
    tokio::spawn(async move {
        user_service
            .run(users::UserRequestHandler::new(user_store), &mut user_rx)
            .await;
    });

    println!("[*] Starting expense service.");
    let expense_store = store.clone();
    tokio::spawn(async move {
        expense_service
            .run(
                expenses::ExpenseRequestHandler::new(expense_store),
                &mut expense_rx,
            )
            .await;
    });

    println!("[*] Starting referral service.");
    let referral_store = store.clone();
    tokio::spawn(async move {
        referral_service
            .run(
                referrals::ReferralRequestHandler::new(referral_store),
                &mut referral_rx,
            )
            .await;
    });

    log::info!("Starting reward service.");
    let reward_store = store.clone();
    tokio::spawn(async move {
        reward_service
            .run(
                rewards::RewardRequestHandler::new(reward_store),
                &mut reward_rx,
            )
            .await;
    });

    log::info!("Starting admin service.");
    let admin_store = store.clone();
    tokio::spawn(async move {
        admin_service
            .run(admin::AdminRequestHandler::new(admin_store), &mut admin_rx)
            .await;
    });

    println!("[*] Starting HTTP server.");
    http::start_http_server(listen, user_tx, expense_tx, referral_tx, reward_tx, admin_tx).await?;

    Ok(())
}
