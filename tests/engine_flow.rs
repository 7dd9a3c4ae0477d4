use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use growthpay::models::global_settings::GlobalSettings;
use growthpay::models::rewards::RewardTier;
use growthpay::models::users::{NewUser, User};
use growthpay::repositories::memory::MemStore;
use growthpay::repositories::session::MemorySessionStore;
use growthpay::repositories::SharedStore;
use growthpay::services::rewards::{RewardRequest, RewardRequestHandler, RewardService};
use growthpay::services::session::SessionGuard;
use growthpay::services::users::{UserRequest, UserRequestHandler, UserService};
use growthpay::services::{reports, Service};

fn settings(cycle: &str) -> GlobalSettings {
    GlobalSettings {
        subscription_fee: 299,
        t1_reward: 50,
        t2_reward: 25,
        current_cycle_id: cycle.to_string(),
        notice: String::new(),
        campaign_active: false,
        campaign_title: String::new(),
    }
}

fn spawn_services(
    store: &SharedStore,
) -> (mpsc::Sender<UserRequest>, mpsc::Sender<RewardRequest>) {
    let (user_tx, mut user_rx) = mpsc::channel(32);
    let (reward_tx, mut reward_rx) = mpsc::channel(32);

    let user_store = store.clone();
    tokio::spawn(async move {
        UserService::new()
            .run(UserRequestHandler::new(user_store), &mut user_rx)
            .await;
    });

    let reward_store = store.clone();
    tokio::spawn(async move {
        RewardService::new()
            .run(RewardRequestHandler::new(reward_store), &mut reward_rx)
            .await;
    });

    (user_tx, reward_tx)
}

async fn signup(
    user_tx: &mpsc::Sender<UserRequest>,
    mobile: &str,
    referral_code: Option<&str>,
) -> User {
    let (tx, rx) = oneshot::channel();
    user_tx
        .send(UserRequest::Signup {
            new_user: NewUser {
                mobile: mobile.to_string(),
                pin: "1234".to_string(),
                recovery_key: "567890".to_string(),
                full_name: format!("User {}", mobile),
                referral_code: referral_code.map(str::to_string),
            },
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap()
}

async fn upgrade(reward_tx: &mpsc::Sender<RewardRequest>, user_id: &str) {
    let (tx, rx) = oneshot::channel();
    reward_tx
        .send(RewardRequest::Upgrade {
            user_id: user_id.to_string(),
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();
}

/// The full walkthrough: A invites B, B invites C, everyone upgrades in
/// WEEK_01, the ledger and the P&L line up.
#[tokio::test]
async fn referral_chain_rewards_and_reporting() {
    let store: SharedStore = Arc::new(MemStore::new());
    store.write_settings(settings("WEEK_01")).await.unwrap();
    let (user_tx, reward_tx) = spawn_services(&store);

    let a = signup(&user_tx, "9000000001", None).await;
    let b = signup(&user_tx, "9000000002", Some("9000000001")).await;
    let c = signup(&user_tx, "9000000003", Some("9000000002")).await;

    // B upgrades: one T1 for A, no T2 (A has no referrer)
    upgrade(&reward_tx, &b.id).await;
    let a_rewards = store.rewards_for_user(&a.id).await.unwrap();
    assert_eq!(a_rewards.len(), 1);
    assert_eq!(a_rewards[0].tier, RewardTier::T1);
    assert_eq!(a_rewards[0].amount, 50);

    // C upgrades: T1 for B, and A's valve is open thanks to B's activation
    upgrade(&reward_tx, &c.id).await;
    let b_rewards = store.rewards_for_user(&b.id).await.unwrap();
    assert_eq!(b_rewards.len(), 1);
    assert_eq!(b_rewards[0].amount, 50);

    let a_rewards = store.rewards_for_user(&a.id).await.unwrap();
    assert_eq!(a_rewards.len(), 2);
    let t2 = a_rewards.iter().find(|r| r.tier == RewardTier::T2).unwrap();
    assert_eq!(t2.amount, 25);
    assert_eq!(t2.source_user_id.as_deref(), Some(c.id.as_str()));

    // wallets carry the credited totals
    let a_fresh = store.get_user_by_id(&a.id).await.unwrap().unwrap();
    assert_eq!(a_fresh.wallet_balance, 75);

    // 2 premium users at fee 299, payouts 125
    let users = store.list_users().await.unwrap();
    let payouts = store.total_payouts().await.unwrap();
    let report = reports::compute_pnl(&users, payouts, 299);
    assert_eq!(report.total_users, 3);
    assert_eq!(report.premium_users, 2);
    assert_eq!(report.gross_revenue, 598);
    assert_eq!(report.total_payouts, 125);
    assert_eq!(report.net_revenue, 473);
    assert_eq!(report.active_referrers, 2);
}

#[tokio::test]
async fn cycle_rollover_withholds_t2_from_the_grandparent() {
    let store: SharedStore = Arc::new(MemStore::new());
    store.write_settings(settings("WEEK_01")).await.unwrap();
    let (user_tx, reward_tx) = spawn_services(&store);

    signup(&user_tx, "9000000001", None).await;
    let b = signup(&user_tx, "9000000002", Some("9000000001")).await;
    let c = signup(&user_tx, "9000000003", Some("9000000002")).await;

    upgrade(&reward_tx, &b.id).await;
    store.write_settings(settings("WEEK_02")).await.unwrap();
    upgrade(&reward_tx, &c.id).await;

    let a = store.get_user_by_mobile("9000000001").await.unwrap().unwrap();
    let a_rewards = store.rewards_for_user(&a.id).await.unwrap();
    assert_eq!(a_rewards.len(), 1);
    assert!(a_rewards.iter().all(|r| r.tier == RewardTier::T1));
}

/// Login/session lifecycle across two devices against the same account.
#[tokio::test]
async fn device_binding_and_session_lifecycle() {
    let store: SharedStore = Arc::new(MemStore::new());
    store.write_settings(settings("WEEK_01")).await.unwrap();
    let (user_tx, _reward_tx) = spawn_services(&store);

    let user = signup(&user_tx, "9000000001", None).await;

    let phone = SessionGuard::new(
        store.clone(),
        Arc::new(MemorySessionStore::new()),
        "phone-1".to_string(),
        24,
    );
    let logged_in = phone.login("9000000001", "1234").await.unwrap();
    assert_eq!(logged_in.id, user.id);
    assert!(phone.current_user().await.is_some());

    // a second device never gets in, and never steals the binding
    let tablet = SessionGuard::new(
        store.clone(),
        Arc::new(MemorySessionStore::new()),
        "tablet-1".to_string(),
        24,
    );
    assert!(tablet.login("9000000001", "1234").await.is_err());
    let stored = store.get_user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.device_fingerprint.as_deref(), Some("phone-1"));

    phone.logout();
    assert!(phone.current_user().await.is_none());
}
