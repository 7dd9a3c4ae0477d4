use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{expenses, global_settings, rewards, users};

pub mod memory;
pub mod postgres;
pub mod session;

pub type SharedStore = Arc<dyn Store>;

/// Thin data-access seam over the four tables. Production uses
/// [`postgres::PgStore`]; tests and the `--in-memory` flag use
/// [`memory::MemStore`].
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Inserts a user. An unknown referral code is recorded as no referrer;
    /// a known code is stored as-is (the inviter's mobile number).
    async fn insert_user(&self, new_user: users::NewUser) -> Result<users::User, anyhow::Error>;

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<users::User>, anyhow::Error>;

    async fn get_user_by_mobile(&self, mobile: &str)
        -> Result<Option<users::User>, anyhow::Error>;

    async fn find_by_credentials(
        &self,
        mobile: &str,
        pin: &str,
    ) -> Result<Option<users::User>, anyhow::Error>;

    /// Conditional bind: only succeeds while no fingerprint is stored.
    /// Returns whether the update applied. An existing binding is never
    /// overwritten.
    async fn bind_device_if_unbound(
        &self,
        user_id: &str,
        fingerprint: &str,
    ) -> Result<bool, anyhow::Error>;

    async fn update_profile(
        &self,
        user_id: &str,
        update: users::UpdateProfile,
    ) -> Result<bool, anyhow::Error>;

    /// Returns whether a user matched (mobile, recovery_key).
    async fn reset_pin(
        &self,
        mobile: &str,
        recovery_key: &str,
        new_pin: &str,
    ) -> Result<bool, anyhow::Error>;

    /// Conditional debit; returns false when the balance would go negative.
    async fn debit_wallet(&self, user_id: &str, amount: i64) -> Result<bool, anyhow::Error>;

    /// All users in creation order.
    async fn list_users(&self) -> Result<Vec<users::User>, anyhow::Error>;

    /// Direct referrals of the given referral code, in creation order.
    async fn direct_referrals(
        &self,
        referral_code: &str,
    ) -> Result<Vec<users::User>, anyhow::Error>;

    /// Number of the code owner's direct referrals that are premium and
    /// were activated in the given cycle. The valve condition.
    async fn count_cycle_activations(
        &self,
        referral_code: &str,
        cycle_id: &str,
    ) -> Result<i64, anyhow::Error>;

    /// Atomically flips the user to premium (only if currently free,
    /// stamping activation timestamp and cycle) and applies the given
    /// grants, crediting each recipient's wallet. Returns whether the flip
    /// applied; when it did not, nothing is granted.
    async fn apply_upgrade(
        &self,
        user_id: &str,
        cycle_id: &str,
        grants: Vec<rewards::NewReward>,
    ) -> Result<bool, anyhow::Error>;

    /// Inserts a single reward and credits the recipient atomically.
    async fn grant_reward(
        &self,
        reward: rewards::NewReward,
    ) -> Result<rewards::Reward, anyhow::Error>;

    async fn rewards_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<rewards::Reward>, anyhow::Error>;

    /// Sum of every reward ever granted, in paise.
    async fn total_payouts(&self) -> Result<i64, anyhow::Error>;

    async fn insert_expense(
        &self,
        user_id: &str,
        amount: i64,
        category: expenses::Category,
        description: &str,
    ) -> Result<expenses::Expense, anyhow::Error>;

    async fn get_expense(&self, id: &str) -> Result<Option<expenses::Expense>, anyhow::Error>;

    async fn update_expense(
        &self,
        id: &str,
        amount: i64,
        category: expenses::Category,
        description: &str,
    ) -> Result<bool, anyhow::Error>;

    async fn delete_expense(&self, id: &str) -> Result<bool, anyhow::Error>;

    async fn list_expenses(
        &self,
        user_id: &str,
        since: Option<chrono::NaiveDateTime>,
    ) -> Result<Vec<expenses::Expense>, anyhow::Error>;

    async fn read_settings(
        &self,
    ) -> Result<Option<global_settings::GlobalSettings>, anyhow::Error>;

    /// Whole-row replacement of the singleton settings row.
    async fn write_settings(
        &self,
        settings: global_settings::GlobalSettings,
    ) -> Result<(), anyhow::Error>;
}
