use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::Store;
use crate::models::{expenses, global_settings, rewards, users};

const USER_COLUMNS: &str = "id, mobile, pin, recovery_key, full_name, age, bank_name, ifsc_code, \
     device_fingerprint, wallet_balance, status, premium_activated_at, activation_cycle, \
     referred_by, is_admin, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    mobile: String,
    pin: String,
    recovery_key: String,
    full_name: String,
    age: Option<i32>,
    bank_name: Option<String>,
    ifsc_code: Option<String>,
    device_fingerprint: Option<String>,
    wallet_balance: i64,
    status: String,
    premium_activated_at: Option<chrono::NaiveDateTime>,
    activation_cycle: Option<String>,
    referred_by: Option<String>,
    is_admin: bool,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl UserRow {
    fn into_model(self) -> users::User {
        users::User {
            id: self.id,
            mobile: self.mobile,
            pin: self.pin,
            recovery_key: self.recovery_key,
            full_name: self.full_name,
            age: self.age,
            bank_name: self.bank_name,
            ifsc_code: self.ifsc_code,
            device_fingerprint: self.device_fingerprint,
            wallet_balance: self.wallet_balance,
            status: users::SubscriptionStatus::parse(&self.status)
                .unwrap_or(users::SubscriptionStatus::Free),
            premium_activated_at: self.premium_activated_at,
            activation_cycle: self.activation_cycle,
            referred_by: self.referred_by,
            is_admin: self.is_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    user_id: String,
    amount: i64,
    category: String,
    description: String,
    created_at: chrono::NaiveDateTime,
}

impl ExpenseRow {
    fn into_model(self) -> expenses::Expense {
        expenses::Expense {
            id: self.id,
            user_id: self.user_id,
            amount: self.amount,
            category: expenses::Category::parse(&self.category)
                .unwrap_or(expenses::Category::Other),
            description: self.description,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RewardRow {
    id: String,
    user_id: String,
    source_user_id: Option<String>,
    tier: String,
    amount: i64,
    cycle_id: String,
    created_at: chrono::NaiveDateTime,
}

impl RewardRow {
    fn into_model(self) -> rewards::Reward {
        rewards::Reward {
            id: self.id,
            user_id: self.user_id,
            source_user_id: self.source_user_id,
            tier: rewards::RewardTier::parse(&self.tier).unwrap_or(rewards::RewardTier::Bonus),
            amount: self.amount,
            cycle_id: self.cycle_id,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    subscription_fee: i64,
    t1_reward: i64,
    t2_reward: i64,
    current_cycle_id: String,
    notice: String,
    campaign_active: bool,
    campaign_title: String,
}

impl SettingsRow {
    fn into_model(self) -> global_settings::GlobalSettings {
        global_settings::GlobalSettings {
            subscription_fee: self.subscription_fee,
            t1_reward: self.t1_reward,
            t2_reward: self.t2_reward,
            current_cycle_id: self.current_cycle_id,
            notice: self.notice,
            campaign_active: self.campaign_active,
            campaign_title: self.campaign_title,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    conn: PgPool,
}

impl PgStore {
    pub fn new(conn: PgPool) -> Self {
        PgStore { conn }
    }

    async fn fetch_user(
        &self,
        condition: &str,
        binds: &[&str],
    ) -> Result<Option<users::User>, anyhow::Error> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, condition);
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        let row = query.fetch_optional(&self.conn).await?;

        Ok(row.map(UserRow::into_model))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, new_user: users::NewUser) -> Result<users::User, anyhow::Error> {
        let user_id = Uuid::new_v4().hyphenated().to_string();

        let referred_by: Option<String> = match new_user.referral_code {
            Some(code) => {
                let inviter = self.get_user_by_mobile(&code).await?;
                inviter.map(|u| u.mobile)
            }
            None => None,
        };

        let sql = format!(
            "INSERT INTO users (id, mobile, pin, recovery_key, full_name, referred_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user_id)
            .bind(&new_user.mobile)
            .bind(&new_user.pin)
            .bind(&new_user.recovery_key)
            .bind(&new_user.full_name)
            .bind(&referred_by)
            .fetch_one(&self.conn)
            .await?;

        Ok(row.into_model())
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<users::User>, anyhow::Error> {
        self.fetch_user("id = $1", &[user_id]).await
    }

    async fn get_user_by_mobile(
        &self,
        mobile: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        self.fetch_user("mobile = $1", &[mobile]).await
    }

    async fn find_by_credentials(
        &self,
        mobile: &str,
        pin: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        self.fetch_user("mobile = $1 AND pin = $2", &[mobile, pin])
            .await
    }

    async fn bind_device_if_unbound(
        &self,
        user_id: &str,
        fingerprint: &str,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET device_fingerprint = $2, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $1 AND device_fingerprint IS NULL",
        )
        .bind(user_id)
        .bind(fingerprint)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: users::UpdateProfile,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET \
             full_name = COALESCE($2, full_name), \
             age = COALESCE($3, age), \
             bank_name = COALESCE($4, bank_name), \
             ifsc_code = COALESCE($5, ifsc_code), \
             updated_at = CURRENT_TIMESTAMP \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(update.full_name)
        .bind(update.age)
        .bind(update.bank_name)
        .bind(update.ifsc_code)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_pin(
        &self,
        mobile: &str,
        recovery_key: &str,
        new_pin: &str,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET pin = $3, updated_at = CURRENT_TIMESTAMP \
             WHERE mobile = $1 AND recovery_key = $2",
        )
        .bind(mobile)
        .bind(recovery_key)
        .bind(new_pin)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn debit_wallet(&self, user_id: &str, amount: i64) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET wallet_balance = wallet_balance - $2, \
             updated_at = CURRENT_TIMESTAMP \
             WHERE id = $1 AND wallet_balance >= $2",
        )
        .bind(user_id)
        .bind(amount)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> Result<Vec<users::User>, anyhow::Error> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at, id", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(UserRow::into_model).collect())
    }

    async fn direct_referrals(
        &self,
        referral_code: &str,
    ) -> Result<Vec<users::User>, anyhow::Error> {
        let sql = format!(
            "SELECT {} FROM users WHERE referred_by = $1 ORDER BY created_at, id",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(referral_code)
            .fetch_all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(UserRow::into_model).collect())
    }

    async fn count_cycle_activations(
        &self,
        referral_code: &str,
        cycle_id: &str,
    ) -> Result<i64, anyhow::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM users \
             WHERE referred_by = $1 AND status = 'premium' AND activation_cycle = $2",
        )
        .bind(referral_code)
        .bind(cycle_id)
        .fetch_one(&self.conn)
        .await?;

        Ok(count)
    }

    async fn apply_upgrade(
        &self,
        user_id: &str,
        cycle_id: &str,
        grants: Vec<rewards::NewReward>,
    ) -> Result<bool, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let flipped = sqlx::query(
            "UPDATE users SET status = 'premium', \
             premium_activated_at = CURRENT_TIMESTAMP, \
             activation_cycle = $2, \
             updated_at = CURRENT_TIMESTAMP \
             WHERE id = $1 AND status = 'free'",
        )
        .bind(user_id)
        .bind(cycle_id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for grant in grants {
            let reward_id = Uuid::new_v4().hyphenated().to_string();
            sqlx::query(
                "INSERT INTO rewards (id, user_id, source_user_id, tier, amount, cycle_id) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&reward_id)
            .bind(&grant.user_id)
            .bind(&grant.source_user_id)
            .bind(grant.tier.as_str())
            .bind(grant.amount)
            .bind(&grant.cycle_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE users SET wallet_balance = wallet_balance + $2, \
                 updated_at = CURRENT_TIMESTAMP WHERE id = $1",
            )
            .bind(&grant.user_id)
            .bind(grant.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }

    async fn grant_reward(
        &self,
        reward: rewards::NewReward,
    ) -> Result<rewards::Reward, anyhow::Error> {
        let reward_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let row = sqlx::query_as::<_, RewardRow>(
            "INSERT INTO rewards (id, user_id, source_user_id, tier, amount, cycle_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&reward_id)
        .bind(&reward.user_id)
        .bind(&reward.source_user_id)
        .bind(reward.tier.as_str())
        .bind(reward.amount)
        .bind(&reward.cycle_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET wallet_balance = wallet_balance + $2, \
             updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(&reward.user_id)
        .bind(reward.amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into_model())
    }

    async fn rewards_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<rewards::Reward>, anyhow::Error> {
        let rows = sqlx::query_as::<_, RewardRow>(
            "SELECT * FROM rewards WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(rows.into_iter().map(RewardRow::into_model).collect())
    }

    async fn total_payouts(&self) -> Result<i64, anyhow::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM rewards")
            .fetch_one(&self.conn)
            .await?;

        Ok(total)
    }

    async fn insert_expense(
        &self,
        user_id: &str,
        amount: i64,
        category: expenses::Category,
        description: &str,
    ) -> Result<expenses::Expense, anyhow::Error> {
        let expense_id = Uuid::new_v4().hyphenated().to_string();

        let row = sqlx::query_as::<_, ExpenseRow>(
            "INSERT INTO expenses (id, user_id, amount, category, description) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&expense_id)
        .bind(user_id)
        .bind(amount)
        .bind(category.as_str())
        .bind(description)
        .fetch_one(&self.conn)
        .await?;

        Ok(row.into_model())
    }

    async fn get_expense(&self, id: &str) -> Result<Option<expenses::Expense>, anyhow::Error> {
        let row = sqlx::query_as::<_, ExpenseRow>("SELECT * FROM expenses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(row.map(ExpenseRow::into_model))
    }

    async fn update_expense(
        &self,
        id: &str,
        amount: i64,
        category: expenses::Category,
        description: &str,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE expenses SET amount = $2, category = $3, description = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(amount)
        .bind(category.as_str())
        .bind(description)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expense(&self, id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_expenses(
        &self,
        user_id: &str,
        since: Option<chrono::NaiveDateTime>,
    ) -> Result<Vec<expenses::Expense>, anyhow::Error> {
        let rows = match since {
            Some(since) => {
                sqlx::query_as::<_, ExpenseRow>(
                    "SELECT * FROM expenses WHERE user_id = $1 AND created_at >= $2 \
                     ORDER BY created_at DESC, id",
                )
                .bind(user_id)
                .bind(since)
                .fetch_all(&self.conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, ExpenseRow>(
                    "SELECT * FROM expenses WHERE user_id = $1 ORDER BY created_at DESC, id",
                )
                .bind(user_id)
                .fetch_all(&self.conn)
                .await?
            }
        };

        Ok(rows.into_iter().map(ExpenseRow::into_model).collect())
    }

    async fn read_settings(
        &self,
    ) -> Result<Option<global_settings::GlobalSettings>, anyhow::Error> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT subscription_fee, t1_reward, t2_reward, current_cycle_id, notice, \
             campaign_active, campaign_title FROM global_settings WHERE id = 1",
        )
        .fetch_optional(&self.conn)
        .await?;

        Ok(row.map(SettingsRow::into_model))
    }

    async fn write_settings(
        &self,
        settings: global_settings::GlobalSettings,
    ) -> Result<(), anyhow::Error> {
        sqlx::query(
            "INSERT INTO global_settings \
             (id, subscription_fee, t1_reward, t2_reward, current_cycle_id, notice, \
              campaign_active, campaign_title, updated_at) \
             VALUES (1, $1, $2, $3, $4, $5, $6, $7, CURRENT_TIMESTAMP) \
             ON CONFLICT (id) DO UPDATE SET \
             subscription_fee = EXCLUDED.subscription_fee, \
             t1_reward = EXCLUDED.t1_reward, \
             t2_reward = EXCLUDED.t2_reward, \
             current_cycle_id = EXCLUDED.current_cycle_id, \
             notice = EXCLUDED.notice, \
             campaign_active = EXCLUDED.campaign_active, \
             campaign_title = EXCLUDED.campaign_title, \
             updated_at = CURRENT_TIMESTAMP",
        )
        .bind(settings.subscription_fee)
        .bind(settings.t1_reward)
        .bind(settings.t2_reward)
        .bind(&settings.current_cycle_id)
        .bind(&settings.notice)
        .bind(settings.campaign_active)
        .bind(&settings.campaign_title)
        .execute(&self.conn)
        .await?;

        Ok(())
    }
}
