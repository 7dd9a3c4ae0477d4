use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::Store;
use crate::models::{expenses, global_settings, rewards, users};

/// In-memory store with the same semantics as the Postgres one. Backs the
/// `--in-memory` mode and the test suite.
pub struct MemStore {
    users: DashMap<String, users::User>,
    user_order: Mutex<Vec<String>>,
    expenses: DashMap<String, expenses::Expense>,
    rewards: Mutex<Vec<rewards::Reward>>,
    settings: Mutex<Option<global_settings::GlobalSettings>>,
    // serializes multi-entry mutations (upgrade, grant) the way a SQL
    // transaction would
    write_lock: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, anyhow::Error> {
    mutex.lock().map_err(|_| anyhow!("store lock poisoned"))
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            users: DashMap::new(),
            user_order: Mutex::new(Vec::new()),
            expenses: DashMap::new(),
            rewards: Mutex::new(Vec::new()),
            settings: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    fn users_in_order(&self) -> Result<Vec<users::User>, anyhow::Error> {
        let order = lock(&self.user_order)?;
        Ok(order
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.clone()))
            .collect())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_user(&self, new_user: users::NewUser) -> Result<users::User, anyhow::Error> {
        if self.get_user_by_mobile(&new_user.mobile).await?.is_some() {
            bail!("duplicate key: users.mobile");
        }

        let referred_by = match new_user.referral_code {
            Some(code) => self.get_user_by_mobile(&code).await?.map(|u| u.mobile),
            None => None,
        };

        let now = chrono::Utc::now().naive_utc();
        let user = users::User {
            id: Uuid::new_v4().hyphenated().to_string(),
            mobile: new_user.mobile,
            pin: new_user.pin,
            recovery_key: new_user.recovery_key,
            full_name: new_user.full_name,
            age: None,
            bank_name: None,
            ifsc_code: None,
            device_fingerprint: None,
            wallet_balance: 0,
            status: users::SubscriptionStatus::Free,
            premium_activated_at: None,
            activation_cycle: None,
            referred_by,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };

        self.users.insert(user.id.clone(), user.clone());
        lock(&self.user_order)?.push(user.id.clone());

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<users::User>, anyhow::Error> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn get_user_by_mobile(
        &self,
        mobile: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        Ok(self
            .users
            .iter()
            .find(|u| u.mobile == mobile)
            .map(|u| u.clone()))
    }

    async fn find_by_credentials(
        &self,
        mobile: &str,
        pin: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        Ok(self
            .users
            .iter()
            .find(|u| u.mobile == mobile && u.pin == pin)
            .map(|u| u.clone()))
    }

    async fn bind_device_if_unbound(
        &self,
        user_id: &str,
        fingerprint: &str,
    ) -> Result<bool, anyhow::Error> {
        match self.users.get_mut(user_id) {
            Some(mut user) if user.device_fingerprint.is_none() => {
                user.device_fingerprint = Some(fingerprint.to_string());
                user.updated_at = chrono::Utc::now().naive_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: users::UpdateProfile,
    ) -> Result<bool, anyhow::Error> {
        match self.users.get_mut(user_id) {
            Some(mut user) => {
                if let Some(full_name) = update.full_name {
                    user.full_name = full_name;
                }
                if let Some(age) = update.age {
                    user.age = Some(age);
                }
                if let Some(bank_name) = update.bank_name {
                    user.bank_name = Some(bank_name);
                }
                if let Some(ifsc_code) = update.ifsc_code {
                    user.ifsc_code = Some(ifsc_code);
                }
                user.updated_at = chrono::Utc::now().naive_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reset_pin(
        &self,
        mobile: &str,
        recovery_key: &str,
        new_pin: &str,
    ) -> Result<bool, anyhow::Error> {
        let mut matched = false;
        for mut user in self.users.iter_mut() {
            if user.mobile == mobile && user.recovery_key == recovery_key {
                user.pin = new_pin.to_string();
                user.updated_at = chrono::Utc::now().naive_utc();
                matched = true;
                break;
            }
        }

        Ok(matched)
    }

    async fn debit_wallet(&self, user_id: &str, amount: i64) -> Result<bool, anyhow::Error> {
        match self.users.get_mut(user_id) {
            Some(mut user) if user.wallet_balance >= amount => {
                user.wallet_balance -= amount;
                user.updated_at = chrono::Utc::now().naive_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_users(&self) -> Result<Vec<users::User>, anyhow::Error> {
        self.users_in_order()
    }

    async fn direct_referrals(
        &self,
        referral_code: &str,
    ) -> Result<Vec<users::User>, anyhow::Error> {
        Ok(self
            .users_in_order()?
            .into_iter()
            .filter(|u| u.referred_by.as_deref() == Some(referral_code))
            .collect())
    }

    async fn count_cycle_activations(
        &self,
        referral_code: &str,
        cycle_id: &str,
    ) -> Result<i64, anyhow::Error> {
        let count = self
            .users
            .iter()
            .filter(|u| {
                u.referred_by.as_deref() == Some(referral_code)
                    && u.is_premium()
                    && u.activation_cycle.as_deref() == Some(cycle_id)
            })
            .count();

        Ok(count as i64)
    }

    async fn apply_upgrade(
        &self,
        user_id: &str,
        cycle_id: &str,
        grants: Vec<rewards::NewReward>,
    ) -> Result<bool, anyhow::Error> {
        let _guard = lock(&self.write_lock)?;
        let now = chrono::Utc::now().naive_utc();

        match self.users.get_mut(user_id) {
            Some(mut user) if !user.is_premium() => {
                user.status = users::SubscriptionStatus::Premium;
                user.premium_activated_at = Some(now);
                user.activation_cycle = Some(cycle_id.to_string());
                user.updated_at = now;
            }
            _ => return Ok(false),
        }

        let mut ledger = lock(&self.rewards)?;
        for grant in grants {
            if let Some(mut recipient) = self.users.get_mut(&grant.user_id) {
                recipient.wallet_balance += grant.amount;
                recipient.updated_at = now;
            }
            ledger.push(rewards::Reward {
                id: Uuid::new_v4().hyphenated().to_string(),
                user_id: grant.user_id,
                source_user_id: grant.source_user_id,
                tier: grant.tier,
                amount: grant.amount,
                cycle_id: grant.cycle_id,
                created_at: now,
            });
        }

        Ok(true)
    }

    async fn grant_reward(
        &self,
        reward: rewards::NewReward,
    ) -> Result<rewards::Reward, anyhow::Error> {
        let _guard = lock(&self.write_lock)?;
        let now = chrono::Utc::now().naive_utc();

        match self.users.get_mut(&reward.user_id) {
            Some(mut recipient) => {
                recipient.wallet_balance += reward.amount;
                recipient.updated_at = now;
            }
            None => bail!("reward recipient not found: {}", reward.user_id),
        }

        let granted = rewards::Reward {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_id: reward.user_id,
            source_user_id: reward.source_user_id,
            tier: reward.tier,
            amount: reward.amount,
            cycle_id: reward.cycle_id,
            created_at: now,
        };
        lock(&self.rewards)?.push(granted.clone());

        Ok(granted)
    }

    async fn rewards_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<rewards::Reward>, anyhow::Error> {
        Ok(lock(&self.rewards)?
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn total_payouts(&self) -> Result<i64, anyhow::Error> {
        Ok(lock(&self.rewards)?.iter().map(|r| r.amount).sum())
    }

    async fn insert_expense(
        &self,
        user_id: &str,
        amount: i64,
        category: expenses::Category,
        description: &str,
    ) -> Result<expenses::Expense, anyhow::Error> {
        let expense = expenses::Expense {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_id: user_id.to_string(),
            amount,
            category,
            description: description.to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        };

        self.expenses.insert(expense.id.clone(), expense.clone());

        Ok(expense)
    }

    async fn get_expense(&self, id: &str) -> Result<Option<expenses::Expense>, anyhow::Error> {
        Ok(self.expenses.get(id).map(|e| e.clone()))
    }

    async fn update_expense(
        &self,
        id: &str,
        amount: i64,
        category: expenses::Category,
        description: &str,
    ) -> Result<bool, anyhow::Error> {
        match self.expenses.get_mut(id) {
            Some(mut expense) => {
                expense.amount = amount;
                expense.category = category;
                expense.description = description.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expense(&self, id: &str) -> Result<bool, anyhow::Error> {
        Ok(self.expenses.remove(id).is_some())
    }

    async fn list_expenses(
        &self,
        user_id: &str,
        since: Option<chrono::NaiveDateTime>,
    ) -> Result<Vec<expenses::Expense>, anyhow::Error> {
        let mut matching: Vec<expenses::Expense> = self
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| since.map_or(true, |cutoff| e.created_at >= cutoff))
            .map(|e| e.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching)
    }

    async fn read_settings(
        &self,
    ) -> Result<Option<global_settings::GlobalSettings>, anyhow::Error> {
        Ok(lock(&self.settings)?.clone())
    }

    async fn write_settings(
        &self,
        settings: global_settings::GlobalSettings,
    ) -> Result<(), anyhow::Error> {
        *lock(&self.settings)? = Some(settings);
        Ok(())
    }
}
