use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{store_err, RequestHandler, Service, ServiceError};
use crate::models::rewards::{GrantSummary, NewReward, Reward, RewardTier, UpgradeOutcome};
use crate::models::users;
use crate::repositories::SharedStore;

pub enum RewardRequest {
    Upgrade {
        user_id: String,
        response: oneshot::Sender<Result<UpgradeOutcome, ServiceError>>,
    },
    GrantBonus {
        user_id: String,
        amount: i64,
        response: oneshot::Sender<Result<Reward, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct RewardRequestHandler {
    store: SharedStore,
}

impl RewardRequestHandler {
    pub fn new(store: SharedStore) -> Self {
        RewardRequestHandler { store }
    }

    /// Handles a premium-upgrade event. Reward amounts and the cycle id are
    /// snapshotted from the settings row at this moment; the status flip and
    /// every grant commit atomically in the store. Calling this for an
    /// already-premium user is a no-op.
    pub(crate) async fn upgrade(&self, user_id: &str) -> Result<UpgradeOutcome, ServiceError> {
        let settings = self
            .store
            .read_settings()
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound("global settings".to_string()))?;
        let cycle_id = settings.current_cycle_id.clone();

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;
        if user.is_premium() {
            return Ok(UpgradeOutcome::already_premium(cycle_id));
        }

        let mut grants: Vec<NewReward> = Vec::new();
        let mut t1 = None;
        let mut t2 = None;

        let direct = self.referrer_of(&user).await?;
        if let Some(direct) = &direct {
            // T1 is unconditional once a direct referrer exists
            grants.push(NewReward {
                user_id: direct.id.clone(),
                source_user_id: Some(user.id.clone()),
                tier: RewardTier::T1,
                amount: settings.t1_reward,
                cycle_id: cycle_id.clone(),
            });
            t1 = Some(GrantSummary {
                recipient_id: direct.id.clone(),
                amount: settings.t1_reward,
            });

            if let Some(grand) = self.referrer_of(direct).await? {
                // valve: the grandparent needs at least one direct referral
                // premium-activated in the current cycle
                let qualifying = self
                    .store
                    .count_cycle_activations(&grand.mobile, &cycle_id)
                    .await
                    .map_err(store_err)?;
                if qualifying >= 1 {
                    grants.push(NewReward {
                        user_id: grand.id.clone(),
                        source_user_id: Some(user.id.clone()),
                        tier: RewardTier::T2,
                        amount: settings.t2_reward,
                        cycle_id: cycle_id.clone(),
                    });
                    t2 = Some(GrantSummary {
                        recipient_id: grand.id,
                        amount: settings.t2_reward,
                    });
                } else {
                    log::info!(
                        "T2 valve locked for {} in cycle {}: no qualifying referral.",
                        grand.id,
                        cycle_id
                    );
                }
            }
        }

        // conditional flip doubles as the idempotency guard: a concurrent or
        // repeated call finds the user already premium and grants nothing
        let applied = self
            .store
            .apply_upgrade(&user.id, &cycle_id, grants)
            .await
            .map_err(store_err)?;
        if !applied {
            return Ok(UpgradeOutcome::already_premium(cycle_id));
        }

        Ok(UpgradeOutcome {
            applied: true,
            cycle_id,
            t1,
            t2,
        })
    }

    async fn referrer_of(
        &self,
        user: &users::User,
    ) -> Result<Option<users::User>, ServiceError> {
        match &user.referred_by {
            Some(code) => self.store.get_user_by_mobile(code).await.map_err(store_err),
            None => Ok(None),
        }
    }

    async fn grant_bonus(&self, user_id: &str, amount: i64) -> Result<Reward, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::Validation(
                "bonus amount must be positive".to_string(),
            ));
        }

        let settings = self
            .store
            .read_settings()
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound("global settings".to_string()))?;

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        self.store
            .grant_reward(NewReward {
                user_id: user.id,
                source_user_id: None,
                tier: RewardTier::Bonus,
                amount,
                cycle_id: settings.current_cycle_id,
            })
            .await
            .map_err(store_err)
    }
}

#[async_trait]
impl RequestHandler<RewardRequest> for RewardRequestHandler {
    async fn handle_request(&self, request: RewardRequest) {
        match request {
            RewardRequest::Upgrade { user_id, response } => {
                let result = self.upgrade(&user_id).await;
                if let Err(e) = &result {
                    log::error!("Upgrade failed for {}: {}", user_id, e);
                }
                let _ = response.send(result);
            }
            RewardRequest::GrantBonus {
                user_id,
                amount,
                response,
            } => {
                let result = self.grant_bonus(&user_id, amount).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct RewardService;

impl RewardService {
    pub fn new() -> Self {
        RewardService {}
    }
}

#[async_trait]
impl Service<RewardRequest, RewardRequestHandler> for RewardService {}
