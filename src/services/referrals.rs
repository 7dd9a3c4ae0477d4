use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{store_err, RequestHandler, Service, ServiceError};
use crate::models::referrals::{TeamMember, Upline, UplineRef, ValveStatus};
use crate::models::users;
use crate::repositories::SharedStore;

pub enum ReferralRequest {
    GetUpline {
        user_id: String,
        response: oneshot::Sender<Result<Upline, ServiceError>>,
    },
    ListTeam {
        user_id: String,
        response: oneshot::Sender<Result<Vec<TeamMember>, ServiceError>>,
    },
    ValveStatus {
        user_id: String,
        response: oneshot::Sender<Result<ValveStatus, ServiceError>>,
    },
}

fn upline_ref(user: &users::User) -> UplineRef {
    UplineRef {
        id: user.id.clone(),
        full_name: user.full_name.clone(),
        mobile: user.mobile.clone(),
    }
}

#[derive(Clone)]
pub struct ReferralRequestHandler {
    store: SharedStore,
}

impl ReferralRequestHandler {
    pub fn new(store: SharedStore) -> Self {
        ReferralRequestHandler { store }
    }

    async fn get_user(&self, user_id: &str) -> Result<users::User, ServiceError> {
        self.store
            .get_user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))
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

    /// Walks two levels up the referral chain. Missing links terminate the
    /// walk without error.
    async fn resolve_upline(&self, user_id: &str) -> Result<Upline, ServiceError> {
        let user = self.get_user(user_id).await?;

        let direct = self.referrer_of(&user).await?;
        let grand = match &direct {
            Some(direct) => self.referrer_of(direct).await?,
            None => None,
        };

        Ok(Upline {
            direct_referrer: direct.as_ref().map(upline_ref),
            grand_referrer: grand.as_ref().map(upline_ref),
        })
    }

    async fn list_team(&self, user_id: &str) -> Result<Vec<TeamMember>, ServiceError> {
        let user = self.get_user(user_id).await?;
        let team = self
            .store
            .direct_referrals(&user.mobile)
            .await
            .map_err(store_err)?;

        Ok(team
            .into_iter()
            .map(|member| TeamMember {
                full_name: member.full_name,
                mobile: member.mobile,
                status: member.status,
            })
            .collect())
    }

    async fn valve_status(&self, user_id: &str) -> Result<ValveStatus, ServiceError> {
        let settings = self
            .store
            .read_settings()
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound("global settings".to_string()))?;
        let user = self.get_user(user_id).await?;

        let qualifying = self
            .store
            .count_cycle_activations(&user.mobile, &settings.current_cycle_id)
            .await
            .map_err(store_err)?;

        Ok(ValveStatus {
            unlocked: qualifying >= 1,
            qualifying_referrals: qualifying,
            cycle_id: settings.current_cycle_id,
        })
    }
}

#[async_trait]
impl RequestHandler<ReferralRequest> for ReferralRequestHandler {
    async fn handle_request(&self, request: ReferralRequest) {
        match request {
            ReferralRequest::GetUpline { user_id, response } => {
                let result = self.resolve_upline(&user_id).await;
                let _ = response.send(result);
            }
            ReferralRequest::ListTeam { user_id, response } => {
                let result = self.list_team(&user_id).await;
                let _ = response.send(result);
            }
            ReferralRequest::ValveStatus { user_id, response } => {
                let result = self.valve_status(&user_id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct ReferralService;

impl ReferralService {
    pub fn new() -> Self {
        ReferralService {}
    }
}

#[async_trait]
impl Service<ReferralRequest, ReferralRequestHandler> for ReferralService {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::global_settings::GlobalSettings;
    use crate::models::users::NewUser;
    use crate::repositories::memory::MemStore;
    use crate::services::rewards::RewardRequestHandler;

    async fn signup(
        store: &SharedStore,
        mobile: &str,
        referral_code: Option<&str>,
    ) -> users::User {
        store
            .insert_user(NewUser {
                mobile: mobile.to_string(),
                pin: "1234".to_string(),
                recovery_key: "567890".to_string(),
                full_name: format!("User {}", mobile),
                referral_code: referral_code.map(str::to_string),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upline_walks_two_levels_and_stops_at_missing_links() {
        let store: SharedStore = Arc::new(MemStore::new());
        let a = signup(&store, "9000000001", None).await;
        let b = signup(&store, "9000000002", Some("9000000001")).await;
        let c = signup(&store, "9000000003", Some("9000000002")).await;
        let handler = ReferralRequestHandler::new(store.clone());

        let c_upline = handler.resolve_upline(&c.id).await.unwrap();
        assert_eq!(c_upline.direct_referrer.unwrap().id, b.id);
        assert_eq!(c_upline.grand_referrer.unwrap().id, a.id);

        let b_upline = handler.resolve_upline(&b.id).await.unwrap();
        assert_eq!(b_upline.direct_referrer.unwrap().id, a.id);
        assert!(b_upline.grand_referrer.is_none());

        let a_upline = handler.resolve_upline(&a.id).await.unwrap();
        assert!(a_upline.direct_referrer.is_none());
        assert!(a_upline.grand_referrer.is_none());
    }

    #[tokio::test]
    async fn team_listing_preserves_creation_order() {
        let store: SharedStore = Arc::new(MemStore::new());
        let a = signup(&store, "9000000001", None).await;
        signup(&store, "9000000002", Some("9000000001")).await;
        signup(&store, "9000000003", Some("9000000001")).await;
        signup(&store, "9000000004", Some("9000000001")).await;
        let handler = ReferralRequestHandler::new(store.clone());

        let team = handler.list_team(&a.id).await.unwrap();
        let mobiles: Vec<&str> = team.iter().map(|m| m.mobile.as_str()).collect();
        assert_eq!(mobiles, vec!["9000000002", "9000000003", "9000000004"]);
    }

    #[tokio::test]
    async fn valve_status_is_recomputed_per_read() {
        let store: SharedStore = Arc::new(MemStore::new());
        let mut settings = GlobalSettings::default();
        settings.current_cycle_id = "WEEK_01".to_string();
        store.write_settings(settings.clone()).await.unwrap();

        let a = signup(&store, "9000000001", None).await;
        let b = signup(&store, "9000000002", Some("9000000001")).await;
        let handler = ReferralRequestHandler::new(store.clone());

        let locked = handler.valve_status(&a.id).await.unwrap();
        assert!(!locked.unlocked);
        assert_eq!(locked.qualifying_referrals, 0);

        RewardRequestHandler::new(store.clone())
            .upgrade(&b.id)
            .await
            .unwrap();
        let unlocked = handler.valve_status(&a.id).await.unwrap();
        assert!(unlocked.unlocked);
        assert_eq!(unlocked.qualifying_referrals, 1);

        // cycle rollover locks it again without touching stored state
        settings.current_cycle_id = "WEEK_02".to_string();
        store.write_settings(settings).await.unwrap();
        let relocked = handler.valve_status(&a.id).await.unwrap();
        assert!(!relocked.unlocked);
        assert_eq!(relocked.cycle_id, "WEEK_02");
    }
}
