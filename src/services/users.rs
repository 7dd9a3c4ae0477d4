use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{store_err, RequestHandler, Service, ServiceError};
use crate::models::users;
use crate::repositories::SharedStore;

pub enum UserRequest {
    Signup {
        new_user: users::NewUser,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    Login {
        mobile: String,
        pin: String,
        device_id: String,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    GetUser {
        id: String,
        response: oneshot::Sender<Result<Option<users::User>, ServiceError>>,
    },
    UpdateProfile {
        id: String,
        update: users::UpdateProfile,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    ResetPin {
        mobile: String,
        recovery_key: String,
        new_pin: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Withdraw {
        user_id: String,
        amount: i64,
        response: oneshot::Sender<Result<i64, ServiceError>>,
    },
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn validate_mobile(mobile: &str) -> Result<(), ServiceError> {
    if mobile.len() != 10 || !all_digits(mobile) {
        return Err(ServiceError::Validation(
            "mobile number must be 10 digits".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_pin(pin: &str) -> Result<(), ServiceError> {
    if pin.len() != 4 || !all_digits(pin) {
        return Err(ServiceError::Validation("PIN must be 4 digits".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_recovery_key(key: &str) -> Result<(), ServiceError> {
    if key.len() != 6 || !all_digits(key) {
        return Err(ServiceError::Validation(
            "recovery key must be 6 digits".to_string(),
        ));
    }
    Ok(())
}

/// Server-side half of login: credential match plus the one-device-per-account
/// rule. Binds the device on first login; an existing binding for a different
/// device refuses the login and is never overwritten.
pub(crate) async fn authenticate(
    store: &SharedStore,
    mobile: &str,
    pin: &str,
    device_id: &str,
) -> Result<users::User, ServiceError> {
    let user = store
        .find_by_credentials(mobile, pin)
        .await
        .map_err(store_err)?;
    let Some(user) = user else {
        return Err(ServiceError::InvalidCredentials);
    };

    match &user.device_fingerprint {
        Some(fingerprint) if fingerprint != device_id => Err(ServiceError::DeviceConflict),
        Some(_) => Ok(user),
        None => {
            let bound = store
                .bind_device_if_unbound(&user.id, device_id)
                .await
                .map_err(store_err)?;
            if bound {
                return Ok(users::User {
                    device_fingerprint: Some(device_id.to_string()),
                    ..user
                });
            }

            // lost a bind race; re-read and see who won
            let fresh = store
                .get_user_by_id(&user.id)
                .await
                .map_err(store_err)?
                .ok_or_else(|| ServiceError::NotFound(format!("user {}", user.id)))?;
            match &fresh.device_fingerprint {
                Some(fingerprint) if fingerprint == device_id => Ok(fresh),
                _ => Err(ServiceError::DeviceConflict),
            }
        }
    }
}

#[derive(Clone)]
pub struct UserRequestHandler {
    store: SharedStore,
}

impl UserRequestHandler {
    pub fn new(store: SharedStore) -> Self {
        UserRequestHandler { store }
    }

    async fn signup(&self, new_user: users::NewUser) -> Result<users::User, ServiceError> {
        validate_mobile(&new_user.mobile)?;
        validate_pin(&new_user.pin)?;
        validate_recovery_key(&new_user.recovery_key)?;
        if new_user.full_name.trim().is_empty() {
            return Err(ServiceError::Validation("name must not be empty".to_string()));
        }
        if new_user.referral_code.as_deref() == Some(new_user.mobile.as_str()) {
            return Err(ServiceError::Validation(
                "cannot use your own number as referral code".to_string(),
            ));
        }

        let existing = self
            .store
            .get_user_by_mobile(&new_user.mobile)
            .await
            .map_err(store_err)?;
        if existing.is_some() {
            return Err(ServiceError::Validation(
                "mobile number already registered".to_string(),
            ));
        }

        self.store.insert_user(new_user).await.map_err(store_err)
    }

    async fn get_user(&self, id: &str) -> Result<Option<users::User>, ServiceError> {
        self.store.get_user_by_id(id).await.map_err(store_err)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: users::UpdateProfile,
    ) -> Result<(), ServiceError> {
        if let Some(age) = update.age {
            if !(1..=120).contains(&age) {
                return Err(ServiceError::Validation("age out of range".to_string()));
            }
        }

        let updated = self
            .store
            .update_profile(id, update)
            .await
            .map_err(store_err)?;
        if !updated {
            return Err(ServiceError::NotFound(format!("user {}", id)));
        }

        Ok(())
    }

    async fn reset_pin(
        &self,
        mobile: &str,
        recovery_key: &str,
        new_pin: &str,
    ) -> Result<(), ServiceError> {
        validate_mobile(mobile)?;
        validate_recovery_key(recovery_key)?;
        validate_pin(new_pin)?;

        let matched = self
            .store
            .reset_pin(mobile, recovery_key, new_pin)
            .await
            .map_err(store_err)?;
        if !matched {
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(())
    }

    /// Returns the balance remaining after the debit.
    async fn withdraw(&self, user_id: &str, amount: i64) -> Result<i64, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::Validation(
                "withdrawal amount must be positive".to_string(),
            ));
        }

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        let debited = self
            .store
            .debit_wallet(&user.id, amount)
            .await
            .map_err(store_err)?;
        if !debited {
            return Err(ServiceError::Validation("insufficient balance".to_string()));
        }

        let fresh = self
            .store
            .get_user_by_id(&user.id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        Ok(fresh.wallet_balance)
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::Signup { new_user, response } => {
                let result = self.signup(new_user).await;
                let _ = response.send(result);
            }
            UserRequest::Login {
                mobile,
                pin,
                device_id,
                response,
            } => {
                let result = authenticate(&self.store, &mobile, &pin, &device_id).await;
                let _ = response.send(result);
            }
            UserRequest::GetUser { id, response } => {
                let result = self.get_user(&id).await;
                let _ = response.send(result);
            }
            UserRequest::UpdateProfile {
                id,
                update,
                response,
            } => {
                let result = self.update_profile(&id, update).await;
                let _ = response.send(result);
            }
            UserRequest::ResetPin {
                mobile,
                recovery_key,
                new_pin,
                response,
            } => {
                let result = self.reset_pin(&mobile, &recovery_key, &new_pin).await;
                let _ = response.send(result);
            }
            UserRequest::Withdraw {
                user_id,
                amount,
                response,
            } => {
                let result = self.withdraw(&user_id, amount).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repositories::memory::MemStore;

    fn new_user(mobile: &str, referral_code: Option<&str>) -> users::NewUser {
        users::NewUser {
            mobile: mobile.to_string(),
            pin: "1234".to_string(),
            recovery_key: "567890".to_string(),
            full_name: format!("User {}", mobile),
            referral_code: referral_code.map(str::to_string),
        }
    }

    fn handler() -> UserRequestHandler {
        UserRequestHandler::new(Arc::new(MemStore::new()))
    }

    #[tokio::test]
    async fn signup_rejects_malformed_input() {
        let handler = handler();

        let mut bad_mobile = new_user("12345", None);
        bad_mobile.mobile = "12345".to_string();
        assert!(matches!(
            handler.signup(bad_mobile).await,
            Err(ServiceError::Validation(_))
        ));

        let mut bad_pin = new_user("9000000001", None);
        bad_pin.pin = "12".to_string();
        assert!(matches!(
            handler.signup(bad_pin).await,
            Err(ServiceError::Validation(_))
        ));

        let mut bad_key = new_user("9000000001", None);
        bad_key.recovery_key = "12345a".to_string();
        assert!(matches!(
            handler.signup(bad_key).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn signup_rejects_self_referral() {
        let handler = handler();
        let result = handler.signup(new_user("9000000001", Some("9000000001"))).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_mobile() {
        let handler = handler();
        handler.signup(new_user("9000000001", None)).await.unwrap();
        let result = handler.signup(new_user("9000000001", None)).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_referral_code_records_no_referrer() {
        let handler = handler();
        let user = handler
            .signup(new_user("9000000001", Some("9999999999")))
            .await
            .unwrap();
        assert!(user.referred_by.is_none());
    }

    #[tokio::test]
    async fn known_referral_code_links_the_inviter() {
        let handler = handler();
        let inviter = handler.signup(new_user("9000000001", None)).await.unwrap();
        let invitee = handler
            .signup(new_user("9000000002", Some("9000000001")))
            .await
            .unwrap();
        assert_eq!(invitee.referred_by.as_deref(), Some(inviter.mobile.as_str()));
    }

    #[tokio::test]
    async fn reset_pin_requires_matching_recovery_key() {
        let store: SharedStore = Arc::new(MemStore::new());
        let handler = UserRequestHandler::new(store.clone());
        let user = handler.signup(new_user("9000000001", None)).await.unwrap();

        let wrong = handler.reset_pin(&user.mobile, "000000", "4321").await;
        assert_eq!(wrong, Err(ServiceError::InvalidCredentials));

        handler
            .reset_pin(&user.mobile, "567890", "4321")
            .await
            .unwrap();
        let fresh = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(fresh.pin, "4321");
    }

    #[tokio::test]
    async fn withdraw_never_goes_negative() {
        let store: SharedStore = Arc::new(MemStore::new());
        let handler = UserRequestHandler::new(store.clone());
        let user = handler.signup(new_user("9000000001", None)).await.unwrap();

        let result = handler.withdraw(&user.id, 100).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        store
            .grant_reward(crate::models::rewards::NewReward {
                user_id: user.id.clone(),
                source_user_id: None,
                tier: crate::models::rewards::RewardTier::Bonus,
                amount: 500,
                cycle_id: "CYCLE_01".to_string(),
            })
            .await
            .unwrap();

        let remaining = handler.withdraw(&user.id, 300).await.unwrap();
        assert_eq!(remaining, 200);

        let result = handler.withdraw(&user.id, 201).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
