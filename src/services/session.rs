use std::sync::Arc;

use super::{store_err, ServiceError};
use crate::models::sessions::SessionRecord;
use crate::models::users;
use crate::repositories::session::SessionStore;
use crate::repositories::SharedStore;

/// Binds one account to one device and owns the local session marker.
/// Device conflicts and timeouts resolve to the signed-out state, never to
/// a user-facing error.
pub struct SessionGuard {
    store: SharedStore,
    sessions: Arc<dyn SessionStore>,
    device_id: String,
    timeout_secs: i64,
}

impl SessionGuard {
    pub fn new(
        store: SharedStore,
        sessions: Arc<dyn SessionStore>,
        device_id: String,
        timeout_hours: i64,
    ) -> Self {
        SessionGuard {
            store,
            sessions,
            device_id,
            timeout_secs: timeout_hours * 3600,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Credential check plus device binding; persists the session marker on
    /// success. Fails with `DeviceConflict` when the account is bound to a
    /// different device, regardless of correct credentials.
    pub async fn login(&self, mobile: &str, pin: &str) -> Result<users::User, ServiceError> {
        let user = super::users::authenticate(&self.store, mobile, pin, &self.device_id).await?;

        self.sessions
            .save(&SessionRecord {
                user_id: user.id.clone(),
                device_id: self.device_id.clone(),
                saved_at: chrono::Utc::now().timestamp(),
            })
            .map_err(store_err)?;

        Ok(user)
    }

    /// Restores the session on app start. Absent, expired or conflicting
    /// markers yield `None` and clear local state; expiry is sliding, so a
    /// successful resume refreshes the timestamp.
    pub async fn resume_session(&self) -> Result<Option<users::User>, ServiceError> {
        let Some(record) = self.sessions.load().map_err(store_err)? else {
            return Ok(None);
        };

        let age = chrono::Utc::now().timestamp() - record.saved_at;
        if age >= self.timeout_secs {
            log::info!("Session expired after {}s, signing out.", age);
            self.clear_silently();
            return Ok(None);
        }

        let user = self
            .store
            .get_user_by_id(&record.user_id)
            .await
            .map_err(store_err)?;
        let Some(user) = user else {
            self.clear_silently();
            return Ok(None);
        };

        if let Some(fingerprint) = &user.device_fingerprint {
            if fingerprint != &self.device_id {
                // forced logout, not an error the user sees
                log::warn!("Device fingerprint conflict for user {}, signing out.", user.id);
                self.clear_silently();
                return Ok(None);
            }
        }

        self.sessions
            .save(&SessionRecord {
                user_id: user.id.clone(),
                device_id: self.device_id.clone(),
                saved_at: chrono::Utc::now().timestamp(),
            })
            .map_err(store_err)?;

        Ok(Some(user))
    }

    /// Single accessor collaborators use for identity.
    pub async fn current_user(&self) -> Option<users::User> {
        match self.resume_session().await {
            Ok(user) => user,
            Err(e) => {
                log::warn!("Could not resume session: {}", e);
                None
            }
        }
    }

    pub fn logout(&self) {
        self.clear_silently();
    }

    fn clear_silently(&self) {
        if let Err(e) = self.sessions.clear() {
            log::warn!("Could not clear session state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::NewUser;
    use crate::repositories::memory::MemStore;
    use crate::repositories::session::MemorySessionStore;

    async fn seeded_store() -> (SharedStore, users::User) {
        let store: SharedStore = Arc::new(MemStore::new());
        let user = store
            .insert_user(NewUser {
                mobile: "9000000001".to_string(),
                pin: "1234".to_string(),
                recovery_key: "567890".to_string(),
                full_name: "Asha".to_string(),
                referral_code: None,
            })
            .await
            .unwrap();
        (store, user)
    }

    fn guard(store: &SharedStore, device_id: &str) -> SessionGuard {
        SessionGuard::new(
            store.clone(),
            Arc::new(MemorySessionStore::new()),
            device_id.to_string(),
            24,
        )
    }

    #[tokio::test]
    async fn first_login_binds_the_device() {
        let (store, user) = seeded_store().await;
        let guard = guard(&store, "device-a");

        let logged_in = guard.login("9000000001", "1234").await.unwrap();
        assert_eq!(logged_in.device_fingerprint.as_deref(), Some("device-a"));

        let stored = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.device_fingerprint.as_deref(), Some("device-a"));
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected_before_binding() {
        let (store, user) = seeded_store().await;
        let guard = guard(&store, "device-a");

        let result = guard.login("9000000001", "9999").await;
        assert_eq!(result.unwrap_err(), ServiceError::InvalidCredentials);

        let stored = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.device_fingerprint.is_none());
    }

    #[tokio::test]
    async fn second_device_is_refused_and_never_rebinds() {
        let (store, user) = seeded_store().await;
        guard(&store, "device-a")
            .login("9000000001", "1234")
            .await
            .unwrap();

        let other = guard(&store, "device-b");
        for _ in 0..3 {
            let result = other.login("9000000001", "1234").await;
            assert_eq!(result.unwrap_err(), ServiceError::DeviceConflict);
        }

        let stored = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.device_fingerprint.as_deref(), Some("device-a"));
    }

    #[tokio::test]
    async fn resume_restores_and_refreshes_a_live_session() {
        let (store, user) = seeded_store().await;
        let sessions = Arc::new(MemorySessionStore::new());
        let guard = SessionGuard::new(store.clone(), sessions.clone(), "device-a".to_string(), 24);

        guard.login("9000000001", "1234").await.unwrap();
        let resumed = guard.resume_session().await.unwrap().unwrap();
        assert_eq!(resumed.id, user.id);

        let marker = sessions.load().unwrap().unwrap();
        assert!(chrono::Utc::now().timestamp() - marker.saved_at < 5);
    }

    #[tokio::test]
    async fn stale_marker_resumes_to_none_and_clears_state() {
        let (store, user) = seeded_store().await;
        let sessions = Arc::new(MemorySessionStore::new());
        let guard = SessionGuard::new(store.clone(), sessions.clone(), "device-a".to_string(), 24);

        sessions
            .save(&SessionRecord {
                user_id: user.id.clone(),
                device_id: "device-a".to_string(),
                saved_at: chrono::Utc::now().timestamp() - 25 * 3600,
            })
            .unwrap();

        assert!(guard.resume_session().await.unwrap().is_none());
        assert!(sessions.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn fingerprint_conflict_on_resume_is_a_silent_logout() {
        let (store, user) = seeded_store().await;
        guard(&store, "device-a")
            .login("9000000001", "1234")
            .await
            .unwrap();

        // a stray marker on another device must not survive resume
        let sessions = Arc::new(MemorySessionStore::new());
        sessions
            .save(&SessionRecord {
                user_id: user.id.clone(),
                device_id: "device-b".to_string(),
                saved_at: chrono::Utc::now().timestamp(),
            })
            .unwrap();
        let other = SessionGuard::new(store.clone(), sessions.clone(), "device-b".to_string(), 24);

        assert!(other.resume_session().await.unwrap().is_none());
        assert!(sessions.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn logout_clears_the_marker() {
        let (store, _user) = seeded_store().await;
        let sessions = Arc::new(MemorySessionStore::new());
        let guard = SessionGuard::new(store.clone(), sessions.clone(), "device-a".to_string(), 24);

        guard.login("9000000001", "1234").await.unwrap();
        guard.logout();
        assert!(sessions.load().unwrap().is_none());
        assert!(guard.current_user().await.is_none());
    }
}
