use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{reports, store_err, RequestHandler, Service, ServiceError};
use crate::models::global_settings::GlobalSettings;
use crate::models::reports::PnlReport;
use crate::repositories::SharedStore;

pub enum AdminRequest {
    ReadSettings {
        response: oneshot::Sender<Result<GlobalSettings, ServiceError>>,
    },
    WriteSettings {
        settings: GlobalSettings,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Stats {
        response: oneshot::Sender<Result<PnlReport, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct AdminRequestHandler {
    store: SharedStore,
}

impl AdminRequestHandler {
    pub fn new(store: SharedStore) -> Self {
        AdminRequestHandler { store }
    }

    async fn read_settings(&self) -> Result<GlobalSettings, ServiceError> {
        self.store
            .read_settings()
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound("global settings".to_string()))
    }

    /// Whole-row replacement. Callers resend unchanged fields; a partial
    /// object would reset them.
    async fn write_settings(&self, settings: GlobalSettings) -> Result<(), ServiceError> {
        if settings.subscription_fee < 0 || settings.t1_reward < 0 || settings.t2_reward < 0 {
            return Err(ServiceError::Validation(
                "fees and rewards must not be negative".to_string(),
            ));
        }
        if settings.current_cycle_id.trim().is_empty() {
            return Err(ServiceError::Validation(
                "cycle id must not be empty".to_string(),
            ));
        }

        self.store.write_settings(settings).await.map_err(store_err)
    }

    async fn stats(&self) -> Result<PnlReport, ServiceError> {
        let settings = self.read_settings().await?;
        let users = self.store.list_users().await.map_err(store_err)?;
        let total_payouts = self.store.total_payouts().await.map_err(store_err)?;

        Ok(reports::compute_pnl(
            &users,
            total_payouts,
            settings.subscription_fee,
        ))
    }
}

#[async_trait]
impl RequestHandler<AdminRequest> for AdminRequestHandler {
    async fn handle_request(&self, request: AdminRequest) {
        match request {
            AdminRequest::ReadSettings { response } => {
                let result = self.read_settings().await;
                let _ = response.send(result);
            }
            AdminRequest::WriteSettings { settings, response } => {
                let result = self.write_settings(settings).await;
                let _ = response.send(result);
            }
            AdminRequest::Stats { response } => {
                let result = self.stats().await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct AdminService;

impl AdminService {
    pub fn new() -> Self {
        AdminService {}
    }
}

#[async_trait]
impl Service<AdminRequest, AdminRequestHandler> for AdminService {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repositories::memory::MemStore;

    fn handler_with_store() -> (SharedStore, AdminRequestHandler) {
        let store: SharedStore = Arc::new(MemStore::new());
        (store.clone(), AdminRequestHandler::new(store))
    }

    #[tokio::test]
    async fn settings_are_missing_until_first_write() {
        let (_store, handler) = handler_with_store();
        assert!(matches!(
            handler.read_settings().await,
            Err(ServiceError::NotFound(_))
        ));

        handler.write_settings(GlobalSettings::default()).await.unwrap();
        assert_eq!(
            handler.read_settings().await.unwrap(),
            GlobalSettings::default()
        );
    }

    #[tokio::test]
    async fn write_back_of_a_read_is_a_no_op() {
        let (_store, handler) = handler_with_store();
        let mut settings = GlobalSettings::default();
        settings.notice = "maintenance on sunday".to_string();
        settings.campaign_active = true;
        settings.campaign_title = "Diwali double".to_string();
        handler.write_settings(settings).await.unwrap();

        let before = handler.read_settings().await.unwrap();
        handler.write_settings(before.clone()).await.unwrap();
        let after = handler.read_settings().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn partial_fields_survive_a_full_row_write() {
        let (_store, handler) = handler_with_store();
        let mut settings = GlobalSettings::default();
        settings.notice = "do not clobber me".to_string();
        handler.write_settings(settings).await.unwrap();

        // a proper read-modify-write keeps unrelated fields
        let mut current = handler.read_settings().await.unwrap();
        current.subscription_fee = 19900;
        handler.write_settings(current).await.unwrap();

        let fresh = handler.read_settings().await.unwrap();
        assert_eq!(fresh.subscription_fee, 19900);
        assert_eq!(fresh.notice, "do not clobber me");
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let (_store, handler) = handler_with_store();

        let mut negative = GlobalSettings::default();
        negative.t1_reward = -1;
        assert!(matches!(
            handler.write_settings(negative).await,
            Err(ServiceError::Validation(_))
        ));

        let mut empty_cycle = GlobalSettings::default();
        empty_cycle.current_cycle_id = "  ".to_string();
        assert!(matches!(
            handler.write_settings(empty_cycle).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn stats_tolerate_an_empty_store() {
        let (_store, handler) = handler_with_store();
        handler.write_settings(GlobalSettings::default()).await.unwrap();

        let report = handler.stats().await.unwrap();
        assert_eq!(report.total_users, 0);
        assert_eq!(report.total_payouts, 0);
        assert_eq!(report.net_revenue, 0);
    }
}
