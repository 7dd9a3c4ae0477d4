use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{store_err, RequestHandler, Service, ServiceError};
use crate::models::expenses::{Category, Expense, ExpenseFilter, NewExpense, UpdateExpense};
use crate::repositories::SharedStore;

pub enum ExpenseRequest {
    Create {
        new_expense: NewExpense,
        response: oneshot::Sender<Result<Expense, ServiceError>>,
    },
    Update {
        id: String,
        update: UpdateExpense,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Delete {
        id: String,
        user_id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    List {
        user_id: String,
        filter: Option<ExpenseFilter>,
        response: oneshot::Sender<Result<Vec<Expense>, ServiceError>>,
    },
}

fn parse_category(value: &str) -> Result<Category, ServiceError> {
    Category::parse(value)
        .ok_or_else(|| ServiceError::Validation(format!("unknown category: {}", value)))
}

fn validate_amount(amount: i64) -> Result<(), ServiceError> {
    if amount <= 0 {
        return Err(ServiceError::Validation(
            "expense amount must be positive".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ExpenseRequestHandler {
    store: SharedStore,
}

impl ExpenseRequestHandler {
    pub fn new(store: SharedStore) -> Self {
        ExpenseRequestHandler { store }
    }

    async fn create(&self, new_expense: NewExpense) -> Result<Expense, ServiceError> {
        validate_amount(new_expense.amount)?;
        let category = parse_category(&new_expense.category)?;

        let owner = self
            .store
            .get_user_by_id(&new_expense.user_id)
            .await
            .map_err(store_err)?;
        if owner.is_none() {
            return Err(ServiceError::NotFound(format!(
                "user {}",
                new_expense.user_id
            )));
        }

        self.store
            .insert_expense(
                &new_expense.user_id,
                new_expense.amount,
                category,
                &new_expense.description,
            )
            .await
            .map_err(store_err)
    }

    /// Only the owner may touch an entry; anything else reads as missing.
    async fn owned_expense(&self, id: &str, user_id: &str) -> Result<Expense, ServiceError> {
        let expense = self
            .store
            .get_expense(id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("expense {}", id)))?;
        if expense.user_id != user_id {
            return Err(ServiceError::NotFound(format!("expense {}", id)));
        }

        Ok(expense)
    }

    async fn update(&self, id: &str, update: UpdateExpense) -> Result<(), ServiceError> {
        validate_amount(update.amount)?;
        let category = parse_category(&update.category)?;
        self.owned_expense(id, &update.user_id).await?;

        let updated = self
            .store
            .update_expense(id, update.amount, category, &update.description)
            .await
            .map_err(store_err)?;
        if !updated {
            return Err(ServiceError::NotFound(format!("expense {}", id)));
        }

        Ok(())
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<(), ServiceError> {
        self.owned_expense(id, user_id).await?;

        let deleted = self.store.delete_expense(id).await.map_err(store_err)?;
        if !deleted {
            return Err(ServiceError::NotFound(format!("expense {}", id)));
        }

        Ok(())
    }

    async fn list(
        &self,
        user_id: &str,
        filter: Option<ExpenseFilter>,
    ) -> Result<Vec<Expense>, ServiceError> {
        let since = filter.map(|f| f.since(chrono::Utc::now().naive_utc()));
        self.store
            .list_expenses(user_id, since)
            .await
            .map_err(store_err)
    }
}

#[async_trait]
impl RequestHandler<ExpenseRequest> for ExpenseRequestHandler {
    async fn handle_request(&self, request: ExpenseRequest) {
        match request {
            ExpenseRequest::Create {
                new_expense,
                response,
            } => {
                let result = self.create(new_expense).await;
                let _ = response.send(result);
            }
            ExpenseRequest::Update {
                id,
                update,
                response,
            } => {
                let result = self.update(&id, update).await;
                let _ = response.send(result);
            }
            ExpenseRequest::Delete {
                id,
                user_id,
                response,
            } => {
                let result = self.delete(&id, &user_id).await;
                let _ = response.send(result);
            }
            ExpenseRequest::List {
                user_id,
                filter,
                response,
            } => {
                let result = self.list(&user_id, filter).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct ExpenseService;

impl ExpenseService {
    pub fn new() -> Self {
        ExpenseService {}
    }
}

#[async_trait]
impl Service<ExpenseRequest, ExpenseRequestHandler> for ExpenseService {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::users::NewUser;
    use crate::repositories::memory::MemStore;

    async fn setup() -> (SharedStore, ExpenseRequestHandler, String, String) {
        let store: SharedStore = Arc::new(MemStore::new());
        let owner = store
            .insert_user(NewUser {
                mobile: "9000000001".to_string(),
                pin: "1234".to_string(),
                recovery_key: "567890".to_string(),
                full_name: "Asha".to_string(),
                referral_code: None,
            })
            .await
            .unwrap();
        let other = store
            .insert_user(NewUser {
                mobile: "9000000002".to_string(),
                pin: "1234".to_string(),
                recovery_key: "567890".to_string(),
                full_name: "Ravi".to_string(),
                referral_code: None,
            })
            .await
            .unwrap();
        let handler = ExpenseRequestHandler::new(store.clone());
        (store, handler, owner.id, other.id)
    }

    fn new_expense(user_id: &str, amount: i64, category: &str) -> NewExpense {
        NewExpense {
            user_id: user_id.to_string(),
            amount,
            category: category.to_string(),
            description: "test entry".to_string(),
        }
    }

    #[tokio::test]
    async fn create_validates_amount_and_category() {
        let (_store, handler, owner, _other) = setup().await;

        assert!(matches!(
            handler.create(new_expense(&owner, 0, "food")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            handler.create(new_expense(&owner, 100, "rent")).await,
            Err(ServiceError::Validation(_))
        ));

        let created = handler.create(new_expense(&owner, 100, "food")).await.unwrap();
        assert_eq!(created.category, Category::Food);
        assert_eq!(created.amount, 100);
    }

    #[tokio::test]
    async fn only_the_owner_can_update_or_delete() {
        let (_store, handler, owner, other) = setup().await;
        let expense = handler
            .create(new_expense(&owner, 100, "transport"))
            .await
            .unwrap();

        let foreign_update = handler
            .update(
                &expense.id,
                UpdateExpense {
                    user_id: other.clone(),
                    amount: 50,
                    category: "bills".to_string(),
                    description: "hijack".to_string(),
                },
            )
            .await;
        assert!(matches!(foreign_update, Err(ServiceError::NotFound(_))));

        let foreign_delete = handler.delete(&expense.id, &other).await;
        assert!(matches!(foreign_delete, Err(ServiceError::NotFound(_))));

        handler
            .update(
                &expense.id,
                UpdateExpense {
                    user_id: owner.clone(),
                    amount: 150,
                    category: "bills".to_string(),
                    description: "corrected".to_string(),
                },
            )
            .await
            .unwrap();
        handler.delete(&expense.id, &owner).await.unwrap();
        assert!(handler.list(&owner, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_applies_the_requested_window() {
        let (_store, handler, owner, _other) = setup().await;
        handler.create(new_expense(&owner, 100, "food")).await.unwrap();
        handler.create(new_expense(&owner, 200, "health")).await.unwrap();

        let all = handler.list(&owner, None).await.unwrap();
        assert_eq!(all.len(), 2);

        // entries were just created, so every window includes them
        for filter in [
            ExpenseFilter::Daily,
            ExpenseFilter::Weekly,
            ExpenseFilter::Monthly,
        ] {
            let listed = handler.list(&owner, Some(filter)).await.unwrap();
            assert_eq!(listed.len(), 2);
        }
    }
}
