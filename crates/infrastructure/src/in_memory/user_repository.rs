use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::RwLock;

use rolegate_application::{NewUser, UserRecord, UserRepository};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::UserId;

use super::InMemoryState;

/// In-memory repository for user records.
#[derive(Clone)]
pub struct InMemoryUserRepository {
    pub(super) state: Arc<RwLock<InMemoryState>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> AppResult<UserRecord> {
        let mut state = self.state.write().await;

        if state
            .users
            .values()
            .any(|existing| existing.email == user.email.as_str())
        {
            return Err(AppError::Conflict(format!(
                "user with email '{}' already exists",
                user.email.as_str()
            )));
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let record = UserRecord {
            id: UserId::new(),
            email: user.email.as_str().to_owned(),
            first_name: user.first_name.as_str().to_owned(),
            last_name: user.last_name.as_str().to_owned(),
            created_at: now.clone(),
            updated_at: now,
        };

        state.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<UserRecord>> {
        let state = self.state.read().await;

        let mut listed: Vec<UserRecord> = state.users.values().cloned().collect();
        listed.sort_by(|left, right| left.email.cmp(&right.email));
        Ok(listed)
    }

    async fn delete(&self, user_id: UserId) -> AppResult<()> {
        let mut state = self.state.write().await;

        if state.users.remove(&user_id).is_none() {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }

        // Cascade matching the schema's ON DELETE CASCADE.
        state.user_roles.retain(|(holder, _)| holder != &user_id);
        Ok(())
    }
}
