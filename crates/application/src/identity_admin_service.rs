//! User administration use-cases.

use std::sync::Arc;

use rolegate_core::{AppError, AppResult, AuthenticatedUser};
use rolegate_domain::{AuditAction, UserId};

use crate::authorization_engine::AuthorizationEngine;
use crate::ports::{AuditEvent, AuditRepository, NewUser, UserRecord, UserRepository};

/// Application service for user lifecycle administration.
///
/// Owns User identity records; the authorization engine only references
/// them. Deleting a user cascades its role assignments in the store and
/// evicts the user's cached permission set.
#[derive(Clone)]
pub struct IdentityAdminService {
    repository: Arc<dyn UserRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    engine: AuthorizationEngine,
}

impl IdentityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn UserRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        engine: AuthorizationEngine,
    ) -> Self {
        Self {
            repository,
            audit_repository,
            engine,
        }
    }

    /// Creates a user record and emits an audit event.
    pub async fn create_user(
        &self,
        actor: &AuthenticatedUser,
        input: NewUser,
    ) -> AppResult<UserRecord> {
        let user = self.repository.create(input).await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::IdentityUserCreated,
                resource_type: "identity_user".to_owned(),
                resource_id: user.id.to_string(),
                detail: Some(format!("created user '{}'", user.email)),
            })
            .await?;

        Ok(user)
    }

    /// Lists all user records.
    pub async fn list_users(&self) -> AppResult<Vec<UserRecord>> {
        self.repository.list().await
    }

    /// Returns a user record by id.
    pub async fn get_user(&self, user_id: UserId) -> AppResult<UserRecord> {
        self.repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))
    }

    /// Deletes a user record, its role assignments, and its cached
    /// permission set, then emits an audit event.
    pub async fn delete_user(&self, actor: &AuthenticatedUser, user_id: UserId) -> AppResult<()> {
        self.repository.delete(user_id).await?;
        self.engine.forget_user(user_id);

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::IdentityUserDeleted,
                resource_type: "identity_user".to_owned(),
                resource_id: user_id.to_string(),
                detail: Some(format!("deleted user '{user_id}'")),
            })
            .await
    }
}
