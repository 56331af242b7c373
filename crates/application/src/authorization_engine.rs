//! Authorization engine owning the role/permission graph.

use std::collections::BTreeSet;
use std::sync::Arc;

use rolegate_core::{AppResult, AuthenticatedUser};
use rolegate_domain::{AuditAction, PermissionCode, PermissionId, RoleId, UserId};

use crate::ports::{AuditEvent, AuditRepository, AuthorizationStore};

use cache::PermissionCache;

mod cache;
#[cfg(test)]
mod tests;

/// Application service owning the User → Role and Role → Permission
/// relationships and answering effective-permission queries.
///
/// Mutations are idempotent: re-creating an existing edge or removing an
/// absent one is a no-op success, emits no audit event, and leaves the
/// cache untouched. An actual change invalidates every affected user's
/// cached permission set before the call returns, so the next decision
/// query always observes the new state. Decision queries are pure reads
/// and report store outages as `Unavailable` instead of a deny, letting
/// the route guard fail closed explicitly.
#[derive(Clone)]
pub struct AuthorizationEngine {
    store: Arc<dyn AuthorizationStore>,
    audit_repository: Arc<dyn AuditRepository>,
    cache: Arc<PermissionCache>,
}

impl AuthorizationEngine {
    /// Creates an engine over a backing store and an audit sink.
    #[must_use]
    pub fn new(
        store: Arc<dyn AuthorizationStore>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            store,
            audit_repository,
            cache: Arc::new(PermissionCache::default()),
        }
    }

    /// Assigns a role to a user. Re-assigning an already-held role is a
    /// no-op success; unknown ids surface as `NotFound`.
    pub async fn assign_role_to_user(
        &self,
        actor: &AuthenticatedUser,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let outcome = self.store.insert_user_role(user_id, role_id).await?;
        if !outcome.changed() {
            return Ok(());
        }

        self.cache.invalidate(user_id);

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessRoleAssigned,
                resource_type: "rbac_user_role".to_owned(),
                resource_id: format!("{user_id}:{role_id}"),
                detail: Some(format!("assigned role '{role_id}' to user '{user_id}'")),
            })
            .await
    }

    /// Revokes a role from a user. Absence of the assignment is a no-op
    /// success.
    pub async fn revoke_role_from_user(
        &self,
        actor: &AuthenticatedUser,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let outcome = self.store.delete_user_role(user_id, role_id).await?;
        if !outcome.changed() {
            return Ok(());
        }

        self.cache.invalidate(user_id);

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessRoleRevoked,
                resource_type: "rbac_user_role".to_owned(),
                resource_id: format!("{user_id}:{role_id}"),
                detail: Some(format!("revoked role '{role_id}' from user '{user_id}'")),
            })
            .await
    }

    /// Grants a permission to a role. Every user holding the role is
    /// invalidated before the call returns.
    pub async fn grant_permission_to_role(
        &self,
        actor: &AuthenticatedUser,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let outcome = self.store.insert_role_grant(role_id, permission_id).await?;
        if !outcome.changed() {
            return Ok(());
        }

        self.invalidate_role_holders(role_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessPermissionGranted,
                resource_type: "rbac_role_grant".to_owned(),
                resource_id: format!("{role_id}:{permission_id}"),
                detail: Some(format!(
                    "granted permission '{permission_id}' to role '{role_id}'"
                )),
            })
            .await
    }

    /// Revokes a permission from a role. Every user holding the role is
    /// invalidated before the call returns.
    pub async fn revoke_permission_from_role(
        &self,
        actor: &AuthenticatedUser,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let outcome = self.store.delete_role_grant(role_id, permission_id).await?;
        if !outcome.changed() {
            return Ok(());
        }

        self.invalidate_role_holders(role_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessPermissionRevoked,
                resource_type: "rbac_role_grant".to_owned(),
                resource_id: format!("{role_id}:{permission_id}"),
                detail: Some(format!(
                    "revoked permission '{permission_id}' from role '{role_id}'"
                )),
            })
            .await
    }

    /// Reports whether the user holds the permission through any of their
    /// roles. Unknown users resolve to `false`, never an error; only a
    /// store outage produces `Err(Unavailable)`.
    pub async fn is_authorized(
        &self,
        user_id: UserId,
        permission: &PermissionCode,
    ) -> AppResult<bool> {
        let permissions = self.resolve(user_id).await?;
        Ok(permissions.contains(permission))
    }

    /// Returns the union of permissions across all roles held by the user.
    /// Always agrees with [`Self::is_authorized`]: both are served from
    /// the same resolution path.
    pub async fn list_effective_permissions(
        &self,
        user_id: UserId,
    ) -> AppResult<BTreeSet<PermissionCode>> {
        let permissions = self.resolve(user_id).await?;
        Ok(permissions.as_ref().clone())
    }

    /// Lists users currently holding the role.
    pub async fn users_holding_role(&self, role_id: RoleId) -> AppResult<Vec<UserId>> {
        self.store.list_users_holding_role(role_id).await
    }

    /// Drops cached permission sets for the given users. Used by role
    /// administration when a role disappears out from under its holders.
    pub fn invalidate_users(&self, users: &[UserId]) {
        self.cache.invalidate_many(users);
    }

    /// Drops the cached permission set for a deleted user.
    pub fn forget_user(&self, user_id: UserId) {
        self.cache.invalidate(user_id);
    }

    async fn resolve(&self, user_id: UserId) -> AppResult<Arc<BTreeSet<PermissionCode>>> {
        if let Some(cached) = self.cache.get(user_id) {
            return Ok(cached);
        }

        let generation = self.cache.fill_generation(user_id);
        let codes = self.store.list_permission_codes_for_user(user_id).await?;
        let permissions = Arc::new(codes.into_iter().collect::<BTreeSet<_>>());
        self.cache
            .store_if_current(user_id, generation, Arc::clone(&permissions));

        Ok(permissions)
    }

    // The holder list is read after the edge mutation committed. If that
    // read fails we no longer know which users are affected, so the whole
    // cache is dropped rather than risk serving a stale decision.
    async fn invalidate_role_holders(&self, role_id: RoleId) -> AppResult<()> {
        match self.store.list_users_holding_role(role_id).await {
            Ok(holders) => {
                self.cache.invalidate_many(&holders);
                Ok(())
            }
            Err(error) => {
                self.cache.invalidate_all();
                Err(error)
            }
        }
    }
}
