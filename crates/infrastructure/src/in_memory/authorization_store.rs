use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rolegate_application::{AuthorizationStore, EdgeMutation};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::{PermissionCode, PermissionId, RoleId, UserId};

use super::InMemoryState;

/// In-memory store for the role/permission graph.
#[derive(Clone)]
pub struct InMemoryAuthorizationStore {
    pub(super) state: Arc<RwLock<InMemoryState>>,
}

fn edge_outcome(changed: bool) -> EdgeMutation {
    if changed {
        EdgeMutation::Changed
    } else {
        EdgeMutation::Unchanged
    }
}

#[async_trait]
impl AuthorizationStore for InMemoryAuthorizationStore {
    async fn insert_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<EdgeMutation> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }
        if !state.roles.contains_key(&role_id) {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        Ok(edge_outcome(state.user_roles.insert((user_id, role_id))))
    }

    async fn delete_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<EdgeMutation> {
        let mut state = self.state.write().await;
        Ok(edge_outcome(state.user_roles.remove(&(user_id, role_id))))
    }

    async fn insert_role_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<EdgeMutation> {
        let mut state = self.state.write().await;

        if !state.roles.contains_key(&role_id) {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }
        if !state.permissions.contains_key(&permission_id) {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' was not found"
            )));
        }

        Ok(edge_outcome(state.role_grants.insert((role_id, permission_id))))
    }

    async fn delete_role_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<EdgeMutation> {
        let mut state = self.state.write().await;
        Ok(edge_outcome(state.role_grants.remove(&(role_id, permission_id))))
    }

    async fn list_permission_codes_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionCode>> {
        let state = self.state.read().await;

        let mut codes = Vec::new();
        for (holder, role_id) in &state.user_roles {
            if holder != &user_id {
                continue;
            }
            for (granted_role, permission_id) in &state.role_grants {
                if granted_role == role_id {
                    if let Some(permission) = state.permissions.get(permission_id) {
                        codes.push(permission.code.clone());
                    }
                }
            }
        }

        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    async fn list_users_holding_role(&self, role_id: RoleId) -> AppResult<Vec<UserId>> {
        let state = self.state.read().await;

        Ok(state
            .user_roles
            .iter()
            .filter_map(|(user_id, held_role)| (held_role == &role_id).then_some(*user_id))
            .collect())
    }
}
