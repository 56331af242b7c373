use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rolegate_application::{AccessAdminRepository, PermissionRecord, RoleRecord};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::{PermissionCode, PermissionId, RoleId, RoleName};

use super::InMemoryState;

/// In-memory repository for role and permission administration.
#[derive(Clone)]
pub struct InMemoryAccessAdminRepository {
    pub(super) state: Arc<RwLock<InMemoryState>>,
}

fn role_record(state: &InMemoryState, role_id: RoleId, name: &RoleName) -> RoleRecord {
    let mut permissions: Vec<PermissionCode> = state
        .role_grants
        .iter()
        .filter(|(granted_role, _)| granted_role == &role_id)
        .filter_map(|(_, permission_id)| state.permissions.get(permission_id))
        .map(|permission| permission.code.clone())
        .collect();
    permissions.sort();

    RoleRecord {
        id: role_id,
        name: name.clone(),
        permissions,
    }
}

#[async_trait]
impl AccessAdminRepository for InMemoryAccessAdminRepository {
    async fn create_role(&self, name: RoleName) -> AppResult<RoleRecord> {
        let mut state = self.state.write().await;

        if state.roles.values().any(|existing| existing == &name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                name.as_str()
            )));
        }

        let role_id = RoleId::new();
        state.roles.insert(role_id, name.clone());
        Ok(RoleRecord {
            id: role_id,
            name,
            permissions: Vec::new(),
        })
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleRecord>> {
        let state = self.state.read().await;

        let mut roles: Vec<RoleRecord> = state
            .roles
            .iter()
            .map(|(role_id, name)| role_record(&state, *role_id, name))
            .collect();
        roles.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(roles)
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleRecord>> {
        let state = self.state.read().await;

        Ok(state
            .roles
            .get(&role_id)
            .map(|name| role_record(&state, role_id, name)))
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;

        if state.roles.remove(&role_id).is_none() {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        // Cascade matching the schema's ON DELETE CASCADE.
        state.user_roles.retain(|(_, held_role)| held_role != &role_id);
        state
            .role_grants
            .retain(|(granted_role, _)| granted_role != &role_id);
        Ok(())
    }

    async fn create_permission(
        &self,
        code: PermissionCode,
        description: Option<String>,
    ) -> AppResult<PermissionRecord> {
        let mut state = self.state.write().await;

        if state
            .permissions
            .values()
            .any(|existing| existing.code == code)
        {
            return Err(AppError::Conflict(format!(
                "permission '{code}' already exists"
            )));
        }

        let record = PermissionRecord {
            id: PermissionId::new(),
            code,
            description,
        };
        state.permissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        let state = self.state.read().await;

        let mut permissions: Vec<PermissionRecord> =
            state.permissions.values().cloned().collect();
        permissions.sort_by(|left, right| left.code.cmp(&right.code));
        Ok(permissions)
    }

    async fn update_permission_description(
        &self,
        permission_id: PermissionId,
        description: Option<String>,
    ) -> AppResult<PermissionRecord> {
        let mut state = self.state.write().await;

        let Some(permission) = state.permissions.get_mut(&permission_id) else {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' was not found"
            )));
        };

        permission.description = description;
        Ok(permission.clone())
    }
}
