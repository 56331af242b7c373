//! Role and permission administration use-cases.

use std::sync::Arc;

use rolegate_core::{AppError, AppResult, AuthenticatedUser};
use rolegate_domain::{AuditAction, PermissionCode, PermissionId, RoleId, RoleName};

use crate::authorization_engine::AuthorizationEngine;
use crate::ports::{
    AccessAdminRepository, AuditEvent, AuditRepository, PermissionRecord, RoleRecord,
};

/// Application service for role and permission administration.
///
/// Role and permission identity records are owned here; the authorization
/// engine owns the assignment edges between them. Deleting a role
/// invalidates every holder's cached permissions before returning, so a
/// removed role stops contributing permissions immediately.
#[derive(Clone)]
pub struct AccessAdminService {
    repository: Arc<dyn AccessAdminRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    engine: AuthorizationEngine,
}

impl AccessAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AccessAdminRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        engine: AuthorizationEngine,
    ) -> Self {
        Self {
            repository,
            audit_repository,
            engine,
        }
    }

    /// Creates a role and emits an audit event. Duplicate names surface
    /// as `Conflict`.
    pub async fn create_role(
        &self,
        actor: &AuthenticatedUser,
        name: RoleName,
    ) -> AppResult<RoleRecord> {
        let role = self.repository.create_role(name).await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessRoleCreated,
                resource_type: "rbac_role".to_owned(),
                resource_id: role.id.to_string(),
                detail: Some(format!("created role '{}'", role.name.as_str())),
            })
            .await?;

        Ok(role)
    }

    /// Lists all roles with their grants.
    pub async fn list_roles(&self) -> AppResult<Vec<RoleRecord>> {
        self.repository.list_roles().await
    }

    /// Returns a role with its grants by id.
    pub async fn get_role(&self, role_id: RoleId) -> AppResult<RoleRecord> {
        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    /// Deletes a role, cascading its grants and assignments. Every user
    /// holding the role is invalidated before the call returns.
    pub async fn delete_role(&self, actor: &AuthenticatedUser, role_id: RoleId) -> AppResult<()> {
        // Holders are captured before the cascade removes the edges.
        let holders = self.engine.users_holding_role(role_id).await?;

        self.repository.delete_role(role_id).await?;
        self.engine.invalidate_users(&holders);

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessRoleDeleted,
                resource_type: "rbac_role".to_owned(),
                resource_id: role_id.to_string(),
                detail: Some(format!("deleted role '{role_id}'")),
            })
            .await
    }

    /// Creates a permission and emits an audit event. Duplicate codes
    /// surface as `Conflict`.
    pub async fn create_permission(
        &self,
        actor: &AuthenticatedUser,
        code: PermissionCode,
        description: Option<String>,
    ) -> AppResult<PermissionRecord> {
        let permission = self.repository.create_permission(code, description).await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessPermissionCreated,
                resource_type: "rbac_permission".to_owned(),
                resource_id: permission.id.to_string(),
                detail: Some(format!("created permission '{}'", permission.code)),
            })
            .await?;

        Ok(permission)
    }

    /// Lists all permissions.
    pub async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        self.repository.list_permissions().await
    }

    /// Updates a permission's description, the only mutable field once a
    /// code exists.
    pub async fn update_permission_description(
        &self,
        actor: &AuthenticatedUser,
        permission_id: PermissionId,
        description: Option<String>,
    ) -> AppResult<PermissionRecord> {
        let permission = self
            .repository
            .update_permission_description(permission_id, description)
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.subject().to_string(),
                action: AuditAction::AccessPermissionUpdated,
                resource_type: "rbac_permission".to_owned(),
                resource_id: permission.id.to_string(),
                detail: Some(format!(
                    "updated description of permission '{}'",
                    permission.code
                )),
            })
            .await?;

        Ok(permission)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    use async_trait::async_trait;
    use tokio::sync::Mutex as AsyncMutex;
    use uuid::Uuid;

    use rolegate_core::{AppError, AppResult, AuthenticatedUser};
    use rolegate_domain::{PermissionCode, PermissionId, RoleId, RoleName, UserId};

    use crate::authorization_engine::AuthorizationEngine;
    use crate::ports::{
        AccessAdminRepository, AuditEvent, AuditRepository, AuthorizationStore, EdgeMutation,
        PermissionRecord, RoleRecord,
    };

    use super::AccessAdminService;

    /// One shared in-memory backend implementing both the engine store
    /// and the admin repository, so cascades are observable end to end.
    #[derive(Default)]
    struct SharedState {
        roles: HashMap<RoleId, RoleName>,
        permissions: HashMap<PermissionId, PermissionRecord>,
        user_roles: HashSet<(UserId, RoleId)>,
        role_grants: HashSet<(RoleId, PermissionId)>,
    }

    #[derive(Default)]
    struct FakeBackend {
        state: Mutex<SharedState>,
    }

    impl FakeBackend {
        fn lock(&self) -> MutexGuard<'_, SharedState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn seed_assignment(&self, user_id: UserId, role_id: RoleId) {
            self.lock().user_roles.insert((user_id, role_id));
        }

        fn seed_grant(&self, role_id: RoleId, permission_id: PermissionId) {
            self.lock().role_grants.insert((role_id, permission_id));
        }
    }

    #[async_trait]
    impl AuthorizationStore for FakeBackend {
        async fn insert_user_role(
            &self,
            user_id: UserId,
            role_id: RoleId,
        ) -> AppResult<EdgeMutation> {
            Ok(if self.lock().user_roles.insert((user_id, role_id)) {
                EdgeMutation::Changed
            } else {
                EdgeMutation::Unchanged
            })
        }

        async fn delete_user_role(
            &self,
            user_id: UserId,
            role_id: RoleId,
        ) -> AppResult<EdgeMutation> {
            Ok(if self.lock().user_roles.remove(&(user_id, role_id)) {
                EdgeMutation::Changed
            } else {
                EdgeMutation::Unchanged
            })
        }

        async fn insert_role_grant(
            &self,
            role_id: RoleId,
            permission_id: PermissionId,
        ) -> AppResult<EdgeMutation> {
            Ok(if self.lock().role_grants.insert((role_id, permission_id)) {
                EdgeMutation::Changed
            } else {
                EdgeMutation::Unchanged
            })
        }

        async fn delete_role_grant(
            &self,
            role_id: RoleId,
            permission_id: PermissionId,
        ) -> AppResult<EdgeMutation> {
            Ok(if self.lock().role_grants.remove(&(role_id, permission_id)) {
                EdgeMutation::Changed
            } else {
                EdgeMutation::Unchanged
            })
        }

        async fn list_permission_codes_for_user(
            &self,
            user_id: UserId,
        ) -> AppResult<Vec<PermissionCode>> {
            let state = self.lock();
            let mut codes = Vec::new();
            for (assigned_user, role_id) in &state.user_roles {
                if assigned_user != &user_id {
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
            Ok(codes)
        }

        async fn list_users_holding_role(&self, role_id: RoleId) -> AppResult<Vec<UserId>> {
            Ok(self
                .lock()
                .user_roles
                .iter()
                .filter_map(|(user_id, held_role)| (held_role == &role_id).then_some(*user_id))
                .collect())
        }
    }

    #[async_trait]
    impl AccessAdminRepository for FakeBackend {
        async fn create_role(&self, name: RoleName) -> AppResult<RoleRecord> {
            let mut state = self.lock();
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
            let state = self.lock();
            let mut roles: Vec<RoleRecord> = state
                .roles
                .iter()
                .map(|(role_id, name)| RoleRecord {
                    id: *role_id,
                    name: name.clone(),
                    permissions: Vec::new(),
                })
                .collect();
            roles.sort_by(|left, right| left.name.cmp(&right.name));
            Ok(roles)
        }

        async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleRecord>> {
            Ok(self.lock().roles.get(&role_id).map(|name| RoleRecord {
                id: role_id,
                name: name.clone(),
                permissions: Vec::new(),
            }))
        }

        async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
            let mut state = self.lock();
            if state.roles.remove(&role_id).is_none() {
                return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
            }
            // FK cascade semantics.
            state.user_roles.retain(|(_, held_role)| held_role != &role_id);
            state.role_grants.retain(|(granted_role, _)| granted_role != &role_id);
            Ok(())
        }

        async fn create_permission(
            &self,
            code: PermissionCode,
            description: Option<String>,
        ) -> AppResult<PermissionRecord> {
            let mut state = self.lock();
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
            let mut permissions: Vec<PermissionRecord> =
                self.lock().permissions.values().cloned().collect();
            permissions.sort_by(|left, right| left.code.cmp(&right.code));
            Ok(permissions)
        }

        async fn update_permission_description(
            &self,
            permission_id: PermissionId,
            description: Option<String>,
        ) -> AppResult<PermissionRecord> {
            let mut state = self.lock();
            let Some(permission) = state.permissions.get_mut(&permission_id) else {
                return Err(AppError::NotFound(format!(
                    "permission '{permission_id}' was not found"
                )));
            };

            permission.description = description;
            Ok(permission.clone())
        }
    }

    #[derive(Default)]
    struct RecordingAuditRepository {
        events: AsyncMutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for RecordingAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    fn actor() -> AuthenticatedUser {
        AuthenticatedUser::new(Uuid::new_v4())
    }

    fn role_name(value: &str) -> RoleName {
        match RoleName::new(value) {
            Ok(name) => name,
            Err(error) => panic!("invalid test role name: {error}"),
        }
    }

    fn code(value: &str) -> PermissionCode {
        match PermissionCode::new(value) {
            Ok(code) => code,
            Err(error) => panic!("invalid test permission code: {error}"),
        }
    }

    fn service() -> (
        AccessAdminService,
        AuthorizationEngine,
        Arc<FakeBackend>,
        Arc<RecordingAuditRepository>,
    ) {
        let backend = Arc::new(FakeBackend::default());
        let audit_repository = Arc::new(RecordingAuditRepository::default());
        let engine = AuthorizationEngine::new(backend.clone(), audit_repository.clone());
        let service =
            AccessAdminService::new(backend.clone(), audit_repository.clone(), engine.clone());
        (service, engine, backend, audit_repository)
    }

    #[tokio::test]
    async fn create_role_writes_audit_event() {
        let (service, _, _, audit_repository) = service();

        let result = service.create_role(&actor(), role_name("editor")).await;
        assert!(result.is_ok());
        assert_eq!(audit_repository.events.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_role_name_is_rejected_with_conflict() {
        let (service, _, _, _) = service();
        let actor = actor();

        assert!(service.create_role(&actor, role_name("editor")).await.is_ok());
        let duplicate = service.create_role(&actor, role_name("editor")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_role_lookup_is_not_found() {
        let (service, _, _, _) = service();

        let result = service.get_role(RoleId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_role_revokes_holder_permissions_immediately() {
        let (service, engine, backend, _) = service();
        let actor = actor();
        let user_id = UserId::new();

        let role = match service.create_role(&actor, role_name("editor")).await {
            Ok(role) => role,
            Err(error) => panic!("role creation failed: {error}"),
        };
        let permission = match service
            .create_permission(&actor, code("doc:write"), None)
            .await
        {
            Ok(permission) => permission,
            Err(error) => panic!("permission creation failed: {error}"),
        };

        backend.seed_grant(role.id, permission.id);
        backend.seed_assignment(user_id, role.id);

        // Prime the cache with the pre-deletion state.
        assert_eq!(
            engine.is_authorized(user_id, &permission.code).await.ok(),
            Some(true)
        );

        assert!(service.delete_role(&actor, role.id).await.is_ok());
        assert_eq!(
            engine.is_authorized(user_id, &permission.code).await.ok(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn duplicate_permission_code_is_rejected_with_conflict() {
        let (service, _, _, _) = service();
        let actor = actor();

        assert!(
            service
                .create_permission(&actor, code("doc:read"), Some("read docs".to_owned()))
                .await
                .is_ok()
        );
        let duplicate = service.create_permission(&actor, code("doc:read"), None).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn permission_description_update_is_audited() {
        let (service, _, _, audit_repository) = service();
        let actor = actor();

        let permission = match service.create_permission(&actor, code("doc:read"), None).await {
            Ok(permission) => permission,
            Err(error) => panic!("permission creation failed: {error}"),
        };

        let updated = service
            .update_permission_description(&actor, permission.id, Some("read access".to_owned()))
            .await;
        assert!(updated.is_ok_and(|record| record.description.as_deref() == Some("read access")));
        assert_eq!(audit_repository.events.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn updating_unknown_permission_is_not_found() {
        let (service, _, _, _) = service();

        let result = service
            .update_permission_description(&actor(), PermissionId::new(), None)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
