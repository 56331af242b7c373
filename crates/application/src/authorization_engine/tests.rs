use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use rolegate_core::{AppError, AppResult, AuthenticatedUser};
use rolegate_domain::{PermissionCode, PermissionId, RoleId, UserId};

use crate::ports::{AuditEvent, AuditRepository, AuthorizationStore, EdgeMutation};

use super::AuthorizationEngine;

#[derive(Default)]
struct FakeStoreState {
    users: HashSet<UserId>,
    roles: HashSet<RoleId>,
    permissions: HashMap<PermissionId, PermissionCode>,
    user_roles: HashSet<(UserId, RoleId)>,
    role_grants: HashSet<(RoleId, PermissionId)>,
}

#[derive(Default)]
struct FakeAuthorizationStore {
    state: Mutex<FakeStoreState>,
    fail_reads: AtomicBool,
}

impl FakeAuthorizationStore {
    fn lock(&self) -> MutexGuard<'_, FakeStoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seed_user(&self) -> UserId {
        let user_id = UserId::new();
        self.lock().users.insert(user_id);
        user_id
    }

    fn seed_role(&self) -> RoleId {
        let role_id = RoleId::new();
        self.lock().roles.insert(role_id);
        role_id
    }

    fn seed_permission(&self, code: &str) -> (PermissionId, PermissionCode) {
        let permission_id = PermissionId::new();
        let code = match PermissionCode::new(code) {
            Ok(code) => code,
            Err(error) => panic!("invalid test permission code: {error}"),
        };
        self.lock().permissions.insert(permission_id, code.clone());
        (permission_id, code)
    }

    fn assignment_exists(&self, user_id: UserId, role_id: RoleId) -> bool {
        self.lock().user_roles.contains(&(user_id, role_id))
    }

    fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("store offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorizationStore for FakeAuthorizationStore {
    async fn insert_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<EdgeMutation> {
        let mut state = self.lock();
        if !state.users.contains(&user_id) {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }
        if !state.roles.contains(&role_id) {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        Ok(if state.user_roles.insert((user_id, role_id)) {
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
        let mut state = self.lock();
        if !state.roles.contains(&role_id) {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }
        if !state.permissions.contains_key(&permission_id) {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' was not found"
            )));
        }

        Ok(if state.role_grants.insert((role_id, permission_id)) {
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
        Ok(
            if self.lock().role_grants.remove(&(role_id, permission_id)) {
                EdgeMutation::Changed
            } else {
                EdgeMutation::Unchanged
            },
        )
    }

    async fn list_permission_codes_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionCode>> {
        self.check_reads()?;

        let state = self.lock();
        let mut codes = Vec::new();
        for (assigned_user, role_id) in &state.user_roles {
            if assigned_user != &user_id {
                continue;
            }
            for (granted_role, permission_id) in &state.role_grants {
                if granted_role == role_id {
                    if let Some(code) = state.permissions.get(permission_id) {
                        codes.push(code.clone());
                    }
                }
            }
        }

        Ok(codes)
    }

    async fn list_users_holding_role(&self, role_id: RoleId) -> AppResult<Vec<UserId>> {
        self.check_reads()?;

        Ok(self
            .lock()
            .user_roles
            .iter()
            .filter_map(|(user_id, held_role)| (held_role == &role_id).then_some(*user_id))
            .collect())
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

fn engine_with_store() -> (
    AuthorizationEngine,
    Arc<FakeAuthorizationStore>,
    Arc<RecordingAuditRepository>,
) {
    let store = Arc::new(FakeAuthorizationStore::default());
    let audit_repository = Arc::new(RecordingAuditRepository::default());
    let engine = AuthorizationEngine::new(store.clone(), audit_repository.clone());
    (engine, store, audit_repository)
}

fn code(value: &str) -> PermissionCode {
    match PermissionCode::new(value) {
        Ok(code) => code,
        Err(error) => panic!("invalid test permission code: {error}"),
    }
}

#[tokio::test]
async fn assigned_role_grants_its_permissions() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let editor = store.seed_role();
    let (doc_write_id, doc_write) = store.seed_permission("doc:write");

    let granted = engine
        .grant_permission_to_role(&actor, editor, doc_write_id)
        .await;
    assert!(granted.is_ok());

    let assigned = engine.assign_role_to_user(&actor, user_id, editor).await;
    assert!(assigned.is_ok());
    assert_eq!(engine.is_authorized(user_id, &doc_write).await.ok(), Some(true));

    let revoked = engine.revoke_role_from_user(&actor, user_id, editor).await;
    assert!(revoked.is_ok());
    assert_eq!(engine.is_authorized(user_id, &doc_write).await.ok(), Some(false));
}

#[tokio::test]
async fn effective_permissions_union_across_roles() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let viewer = store.seed_role();
    let editor = store.seed_role();
    let (doc_read_id, doc_read) = store.seed_permission("doc:read");
    let (doc_write_id, doc_write) = store.seed_permission("doc:write");

    for result in [
        engine.grant_permission_to_role(&actor, viewer, doc_read_id).await,
        engine.grant_permission_to_role(&actor, editor, doc_write_id).await,
        engine.assign_role_to_user(&actor, user_id, viewer).await,
        engine.assign_role_to_user(&actor, user_id, editor).await,
    ] {
        assert!(result.is_ok());
    }

    let effective = engine.list_effective_permissions(user_id).await;
    assert!(effective.as_ref().is_ok_and(|permissions| {
        permissions.len() == 2
            && permissions.contains(&doc_read)
            && permissions.contains(&doc_write)
    }));
}

#[tokio::test]
async fn repeated_assignment_is_noop_success() {
    let (engine, store, audit_repository) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let role_id = store.seed_role();

    assert!(engine.assign_role_to_user(&actor, user_id, role_id).await.is_ok());
    assert!(engine.assign_role_to_user(&actor, user_id, role_id).await.is_ok());

    assert!(store.assignment_exists(user_id, role_id));
    // Only the call that changed state is audited.
    assert_eq!(audit_repository.events.lock().await.len(), 1);
}

#[tokio::test]
async fn revoking_absent_assignment_is_noop_success() {
    let (engine, store, audit_repository) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let role_id = store.seed_role();

    let result = engine.revoke_role_from_user(&actor, user_id, role_id).await;
    assert!(result.is_ok());
    assert!(audit_repository.events.lock().await.is_empty());
}

#[tokio::test]
async fn repeated_grant_is_noop_success() {
    let (engine, store, audit_repository) = engine_with_store();
    let actor = actor();
    let role_id = store.seed_role();
    let (permission_id, _) = store.seed_permission("doc:read");

    assert!(engine.grant_permission_to_role(&actor, role_id, permission_id).await.is_ok());
    assert!(engine.grant_permission_to_role(&actor, role_id, permission_id).await.is_ok());
    assert_eq!(audit_repository.events.lock().await.len(), 1);
}

#[tokio::test]
async fn unknown_user_is_not_authorized() {
    let (engine, store, _) = engine_with_store();
    store.seed_permission("doc:read");

    let result = engine.is_authorized(UserId::new(), &code("doc:read")).await;
    assert_eq!(result.ok(), Some(false));
}

#[tokio::test]
async fn unknown_user_has_no_effective_permissions() {
    let (engine, _, _) = engine_with_store();

    let effective = engine.list_effective_permissions(UserId::new()).await;
    assert!(effective.is_ok_and(|permissions| permissions.is_empty()));
}

#[tokio::test]
async fn assignment_with_unknown_role_fails_not_found() {
    let (engine, store, audit_repository) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();

    let result = engine.assign_role_to_user(&actor, user_id, RoleId::new()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(audit_repository.events.lock().await.is_empty());
}

#[tokio::test]
async fn assignment_with_unknown_user_fails_not_found() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let role_id = store.seed_role();

    let result = engine.assign_role_to_user(&actor, UserId::new(), role_id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn is_authorized_agrees_with_effective_listing() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let role_id = store.seed_role();
    let (doc_read_id, doc_read) = store.seed_permission("doc:read");
    store.seed_permission("doc:write");

    assert!(engine.grant_permission_to_role(&actor, role_id, doc_read_id).await.is_ok());
    assert!(engine.assign_role_to_user(&actor, user_id, role_id).await.is_ok());

    let effective = match engine.list_effective_permissions(user_id).await {
        Ok(permissions) => permissions,
        Err(error) => panic!("listing failed: {error}"),
    };

    for candidate in [doc_read, code("doc:write"), code("doc:delete")] {
        let authorized = engine.is_authorized(user_id, &candidate).await;
        assert_eq!(authorized.ok(), Some(effective.contains(&candidate)));
    }
}

#[tokio::test]
async fn grant_to_held_role_is_visible_on_next_check() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let role_id = store.seed_role();
    let (permission_id, permission) = store.seed_permission("doc:write");

    assert!(engine.assign_role_to_user(&actor, user_id, role_id).await.is_ok());
    // Prime the cache with the pre-grant state.
    assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(false));

    assert!(engine.grant_permission_to_role(&actor, role_id, permission_id).await.is_ok());
    assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(true));

    assert!(engine.revoke_permission_from_role(&actor, role_id, permission_id).await.is_ok());
    assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(false));
}

#[tokio::test]
async fn grant_invalidates_every_role_holder() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let first = store.seed_user();
    let second = store.seed_user();
    let role_id = store.seed_role();
    let (permission_id, permission) = store.seed_permission("report:run");

    for user_id in [first, second] {
        assert!(engine.assign_role_to_user(&actor, user_id, role_id).await.is_ok());
        assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(false));
    }

    assert!(engine.grant_permission_to_role(&actor, role_id, permission_id).await.is_ok());

    for user_id in [first, second] {
        assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(true));
    }
}

#[tokio::test]
async fn rejected_mutation_leaves_cache_untouched() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let role_id = store.seed_role();
    let (permission_id, permission) = store.seed_permission("doc:read");

    assert!(engine.grant_permission_to_role(&actor, role_id, permission_id).await.is_ok());
    assert!(engine.assign_role_to_user(&actor, user_id, role_id).await.is_ok());
    assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(true));

    let rejected = engine.assign_role_to_user(&actor, user_id, RoleId::new()).await;
    assert!(matches!(rejected, Err(AppError::NotFound(_))));

    // A rejected mutation must not have invalidated anything: the cached
    // decision is still served even when the store stops answering reads.
    store.set_fail_reads(true);
    assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(true));
}

#[tokio::test]
async fn store_outage_surfaces_unavailable() {
    let (engine, store, _) = engine_with_store();
    store.set_fail_reads(true);

    let result = engine.is_authorized(UserId::new(), &code("doc:read")).await;
    assert!(matches!(result, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn forget_user_drops_cached_permissions() {
    let (engine, store, _) = engine_with_store();
    let actor = actor();
    let user_id = store.seed_user();
    let role_id = store.seed_role();
    let (permission_id, permission) = store.seed_permission("doc:write");

    assert!(engine.grant_permission_to_role(&actor, role_id, permission_id).await.is_ok());
    assert!(engine.assign_role_to_user(&actor, user_id, role_id).await.is_ok());
    assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(true));

    // Simulate identity administration deleting the user with cascade.
    {
        let mut state = store.lock();
        state.users.remove(&user_id);
        state.user_roles.retain(|(assigned_user, _)| assigned_user != &user_id);
    }
    engine.forget_user(user_id);

    assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(false));
}

#[tokio::test]
async fn concurrent_assign_and_revoke_converge_on_store_state() {
    for _ in 0..16 {
        let (engine, store, _) = engine_with_store();
        let actor = actor();
        let user_id = store.seed_user();
        let role_id = store.seed_role();
        let (permission_id, permission) = store.seed_permission("doc:write");

        assert!(engine.grant_permission_to_role(&actor, role_id, permission_id).await.is_ok());

        let assign = engine.assign_role_to_user(&actor, user_id, role_id);
        let revoke = engine.revoke_role_from_user(&actor, user_id, role_id);
        let (assigned, revoked) = tokio::join!(assign, revoke);
        assert!(assigned.is_ok());
        assert!(revoked.is_ok());

        // Whatever interleaving the store committed, the next decision
        // must match it: no lost update and no stale cache entry.
        let expected = store.assignment_exists(user_id, role_id);
        assert_eq!(engine.is_authorized(user_id, &permission).await.ok(), Some(expected));
    }
}
