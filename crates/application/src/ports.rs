//! Repository ports and the records they exchange.

use async_trait::async_trait;

use rolegate_core::AppResult;
use rolegate_domain::{
    AuditAction, DisplayName, EmailAddress, PermissionCode, PermissionId, RoleId, RoleName, UserId,
};

/// Outcome of an idempotent relationship mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMutation {
    /// The edge was created or removed by this call.
    Changed,
    /// The store was already in the requested state.
    Unchanged,
}

impl EdgeMutation {
    /// Returns whether this call actually altered the store.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Backing store port for the authorization engine.
///
/// Every mutation runs in its own transaction; concurrent calls touching
/// the same pair serialize on the store's row locks (last committed wins).
/// A mutation referencing an unknown user/role/permission id fails with
/// `NotFound` for inserts and reports `Unchanged` for deletes, matching
/// the idempotent-removal contract.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Creates the (user, role) assignment edge if absent.
    async fn insert_user_role(&self, user_id: UserId, role_id: RoleId)
    -> AppResult<EdgeMutation>;

    /// Removes the (user, role) assignment edge if present.
    async fn delete_user_role(&self, user_id: UserId, role_id: RoleId)
    -> AppResult<EdgeMutation>;

    /// Creates the (role, permission) grant edge if absent.
    async fn insert_role_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<EdgeMutation>;

    /// Removes the (role, permission) grant edge if present.
    async fn delete_role_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<EdgeMutation>;

    /// Lists the union of permission codes across all roles held by the
    /// user. Unknown users resolve to an empty list, never an error.
    async fn list_permission_codes_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionCode>>;

    /// Lists users currently holding the role.
    async fn list_users_holding_role(&self, role_id: RoleId) -> AppResult<Vec<UserId>>;
}

/// User record returned by repository queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Stable user identifier.
    pub id: UserId,
    /// Canonical email address, unique across the system.
    pub email: String,
    /// First display name.
    pub first_name: String,
    /// Last display name.
    pub last_name: String,
    /// Creation timestamp in RFC3339.
    pub created_at: String,
    /// Last update timestamp in RFC3339.
    pub updated_at: String,
}

/// Validated input for user creation.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique email address.
    pub email: EmailAddress,
    /// First display name.
    pub first_name: DisplayName,
    /// Last display name.
    pub last_name: DisplayName,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a user record. Duplicate email surfaces as `Conflict`.
    async fn create(&self, user: NewUser) -> AppResult<UserRecord>;

    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Lists all user records ordered by email.
    async fn list(&self) -> AppResult<Vec<UserRecord>>;

    /// Deletes a user record, cascading its role assignments. Unknown id
    /// surfaces as `NotFound`.
    async fn delete(&self, user_id: UserId) -> AppResult<()>;
}

/// Role record with its effective grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: RoleName,
    /// Permission codes granted to the role.
    pub permissions: Vec<PermissionCode>,
}

/// Permission record identified by its stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRecord {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Unique `resource:action` code. Immutable once created.
    pub code: PermissionCode,
    /// Optional human-readable description. The only editable field.
    pub description: Option<String>,
}

/// Repository port for role and permission administration.
#[async_trait]
pub trait AccessAdminRepository: Send + Sync {
    /// Creates a role. Duplicate name surfaces as `Conflict`.
    async fn create_role(&self, name: RoleName) -> AppResult<RoleRecord>;

    /// Lists all roles with their grants, ordered by name.
    async fn list_roles(&self) -> AppResult<Vec<RoleRecord>>;

    /// Finds a role by its identifier.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleRecord>>;

    /// Deletes a role, cascading its grants and assignments. Unknown id
    /// surfaces as `NotFound`.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Creates a permission. Duplicate code surfaces as `Conflict`.
    async fn create_permission(
        &self,
        code: PermissionCode,
        description: Option<String>,
    ) -> AppResult<PermissionRecord>;

    /// Lists all permissions ordered by code.
    async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>>;

    /// Updates a permission's description. Unknown id surfaces as
    /// `NotFound`.
    async fn update_permission_description(
        &self,
        permission_id: PermissionId,
        description: Option<String>,
    ) -> AppResult<PermissionRecord>;
}

/// Canonical audit event payload emitted by application use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Subject that performed the action.
    pub subject: String,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Resource kind targeted by the action.
    pub resource_type: String,
    /// Stable resource identifier.
    pub resource_id: String,
    /// Optional human-readable detail payload.
    pub detail: Option<String>,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
