//! Request and response payloads for the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rolegate_application::{PermissionRecord, RoleRecord, UserRecord};

/// Health probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for user creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// API representation of a user record.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserRecord> for UserResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.id.to_string(),
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// API representation of a role and its grants.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<RoleRecord> for RoleResponse {
    fn from(record: RoleRecord) -> Self {
        Self {
            role_id: record.id.to_string(),
            name: record.name.as_str().to_owned(),
            permissions: record
                .permissions
                .into_iter()
                .map(|code| code.as_str().to_owned())
                .collect(),
        }
    }
}

/// Incoming payload for permission creation.
#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub code: String,
    pub description: Option<String>,
}

/// Incoming payload for permission description updates.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionRequest {
    pub description: Option<String>,
}

/// API representation of a permission.
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub code: String,
    pub description: Option<String>,
}

impl From<PermissionRecord> for PermissionResponse {
    fn from(record: PermissionRecord) -> Self {
        Self {
            permission_id: record.id.to_string(),
            code: record.code.as_str().to_owned(),
            description: record.description,
        }
    }
}

/// Incoming payload identifying a user/role assignment edge.
#[derive(Debug, Deserialize)]
pub struct UserRoleRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

/// Incoming payload identifying a role/permission grant edge.
#[derive(Debug, Deserialize)]
pub struct RolePermissionRequest {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

/// Effective permission listing for one user.
#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub user_id: String,
    pub permissions: Vec<String>,
}

/// Query parameters for an authorization check.
#[derive(Debug, Deserialize)]
pub struct AuthorizationCheckQuery {
    pub user_id: Uuid,
    pub permission: String,
}

/// Outcome of an authorization check.
#[derive(Debug, Serialize)]
pub struct AuthorizationCheckResponse {
    pub user_id: String,
    pub permission: String,
    pub authorized: bool,
}
