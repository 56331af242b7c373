//! Role and permission types enforced by the authorization engine.

use std::str::FromStr;

use rolegate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a role record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Maximum length of a role name.
pub const ROLE_NAME_MAX_LENGTH: usize = 64;

/// Validated role name, unique across the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleName(String);

impl RoleName {
    /// Creates a validated role name. Trimmed, non-empty, at most
    /// [`ROLE_NAME_MAX_LENGTH`] characters.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty".to_owned(),
            ));
        }

        if trimmed.chars().count() > ROLE_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "role name must not exceed {ROLE_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the validated name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

/// Maximum length of a permission code.
pub const PERMISSION_CODE_MAX_LENGTH: usize = 128;

/// Stable permission code in `resource:action` form.
///
/// Both segments are lowercase ASCII alphanumeric plus `_` and `-`. The
/// code identifies an atomic capability and never changes once referenced
/// by a role; only the permission's description is editable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(String);

impl PermissionCode {
    /// Creates a validated permission code.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.len() > PERMISSION_CODE_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "permission code must not exceed {PERMISSION_CODE_MAX_LENGTH} characters"
            )));
        }

        let Some((resource, action)) = trimmed.split_once(':') else {
            return Err(AppError::Validation(format!(
                "permission code '{trimmed}' must have the form 'resource:action'"
            )));
        };

        if !is_valid_segment(resource) || !is_valid_segment(action) {
            return Err(AppError::Validation(format!(
                "permission code '{trimmed}' segments must be non-empty lowercase \
                 alphanumerics, '_' or '-'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the stable storage value for this code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the resource segment of the code.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    /// Returns the action segment of the code.
    #[must_use]
    pub fn action(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_' || byte == b'-')
}

impl FromStr for PermissionCode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0
    }
}

impl std::fmt::Display for PermissionCode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a user record is created.
    IdentityUserCreated,
    /// Emitted when a user record is deleted.
    IdentityUserDeleted,
    /// Emitted when a role is created.
    AccessRoleCreated,
    /// Emitted when a role is deleted.
    AccessRoleDeleted,
    /// Emitted when a permission is created.
    AccessPermissionCreated,
    /// Emitted when a permission description is updated.
    AccessPermissionUpdated,
    /// Emitted when a role is assigned to a user.
    AccessRoleAssigned,
    /// Emitted when a role is revoked from a user.
    AccessRoleRevoked,
    /// Emitted when a permission is granted to a role.
    AccessPermissionGranted,
    /// Emitted when a permission is revoked from a role.
    AccessPermissionRevoked,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityUserCreated => "identity.user.created",
            Self::IdentityUserDeleted => "identity.user.deleted",
            Self::AccessRoleCreated => "access.role.created",
            Self::AccessRoleDeleted => "access.role.deleted",
            Self::AccessPermissionCreated => "access.permission.created",
            Self::AccessPermissionUpdated => "access.permission.updated",
            Self::AccessRoleAssigned => "access.role.assigned",
            Self::AccessRoleRevoked => "access.role.revoked",
            Self::AccessPermissionGranted => "access.permission.granted",
            Self::AccessPermissionRevoked => "access.permission.revoked",
        }
    }
}
