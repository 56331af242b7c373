//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod identity;

pub use access::{AuditAction, PermissionCode, PermissionId, RoleId, RoleName};
pub use identity::{DisplayName, EmailAddress, UserId};
