//! Application services and ports.

#![forbid(unsafe_code)]

mod access_admin_service;
mod authorization_engine;
mod identity_admin_service;
mod ports;

pub use access_admin_service::AccessAdminService;
pub use authorization_engine::AuthorizationEngine;
pub use identity_admin_service::IdentityAdminService;
pub use ports::{
    AccessAdminRepository, AuditEvent, AuditRepository, AuthorizationStore, EdgeMutation, NewUser,
    PermissionRecord, RoleRecord, UserRecord, UserRepository,
};
