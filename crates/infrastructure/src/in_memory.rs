//! In-memory adapters for tests and local development.
//!
//! All adapters handed out by one [`InMemoryStores`] hub share a single
//! state behind a `tokio::sync::RwLock`, so referential behavior (unknown
//! ids, cascades) matches the PostgreSQL schema.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use rolegate_application::{AuditEvent, PermissionRecord, UserRecord};
use rolegate_domain::{PermissionId, RoleId, RoleName, UserId};

mod access_admin_repository;
mod audit_repository;
mod authorization_store;
mod user_repository;

pub use access_admin_repository::InMemoryAccessAdminRepository;
pub use audit_repository::InMemoryAuditRepository;
pub use authorization_store::InMemoryAuthorizationStore;
pub use user_repository::InMemoryUserRepository;

#[derive(Debug, Default)]
struct InMemoryState {
    users: HashMap<UserId, UserRecord>,
    roles: HashMap<RoleId, RoleName>,
    permissions: HashMap<PermissionId, PermissionRecord>,
    user_roles: HashSet<(UserId, RoleId)>,
    role_grants: HashSet<(RoleId, PermissionId)>,
    audit_log: Vec<AuditEvent>,
}

/// Hub handing out in-memory adapters over one shared state.
#[derive(Clone, Default)]
pub struct InMemoryStores {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStores {
    /// Creates an empty shared state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an authorization store over the shared state.
    #[must_use]
    pub fn authorization_store(&self) -> InMemoryAuthorizationStore {
        InMemoryAuthorizationStore {
            state: Arc::clone(&self.state),
        }
    }

    /// Returns a user repository over the shared state.
    #[must_use]
    pub fn user_repository(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            state: Arc::clone(&self.state),
        }
    }

    /// Returns a role/permission repository over the shared state.
    #[must_use]
    pub fn access_admin_repository(&self) -> InMemoryAccessAdminRepository {
        InMemoryAccessAdminRepository {
            state: Arc::clone(&self.state),
        }
    }

    /// Returns an audit repository over the shared state.
    #[must_use]
    pub fn audit_repository(&self) -> InMemoryAuditRepository {
        InMemoryAuditRepository {
            state: Arc::clone(&self.state),
        }
    }
}
