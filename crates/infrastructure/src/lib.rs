//! Persistence adapters for the authorization service.
//!
//! PostgreSQL adapters back the production deployment; the in-memory
//! adapters back tests and local development without a database.

mod in_memory;
mod postgres_access_admin_repository;
mod postgres_audit_repository;
mod postgres_authorization_store;
mod postgres_errors;
mod postgres_user_repository;

pub use in_memory::{
    InMemoryAccessAdminRepository, InMemoryAuditRepository, InMemoryAuthorizationStore,
    InMemoryStores, InMemoryUserRepository,
};
pub use postgres_access_admin_repository::PostgresAccessAdminRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_store::PostgresAuthorizationStore;
pub use postgres_user_repository::PostgresUserRepository;
