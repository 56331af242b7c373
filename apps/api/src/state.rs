use rolegate_application::{AccessAdminService, AuthorizationEngine, IdentityAdminService};
use rolegate_domain::PermissionCode;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub identity_admin_service: IdentityAdminService,
    pub access_admin_service: AccessAdminService,
    pub authorization_engine: AuthorizationEngine,
    /// Permission required for authorization administration; the
    /// self-check handler consults it when the caller queries another
    /// user's permissions.
    pub rbac_manage: PermissionCode,
}
