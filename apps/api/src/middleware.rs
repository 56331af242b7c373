use axum::extract::{Extension, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use rolegate_application::AuthorizationEngine;
use rolegate_core::{AppError, AuthenticatedUser};
use rolegate_domain::{PermissionCode, UserId};
use tracing::warn;

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the subject id established by the upstream
/// authenticator.
pub const AUTHENTICATED_USER_HEADER: &str = "x-authenticated-user";

/// Permission a route group requires, attached as a route-layer
/// extension.
#[derive(Debug, Clone)]
pub struct RequiredPermission(PermissionCode);

impl RequiredPermission {
    /// Wraps the permission guarding a route group.
    #[must_use]
    pub fn new(permission: PermissionCode) -> Self {
        Self(permission)
    }

    /// Returns the guarded permission.
    #[must_use]
    pub fn permission(&self) -> &PermissionCode {
        &self.0
    }
}

/// Establishes the caller identity from the upstream authenticator's
/// header and makes it available to downstream layers and handlers.
pub async fn require_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Route guard: denies dispatch unless the caller holds the route
/// group's required permission. A store outage surfaces as 503 rather
/// than a deny, so callers can retry.
pub async fn require_permission(
    State(state): State<AppState>,
    Extension(required): Extension<RequiredPermission>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = request
        .extensions()
        .get::<AuthenticatedUser>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    authorize_dispatch(&state.authorization_engine, identity, &required).await?;
    Ok(next.run(request).await)
}

/// Decides whether the identified caller may reach the guarded route
/// group. Denials carry a generic message; a store outage propagates as
/// `Unavailable` instead of a deny.
async fn authorize_dispatch(
    engine: &AuthorizationEngine,
    identity: AuthenticatedUser,
    required: &RequiredPermission,
) -> Result<(), AppError> {
    let user_id = UserId::from_uuid(identity.subject());
    match engine.is_authorized(user_id, required.permission()).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            warn!(subject = %identity, permission = %required.permission(), "access denied");
            Err(AppError::Forbidden("access denied".to_owned()))
        }
        Err(error) => {
            warn!(
                subject = %identity,
                permission = %required.permission(),
                %error,
                "authorization check could not be completed"
            );
            Err(error)
        }
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let value = headers
        .get(AUTHENTICATED_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let subject = uuid::Uuid::parse_str(value).map_err(|_| {
        AppError::Unauthorized("invalid authenticated user header".to_owned())
    })?;

    Ok(AuthenticatedUser::new(subject))
}
