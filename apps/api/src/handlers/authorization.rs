use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use rolegate_core::{AppError, AuthenticatedUser};
use rolegate_domain::{PermissionCode, PermissionId, RoleId, UserId};

use crate::dto::{
    AuthorizationCheckQuery, AuthorizationCheckResponse, EffectivePermissionsResponse,
    RolePermissionRequest, UserRoleRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<UserRoleRequest>,
) -> ApiResult<StatusCode> {
    state
        .authorization_engine
        .assign_role_to_user(
            &actor,
            UserId::from_uuid(payload.user_id),
            RoleId::from_uuid(payload.role_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<UserRoleRequest>,
) -> ApiResult<StatusCode> {
    state
        .authorization_engine
        .revoke_role_from_user(
            &actor,
            UserId::from_uuid(payload.user_id),
            RoleId::from_uuid(payload.role_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<RolePermissionRequest>,
) -> ApiResult<StatusCode> {
    state
        .authorization_engine
        .grant_permission_to_role(
            &actor,
            RoleId::from_uuid(payload.role_id),
            PermissionId::from_uuid(payload.permission_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<RolePermissionRequest>,
) -> ApiResult<StatusCode> {
    state
        .authorization_engine
        .revoke_permission_from_role(
            &actor,
            RoleId::from_uuid(payload.role_id),
            PermissionId::from_uuid(payload.permission_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_effective_permissions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let user_id = UserId::from_uuid(user_id);
    let permissions = state
        .authorization_engine
        .list_effective_permissions(user_id)
        .await?;

    Ok(Json(EffectivePermissionsResponse {
        user_id: user_id.to_string(),
        permissions: permissions
            .into_iter()
            .map(|code| code.as_str().to_owned())
            .collect(),
    }))
}

/// Answers an authorization check. Callers may always query themselves;
/// querying another user requires authorization administration rights.
pub async fn check_authorization_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Query(query): Query<AuthorizationCheckQuery>,
) -> ApiResult<Json<AuthorizationCheckResponse>> {
    let queried_user = UserId::from_uuid(query.user_id);
    let caller_id = UserId::from_uuid(caller.subject());

    if queried_user != caller_id {
        let can_manage = state
            .authorization_engine
            .is_authorized(caller_id, &state.rbac_manage)
            .await?;
        if !can_manage {
            return Err(AppError::Forbidden("access denied".to_owned()).into());
        }
    }

    let permission = PermissionCode::new(query.permission)?;
    let authorized = state
        .authorization_engine
        .is_authorized(queried_user, &permission)
        .await?;

    Ok(Json(AuthorizationCheckResponse {
        user_id: queried_user.to_string(),
        permission: permission.as_str().to_owned(),
        authorized,
    }))
}
