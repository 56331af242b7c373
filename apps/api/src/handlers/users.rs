use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use rolegate_application::NewUser;
use rolegate_core::AuthenticatedUser;
use rolegate_domain::{DisplayName, EmailAddress, UserId};

use crate::dto::{CreateUserRequest, UserResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let input = NewUser {
        email: EmailAddress::new(payload.email)?,
        first_name: DisplayName::new(payload.first_name)?,
        last_name: DisplayName::new(payload.last_name)?,
    };

    let user = state
        .identity_admin_service
        .create_user(&actor, input)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn list_users_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state
        .identity_admin_service
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .identity_admin_service
        .get_user(UserId::from_uuid(user_id))
        .await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .identity_admin_service
        .delete_user(&actor, UserId::from_uuid(user_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
