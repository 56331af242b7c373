use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use rolegate_application::{AuthorizationStore, EdgeMutation};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::{PermissionCode, PermissionId, RoleId, UserId};

use crate::postgres_errors::map_query_error;

/// PostgreSQL-backed store for the role/permission graph.
///
/// Edge inserts rely on `ON CONFLICT DO NOTHING` plus `rows_affected` to
/// report idempotent outcomes, and on the schema's foreign keys to reject
/// unknown ids, so no pre-check race exists. Edge deletes are plain
/// `DELETE`s; an absent edge reports `Unchanged`.
#[derive(Clone)]
pub struct PostgresAuthorizationStore {
    pool: PgPool,
}

impl PostgresAuthorizationStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionCodeRow {
    code: String,
}

fn edge_outcome(rows_affected: u64) -> EdgeMutation {
    if rows_affected > 0 {
        EdgeMutation::Changed
    } else {
        EdgeMutation::Unchanged
    }
}

#[async_trait]
impl AuthorizationStore for PostgresAuthorizationStore {
    async fn insert_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<EdgeMutation> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO rbac_user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(
                format!("failed to assign role '{role_id}' to user '{user_id}'").as_str(),
                error,
            )
        })?
        .rows_affected();

        Ok(edge_outcome(rows_affected))
    }

    async fn delete_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<EdgeMutation> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM rbac_user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(
                format!("failed to revoke role '{role_id}' from user '{user_id}'").as_str(),
                error,
            )
        })?
        .rows_affected();

        Ok(edge_outcome(rows_affected))
    }

    async fn insert_role_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<EdgeMutation> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO rbac_role_grants (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(
                format!("failed to grant permission '{permission_id}' to role '{role_id}'")
                    .as_str(),
                error,
            )
        })?
        .rows_affected();

        Ok(edge_outcome(rows_affected))
    }

    async fn delete_role_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<EdgeMutation> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM rbac_role_grants
            WHERE role_id = $1 AND permission_id = $2
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(
                format!("failed to revoke permission '{permission_id}' from role '{role_id}'")
                    .as_str(),
                error,
            )
        })?
        .rows_affected();

        Ok(edge_outcome(rows_affected))
    }

    async fn list_permission_codes_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionCode>> {
        let rows = sqlx::query_as::<_, PermissionCodeRow>(
            r#"
            SELECT DISTINCT permissions.code
            FROM rbac_user_roles AS user_roles
            INNER JOIN rbac_role_grants AS grants
                ON grants.role_id = user_roles.role_id
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = grants.permission_id
            WHERE user_roles.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(
                format!("failed to load permissions for user '{user_id}'").as_str(),
                error,
            )
        })?;

        rows.into_iter()
            .map(|row| {
                PermissionCode::from_str(row.code.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "invalid stored permission code '{}': {error}",
                        row.code
                    ))
                })
            })
            .collect()
    }

    async fn list_users_holding_role(&self, role_id: RoleId) -> AppResult<Vec<UserId>> {
        let rows = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT user_id
            FROM rbac_user_roles
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(
                format!("failed to list holders of role '{role_id}'").as_str(),
                error,
            )
        })?;

        Ok(rows.into_iter().map(UserId::from_uuid).collect())
    }
}
