use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use rolegate_application::{AccessAdminRepository, PermissionRecord, RoleRecord};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::{PermissionCode, PermissionId, RoleId, RoleName};

use crate::postgres_errors::map_query_error;

/// PostgreSQL-backed repository for role and permission administration.
#[derive(Clone)]
pub struct PostgresAccessAdminRepository {
    pool: PgPool,
}

impl PostgresAccessAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: uuid::Uuid,
    role_name: String,
    permission_code: Option<String>,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    code: String,
    description: Option<String>,
}

impl TryFrom<PermissionRow> for PermissionRecord {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let code = PermissionCode::from_str(row.code.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored permission code '{}': {error}",
                row.code
            ))
        })?;

        Ok(Self {
            id: PermissionId::from_uuid(row.id),
            code,
            description: row.description,
        })
    }
}

const ROLE_QUERY: &str = r#"
    SELECT
        roles.id AS role_id,
        roles.name AS role_name,
        permissions.code AS permission_code
    FROM rbac_roles AS roles
    LEFT JOIN rbac_role_grants AS grants
        ON grants.role_id = roles.id
    LEFT JOIN rbac_permissions AS permissions
        ON permissions.id = grants.permission_id
"#;

#[async_trait]
impl AccessAdminRepository for PostgresAccessAdminRepository {
    async fn create_role(&self, name: RoleName) -> AppResult<RoleRecord> {
        let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO rbac_roles (name)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_duplicate_role(error, name.as_str()))?;

        Ok(RoleRecord {
            id: RoleId::from_uuid(role_id),
            name,
            permissions: Vec::new(),
        })
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleRecord>> {
        let query = format!("{ROLE_QUERY} ORDER BY roles.name, permissions.code");
        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| map_query_error("failed to list roles", error))?;

        let mut roles = aggregate_roles(rows)?;
        roles.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(roles)
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleRecord>> {
        let query = format!("{ROLE_QUERY} WHERE roles.id = $1 ORDER BY permissions.code");
        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .bind(role_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                map_query_error(format!("failed to load role '{role_id}'").as_str(), error)
            })?;

        Ok(aggregate_roles(rows)?.into_iter().next())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM rbac_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(format!("failed to delete role '{role_id}'").as_str(), error)
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        Ok(())
    }

    async fn create_permission(
        &self,
        code: PermissionCode,
        description: Option<String>,
    ) -> AppResult<PermissionRecord> {
        let permission_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO rbac_permissions (code, description)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(code.as_str())
        .bind(description.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_duplicate_permission(error, code.as_str()))?;

        Ok(PermissionRecord {
            id: PermissionId::from_uuid(permission_id),
            code,
            description,
        })
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, code, description
            FROM rbac_permissions
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error("failed to list permissions", error))?;

        rows.into_iter().map(PermissionRecord::try_from).collect()
    }

    async fn update_permission_description(
        &self,
        permission_id: PermissionId,
        description: Option<String>,
    ) -> AppResult<PermissionRecord> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            UPDATE rbac_permissions
            SET description = $2
            WHERE id = $1
            RETURNING id, code, description
            "#,
        )
        .bind(permission_id.as_uuid())
        .bind(description.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(
                format!("failed to update permission '{permission_id}'").as_str(),
                error,
            )
        })?
        .ok_or_else(|| {
            AppError::NotFound(format!("permission '{permission_id}' was not found"))
        })?;

        row.try_into()
    }
}

fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<RoleRecord>> {
    let mut by_id: HashMap<uuid::Uuid, RoleRecord> = HashMap::new();
    let mut order: Vec<uuid::Uuid> = Vec::new();

    for row in rows {
        if !by_id.contains_key(&row.role_id) {
            let name = RoleName::new(row.role_name.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored role name '{}': {error}",
                    row.role_name
                ))
            })?;

            by_id.insert(
                row.role_id,
                RoleRecord {
                    id: RoleId::from_uuid(row.role_id),
                    name,
                    permissions: Vec::new(),
                },
            );
            order.push(row.role_id);
        }

        if let Some(code_value) = row.permission_code {
            let code = PermissionCode::from_str(code_value.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored permission code '{code_value}': {error}"
                ))
            })?;

            if let Some(role) = by_id.get_mut(&row.role_id) {
                role.permissions.push(code);
            }
        }
    }

    Ok(order.into_iter().filter_map(|id| by_id.remove(&id)).collect())
}

fn map_duplicate_role(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    map_query_error("failed to create role", error)
}

fn map_duplicate_permission(error: sqlx::Error, code: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("permission '{code}' already exists"));
    }

    map_query_error("failed to create permission", error)
}
