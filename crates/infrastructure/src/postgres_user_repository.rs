use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use rolegate_application::{NewUser, UserRecord, UserRepository};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::UserId;

use crate::postgres_errors::map_query_error;

/// PostgreSQL-backed repository for user records.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = r#"
    id,
    email,
    first_name,
    last_name,
    to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    to_char(updated_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    first_name: String,
    last_name: String,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> AppResult<UserRecord> {
        let query = format!(
            r#"
            INSERT INTO users (email, first_name, last_name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(query.as_str())
            .bind(user.email.as_str())
            .bind(user.first_name.as_str())
            .bind(user.last_name.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| map_duplicate_email(error, user.email.as_str()))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(query.as_str())
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                map_query_error(format!("failed to load user '{user_id}'").as_str(), error)
            })?;

        Ok(row.map(UserRecord::from))
    }

    async fn list(&self) -> AppResult<Vec<UserRecord>> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY email
            "#
        );

        let rows = sqlx::query_as::<_, UserRow>(query.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| map_query_error("failed to list users", error))?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn delete(&self, user_id: UserId) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_query_error(format!("failed to delete user '{user_id}'").as_str(), error)
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }

        Ok(())
    }
}

fn map_duplicate_email(error: sqlx::Error, email: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("user with email '{email}' already exists"));
    }

    map_query_error("failed to create user", error)
}
