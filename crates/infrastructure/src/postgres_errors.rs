//! Shared sqlx-to-application error mapping.

use rolegate_core::AppError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Maps a sqlx error into the application taxonomy.
///
/// Unique violations become `Conflict` and foreign-key violations become
/// `NotFound`, so adapters can lean on the schema's constraints instead of
/// racy pre-checks. Connectivity failures become `Unavailable`, which
/// decision queries must surface instead of a deny. Everything else is an
/// `Internal` fault.
pub(crate) fn map_query_error(context: &str, error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return AppError::Conflict(format!("{context}: value already exists"));
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return AppError::NotFound(format!(
                    "{context}: referenced record was not found"
                ));
            }
            _ => return AppError::Internal(format!("{context}: {error}")),
        }
    }

    if is_connectivity_error(&error) {
        return AppError::Unavailable(format!("{context}: {error}"));
    }

    AppError::Internal(format!("{context}: {error}"))
}

fn is_connectivity_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
    )
}

#[cfg(test)]
mod tests {
    use rolegate_core::AppError;

    use super::map_query_error;

    #[test]
    fn pool_exhaustion_maps_to_unavailable() {
        let mapped = map_query_error("failed to load permissions", sqlx::Error::PoolTimedOut);
        assert!(matches!(mapped, AppError::Unavailable(_)));
    }

    #[test]
    fn closed_pool_maps_to_unavailable() {
        let mapped = map_query_error("failed to load permissions", sqlx::Error::PoolClosed);
        assert!(matches!(mapped, AppError::Unavailable(_)));
    }

    #[test]
    fn io_failure_maps_to_unavailable() {
        let io_error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let mapped = map_query_error("failed to assign role", sqlx::Error::Io(io_error));
        assert!(matches!(mapped, AppError::Unavailable(_)));
    }

    #[test]
    fn decode_failure_maps_to_internal() {
        let mapped = map_query_error(
            "failed to decode permission",
            sqlx::Error::RowNotFound,
        );
        assert!(matches!(mapped, AppError::Internal(_)));
    }
}
