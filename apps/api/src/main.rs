//! Rolegate API composition root.

#![forbid(unsafe_code)]

mod bootstrap;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Extension;
use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use rolegate_application::{
    AccessAdminRepository, AccessAdminService, AuditRepository, AuthorizationEngine,
    AuthorizationStore, IdentityAdminService, UserRepository,
};
use rolegate_core::AppError;
use rolegate_domain::{EmailAddress, PermissionCode};
use rolegate_infrastructure::{
    PostgresAccessAdminRepository, PostgresAuditRepository, PostgresAuthorizationStore,
    PostgresUserRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::middleware::RequiredPermission;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);
    let bootstrap_admin_email = env::var("BOOTSTRAP_ADMIN_EMAIL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(EmailAddress::new)
        .transpose()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let authorization_store: Arc<dyn AuthorizationStore> =
        Arc::new(PostgresAuthorizationStore::new(pool.clone()));
    let audit_repository: Arc<dyn AuditRepository> =
        Arc::new(PostgresAuditRepository::new(pool.clone()));
    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool.clone()));
    let access_admin_repository: Arc<dyn AccessAdminRepository> =
        Arc::new(PostgresAccessAdminRepository::new(pool.clone()));

    let authorization_engine =
        AuthorizationEngine::new(Arc::clone(&authorization_store), Arc::clone(&audit_repository));
    let identity_admin_service = IdentityAdminService::new(
        Arc::clone(&user_repository),
        Arc::clone(&audit_repository),
        authorization_engine.clone(),
    );
    let access_admin_service = AccessAdminService::new(
        Arc::clone(&access_admin_repository),
        Arc::clone(&audit_repository),
        authorization_engine.clone(),
    );

    if let Some(admin_email) = bootstrap_admin_email {
        bootstrap::seed_admin(
            &user_repository,
            &access_admin_repository,
            &authorization_store,
            admin_email,
        )
        .await?;
    }

    let users_manage = PermissionCode::new("users:manage")?;
    let rbac_manage = PermissionCode::new("rbac:manage")?;

    let app_state = AppState {
        identity_admin_service,
        access_admin_service,
        authorization_engine,
        rbac_manage: rbac_manage.clone(),
    };

    let user_routes = Router::new()
        .route(
            "/api/users",
            get(handlers::users::list_users_handler).post(handlers::users::create_user_handler),
        )
        .route(
            "/api/users/{user_id}",
            get(handlers::users::get_user_handler).delete(handlers::users::delete_user_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_permission,
        ))
        .layer(Extension(RequiredPermission::new(users_manage)));

    let access_routes = Router::new()
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/roles/{role_id}",
            get(handlers::roles::get_role_handler).delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/api/permissions",
            get(handlers::permissions::list_permissions_handler)
                .post(handlers::permissions::create_permission_handler),
        )
        .route(
            "/api/permissions/{permission_id}",
            put(handlers::permissions::update_permission_handler),
        )
        .route(
            "/api/authorization/user-roles",
            post(handlers::authorization::assign_role_handler)
                .delete(handlers::authorization::revoke_role_handler),
        )
        .route(
            "/api/authorization/role-permissions",
            post(handlers::authorization::grant_permission_handler)
                .delete(handlers::authorization::revoke_permission_handler),
        )
        .route(
            "/api/authorization/users/{user_id}/permissions",
            get(handlers::authorization::list_effective_permissions_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_permission,
        ))
        .layer(Extension(RequiredPermission::new(rbac_manage)));

    // The check endpoint enforces its own access rule in the handler:
    // callers may always query themselves.
    let protected_routes = Router::new()
        .merge(user_routes)
        .merge(access_routes)
        .route(
            "/api/authorization/check",
            get(handlers::authorization::check_authorization_handler),
        )
        .route_layer(from_fn(middleware::require_identity));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "rolegate-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
