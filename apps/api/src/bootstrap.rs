//! Idempotent startup seeding of the baseline administrator.

use std::sync::Arc;

use tracing::info;

use rolegate_application::{AccessAdminRepository, AuthorizationStore, NewUser, UserRepository};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::{
    DisplayName, EmailAddress, PermissionCode, PermissionId, RoleId, RoleName, UserId,
};

const ADMINISTRATOR_ROLE: &str = "administrator";

const BASELINE_PERMISSIONS: [(&str, &str); 2] = [
    ("users:manage", "administer user records"),
    ("rbac:manage", "administer roles, permissions and assignments"),
];

/// Seeds the baseline permissions, the administrator role, the admin
/// user and the assignment between them. Every step tolerates existing
/// records, so re-running at startup is safe.
pub async fn seed_admin(
    users: &Arc<dyn UserRepository>,
    access_admin: &Arc<dyn AccessAdminRepository>,
    store: &Arc<dyn AuthorizationStore>,
    email: EmailAddress,
) -> AppResult<()> {
    let role_id = ensure_role(access_admin).await?;

    for (code, description) in BASELINE_PERMISSIONS {
        let permission_id = ensure_permission(access_admin, code, description).await?;
        store.insert_role_grant(role_id, permission_id).await?;
    }

    let user_id = ensure_user(users, &email).await?;
    store.insert_user_role(user_id, role_id).await?;

    info!(admin = email.as_str(), "bootstrap administrator seeded");
    Ok(())
}

async fn ensure_role(access_admin: &Arc<dyn AccessAdminRepository>) -> AppResult<RoleId> {
    let name = RoleName::new(ADMINISTRATOR_ROLE)?;

    match access_admin.create_role(name.clone()).await {
        Ok(role) => Ok(role.id),
        Err(AppError::Conflict(_)) => access_admin
            .list_roles()
            .await?
            .into_iter()
            .find(|role| role.name == name)
            .map(|role| role.id)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "role '{ADMINISTRATOR_ROLE}' exists but could not be resolved"
                ))
            }),
        Err(error) => Err(error),
    }
}

async fn ensure_permission(
    access_admin: &Arc<dyn AccessAdminRepository>,
    code: &str,
    description: &str,
) -> AppResult<PermissionId> {
    let code = PermissionCode::new(code)?;

    match access_admin
        .create_permission(code.clone(), Some(description.to_owned()))
        .await
    {
        Ok(permission) => Ok(permission.id),
        Err(AppError::Conflict(_)) => access_admin
            .list_permissions()
            .await?
            .into_iter()
            .find(|permission| permission.code == code)
            .map(|permission| permission.id)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "permission '{code}' exists but could not be resolved"
                ))
            }),
        Err(error) => Err(error),
    }
}

async fn ensure_user(
    users: &Arc<dyn UserRepository>,
    email: &EmailAddress,
) -> AppResult<UserId> {
    let input = NewUser {
        email: email.clone(),
        first_name: DisplayName::new("System")?,
        last_name: DisplayName::new("Administrator")?,
    };

    match users.create(input).await {
        Ok(user) => Ok(user.id),
        Err(AppError::Conflict(_)) => users
            .list()
            .await?
            .into_iter()
            .find(|user| user.email == email.as_str())
            .map(|user| user.id)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "user '{}' exists but could not be resolved",
                    email.as_str()
                ))
            }),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rolegate_application::{
        AccessAdminRepository, AuthorizationStore, UserRepository,
    };
    use rolegate_domain::EmailAddress;
    use rolegate_infrastructure::InMemoryStores;

    use super::seed_admin;

    fn admin_email() -> EmailAddress {
        match EmailAddress::new("admin@example.com") {
            Ok(email) => email,
            Err(error) => panic!("invalid test email: {error}"),
        }
    }

    #[tokio::test]
    async fn seeding_twice_converges_on_one_admin() {
        let stores = InMemoryStores::new();
        let users: Arc<dyn UserRepository> = Arc::new(stores.user_repository());
        let access_admin: Arc<dyn AccessAdminRepository> =
            Arc::new(stores.access_admin_repository());
        let store: Arc<dyn AuthorizationStore> = Arc::new(stores.authorization_store());

        for _ in 0..2 {
            let seeded = seed_admin(&users, &access_admin, &store, admin_email()).await;
            assert!(seeded.is_ok());
        }

        let listed = users.list().await;
        assert!(listed.is_ok_and(|users| users.len() == 1));

        let roles = access_admin.list_roles().await;
        assert!(roles.is_ok_and(|roles| {
            roles.len() == 1 && roles[0].permissions.len() == 2
        }));
    }

    #[tokio::test]
    async fn seeded_admin_holds_both_baseline_permissions() {
        let stores = InMemoryStores::new();
        let users: Arc<dyn UserRepository> = Arc::new(stores.user_repository());
        let access_admin: Arc<dyn AccessAdminRepository> =
            Arc::new(stores.access_admin_repository());
        let store: Arc<dyn AuthorizationStore> = Arc::new(stores.authorization_store());

        let seeded = seed_admin(&users, &access_admin, &store, admin_email()).await;
        assert!(seeded.is_ok());

        let admin = match users.list().await.map(|mut users| users.pop()) {
            Ok(Some(user)) => user,
            Ok(None) => panic!("admin user missing after seeding"),
            Err(error) => panic!("user listing failed: {error}"),
        };

        let codes = store.list_permission_codes_for_user(admin.id).await;
        assert!(codes.is_ok_and(|codes| {
            codes.iter().map(|code| code.as_str()).collect::<Vec<_>>()
                == vec!["rbac:manage", "users:manage"]
        }));
    }
}
