use crate::error::AppError;
use crate::identity::IdentityResult;
use crate::model::user::normalize;
use crate::model::Role;
use crate::store::{is_table_empty, tables};
use sqlx::PgPool;

#[derive(Clone)]
pub struct RoleManager {
    pool: PgPool,
}

impl RoleManager {
    pub fn new(pool: PgPool) -> Self {
        RoleManager { pool }
    }

    pub async fn has_any(&self) -> Result<bool, AppError> {
        Ok(!is_table_empty(&self.pool, tables::ROLES).await?)
    }

    /// Store a role. A blank or already-used name is reported in the result.
    pub async fn create(&self, role: Role) -> Result<IdentityResult, AppError> {
        if role.name.trim().is_empty() {
            return Ok(IdentityResult::failed_with(
                "InvalidRoleName",
                "Role name cannot be empty.",
            ));
        }
        if self.find_by_name(&role.name).await?.is_some() {
            return Ok(IdentityResult::failed_with(
                "DuplicateRoleName",
                format!("Role name '{}' is already taken.", role.name),
            ));
        }
        let result = sqlx::query(&format!(
            "INSERT INTO {} (id, name, normalized_name, concurrency_stamp) VALUES ($1, $2, $3, $4)",
            tables::ROLES
        ))
        .bind(&role.id)
        .bind(&role.name)
        .bind(&role.normalized_name)
        .bind(&role.concurrency_stamp)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => {
                tracing::debug!(role = %role.name, "role created");
                Ok(IdentityResult::success())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(IdentityResult::failed_with(
                "DuplicateRoleName",
                format!("Role name '{}' is already taken.", role.name),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT id, name, normalized_name, concurrency_stamp FROM {} WHERE normalized_name = $1",
            tables::ROLES
        ))
        .bind(normalize(name))
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    pub async fn all(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT id, name, normalized_name, concurrency_stamp FROM {} ORDER BY name",
            tables::ROLES
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::apply_migrations;

    #[sqlx::test(migrations = false)]
    async fn create_and_reject_duplicates(pool: PgPool) -> anyhow::Result<()> {
        apply_migrations(&pool).await?;
        let roles = RoleManager::new(pool);
        assert!(!roles.has_any().await?);

        assert!(roles.create(Role::new("Admin")).await?.succeeded);
        let dup = roles.create(Role::new("ADMIN")).await?;
        assert!(!dup.succeeded);
        assert!(dup.has_error("DuplicateRoleName"));

        let blank = roles.create(Role::new("  ")).await?;
        assert!(blank.has_error("InvalidRoleName"));

        let found = roles.find_by_name("admin").await?.expect("role exists");
        assert_eq!(found.name, "Admin");
        assert_eq!(roles.all().await?.len(), 1);
        Ok(())
    }
}
