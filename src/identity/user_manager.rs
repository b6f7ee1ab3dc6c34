use crate::error::AppError;
use crate::identity::{IdentityError, IdentityResult, PasswordHasher, PasswordPolicy, RoleManager};
use crate::model::user::{normalize, FULL_NAME_MAX_LENGTH};
use crate::model::User;
use crate::store::{count_rows, is_table_empty, tables};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, user_name, normalized_user_name, email, normalized_email, email_confirmed, \
     password_hash, security_stamp, concurrency_stamp, phone_number, phone_number_confirmed, \
     two_factor_enabled, lockout_end, lockout_enabled, access_failed_count, full_name, dob";

const ALLOWED_USER_NAME_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+";
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

pub const MAX_FAILED_ACCESS_ATTEMPTS: i32 = 5;

pub fn default_lockout_span() -> Duration {
    Duration::minutes(5)
}

#[derive(Clone)]
pub struct UserManager {
    pool: PgPool,
    roles: RoleManager,
    policy: PasswordPolicy,
}

impl UserManager {
    pub fn new(pool: PgPool, roles: RoleManager, policy: PasswordPolicy) -> Self {
        UserManager { pool, roles, policy }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    pub async fn has_any(&self) -> Result<bool, AppError> {
        Ok(!is_table_empty(&self.pool, tables::USERS).await?)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        Ok(count_rows(&self.pool, tables::USERS).await?)
    }

    /// Validate, hash the password and store the user.
    /// Policy and uniqueness violations come back as a failed result; only store errors are `Err`.
    pub async fn create(&self, mut user: User, password: &str) -> Result<IdentityResult, AppError> {
        let mut errors = validate_user(&user);
        errors.extend(self.policy.validate(password));
        if errors.is_empty() && self.find_by_name(user.user_name()).await?.is_some() {
            errors.push(duplicate_user_name(user.user_name()));
        }
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }

        user.credential.password_hash = Some(PasswordHasher::hash(password).await?);
        let c = &user.credential;
        let result = sqlx::query(&format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
            tables::USERS,
            USER_COLUMNS
        ))
        .bind(&c.id)
        .bind(&c.user_name)
        .bind(&c.normalized_user_name)
        .bind(&c.email)
        .bind(&c.normalized_email)
        .bind(c.email_confirmed)
        .bind(&c.password_hash)
        .bind(&c.security_stamp)
        .bind(&c.concurrency_stamp)
        .bind(&c.phone_number)
        .bind(c.phone_number_confirmed)
        .bind(c.two_factor_enabled)
        .bind(c.lockout_end)
        .bind(c.lockout_enabled)
        .bind(c.access_failed_count)
        .bind(&user.full_name)
        .bind(user.dob)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => {
                tracing::debug!(user_name = %c.user_name, "user created");
                Ok(IdentityResult::success())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(IdentityResult::failed(vec![duplicate_user_name(&c.user_name)]))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_name(&self, user_name: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM {} WHERE normalized_user_name = $1",
            USER_COLUMNS,
            tables::USERS
        ))
        .bind(normalize(user_name))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            USER_COLUMNS,
            tables::USERS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn add_to_role(&self, user: &User, role_name: &str) -> Result<IdentityResult, AppError> {
        let role = match self.roles.find_by_name(role_name).await? {
            Some(r) => r,
            None => {
                return Ok(IdentityResult::failed_with(
                    "RoleNotFound",
                    format!("Role {} does not exist.", role_name),
                ))
            }
        };
        let inserted = sqlx::query(&format!(
            "INSERT INTO {} (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            tables::USER_ROLES
        ))
        .bind(user.id())
        .bind(&role.id)
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Ok(IdentityResult::failed_with(
                "UserAlreadyInRole",
                format!("User already in role '{}'.", role.name),
            ));
        }
        Ok(IdentityResult::success())
    }

    pub async fn roles_of(&self, user: &User) -> Result<Vec<String>, AppError> {
        let names = sqlx::query_scalar::<_, String>(&format!(
            "SELECT r.name FROM {} ur JOIN {} r ON r.id = ur.role_id WHERE ur.user_id = $1 ORDER BY r.name",
            tables::USER_ROLES,
            tables::ROLES
        ))
        .bind(user.id())
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    pub async fn is_in_role(&self, user: &User, role_name: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} ur JOIN {} r ON r.id = ur.role_id WHERE ur.user_id = $1 AND r.normalized_name = $2)",
            tables::USER_ROLES,
            tables::ROLES
        ))
        .bind(user.id())
        .bind(normalize(role_name))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn check_password(&self, user: &User, password: &str) -> Result<bool, AppError> {
        match user.credential.password_hash.as_deref() {
            Some(hash) => PasswordHasher::verify(password, hash).await,
            None => Ok(false),
        }
    }

    /// Count a failed sign-in. Locks the account once the limit is reached and resets the counter.
    /// Returns the lockout end when this failure triggered a lockout.
    ///
    /// The counter is incremented in the store, under the row lock taken by the UPDATE, so
    /// concurrent failures are all counted.
    pub async fn access_failed(&self, user: &User, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, AppError> {
        let mut tx = self.pool.begin().await?;
        let (failed, lockout_enabled): (i32, bool) = sqlx::query_as(&format!(
            "UPDATE {} SET access_failed_count = access_failed_count + 1 WHERE id = $1 \
             RETURNING access_failed_count, lockout_enabled",
            tables::USERS
        ))
        .bind(user.id())
        .fetch_one(&mut *tx)
        .await?;
        if lockout_enabled && failed >= MAX_FAILED_ACCESS_ATTEMPTS {
            let end = now + default_lockout_span();
            sqlx::query(&format!(
                "UPDATE {} SET access_failed_count = 0, lockout_end = $2 WHERE id = $1",
                tables::USERS
            ))
            .bind(user.id())
            .bind(end)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            tracing::warn!(user_name = %user.user_name(), until = %end, "user locked out");
            return Ok(Some(end));
        }
        tx.commit().await?;
        Ok(None)
    }

    pub async fn reset_access_failed_count(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(&format!(
            "UPDATE {} SET access_failed_count = 0 WHERE id = $1",
            tables::USERS
        ))
        .bind(user.id())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn duplicate_user_name(user_name: &str) -> IdentityError {
    IdentityError::new(
        "DuplicateUserName",
        format!("Username '{}' is already taken.", user_name),
    )
}

fn validate_user(user: &User) -> Vec<IdentityError> {
    let mut errors = Vec::new();
    let name = user.user_name();
    if name.is_empty() || !name.chars().all(|c| ALLOWED_USER_NAME_CHARS.contains(c)) {
        errors.push(IdentityError::new(
            "InvalidUserName",
            format!("Username '{}' is invalid, can only contain letters or digits.", name),
        ));
    }
    if let Some(email) = user.credential.email.as_deref() {
        let valid = Regex::new(EMAIL_PATTERN)
            .map(|re| re.is_match(email))
            .unwrap_or(false);
        if !valid {
            errors.push(IdentityError::new("InvalidEmail", format!("Email '{}' is invalid.", email)));
        }
    }
    let full_name = user.full_name.trim();
    if full_name.is_empty() {
        errors.push(IdentityError::new("InvalidFullName", "Full name is required."));
    } else if user.full_name.chars().count() > FULL_NAME_MAX_LENGTH {
        errors.push(IdentityError::new(
            "InvalidFullName",
            format!("Full name must be at most {} characters.", FULL_NAME_MAX_LENGTH),
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::apply_migrations;
    use crate::model::{Credential, Role};
    use chrono::NaiveDate;

    fn member(user_name: &str) -> User {
        User::new(
            Credential::new(user_name).with_email(user_name),
            "Test Member",
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        )
    }

    #[test]
    fn user_validation_rules() {
        assert!(validate_user(&member("member@example.com")).is_empty());

        let bad_name = member("has space@example.com");
        assert_eq!(validate_user(&bad_name)[0].code, "InvalidUserName");

        let mut long_name = member("long@example.com");
        long_name.full_name = "x".repeat(FULL_NAME_MAX_LENGTH + 1);
        assert_eq!(validate_user(&long_name)[0].code, "InvalidFullName");

        let mut blank_name = member("blank@example.com");
        blank_name.full_name = "   ".into();
        assert_eq!(validate_user(&blank_name)[0].code, "InvalidFullName");

        let bad_email = User::new(
            Credential::new("someone").with_email("not-an-email"),
            "Someone",
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        );
        assert_eq!(validate_user(&bad_email)[0].code, "InvalidEmail");
    }

    #[sqlx::test(migrations = false)]
    async fn create_find_and_assign_roles(pool: PgPool) -> anyhow::Result<()> {
        apply_migrations(&pool).await?;
        let roles = RoleManager::new(pool.clone());
        let users = UserManager::new(pool, roles.clone(), PasswordPolicy::default());

        roles.create(Role::new("Member")).await?;
        let created = users.create(member("member@example.com"), "Passw0rd!").await?;
        assert!(created.succeeded, "{}", created);

        let dup = users.create(member("MEMBER@example.com"), "Passw0rd!").await?;
        assert!(dup.has_error("DuplicateUserName"));

        let weak = users.create(member("weak@example.com"), "weak").await?;
        assert!(!weak.succeeded);
        assert!(weak.has_error("PasswordTooShort"));
        assert_eq!(users.count().await?, 1);

        let user = users.find_by_name("member@example.com").await?.expect("user stored");
        assert!(users.check_password(&user, "Passw0rd!").await?);
        assert!(!users.check_password(&user, "wrong").await?);

        assert!(users.add_to_role(&user, "Member").await?.succeeded);
        assert!(users.add_to_role(&user, "Member").await?.has_error("UserAlreadyInRole"));
        assert!(users.add_to_role(&user, "Admin").await?.has_error("RoleNotFound"));
        assert!(users.is_in_role(&user, "member").await?);
        assert_eq!(users.roles_of(&user).await?, vec!["Member".to_string()]);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn repeated_failures_lock_the_account(pool: PgPool) -> anyhow::Result<()> {
        apply_migrations(&pool).await?;
        let users = UserManager::new(pool.clone(), RoleManager::new(pool), PasswordPolicy::default());
        users.create(member("lock@example.com"), "Passw0rd!").await?;
        let now = Utc::now();

        for _ in 0..MAX_FAILED_ACCESS_ATTEMPTS - 1 {
            let user = users.find_by_name("lock@example.com").await?.expect("user");
            assert!(users.access_failed(&user, now).await?.is_none());
        }
        let user = users.find_by_name("lock@example.com").await?.expect("user");
        assert_eq!(user.credential.access_failed_count, MAX_FAILED_ACCESS_ATTEMPTS - 1);
        let end = users.access_failed(&user, now).await?.expect("locked");

        let user = users.find_by_name("lock@example.com").await?.expect("user");
        assert_eq!(user.credential.access_failed_count, 0);
        assert!(user.credential.is_locked_out(now));
        assert!(end > now);
        Ok(())
    }
}
