//! Password sign-in with lockout, and bearer access tokens persisted in `"UserTokens"`.

use crate::error::AppError;
use crate::identity::UserManager;
use crate::model::User;
use crate::store::tables;
use chrono::Utc;
use sqlx::PgPool;

pub const TOKEN_PROVIDER: &str = "CourseCatalog";
pub const ACCESS_TOKEN_NAME: &str = "AccessToken";

#[derive(Debug)]
pub enum SignInResult {
    Succeeded { user: User, token: String },
    Failed,
    LockedOut,
}

#[derive(Clone)]
pub struct SignInManager {
    pool: PgPool,
    users: UserManager,
}

impl SignInManager {
    pub fn new(pool: PgPool, users: UserManager) -> Self {
        SignInManager { pool, users }
    }

    pub async fn password_sign_in(
        &self,
        user_name: &str,
        password: &str,
        lockout_on_failure: bool,
    ) -> Result<SignInResult, AppError> {
        let Some(user) = self.users.find_by_name(user_name).await? else {
            return Ok(SignInResult::Failed);
        };
        let now = Utc::now();
        if user.credential.is_locked_out(now) {
            tracing::info!(user_name = %user.user_name(), "sign-in rejected: locked out");
            return Ok(SignInResult::LockedOut);
        }
        if !self.users.check_password(&user, password).await? {
            if lockout_on_failure && self.users.access_failed(&user, now).await?.is_some() {
                return Ok(SignInResult::LockedOut);
            }
            return Ok(SignInResult::Failed);
        }
        if user.credential.access_failed_count > 0 {
            self.users.reset_access_failed_count(&user).await?;
        }
        let token = self.issue_token(&user).await?;
        tracing::info!(user_name = %user.user_name(), "user signed in");
        Ok(SignInResult::Succeeded { user, token })
    }

    /// Resolve a bearer token to its user. Locked-out users are not authenticated.
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>, AppError> {
        let user_id: Option<String> = sqlx::query_scalar(&format!(
            "SELECT user_id FROM {} WHERE login_provider = $1 AND name = $2 AND value = $3",
            tables::USER_TOKENS
        ))
        .bind(TOKEN_PROVIDER)
        .bind(ACCESS_TOKEN_NAME)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let user = self.users.find_by_id(&user_id).await?;
        Ok(user.filter(|u| !u.credential.is_locked_out(Utc::now())))
    }

    pub async fn sign_out(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND login_provider = $2 AND name = $3",
            tables::USER_TOKENS
        ))
        .bind(user.id())
        .bind(TOKEN_PROVIDER)
        .bind(ACCESS_TOKEN_NAME)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// One access token per user; signing in again replaces the previous one.
    async fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let token = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (user_id, login_provider, name, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, login_provider, name)
            DO UPDATE SET value = EXCLUDED.value
            "#,
            tables::USER_TOKENS
        ))
        .bind(user.id())
        .bind(TOKEN_PROVIDER)
        .bind(ACCESS_TOKEN_NAME)
        .bind(&token)
        .execute(&self.pool)
        .await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{PasswordPolicy, RoleManager};
    use crate::migration::apply_migrations;
    use crate::model::Credential;
    use chrono::NaiveDate;

    async fn setup(pool: PgPool) -> anyhow::Result<SignInManager> {
        apply_migrations(&pool).await?;
        let users = UserManager::new(pool.clone(), RoleManager::new(pool.clone()), PasswordPolicy::default());
        let user = User::new(
            Credential::new("reader@example.com").with_email("reader@example.com"),
            "Reader",
            NaiveDate::from_ymd_opt(1995, 3, 3).unwrap(),
        );
        assert!(users.create(user, "Reader#2024").await?.succeeded);
        Ok(SignInManager::new(pool, users))
    }

    #[sqlx::test(migrations = false)]
    async fn sign_in_issues_resolvable_token(pool: PgPool) -> anyhow::Result<()> {
        let sign_in = setup(pool).await?;
        let SignInResult::Succeeded { user, token } =
            sign_in.password_sign_in("READER@example.com", "Reader#2024", true).await?
        else {
            panic!("expected successful sign-in");
        };
        let resolved = sign_in.authenticate(&token).await?.expect("token resolves");
        assert_eq!(resolved.id(), user.id());

        sign_in.sign_out(&user).await?;
        assert!(sign_in.authenticate(&token).await?.is_none());
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn unknown_user_and_wrong_password_fail(pool: PgPool) -> anyhow::Result<()> {
        let sign_in = setup(pool).await?;
        assert!(matches!(
            sign_in.password_sign_in("nobody@example.com", "Reader#2024", true).await?,
            SignInResult::Failed
        ));
        assert!(matches!(
            sign_in.password_sign_in("reader@example.com", "nope", true).await?,
            SignInResult::Failed
        ));
        assert!(sign_in.authenticate("not-a-token").await?.is_none());
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn concurrent_failures_still_lock_out(pool: PgPool) -> anyhow::Result<()> {
        let sign_in = setup(pool).await?;
        let attempts: Vec<_> = (0..20)
            .map(|_| {
                let sign_in = sign_in.clone();
                tokio::spawn(async move { sign_in.password_sign_in("reader@example.com", "nope", true).await })
            })
            .collect();
        let mut locked_out = 0;
        for attempt in attempts {
            if matches!(attempt.await??, SignInResult::LockedOut) {
                locked_out += 1;
            }
        }
        assert!(locked_out > 0);

        let user = sign_in.users.find_by_name("reader@example.com").await?.expect("user");
        assert!(user.credential.is_locked_out(Utc::now()));
        assert!(matches!(
            sign_in.password_sign_in("reader@example.com", "Reader#2024", true).await?,
            SignInResult::LockedOut
        ));
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn fifth_failure_locks_out(pool: PgPool) -> anyhow::Result<()> {
        let sign_in = setup(pool).await?;
        for _ in 0..4 {
            assert!(matches!(
                sign_in.password_sign_in("reader@example.com", "nope", true).await?,
                SignInResult::Failed
            ));
        }
        assert!(matches!(
            sign_in.password_sign_in("reader@example.com", "nope", true).await?,
            SignInResult::LockedOut
        ));
        assert!(matches!(
            sign_in.password_sign_in("reader@example.com", "Reader#2024", true).await?,
            SignInResult::LockedOut
        ));
        Ok(())
    }
}
