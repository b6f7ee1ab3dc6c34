//! Versioned schema migrations compiled into the binary.
//! Each pending migration runs in its own transaction and is recorded in `"__SchemaMigrations"`.

use crate::error::HostError;
use crate::store::tables;
use sqlx::PgPool;
use std::collections::HashSet;

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_identity_schema",
        statements: &[
            r#"
            CREATE TABLE "Roles" (
                id VARCHAR(50) PRIMARY KEY,
                name VARCHAR(256),
                normalized_name VARCHAR(256),
                concurrency_stamp TEXT
            )
            "#,
            r#"CREATE UNIQUE INDEX "RoleNameIndex" ON "Roles" (normalized_name) WHERE normalized_name IS NOT NULL"#,
            r#"
            CREATE TABLE "Users" (
                id VARCHAR(50) PRIMARY KEY,
                user_name VARCHAR(256),
                normalized_user_name VARCHAR(256),
                email VARCHAR(256),
                normalized_email VARCHAR(256),
                email_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
                password_hash TEXT,
                security_stamp TEXT,
                concurrency_stamp TEXT,
                phone_number TEXT,
                phone_number_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
                two_factor_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                lockout_end TIMESTAMPTZ,
                lockout_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                access_failed_count INTEGER NOT NULL DEFAULT 0,
                full_name VARCHAR(50) NOT NULL,
                dob DATE NOT NULL
            )
            "#,
            r#"CREATE UNIQUE INDEX "UserNameIndex" ON "Users" (normalized_user_name) WHERE normalized_user_name IS NOT NULL"#,
            r#"CREATE INDEX "EmailIndex" ON "Users" (normalized_email)"#,
            r#"
            CREATE TABLE "RoleClaims" (
                id SERIAL PRIMARY KEY,
                role_id VARCHAR(50) NOT NULL REFERENCES "Roles" (id) ON DELETE CASCADE,
                claim_type TEXT,
                claim_value TEXT
            )
            "#,
            r#"
            CREATE TABLE "UserClaims" (
                id SERIAL PRIMARY KEY,
                user_id VARCHAR(50) NOT NULL REFERENCES "Users" (id) ON DELETE CASCADE,
                claim_type TEXT,
                claim_value TEXT
            )
            "#,
            r#"
            CREATE TABLE "UserLogins" (
                login_provider VARCHAR(128) NOT NULL,
                provider_key VARCHAR(128) NOT NULL,
                provider_display_name TEXT,
                user_id VARCHAR(50) NOT NULL REFERENCES "Users" (id) ON DELETE CASCADE,
                PRIMARY KEY (login_provider, provider_key)
            )
            "#,
            r#"
            CREATE TABLE "UserTokens" (
                user_id VARCHAR(50) NOT NULL REFERENCES "Users" (id) ON DELETE CASCADE,
                login_provider VARCHAR(128) NOT NULL,
                name VARCHAR(128) NOT NULL,
                value TEXT,
                PRIMARY KEY (user_id, login_provider, name)
            )
            "#,
            r#"
            CREATE TABLE "UserRoles" (
                user_id VARCHAR(50) NOT NULL REFERENCES "Users" (id) ON DELETE CASCADE,
                role_id VARCHAR(50) NOT NULL REFERENCES "Roles" (id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, role_id)
            )
            "#,
        ],
    },
    Migration {
        version: 2,
        name: "create_catalog_schema",
        statements: &[
            r#"
            CREATE TABLE "Courses" (
                id SERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                topic TEXT,
                release_date DATE NOT NULL,
                author TEXT
            )
            "#,
            r#"
            CREATE TABLE "Lessons" (
                id SERIAL PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                image_path VARCHAR(200),
                introduction TEXT NOT NULL,
                content TEXT,
                date_created DATE NOT NULL,
                course_id INTEGER NOT NULL REFERENCES "Courses" (id) ON DELETE CASCADE
            )
            "#,
            r#"CREATE INDEX "IX_Lessons_course_id" ON "Lessons" (course_id)"#,
        ],
    },
    Migration {
        version: 3,
        name: "index_user_tokens_by_value",
        statements: &[r#"CREATE INDEX "IX_UserTokens_provider_value" ON "UserTokens" (login_provider, value)"#],
    },
];

/// Apply every migration not yet recorded. Returns the versions applied by this call.
pub async fn apply_migrations(pool: &PgPool) -> Result<Vec<i64>, HostError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            version BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        tables::SCHEMA_MIGRATIONS
    ))
    .execute(pool)
    .await?;

    let applied: HashSet<i64> = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT version FROM {}",
        tables::SCHEMA_MIGRATIONS
    ))
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let mut newly_applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        tracing::info!(version = migration.version, name = migration.name, "applying migration");
        apply_one(pool, migration).await.map_err(|source| HostError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        })?;
        newly_applied.push(migration.version);
    }
    if newly_applied.is_empty() {
        tracing::debug!("schema is up to date");
    }
    Ok(newly_applied)
}

async fn apply_one(pool: &PgPool, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in migration.statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    sqlx::query(&format!(
        "INSERT INTO {} (version, name) VALUES ($1, $2)",
        tables::SCHEMA_MIGRATIONS
    ))
    .bind(migration.version)
    .bind(migration.name)
    .execute(&mut *tx)
    .await?;
    tx.commit().await
}
