//! Database connection, bootstrap, and table names for every mapped entity.

use crate::error::{ConfigError, HostError};
use sqlx::postgres::PgPoolOptions;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Table names. Identity tables use the names the credential store expects.
pub mod tables {
    pub const ROLES: &str = "\"Roles\"";
    pub const USERS: &str = "\"Users\"";
    pub const ROLE_CLAIMS: &str = "\"RoleClaims\"";
    pub const USER_CLAIMS: &str = "\"UserClaims\"";
    pub const USER_LOGINS: &str = "\"UserLogins\"";
    pub const USER_TOKENS: &str = "\"UserTokens\"";
    pub const USER_ROLES: &str = "\"UserRoles\"";
    pub const COURSES: &str = "\"Courses\"";
    pub const LESSONS: &str = "\"Lessons\"";
    pub const SCHEMA_MIGRATIONS: &str = "\"__SchemaMigrations\"";
}

/// Open the application pool. Connection retry and timeouts are left to sqlx defaults.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// True when `table` (one of [`tables`]) has no rows.
pub async fn is_table_empty<'e, E>(executor: E, table: &str) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {})", table);
    tracing::debug!(sql = %sql, "query");
    let (exists,): (bool,) = sqlx::query_as(&sql).fetch_one(executor).await?;
    Ok(!exists)
}

pub async fn count_rows<'e, E>(executor: E, table: &str) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    tracing::debug!(sql = %sql, "query");
    let (n,): (i64,) = sqlx::query_as(&sql).fetch_one(executor).await?;
    Ok(n)
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), HostError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| invalid_url(e.to_string()))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn invalid_url(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: "DATABASE_URL",
        reason: reason.into(),
    }
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[scheme_end..]
        .find('/')
        .map(|i| i + scheme_end + 1)
        .ok_or_else(|| invalid_url("no database path"))?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim().to_string();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres{}", base, query), db_name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
