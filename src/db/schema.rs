use anyhow::Result;
use sqlx::PgPool;

/// Create tables and indexes if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (label, sql) in [
        ("users table", CREATE_USERS_TABLE),
        ("users email index", CREATE_USERS_EMAIL_INDEX),
        ("users username index", CREATE_USERS_USERNAME_INDEX),
        ("medications table", CREATE_MEDICATIONS_TABLE),
        ("medications user index", CREATE_MEDICATIONS_USER_INDEX),
        ("audit_logs table", CREATE_AUDIT_LOGS_TABLE),
    ] {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", label, e))?;
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(32) NOT NULL,
    email VARCHAR(255) NOT NULL,
    password_hash TEXT NOT NULL,
    password_changed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
)
"#;

// Uniqueness only among live rows so a soft-deleted account frees its email
const CREATE_USERS_EMAIL_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS users_email_uq
    ON users (lower(email)) WHERE deleted_at IS NULL
"#;

const CREATE_USERS_USERNAME_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS users_username_uq
    ON users (username) WHERE deleted_at IS NULL
"#;

const CREATE_MEDICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS medications (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users (id),
    kind SMALLINT NOT NULL CHECK (kind BETWEEN 1 AND 3),
    name VARCHAR(255) NOT NULL,
    dose VARCHAR(255) NOT NULL,
    schedule_type TEXT NOT NULL
        CHECK (schedule_type IN ('hourly', 'daily', 'weekly', 'monthly')),
    description TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
)
"#;

const CREATE_MEDICATIONS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS medications_user_idx
    ON medications (user_id) WHERE deleted_at IS NULL
"#;

const CREATE_AUDIT_LOGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS audit_logs (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT,
    action VARCHAR(64) NOT NULL,
    detail TEXT NOT NULL DEFAULT '',
    ip VARCHAR(64) NOT NULL DEFAULT '',
    user_agent TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL
)
"#;
