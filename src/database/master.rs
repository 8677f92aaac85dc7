//! Master database bootstrap. The master database holds the admin registry
//! and nothing tenant-specific.

use sqlx::PgPool;

use crate::database::manager::DatabaseError;

const ADMINS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS admins (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    tenant_db TEXT NOT NULL,
    selected_fields JSONB NOT NULL DEFAULT '[]'::jsonb,
    company JSONB,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Uniqueness is enforced on the folded username so `Alice` and `alice`
/// cannot coexist.
const ADMINS_USERNAME_INDEX_DDL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS admins_username_lower_idx
    ON admins (lower(username))
"#;

pub async fn ensure_master_tables(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query(ADMINS_TABLE_DDL).execute(pool).await?;
    sqlx::query(ADMINS_USERNAME_INDEX_DDL).execute(pool).await?;
    Ok(())
}
