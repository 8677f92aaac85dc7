//! Admin registry stored in the master database. Each admin owns exactly
//! one tenant database, named from the folded username, so usernames that
//! differ only in case map to the same tenant and must collide at signup.

pub mod model;

pub use model::{AdminEntry, AdminUpdate, CompanyProfile, NewAdmin};

use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::password;
use crate::database::manager::DatabaseError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Username already exists: {0}")]
    AlreadyExists(String),

    #[error("Admin not found")]
    NotFound,

    #[error("{0}")]
    InvalidUsername(String),

    #[error("{0}")]
    InvalidPassword(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const ADMIN_COLUMNS: &str = "id, username, email, password_hash, tenant_db, \
     selected_fields, company, is_active, created_at, updated_at";

/// Usernames become part of a database name, so the accepted alphabet is
/// restricted to characters that survive the tenant-name validator after
/// folding.
fn validate_username(username: &str) -> Result<(), RegistryError> {
    let len = username.chars().count();
    if !(2..=64).contains(&len) {
        return Err(RegistryError::InvalidUsername(
            "Username must be 2-64 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(RegistryError::InvalidUsername(
            "Username may contain only letters, digits and underscores".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), RegistryError> {
    if password.len() < 8 {
        return Err(RegistryError::InvalidPassword(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// Tenant database name derived from a username. Folding means `Alice` and
/// `alice` share a tenant, which is why registry uniqueness is case
/// insensitive.
pub fn tenant_db_name(username: &str) -> String {
    format!("tenant_{}", username.to_lowercase())
}

pub struct AdminRegistry {
    pool: PgPool,
}

impl AdminRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_admin: NewAdmin) -> Result<AdminEntry, RegistryError> {
        validate_username(&new_admin.username)?;
        validate_password(&new_admin.password)?;
        let email = new_admin.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(RegistryError::InvalidUsername(
                "Invalid email address".to_string(),
            ));
        }

        let password_hash = password::hash(&new_admin.password)
            .await
            .map_err(|e| RegistryError::Hash(e.to_string()))?;

        let sql = format!(
            r#"
            INSERT INTO admins (username, email, password_hash, tenant_db, selected_fields, company)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ADMIN_COLUMNS
        );

        let entry: AdminEntry = sqlx::query_as(&sql)
            .bind(&new_admin.username)
            .bind(email)
            .bind(&password_hash)
            .bind(tenant_db_name(&new_admin.username))
            .bind(Json(&new_admin.selected_fields))
            .bind(new_admin.company.as_ref().map(Json))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                // 23505 on the folded-username index: case-insensitive collision
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                    RegistryError::AlreadyExists(new_admin.username.clone())
                }
                _ => RegistryError::Sqlx(e),
            })?;

        info!("Registered admin: {}", entry.username);
        Ok(entry)
    }

    /// Verify credentials against the stored hash. Unknown usernames,
    /// wrong passwords and deactivated accounts are indistinguishable to
    /// the caller.
    pub async fn authenticate(
        &self,
        username: &str,
        plain_password: &str,
    ) -> Result<AdminEntry, RegistryError> {
        let entry = match self.find_by_username(username).await? {
            Some(entry) => entry,
            None => return Err(RegistryError::InvalidCredentials),
        };

        let verified = password::verify(plain_password, &entry.password_hash)
            .await
            .map_err(|e| RegistryError::Hash(e.to_string()))?;

        if !verified || !entry.is_active {
            return Err(RegistryError::InvalidCredentials);
        }
        Ok(entry)
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminEntry>, RegistryError> {
        let sql = format!(
            "SELECT {} FROM admins WHERE lower(username) = lower($1)",
            ADMIN_COLUMNS
        );
        let entry = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    pub async fn get(&self, id: Uuid) -> Result<AdminEntry, RegistryError> {
        let sql = format!("SELECT {} FROM admins WHERE id = $1", ADMIN_COLUMNS);
        let entry: Option<AdminEntry> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        entry.ok_or(RegistryError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<AdminEntry>, RegistryError> {
        let sql = format!(
            "SELECT {} FROM admins ORDER BY created_at DESC",
            ADMIN_COLUMNS
        );
        let entries = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(entries)
    }

    pub async fn update(&self, id: Uuid, update: AdminUpdate) -> Result<AdminEntry, RegistryError> {
        let password_hash = match &update.password {
            Some(plain) => {
                validate_password(plain)?;
                Some(
                    password::hash(plain)
                        .await
                        .map_err(|e| RegistryError::Hash(e.to_string()))?,
                )
            }
            None => None,
        };

        let sql = format!(
            r#"
            UPDATE admins
            SET email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                selected_fields = COALESCE($4, selected_fields),
                company = COALESCE($5, company),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            ADMIN_COLUMNS
        );

        let entry: Option<AdminEntry> = sqlx::query_as(&sql)
            .bind(id)
            .bind(update.email.as_deref().map(str::trim))
            .bind(password_hash)
            .bind(update.selected_fields.as_ref().map(Json))
            .bind(update.company.as_ref().map(Json))
            .fetch_optional(&self.pool)
            .await?;

        entry.ok_or(RegistryError::NotFound)
    }

    /// Flip the active flag. Tokens already issued stay valid until expiry;
    /// deactivation only blocks new logins.
    pub async fn toggle_active(&self, id: Uuid) -> Result<AdminEntry, RegistryError> {
        let sql = format!(
            r#"
            UPDATE admins
            SET is_active = NOT is_active, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            ADMIN_COLUMNS
        );
        let entry: Option<AdminEntry> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        entry.ok_or(RegistryError::NotFound)
    }

    /// Remove the registry row. The tenant database is left in place; its
    /// data outlives the account that created it.
    pub async fn delete(&self, id: Uuid) -> Result<(), RegistryError> {
        let deleted: Option<(Uuid,)> =
            sqlx::query_as("DELETE FROM admins WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        deleted.map(|_| ()).ok_or(RegistryError::NotFound)
    }
}
