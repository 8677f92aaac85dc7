//! Per-tenant users store. The users table has a fixed shape created when
//! the tenant database is first provisioned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::error::ApiError;

pub const USER_ROLES: &[&str] = &["user", "manager", "admin"];

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

fn validate_role(role: &str) -> Result<(), ApiError> {
    if USER_ROLES.contains(&role) {
        return Ok(());
    }
    Err(ApiError::validation(format!(
        "Invalid role: {} (expected one of user, manager, admin)",
        role
    )))
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(())
}

pub struct UserStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<TenantUser, ApiError> {
        let name = new_user.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        validate_email(&new_user.email)?;
        let role = new_user.role.as_deref().unwrap_or("user");
        validate_role(role)?;

        let user: TenantUser = sqlx::query_as(
            r#"
            INSERT INTO users (name, email, role)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, role, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(new_user.email.trim())
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(map_unique_email)?;

        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<TenantUser>, ApiError> {
        let users: Vec<TenantUser> = sqlx::query_as(
            "SELECT id, name, email, role, created_at, updated_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await
        .map_err(DatabaseError::Sqlx)?;
        Ok(users)
    }

    pub async fn get(&self, id: Uuid) -> Result<TenantUser, ApiError> {
        let user: Option<TenantUser> = sqlx::query_as(
            "SELECT id, name, email, role, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(DatabaseError::Sqlx)?;

        user.ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn update(&self, id: Uuid, update: UserUpdate) -> Result<TenantUser, ApiError> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(role) = &update.role {
            validate_role(role)?;
        }

        let user: Option<TenantUser> = sqlx::query_as(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.email.as_deref().map(str::trim))
        .bind(update.role.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(map_unique_email)?;

        user.ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted: Option<(Uuid,)> = sqlx::query_as("DELETE FROM users WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(DatabaseError::Sqlx)?;

        deleted
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("User not found"))
    }
}

/// 23505 unique_violation on the email constraint becomes a 409.
fn map_unique_email(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return ApiError::conflict("Email already exists");
        }
    }
    DatabaseError::Sqlx(err).into()
}
