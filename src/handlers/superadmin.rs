//! Superadmin surface: bootstrap login plus full lifecycle management of
//! the admin registry.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::database::users::UserStore;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::{AdminEntry, AdminUpdate, NewAdmin};
use crate::runtime::TenantRuntime;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn credentials(&self) -> Result<(&str, &str), ApiError> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p)),
            _ => Err(ApiError::validation("Missing credentials")),
        }
    }
}

/// POST /api/superadmin/login. The superadmin is bootstrapped from the
/// environment, not stored in any database.
pub async fn login(
    State(runtime): State<Arc<TenantRuntime>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Value> {
    let (username, password) = body.credentials()?;

    let bootstrap = &runtime.config.bootstrap;
    let (env_user, env_pass) = match (&bootstrap.superadmin_user, &bootstrap.superadmin_pass) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            return Err(ApiError::ConfigurationError(
                "SuperAdmin not configured".to_string(),
            ))
        }
    };

    if username != env_user || password != env_pass {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::superadmin(username, runtime.config.security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &runtime.config.security.jwt_secret)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!("Superadmin logged in: {}", username);
    Ok(ApiResponse::success(json!({ "token": token })))
}

/// POST /api/superadmin/create-admin. Registers the admin and eagerly
/// provisions their tenant database so the first admin login finds it warm.
pub async fn create_admin(
    State(runtime): State<Arc<TenantRuntime>>,
    Json(body): Json<NewAdmin>,
) -> ApiResult<AdminEntry> {
    let registry = runtime.admin_registry().await?;
    let entry = registry.create(body).await?;

    runtime.tenant_pool(&entry.tenant_db).await?;

    Ok(ApiResponse::created(entry))
}

/// GET /api/superadmin/admins
pub async fn list_admins(State(runtime): State<Arc<TenantRuntime>>) -> ApiResult<Vec<AdminEntry>> {
    let registry = runtime.admin_registry().await?;
    Ok(ApiResponse::success(registry.list().await?))
}

/// GET /api/superadmin/admins/:id
pub async fn get_admin(
    State(runtime): State<Arc<TenantRuntime>>,
    Path(id): Path<Uuid>,
) -> ApiResult<AdminEntry> {
    let registry = runtime.admin_registry().await?;
    Ok(ApiResponse::success(registry.get(id).await?))
}

/// GET /api/superadmin/admins/:id/users lists the users inside that
/// admin's tenant database.
pub async fn get_admin_users(
    State(runtime): State<Arc<TenantRuntime>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let registry = runtime.admin_registry().await?;
    let entry = registry.get(id).await?;

    let pool = runtime.tenant_pool(&entry.tenant_db).await?;
    let users = UserStore::new(&pool).list().await?;

    Ok(ApiResponse::success(json!({
        "tenantDbName": entry.tenant_db,
        "users": users
    })))
}

/// PUT /api/superadmin/admins/:id
pub async fn update_admin(
    State(runtime): State<Arc<TenantRuntime>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdminUpdate>,
) -> ApiResult<AdminEntry> {
    let registry = runtime.admin_registry().await?;
    Ok(ApiResponse::success(registry.update(id, body).await?))
}

/// PATCH /api/superadmin/admins/:id/toggle-status. Already-issued tokens
/// stay valid until expiry; the flag only gates new logins.
pub async fn toggle_status(
    State(runtime): State<Arc<TenantRuntime>>,
    Path(id): Path<Uuid>,
) -> ApiResult<AdminEntry> {
    let registry = runtime.admin_registry().await?;
    let entry = registry.toggle_active(id).await?;
    tracing::info!(
        "Admin {} is now {}",
        entry.username,
        if entry.is_active { "active" } else { "inactive" }
    );
    Ok(ApiResponse::success(entry))
}

/// DELETE /api/superadmin/admins/:id. Removes the registry entry only;
/// the tenant database and its data stay behind.
pub async fn delete_admin(
    State(runtime): State<Arc<TenantRuntime>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let registry = runtime.admin_registry().await?;
    registry.delete(id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}
