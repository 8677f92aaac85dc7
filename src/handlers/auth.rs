//! Unified login. Clients that do not care which role they hold post here;
//! the handler resolves superadmin bootstrap credentials first, then falls
//! through to the admin registry.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims, ROLE_ADMIN, ROLE_SUPERADMIN};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::runtime::TenantRuntime;

use super::superadmin::LoginRequest;

/// POST /api/auth/login
pub async fn login(
    State(runtime): State<Arc<TenantRuntime>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Value> {
    let (username, password) = body.credentials()?;

    let bootstrap = &runtime.config.bootstrap;
    if let (Some(env_user), Some(env_pass)) =
        (&bootstrap.superadmin_user, &bootstrap.superadmin_pass)
    {
        if username == env_user && password == env_pass {
            let claims = Claims::superadmin(username, runtime.config.security.jwt_expiry_hours);
            let token = generate_jwt(&claims, &runtime.config.security.jwt_secret)
                .map_err(|e| ApiError::internal(e.to_string()))?;
            return Ok(ApiResponse::success(json!({
                "token": token,
                "role": ROLE_SUPERADMIN
            })));
        }
    }

    let registry = runtime.admin_registry().await?;
    let entry = registry.authenticate(username, password).await?;

    let claims = Claims::admin(&entry, runtime.config.security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &runtime.config.security.jwt_secret)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "role": ROLE_ADMIN,
        "tenantDbName": entry.tenant_db
    })))
}
