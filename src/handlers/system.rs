use std::sync::Arc;

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};
use crate::runtime::TenantRuntime;

/// Service banner.
pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "leadstack-api",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "superadmin": "POST /api/superadmin/login",
            "admin": "POST /api/admin/login",
            "auth": "POST /api/auth/login"
        }
    }))
}

/// Liveness plus a master-database ping. Always 200; clients read the
/// `database` field to decide whether the store is reachable.
pub async fn health(State(runtime): State<Arc<TenantRuntime>>) -> ApiResult<Value> {
    let database = match runtime.databases.health_check().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            "down"
        }
    };

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "database": database
    })))
}
