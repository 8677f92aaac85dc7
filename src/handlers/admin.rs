//! Admin surface. Every handler here is tenant-scoped: the tenant database
//! comes from the verified token, never from the request.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::database::leads::LeadStore;
use crate::database::users::{NewUser, TenantUser, UserStore, UserUpdate};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthAdmin};
use crate::registry::AdminEntry;
use crate::runtime::TenantRuntime;
use crate::schema::LeadSchema;

use super::superadmin::LoginRequest;

/// POST /api/admin/login
pub async fn login(
    State(runtime): State<Arc<TenantRuntime>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Value> {
    let (username, password) = body.credentials()?;

    let registry = runtime.admin_registry().await?;
    let entry = registry.authenticate(username, password).await?;

    let claims = Claims::admin(&entry, runtime.config.security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &runtime.config.security.jwt_secret)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!("Admin logged in: {}", entry.username);
    Ok(ApiResponse::success(json!({
        "token": token,
        "tenantDbName": entry.tenant_db,
        "selectedFields": entry.selected_fields.0,
        "company": entry.company.as_ref().map(|c| &c.0)
    })))
}

/// Registry entry and tenant pool for the authenticated admin. The pool is
/// resolved from the token's database claim.
async fn tenant_context(
    runtime: &TenantRuntime,
    auth: &AuthAdmin,
) -> Result<(AdminEntry, PgPool), ApiError> {
    let registry = runtime.admin_registry().await?;
    let entry = registry.get(auth.admin_id()?).await?;
    let pool = runtime.tenant_pool(auth.tenant_db()?).await?;
    Ok((entry, pool))
}

async fn lead_context(
    runtime: &TenantRuntime,
    auth: &AuthAdmin,
) -> Result<(PgPool, Arc<LeadSchema>), ApiError> {
    let (entry, pool) = tenant_context(runtime, auth).await?;
    let schema = runtime
        .lead_schema(&pool, auth.tenant_db()?, &entry.selected_fields.0)
        .await?;
    Ok((pool, schema))
}

// --- users ---

/// POST /api/admin/users
pub async fn create_user(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Json(body): Json<NewUser>,
) -> ApiResult<TenantUser> {
    let pool = runtime.tenant_pool(auth.tenant_db()?).await?;
    let user = UserStore::new(&pool).create(body).await?;
    Ok(ApiResponse::created(user))
}

/// GET /api/admin/users
pub async fn list_users(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
) -> ApiResult<Vec<TenantUser>> {
    let pool = runtime.tenant_pool(auth.tenant_db()?).await?;
    Ok(ApiResponse::success(UserStore::new(&pool).list().await?))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Path(id): Path<Uuid>,
) -> ApiResult<TenantUser> {
    let pool = runtime.tenant_pool(auth.tenant_db()?).await?;
    Ok(ApiResponse::success(UserStore::new(&pool).get(id).await?))
}

/// PUT /api/admin/users/:id
pub async fn update_user(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Path(id): Path<Uuid>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<TenantUser> {
    let pool = runtime.tenant_pool(auth.tenant_db()?).await?;
    Ok(ApiResponse::success(
        UserStore::new(&pool).update(id, body).await?,
    ))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = runtime.tenant_pool(auth.tenant_db()?).await?;
    UserStore::new(&pool).delete(id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}

// --- leads ---

/// POST /api/admin/leads. First use materializes the tenant's lead schema
/// from the admin's current field selection.
pub async fn create_lead(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Value> {
    let (pool, schema) = lead_context(&runtime, &auth).await?;
    let lead = LeadStore::new(&pool, &schema).create(body).await?;
    Ok(ApiResponse::created(lead))
}

/// GET /api/admin/leads
pub async fn list_leads(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
) -> ApiResult<Vec<Value>> {
    let (pool, schema) = lead_context(&runtime, &auth).await?;
    Ok(ApiResponse::success(
        LeadStore::new(&pool, &schema).list().await?,
    ))
}

/// GET /api/admin/leads/:id
pub async fn get_lead(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let (pool, schema) = lead_context(&runtime, &auth).await?;
    Ok(ApiResponse::success(
        LeadStore::new(&pool, &schema).get(id).await?,
    ))
}

/// PUT /api/admin/leads/:id
pub async fn update_lead(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Path(id): Path<Uuid>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Value> {
    let (pool, schema) = lead_context(&runtime, &auth).await?;
    Ok(ApiResponse::success(
        LeadStore::new(&pool, &schema).update(id, body).await?,
    ))
}

/// DELETE /api/admin/leads/:id
pub async fn delete_lead(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let (pool, schema) = lead_context(&runtime, &auth).await?;
    LeadStore::new(&pool, &schema).delete(id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}

/// GET /api/admin/leads/schema returns the materialized column layout so a
/// capture form can render the right inputs.
pub async fn lead_schema(
    State(runtime): State<Arc<TenantRuntime>>,
    Extension(auth): Extension<AuthAdmin>,
) -> ApiResult<LeadSchema> {
    let (_, schema) = lead_context(&runtime, &auth).await?;
    Ok(ApiResponse::success((*schema).clone()))
}
