use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, auth, superadmin, system};
use crate::middleware::{require_admin, require_auth, require_superadmin};
use crate::runtime::TenantRuntime;

pub fn app(runtime: Arc<TenantRuntime>) -> Router {
    let cors = cors_layer(runtime.config.server.cors_origin.as_deref());

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/superadmin/login", post(superadmin::login))
        .route("/api/admin/login", post(admin::login))
        .merge(superadmin_routes(runtime.clone()))
        .merge(admin_routes(runtime.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(runtime)
}

/// Protected superadmin actions. Token check runs first, then the role
/// gate, so a valid admin token gets 403 rather than 401.
fn superadmin_routes(runtime: Arc<TenantRuntime>) -> Router<Arc<TenantRuntime>> {
    Router::new()
        .route("/api/superadmin/create-admin", post(superadmin::create_admin))
        .route("/api/superadmin/admins", get(superadmin::list_admins))
        .route(
            "/api/superadmin/admins/:id",
            get(superadmin::get_admin)
                .put(superadmin::update_admin)
                .delete(superadmin::delete_admin),
        )
        .route(
            "/api/superadmin/admins/:id/users",
            get(superadmin::get_admin_users),
        )
        .route(
            "/api/superadmin/admins/:id/toggle-status",
            patch(superadmin::toggle_status),
        )
        .layer(from_fn(require_superadmin))
        .layer(from_fn_with_state(runtime, require_auth))
}

fn admin_routes(runtime: Arc<TenantRuntime>) -> Router<Arc<TenantRuntime>> {
    Router::new()
        .route(
            "/api/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/api/admin/users/:id",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route(
            "/api/admin/leads",
            get(admin::list_leads).post(admin::create_lead),
        )
        .route("/api/admin/leads/schema", get(admin::lead_schema))
        .route(
            "/api/admin/leads/:id",
            get(admin::get_lead)
                .put(admin::update_lead)
                .delete(admin::delete_lead),
        )
        .layer(from_fn(require_admin))
        .layer(from_fn_with_state(runtime, require_auth))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}
