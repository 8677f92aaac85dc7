use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{validate_jwt, Claims, ROLE_ADMIN, ROLE_SUPERADMIN};
use crate::error::ApiError;
use crate::runtime::TenantRuntime;

/// Authenticated caller context extracted from a verified token and
/// injected into the request extensions.
#[derive(Clone, Debug)]
pub struct AuthAdmin {
    pub username: String,
    pub role: String,
    /// Tenant database from the token. Never taken from request input.
    pub database: Option<String>,
    pub admin_id: Option<Uuid>,
}

impl AuthAdmin {
    /// Tenant database for admin-scoped handlers. Superadmin tokens have no
    /// tenant and cannot reach tenant-scoped routes.
    pub fn tenant_db(&self) -> Result<&str, ApiError> {
        self.database
            .as_deref()
            .ok_or_else(|| ApiError::forbidden("No tenant associated with this token"))
    }

    pub fn admin_id(&self) -> Result<Uuid, ApiError> {
        self.admin_id
            .ok_or_else(|| ApiError::forbidden("No admin identity associated with this token"))
    }
}

impl From<Claims> for AuthAdmin {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
            database: claims.database,
            admin_id: claims.admin_id,
        }
    }
}

/// Bearer-token authentication. Rejects with 401 before any handler runs;
/// role checks are layered separately per route group.
pub async fn require_auth(
    State(runtime): State<Arc<TenantRuntime>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token, &runtime.config.security.jwt_secret)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthAdmin::from(claims));
    Ok(next.run(request).await)
}

pub async fn require_superadmin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, ROLE_SUPERADMIN)?;
    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, ROLE_ADMIN)?;
    Ok(next.run(request).await)
}

fn require_role(request: &Request, role: &str) -> Result<(), ApiError> {
    let auth = request
        .extensions()
        .get::<AuthAdmin>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if auth.role != role {
        return Err(ApiError::forbidden(format!("{} access required", role)));
    }
    Ok(())
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, String> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let value = header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_tokens() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_header() {
        let err = extract_bearer(&HeaderMap::new()).unwrap_err();
        assert!(err.contains("Missing"));
    }

    #[test]
    fn rejects_non_bearer_schemes() {
        let err = extract_bearer(&headers_with("Basic dXNlcjpwYXNz")).unwrap_err();
        assert!(err.contains("Bearer"));
    }

    #[test]
    fn rejects_empty_tokens() {
        assert!(extract_bearer(&headers_with("Bearer ")).is_err());
        assert!(extract_bearer(&headers_with("Bearer    ")).is_err());
    }

    #[test]
    fn tenant_db_requires_admin_token() {
        let superadmin = AuthAdmin {
            username: "root".to_string(),
            role: ROLE_SUPERADMIN.to_string(),
            database: None,
            admin_id: None,
        };
        assert!(superadmin.tenant_db().is_err());

        let admin = AuthAdmin {
            username: "alice".to_string(),
            role: ROLE_ADMIN.to_string(),
            database: Some("tenant_alice".to_string()),
            admin_id: Some(Uuid::nil()),
        };
        assert_eq!(admin.tenant_db().unwrap(), "tenant_alice");
    }
}
