use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Optional company branding an admin can attach to their account; rendered
/// on the public capture form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// One row of the admin registry. The password hash never serializes, so an
/// entry can be returned from handlers as-is.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEntry {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "tenantDbName")]
    pub tenant_db: String,
    pub selected_fields: Json<Vec<String>>,
    pub company: Option<Json<CompanyProfile>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub selected_fields: Vec<String>,
    #[serde(default)]
    pub company: Option<CompanyProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub selected_fields: Option<Vec<String>>,
    pub company: Option<CompanyProfile>,
}
