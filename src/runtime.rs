//! Process-wide application context. Handlers receive this through axum
//! state instead of reaching for globals, so tests can stand up isolated
//! instances side by side.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::database::manager::DatabaseError;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::registry::AdminRegistry;
use crate::schema::{LeadSchema, SchemaRegistry};

pub struct TenantRuntime {
    pub config: AppConfig,
    pub databases: DatabaseManager,
    pub schemas: SchemaRegistry,
}

impl TenantRuntime {
    pub fn new(config: AppConfig) -> Result<Self, DatabaseError> {
        let databases = DatabaseManager::new(&config.database)?;
        Ok(Self {
            config,
            databases,
            schemas: SchemaRegistry::new(),
        })
    }

    /// Warm up the master pool, which bootstraps the registry tables on
    /// first open. Failure here is not fatal: the pool cache retries on the
    /// first request that needs it.
    pub async fn initialize(&self) -> Result<(), DatabaseError> {
        self.databases.master_pool().await.map(|_| ())
    }

    /// Registry handle over the cached master pool.
    pub async fn admin_registry(&self) -> Result<AdminRegistry, ApiError> {
        let pool = self.databases.master_pool().await?;
        Ok(AdminRegistry::new(pool))
    }

    /// Pool for a tenant database, provisioning it on first use.
    pub async fn tenant_pool(&self, tenant_db: &str) -> Result<PgPool, ApiError> {
        Ok(self.databases.acquire(tenant_db).await?)
    }

    /// Materialized lead schema for a tenant, building it on first use from
    /// the admin's current field selection.
    pub async fn lead_schema(
        &self,
        pool: &PgPool,
        tenant_db: &str,
        selected_fields: &[String],
    ) -> Result<Arc<LeadSchema>, ApiError> {
        Ok(self
            .schemas
            .lead_schema_for(pool, tenant_db, selected_fields)
            .await?)
    }
}
