//! At-most-once materialization of lead schemas per tenant database.
//!
//! The first request that touches a tenant's leads builds the schema from
//! the admin's selected-field configuration, runs the DDL, and caches the
//! result for the life of the process. Later requests reuse the cached
//! schema and ignore whatever selected fields they were called with, so an
//! edit to the field selection takes effect only after a restart.

use std::future::Future;
use std::sync::Arc;

use crate::database::cache::ConnectionCache;
use crate::database::manager::DatabaseError;
use crate::schema::LeadSchema;

use sqlx::PgPool;

pub struct SchemaRegistry {
    schemas: ConnectionCache<Arc<LeadSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: ConnectionCache::new(),
        }
    }

    /// Materialize the lead schema for `tenant_db`, running `apply` with the
    /// freshly built schema exactly once per key. Concurrent first-time
    /// callers are coalesced; the winner's selected fields decide the shape.
    pub async fn materialize<F, Fut>(
        &self,
        tenant_db: &str,
        selected_fields: &[String],
        apply: F,
    ) -> Result<Arc<LeadSchema>, DatabaseError>
    where
        F: FnOnce(Arc<LeadSchema>) -> Fut,
        Fut: Future<Output = Result<(), DatabaseError>>,
    {
        self.schemas
            .get_or_try_init(tenant_db, || async {
                let schema = Arc::new(LeadSchema::build(selected_fields));
                apply(schema.clone()).await?;
                Ok(schema)
            })
            .await
    }

    /// Materialize against a live tenant pool: build the schema and execute
    /// its idempotent DDL on first use.
    pub async fn lead_schema_for(
        &self,
        pool: &PgPool,
        tenant_db: &str,
        selected_fields: &[String],
    ) -> Result<Arc<LeadSchema>, DatabaseError> {
        self.materialize(tenant_db, selected_fields, |schema| async move {
            let ddl = schema.create_table_ddl();
            sqlx::query(&ddl).execute(pool).await?;
            Ok(())
        })
        .await
    }

    /// Already-materialized schema for `tenant_db`, if any.
    pub async fn get(&self, tenant_db: &str) -> Option<Arc<LeadSchema>> {
        self.schemas.get(tenant_db).await
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
