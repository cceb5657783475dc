use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::info;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::sites::record::OwnerType;

/// Derive the isolated database name for an owner. Hashing keeps the name
/// URL-safe, length-bounded and globally unique regardless of what the
/// owner's display name contains.
pub fn tenant_db_name(owner_type: OwnerType, owner_id: &uuid::Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner_type.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(owner_id.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    // First 16 characters keep the database name a reasonable length
    format!("tenant_{}", &hash[..16])
}

/// Baseline table definitions, in dependency order: categories before
/// subcategories, both before leads (referential constraints). The leads
/// table here is intentionally minimal; the richer shape used by the lead
/// intake path is the SchemaEvolver's job, invoked lazily by callers.
const BASELINE_TABLES: &[(&str, &str)] = &[
    (
        "site_users",
        "CREATE TABLE IF NOT EXISTS site_users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            phone TEXT,
            photo_url TEXT,
            bio TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ),
    (
        "categories",
        "CREATE TABLE IF NOT EXISTS categories (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ),
    (
        "subcategories",
        "CREATE TABLE IF NOT EXISTS subcategories (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            category_id UUID NOT NULL REFERENCES categories(id),
            name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ),
    (
        "leads",
        "CREATE TABLE IF NOT EXISTS leads (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            category_id UUID REFERENCES categories(id),
            subcategory_id UUID REFERENCES subcategories(id),
            email TEXT,
            phone TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ),
];

/// Creates a tenant's isolated database and its baseline schema on demand.
pub struct TenantProvisioner {
    manager: std::sync::Arc<DatabaseManager>,
}

impl TenantProvisioner {
    pub fn new(manager: std::sync::Arc<DatabaseManager>) -> Self {
        Self { manager }
    }

    /// Ensure the tenant database and baseline tables exist. Idempotent:
    /// rerunning against an already-provisioned tenant is a no-op. Any
    /// failure here is fatal and propagates: signup must fail visibly
    /// rather than leave a half-provisioned tenant behind.
    pub async fn provision(&self, tenant_db: &str) -> Result<(), DatabaseError> {
        if !self.manager.database_exists(tenant_db).await? {
            self.manager.create_database(tenant_db).await?;
        }

        let pool = self.manager.tenant_pool(tenant_db).await?;
        self.create_baseline_tables(&pool).await?;

        info!("Provisioned tenant: {}", tenant_db);
        Ok(())
    }

    async fn create_baseline_tables(&self, pool: &PgPool) -> Result<(), DatabaseError> {
        for (name, ddl) in BASELINE_TABLES {
            sqlx::query(ddl).execute(pool).await.map_err(|e| {
                DatabaseError::QueryError(format!("creating baseline table {}: {}", name, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn db_name_is_deterministic_and_valid() {
        let id = Uuid::parse_str("6b34b5a0-8f6e-4f36-9d3a-1f9a9a1e2b4c").unwrap();
        let a = tenant_db_name(OwnerType::Broker, &id);
        let b = tenant_db_name(OwnerType::Broker, &id);
        assert_eq!(a, b);
        assert!(a.starts_with("tenant_"));
        assert_eq!(a.len(), "tenant_".len() + 16);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn db_name_differs_by_owner_type() {
        let id = Uuid::new_v4();
        assert_ne!(
            tenant_db_name(OwnerType::Broker, &id),
            tenant_db_name(OwnerType::Company, &id)
        );
    }

    #[test]
    fn baseline_tables_are_in_dependency_order() {
        let order: Vec<&str> = BASELINE_TABLES.iter().map(|(n, _)| *n).collect();
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert!(pos("categories") < pos("subcategories"));
        assert!(pos("subcategories") < pos("leads"));
    }

    #[test]
    fn baseline_ddl_is_idempotent() {
        for (_, ddl) in BASELINE_TABLES {
            assert!(ddl.contains("IF NOT EXISTS"));
        }
    }
}
