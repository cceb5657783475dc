use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use brokersite_api::database::{
    DatabaseManager, EvolveOutcome, SchemaEvolver, TenantProvisioner,
};

// Exercises provisioning and schema evolution against a live Postgres.
// Skips when DATABASE_URL is absent or unreachable (CI without a database).
#[tokio::test]
async fn provisioning_and_evolution_against_live_database() -> Result<()> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let db = Arc::new(DatabaseManager::new());
    if db.health_check().await.is_err() {
        eprintln!("skipping: database unreachable");
        return Ok(());
    }

    let suffix = Uuid::new_v4().simple().to_string();
    let tenant = format!("tenant_it_{}", &suffix[..12]);
    let provisioner = TenantProvisioner::new(db.clone());

    // Provisioning is idempotent: second run neither errors nor duplicates
    provisioner.provision(&tenant).await?;
    provisioner.provision(&tenant).await?;

    let pool = db.tenant_pool(&tenant).await?;
    for table in ["site_users", "categories", "subcategories", "leads"] {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_one(&pool)
        .await?;
        assert_eq!(count.0, 1, "exactly one {} table", table);
    }

    // Baseline leads shape is intentionally narrower than the evolver target
    let before = SchemaEvolver::live_columns(&pool, "leads").await?;
    assert!(!before.contains("full_name"));

    match SchemaEvolver::ensure_leads_shape(&pool).await {
        EvolveOutcome::Applied(n) => assert!(n >= 3, "expected several added columns, got {}", n),
        other => panic!("expected Applied, got {:?}", other),
    }
    let after = SchemaEvolver::live_columns(&pool, "leads").await?;
    for col in ["full_name", "city", "property_interest", "status", "assigned_to"] {
        assert!(after.contains(col), "missing {}", col);
    }

    // Second pass finds nothing to do
    assert_eq!(
        SchemaEvolver::ensure_leads_shape(&pool).await,
        EvolveOutcome::AlreadyCurrent
    );

    // cleanup
    drop(pool);
    db.close_all().await;
    let admin = DatabaseManager::new();
    let admin_pool = admin.admin_pool().await?;
    sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", tenant))
        .execute(&admin_pool)
        .await?;
    Ok(())
}
