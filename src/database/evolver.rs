use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Columns the current application version requires on a tenant's leads
/// table, with the DDL type used when adding them. Older tenants were
/// provisioned with a narrower baseline; the evolver converges them.
const REQUIRED_LEAD_COLUMNS: &[(&str, &str)] = &[
    ("full_name", "TEXT"),
    ("city", "TEXT"),
    ("property_interest", "TEXT"),
    ("source", "TEXT NOT NULL DEFAULT 'website'"),
    ("status", "TEXT NOT NULL DEFAULT 'new'"),
    ("message", "TEXT"),
    ("assigned_to", "UUID"),
    ("created_at", "TIMESTAMPTZ NOT NULL DEFAULT now()"),
    ("updated_at", "TIMESTAMPTZ NOT NULL DEFAULT now()"),
];

/// What a single evolution pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvolveOutcome {
    /// Added this many missing columns.
    Applied(usize),
    /// Live shape already matched the required set.
    AlreadyCurrent,
    /// The ALTER (or introspection) failed and was tolerated.
    Skipped(String),
}

/// Additive, best-effort schema evolution for tenant leads tables.
///
/// The external contract never errors: concurrent evolution attempts from
/// parallel requests, or insufficient privilege in some deployments, must not
/// block the read/write path that triggered evolution. Callers still use
/// presence-checked column access afterwards.
pub struct SchemaEvolver;

impl SchemaEvolver {
    /// Converge the leads table towards the required column set.
    pub async fn ensure_leads_shape(pool: &PgPool) -> EvolveOutcome {
        // Tenants provisioned by an older baseline may predate the leads
        // table entirely.
        if let Err(e) = Self::ensure_leads_table(pool).await {
            warn!("leads table creation failed, skipping evolution: {}", e);
            return EvolveOutcome::Skipped(e.to_string());
        }

        let live = match Self::live_columns(pool, "leads").await {
            Ok(cols) => cols,
            Err(e) => {
                warn!("leads introspection failed, skipping evolution: {}", e);
                return EvolveOutcome::Skipped(e.to_string());
            }
        };

        let missing = Self::missing_columns(&live);
        if missing.is_empty() {
            return EvolveOutcome::AlreadyCurrent;
        }

        let ddl = Self::alter_statement("leads", &missing);
        debug!("evolving leads table: {}", ddl);

        match sqlx::query(&ddl).execute(pool).await {
            Ok(_) => EvolveOutcome::Applied(missing.len()),
            Err(e) => {
                // Expected under concurrent evolution or restricted roles
                warn!("leads evolution ALTER failed (tolerated): {}", e);
                EvolveOutcome::Skipped(e.to_string())
            }
        }
    }

    async fn ensure_leads_table(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS leads (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email TEXT,
                phone TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Live column names of a tenant table
    pub async fn live_columns(pool: &PgPool, table: &str) -> Result<HashSet<String>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT column_name FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.get::<String, _>("column_name"))
            .collect())
    }

    /// Diff the required set against live columns
    fn missing_columns(live: &HashSet<String>) -> Vec<(&'static str, &'static str)> {
        REQUIRED_LEAD_COLUMNS
            .iter()
            .filter(|(name, _)| !live.contains(*name))
            .copied()
            .collect()
    }

    /// One additive ALTER covering the whole diff. ADD COLUMN IF NOT EXISTS
    /// keeps a race between two evolving requests harmless.
    fn alter_statement(table: &str, missing: &[(&'static str, &'static str)]) -> String {
        let clauses: Vec<String> = missing
            .iter()
            .map(|(name, ddl_type)| format!("ADD COLUMN IF NOT EXISTS {} {}", name, ddl_type))
            .collect();
        format!("ALTER TABLE {} {}", table, clauses.join(", "))
    }
}
