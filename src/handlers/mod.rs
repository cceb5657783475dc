pub mod leads;
pub mod pages;
pub mod sites;
pub mod tenants;

use sqlx::PgPool;

use crate::database::provisioner::tenant_db_name;
use crate::sites::record::SiteRecord;
use crate::state::AppState;

/// Tenant pool for a site's owner, tolerantly: an unreachable tenant store
/// degrades the caller (render with defaults, count as zero) instead of
/// failing it.
pub async fn tenant_pool_for(state: &AppState, record: &SiteRecord) -> Option<PgPool> {
    let db_name = tenant_db_name(record.owner_type, &record.owner_id);
    match state.db.tenant_pool(&db_name).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!("tenant pool unavailable for {} (tolerated): {}", record.slug, e);
            None
        }
    }
}
