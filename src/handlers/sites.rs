use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::OwnerIdentity;
use crate::config;
use crate::error::ApiError;
use crate::sites::record::SiteRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub template: String,
    pub site_title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BindDomainRequest {
    pub domain: String,
}

fn site_response(record: &SiteRecord) -> Value {
    let base = &config::config().sites.public_base_url;
    json!({
        "slug": record.slug,
        "url": format!("{}{}", base, record.url_path()),
        "url_path": record.url_path(),
        "record": record,
    })
}

/// POST /api/sites - publish (or republish) the caller's site
pub async fn sites_post(
    State(state): State<AppState>,
    identity: OwnerIdentity,
    Json(req): Json<PublishRequest>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .publisher
        .publish(
            identity.id,
            identity.owner_type,
            &identity.display_name,
            &req.template,
            req.site_title,
        )
        .await?;

    Ok(Json(json!({ "success": true, "data": site_response(&record) })))
}

/// GET /api/sites - the caller's records, with per-tenant counts
pub async fn sites_get(
    State(state): State<AppState>,
    identity: OwnerIdentity,
) -> Result<Json<Value>, ApiError> {
    let records = state
        .publisher
        .list_for_owner(identity.id, identity.owner_type)
        .await?;

    // Counts are tolerant: one broken tenant store must never break the
    // listing, it just reports zero.
    let entries = futures::future::join_all(records.iter().map(|record| async {
        let (properties, leads) = match super::tenant_pool_for(&state, record).await {
            Some(pool) => (
                count_rows(&pool, "properties").await,
                count_rows(&pool, "leads").await,
            ),
            None => (0, 0),
        };
        let mut entry = site_response(record);
        entry["property_count"] = json!(properties);
        entry["lead_count"] = json!(leads);
        entry
    }))
    .await;

    Ok(Json(json!({ "success": true, "data": entries })))
}

async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
    match sqlx::query_as::<_, (i64,)>(&sql).fetch_one(pool).await {
        Ok((n,)) => n,
        Err(e) => {
            tracing::warn!("count of {} failed (tolerated): {}", table, e);
            0
        }
    }
}

/// POST /api/sites/:slug/domain - attach a custom domain
pub async fn domain_post(
    State(state): State<AppState>,
    identity: OwnerIdentity,
    Path(slug): Path<String>,
    Json(req): Json<BindDomainRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.domain.trim().is_empty() {
        return Err(ApiError::bad_request("Domain is required"));
    }

    let (record, instructions) = state
        .domains
        .bind_domain(identity.id, identity.owner_type, &slug, &req.domain)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "record": record,
            "dns": instructions,
        }
    })))
}

/// GET /api/sites/:slug/domain/check - on-demand DNS verification
pub async fn domain_check_get(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let status = state.domains.check_domain(&slug).await?;
    Ok(Json(json!({ "success": true, "data": status })))
}
