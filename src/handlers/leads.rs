use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::evolver::SchemaEvolver;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct LeadRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub property_interest: Option<String>,
    pub message: Option<String>,
}

/// POST /site/:slug/leads - lead capture from a published site's contact
/// form. This is the business-logic path that lazily evolves the tenant's
/// leads table before writing.
pub async fn lead_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<LeadRequest>,
) -> Result<Json<Value>, ApiError> {
    let full_name = req
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("full_name is required"))?;

    let record = state
        .directory
        .find(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Site not found: {}", slug)))?;

    let pool = super::tenant_pool_for(&state, &record)
        .await
        .ok_or_else(|| ApiError::service_unavailable("tenant store unavailable"))?;

    // Best effort; the insert below presence-checks columns either way
    let outcome = SchemaEvolver::ensure_leads_shape(&pool).await;
    tracing::debug!("lead intake evolution for {}: {:?}", slug, outcome);

    let live = SchemaEvolver::live_columns(&pool, "leads")
        .await
        .map_err(|e| {
            tracing::error!("leads introspection failed: {}", e);
            ApiError::internal_server_error(e.to_string())
        })?;

    // Only write columns the live table actually has (evolution may have
    // been skipped under a restricted role)
    let candidates: [(&str, Option<&str>); 7] = [
        ("full_name", Some(full_name)),
        ("email", req.email.as_deref()),
        ("phone", req.phone.as_deref()),
        ("city", req.city.as_deref()),
        ("property_interest", req.property_interest.as_deref()),
        ("message", req.message.as_deref()),
        ("source", Some("website")),
    ];
    let present: Vec<(&str, &str)> = candidates
        .iter()
        .filter_map(|(col, val)| match val {
            Some(v) if live.contains(*col) => Some((*col, *v)),
            _ => None,
        })
        .collect();

    if present.is_empty() {
        return Err(ApiError::service_unavailable("leads table has no usable columns"));
    }

    let columns: Vec<&str> = present.iter().map(|(c, _)| *c).collect();
    let placeholders: Vec<String> = (1..=present.len()).map(|i| format!("${}", i)).collect();
    let sql = format!(
        "INSERT INTO leads ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in &present {
        query = query.bind(value.to_string());
    }
    query.execute(&pool).await.map_err(|e| {
        tracing::error!("lead insert failed: {}", e);
        ApiError::internal_server_error(e.to_string())
    })?;

    Ok(Json(json!({ "success": true })))
}
