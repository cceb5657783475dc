use axum::extract::{Path, Request, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::sites::record::SiteRecord;
use crate::state::AppState;

/// Page-name whitelist: letters, digits, hyphen, underscore. Anything else
/// silently falls back to the home page rather than erroring; a weird path
/// must never 500 or leak into the filesystem lookup.
pub fn sanitize_page(raw: &str) -> String {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        trimmed.to_string()
    } else {
        "home".to_string()
    }
}

/// Effective host of a request: a forwarded-host header wins over Host, and
/// any port suffix is dropped.
pub fn effective_host(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(axum::http::header::HOST))
        .and_then(|v| v.to_str().ok())?;
    let host = raw.split(',').next()?.trim();
    let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

async fn render_site(state: &AppState, record: &SiteRecord, page: &str) -> Result<Response, ApiError> {
    let pool = super::tenant_pool_for(state, record).await;
    let markup = state.renderer.render(record, page, pool.as_ref()).await?;
    Ok(Html(markup).into_response())
}

/// GET /site/:slug - home page of a published site
pub async fn slug_home(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    slug_page_inner(state, slug, "home".to_string()).await
}

/// GET /site/:slug/:page
pub async fn slug_page(
    State(state): State<AppState>,
    Path((slug, page)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    slug_page_inner(state, slug, page).await
}

async fn slug_page_inner(state: AppState, slug: String, page: String) -> Result<Response, ApiError> {
    let record = state
        .directory
        .find(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Site not found: {}", slug)))?;
    render_site(&state, &record, &sanitize_page(&page)).await
}

/// Router fallback: requests that matched no route may still be a custom
/// domain serving a site. Anything else is not this engine's concern and
/// gets a plain 404.
pub async fn domain_dispatch(State(state): State<AppState>, req: Request) -> Response {
    let host = match effective_host(req.headers()) {
        Some(h) => h,
        None => return passthrough_not_found(),
    };

    let record = match state.directory.find_by_domain(&host).await {
        Ok(Some(record)) => record,
        Ok(None) => return passthrough_not_found(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let page = req
        .uri()
        .path()
        .trim_matches('/')
        .split('/')
        .next()
        .map(sanitize_page)
        .unwrap_or_else(|| "home".to_string());

    match render_site(&state, &record, &page).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

fn passthrough_not_found() -> Response {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "not found", "code": "NOT_FOUND" })),
    )
        .into_response()
}
