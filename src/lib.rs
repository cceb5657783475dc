pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod render;
pub mod sites;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router over the given state.
pub fn app(state: AppState) -> Router {
    let config = config::config();

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Published sites, served by slug
        .route("/site/:slug", get(handlers::pages::slug_home))
        .route("/site/:slug/:page", get(handlers::pages::slug_page))
        .route("/site/:slug/leads", post(handlers::leads::lead_post))
        // Site management (identity forwarded by the auth gateway)
        .merge(site_api_routes())
        // Template assets and operator uploads
        .nest_service(
            "/site-assets",
            ServeDir::new(&config.render.templates_dir),
        )
        .nest_service("/uploads", ServeDir::new(&config.render.uploads_dir))
        // Anything else may be a custom domain serving a site
        .fallback(handlers::pages::domain_dispatch)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn site_api_routes() -> Router<AppState> {
    use handlers::sites;

    Router::new()
        .route("/api/tenants/provision", post(handlers::tenants::provision_post))
        .route("/api/sites", get(sites::sites_get).post(sites::sites_post))
        .route("/api/sites/:slug/domain", post(sites::domain_post))
        .route("/api/sites/:slug/domain/check", get(sites::domain_check_get))
}

async fn root() -> axum::response::Json<serde_json::Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(serde_json::json!({
        "success": true,
        "data": {
            "name": "Brokersite API",
            "version": version,
            "description": "Multi-tenant broker site publishing platform",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "sites": "/api/sites (authenticated - publish and list)",
                "domain": "/api/sites/:slug/domain[/check] (authenticated - custom domains)",
                "pages": "/site/:slug[/:page] (public - rendered sites)",
                "leads": "/site/:slug/leads (public - lead capture)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(serde_json::json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(serde_json::json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
