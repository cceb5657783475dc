#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use brokersite_api::sites::domain::DnsResolver;
use brokersite_api::state::AppState;

/// Address the stubbed platform serves from (TEST-NET-3).
pub const PLATFORM_ADDRESS: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 10);

static ROOT: OnceLock<TempDir> = OnceLock::new();

/// Shared fixture root for the whole test binary. Environment overrides must
/// land before the config singleton is first touched, so every test path
/// goes through here.
pub fn test_root() -> &'static Path {
    ROOT.get_or_init(|| {
        let dir = tempfile::tempdir().expect("tempdir");
        std::env::set_var("APP_ENV", "development");
        std::env::set_var("SITES_DIRECTORY_PATH", dir.path().join("sites.json"));
        std::env::set_var("RENDER_TEMPLATES_DIR", dir.path().join("templates"));
        std::env::set_var("RENDER_UPLOADS_DIR", dir.path().join("uploads"));
        std::env::set_var("SITES_PLATFORM_ADDRESS", PLATFORM_ADDRESS.to_string());
        dir
    })
    .path()
}

/// DNS stub: fixed answers per hostname, empty otherwise.
pub struct StubDns {
    pub answers: Vec<(String, Vec<Ipv4Addr>)>,
}

#[async_trait]
impl DnsResolver for StubDns {
    async fn lookup_ipv4(&self, host: &str) -> Vec<Ipv4Addr> {
        self.answers
            .iter()
            .find(|(h, _)| h == host)
            .map(|(_, a)| a.clone())
            .unwrap_or_default()
    }
}

/// Build an app over a fresh directory document. Tests in one binary run in
/// parallel, and the directory store is last-writer-wins, so each app gets
/// its own document file.
pub fn test_app(resolver: Arc<dyn DnsResolver>) -> Router {
    let root = test_root();
    let mut config = brokersite_api::config::config().clone();
    config.sites.directory_path = root.join(format!("sites-{}.json", Uuid::new_v4().simple()));
    brokersite_api::app(AppState::build(&config, resolver))
}

pub fn test_app_no_dns() -> Router {
    test_app(Arc::new(StubDns { answers: vec![] }))
}

static INSTALLED: OnceLock<std::sync::Mutex<std::collections::HashSet<String>>> = OnceLock::new();

/// Write a minimal template fixture (home + about views, one stylesheet).
/// Installed at most once per test binary so concurrent tests never observe
/// a half-written view file.
pub fn install_template(name: &str) {
    let installed = INSTALLED.get_or_init(|| std::sync::Mutex::new(Default::default()));
    let mut guard = installed.lock().unwrap();
    if !guard.insert(name.to_string()) {
        return;
    }
    let root = test_root().join("templates").join(name);
    let views = root.join("views");
    std::fs::create_dir_all(views.join("pages")).unwrap();
    std::fs::create_dir_all(root.join("assets/css")).unwrap();
    std::fs::write(
        views.join("pages/home.hbs"),
        "<html><head></head><body><h1>{{site_title}}</h1></body></html>",
    )
    .unwrap();
    std::fs::write(
        views.join("pages/about.hbs"),
        "<html><head></head><body><p>about {{slug}}</p></body></html>",
    )
    .unwrap();
    std::fs::write(root.join("assets/css/site.css"), "body {}").unwrap();
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = app.clone().oneshot(req).await.expect("request");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub async fn send_html(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let res = app.clone().oneshot(req).await.expect("request");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.expect("body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn publish_request(owner: Uuid, name: &str, template: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/sites")
        .header("content-type", "application/json")
        .header("x-owner-id", owner.to_string())
        .header("x-owner-type", "broker")
        .header("x-owner-name", name)
        .body(Body::from(
            serde_json::json!({ "template": template }).to_string(),
        ))
        .unwrap()
}

pub fn authed_get(uri: &str, owner: Uuid, name: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-owner-id", owner.to_string())
        .header("x-owner-type", "broker")
        .header("x-owner-name", name)
        .body(Body::empty())
        .unwrap()
}
