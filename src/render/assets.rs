use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

/// Versioned asset URLs for one template, derived entirely from filesystem
/// state. Safe to recompute at any time.
#[derive(Debug, Clone)]
pub struct AssetManifest {
    pub template: String,
    pub base_href: String,
    pub css_urls: Vec<String>,
    pub js_urls: Vec<String>,
    pub(crate) expires_at: Instant,
}

impl AssetManifest {
    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Short-TTL cache over template asset directory walks.
///
/// TTL is long in production (avoid repeated filesystem walks per request)
/// and near-zero in development (template authors see asset changes without
/// a restart). Shared across requests; a race recomputes redundantly, which
/// is harmless.
pub struct AssetManifestCache {
    templates_dir: PathBuf,
    ttl: Duration,
    entries: RwLock<HashMap<String, Arc<AssetManifest>>>,
}

impl AssetManifestCache {
    pub fn new(templates_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Current manifest for a template, recomputed from disk on miss or
    /// expiry. A missing asset directory yields an empty manifest, not an
    /// error.
    pub async fn manifest(&self, template: &str) -> Arc<AssetManifest> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(template) {
                if !entry.expired() {
                    return entry.clone();
                }
            }
        }

        let manifest = Arc::new(self.build(template));
        let mut entries = self.entries.write().await;
        entries.insert(template.to_string(), manifest.clone());
        manifest
    }

    fn build(&self, template: &str) -> AssetManifest {
        let assets_dir = self.templates_dir.join(template).join("assets");
        let mut files = Vec::new();
        collect_asset_files(&assets_dir, &assets_dir, &mut files);
        // Lexicographic order keeps tag injection deterministic
        files.sort();

        let base_href = format!("/site-assets/{}/", template);
        let mut css_urls = Vec::new();
        let mut js_urls = Vec::new();
        for rel in files {
            let version = file_version(&assets_dir.join(&rel));
            let url = format!("/site-assets/{}/assets/{}?v={}", template, rel, version);
            if rel.ends_with(".css") {
                css_urls.push(url);
            } else {
                js_urls.push(url);
            }
        }

        debug!(
            "Built asset manifest for {}: {} css, {} js",
            template,
            css_urls.len(),
            js_urls.len()
        );

        AssetManifest {
            template: template.to_string(),
            base_href,
            css_urls,
            js_urls,
            expires_at: Instant::now() + self.ttl,
        }
    }
}

/// Recursive walk collecting stylesheet and script paths relative to `root`,
/// forward-slash separated.
fn collect_asset_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return, // missing directory means no assets
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_asset_files(root, &path, out);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("css") | Some("js")
        ) {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
}

/// Modification time as a cache-busting version, unix seconds.
fn file_version(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
