use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::manager::DatabaseManager;
use crate::database::provisioner::TenantProvisioner;
use crate::render::assets::AssetManifestCache;
use crate::render::pipeline::RenderPipeline;
use crate::sites::directory::SiteDirectory;
use crate::sites::domain::{DnsResolver, DomainService, SystemDnsResolver};
use crate::sites::publisher::SitePublisher;

/// Shared application state. Caches (tenant pools, asset manifests) live
/// here rather than in module-level statics so tests can build a fresh
/// state per run.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub provisioner: Arc<TenantProvisioner>,
    pub directory: Arc<SiteDirectory>,
    pub publisher: Arc<SitePublisher>,
    pub domains: Arc<DomainService>,
    pub renderer: Arc<RenderPipeline>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::build(config, Arc::new(SystemDnsResolver::new()))
    }

    pub fn build(config: &AppConfig, resolver: Arc<dyn DnsResolver>) -> Self {
        let db = Arc::new(DatabaseManager::new());
        let provisioner = Arc::new(TenantProvisioner::new(db.clone()));
        let directory = Arc::new(SiteDirectory::new(config.sites.directory_path.clone()));
        let publisher = Arc::new(SitePublisher::new(directory.clone()));
        let domains = Arc::new(DomainService::new(
            directory.clone(),
            resolver,
            config.sites.platform_address,
        ));
        let assets = Arc::new(AssetManifestCache::new(
            config.render.templates_dir.clone(),
            Duration::from_secs(config.render.asset_cache_ttl_secs),
        ));
        let renderer = Arc::new(RenderPipeline::new(
            config.render.templates_dir.clone(),
            assets,
            config.render.featured_limit,
        ));

        Self {
            db,
            provisioner,
            directory,
            publisher,
            domains,
            renderer,
        }
    }
}
