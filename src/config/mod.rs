use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub sites: SitesConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    /// Path of the site directory document (slug -> record map).
    pub directory_path: PathBuf,
    /// Public address operators must point their A record at.
    pub platform_address: Ipv4Addr,
    /// Base URL used when building absolute site URLs in API responses.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Root directory holding one subdirectory per template.
    pub templates_dir: PathBuf,
    /// Root directory for operator-uploaded media.
    pub uploads_dir: PathBuf,
    /// Asset manifest cache lifetime, seconds. Near-zero in development so
    /// template authors see live asset changes.
    pub asset_cache_ttl_secs: u64,
    /// How many properties the "featured" strip shows at most.
    pub featured_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        if let Ok(v) = env::var("SITES_DIRECTORY_PATH") {
            self.sites.directory_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SITES_PLATFORM_ADDRESS") {
            self.sites.platform_address = v.parse().unwrap_or(self.sites.platform_address);
        }
        if let Ok(v) = env::var("SITES_PUBLIC_BASE_URL") {
            self.sites.public_base_url = v.trim_end_matches('/').to_string();
        }

        if let Ok(v) = env::var("RENDER_TEMPLATES_DIR") {
            self.render.templates_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("RENDER_UPLOADS_DIR") {
            self.render.uploads_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("RENDER_ASSET_CACHE_TTL_SECS") {
            self.render.asset_cache_ttl_secs = v.parse().unwrap_or(self.render.asset_cache_ttl_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            sites: SitesConfig {
                directory_path: PathBuf::from("data/sites.json"),
                platform_address: Ipv4Addr::new(127, 0, 0, 1),
                public_base_url: "http://localhost:3000".to_string(),
            },
            render: RenderConfig {
                templates_dir: PathBuf::from("templates"),
                uploads_dir: PathBuf::from("uploads"),
                // template authors see asset changes without a restart
                asset_cache_ttl_secs: 0,
                featured_limit: 6,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            sites: SitesConfig {
                directory_path: PathBuf::from("/var/lib/brokersite/sites.json"),
                platform_address: Ipv4Addr::new(0, 0, 0, 0),
                public_base_url: "https://staging.brokersite.example".to_string(),
            },
            render: RenderConfig {
                templates_dir: PathBuf::from("/var/lib/brokersite/templates"),
                uploads_dir: PathBuf::from("/var/lib/brokersite/uploads"),
                asset_cache_ttl_secs: 300,
                featured_limit: 6,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            sites: SitesConfig {
                directory_path: PathBuf::from("/var/lib/brokersite/sites.json"),
                platform_address: Ipv4Addr::new(0, 0, 0, 0),
                public_base_url: "https://brokersite.example".to_string(),
            },
            render: RenderConfig {
                templates_dir: PathBuf::from("/var/lib/brokersite/templates"),
                uploads_dir: PathBuf::from("/var/lib/brokersite/uploads"),
                asset_cache_ttl_secs: 3600,
                featured_limit: 6,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macro for the common environment check
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.render.asset_cache_ttl_secs, 0);
        assert_eq!(config.sites.platform_address, Ipv4Addr::new(127, 0, 0, 1));
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.render.asset_cache_ttl_secs >= 3600);
        assert_eq!(config.database.max_connections, 50);
    }
}
