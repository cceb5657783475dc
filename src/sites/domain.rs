use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;
use uuid::Uuid;

use crate::sites::directory::{DirectoryError, SiteDirectory};
use crate::sites::record::{OwnerType, SiteRecord};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Not the owner of this site")]
    NotOwner,

    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// What the operator must configure, returned from a bind so the UI can show
/// copy-pasteable instructions.
#[derive(Debug, Clone, Serialize)]
pub struct DnsInstructions {
    pub record_type: &'static str,
    pub host: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainStatus {
    pub connected: bool,
    pub domain: String,
    pub target_address: String,
}

/// Address-record lookup seam. Production resolves through the system
/// resolver; tests substitute a stub.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// A records for `host`, or an empty list when resolution fails in any
    /// way (NXDOMAIN, timeout, servfail). Verification treats all failures
    /// the same: not connected yet.
    async fn lookup_ipv4(&self, host: &str) -> Vec<Ipv4Addr>;
}

pub struct SystemDnsResolver {
    resolver: TokioAsyncResolver,
}

impl SystemDnsResolver {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for SystemDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn lookup_ipv4(&self, host: &str) -> Vec<Ipv4Addr> {
        match self.resolver.ipv4_lookup(host).await {
            Ok(lookup) => lookup.iter().map(|a| a.0).collect(),
            Err(e) => {
                warn!("DNS lookup failed for {}: {}", host, e);
                Vec::new()
            }
        }
    }
}

/// Attaches custom domains to site records and verifies them out-of-band.
///
/// Verification is pull-based: there is no background poller, the operator
/// re-checks after configuring DNS and owns the retry around propagation
/// delay.
pub struct DomainService {
    directory: Arc<SiteDirectory>,
    resolver: Arc<dyn DnsResolver>,
    platform_address: Ipv4Addr,
}

impl DomainService {
    pub fn new(
        directory: Arc<SiteDirectory>,
        resolver: Arc<dyn DnsResolver>,
        platform_address: Ipv4Addr,
    ) -> Self {
        Self {
            directory,
            resolver,
            platform_address,
        }
    }

    /// Attach `domain` to the slug's record. Clears any prior verification
    /// stamp: a rebind always starts unverified.
    pub async fn bind_domain(
        &self,
        owner_id: Uuid,
        owner_type: OwnerType,
        slug: &str,
        domain: &str,
    ) -> Result<(SiteRecord, DnsInstructions), DomainError> {
        let domain = normalize_domain(domain)
            .ok_or_else(|| DomainError::InvalidDomain(domain.to_string()))?;

        let mut sites = self.directory.load().await?;
        let record = sites
            .get_mut(slug)
            .ok_or_else(|| DomainError::SiteNotFound(slug.to_string()))?;
        if !record.belongs_to(&owner_id, owner_type) {
            return Err(DomainError::NotOwner);
        }

        record.custom_domain = Some(domain.clone());
        record.domain_verified_at = None;
        record.updated_at = Utc::now();
        let updated = record.clone();
        self.directory.save(&sites).await?;

        info!("Bound domain {} to site {}", domain, slug);
        Ok((
            updated,
            DnsInstructions {
                record_type: "A",
                host: domain,
                target: self.platform_address.to_string(),
            },
        ))
    }

    /// On-demand verification: resolve the bound domain (and a www-prefixed
    /// fallback) and compare against the platform address. A match stamps
    /// `domain_verified_at` and persists.
    pub async fn check_domain(&self, slug: &str) -> Result<DomainStatus, DomainError> {
        let mut sites = self.directory.load().await?;
        let record = sites
            .get_mut(slug)
            .ok_or_else(|| DomainError::SiteNotFound(slug.to_string()))?;
        let domain = record
            .custom_domain
            .clone()
            .ok_or_else(|| DomainError::InvalidDomain("no domain bound".to_string()))?;

        let mut addresses = self.resolver.lookup_ipv4(&domain).await;
        if addresses.is_empty() {
            addresses = self.resolver.lookup_ipv4(&format!("www.{}", domain)).await;
        }

        let connected = addresses.contains(&self.platform_address);
        if connected {
            record.domain_verified_at = Some(Utc::now());
            record.updated_at = Utc::now();
            self.directory.save(&sites).await?;
            info!("Verified domain {} for site {}", domain, slug);
        }

        Ok(DomainStatus {
            connected,
            domain,
            target_address: self.platform_address.to_string(),
        })
    }
}

/// Lowercased bare hostname, or None when the input is not a plausible
/// domain. Tolerates pasted values with a scheme or trailing dot.
fn normalize_domain(input: &str) -> Option<String> {
    let mut s = input.trim().to_ascii_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }
    if let Some(idx) = s.find('/') {
        s.truncate(idx);
    }
    let s = s.trim_end_matches('.').to_string();

    let plausible = !s.is_empty()
        && s.contains('.')
        && !s.starts_with('.')
        && !s.contains("..")
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    plausible.then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::publisher::SitePublisher;

    struct StubResolver {
        answers: Vec<(String, Vec<Ipv4Addr>)>,
    }

    #[async_trait]
    impl DnsResolver for StubResolver {
        async fn lookup_ipv4(&self, host: &str) -> Vec<Ipv4Addr> {
            self.answers
                .iter()
                .find(|(h, _)| h == host)
                .map(|(_, addrs)| addrs.clone())
                .unwrap_or_default()
        }
    }

    const PLATFORM: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 10);

    async fn setup(
        dir: &tempfile::TempDir,
        answers: Vec<(String, Vec<Ipv4Addr>)>,
    ) -> (Arc<SiteDirectory>, DomainService, SiteRecord, Uuid) {
        let directory = Arc::new(SiteDirectory::new(dir.path().join("sites.json")));
        let owner = Uuid::new_v4();
        let record = SitePublisher::new(directory.clone())
            .publish(owner, OwnerType::Broker, "Jane Doe", "modern", None)
            .await
            .unwrap();
        let service = DomainService::new(
            directory.clone(),
            Arc::new(StubResolver { answers }),
            PLATFORM,
        );
        (directory, service, record, owner)
    }

    #[tokio::test]
    async fn bind_returns_instructions_and_clears_verification() {
        let dir = tempfile::tempdir().unwrap();
        let (directory, service, record, owner) = setup(&dir, vec![]).await;

        let (updated, instructions) = service
            .bind_domain(owner, OwnerType::Broker, &record.slug, "Example.Test")
            .await
            .unwrap();

        assert_eq!(updated.custom_domain.as_deref(), Some("example.test"));
        assert!(updated.domain_verified_at.is_none());
        assert_eq!(instructions.record_type, "A");
        assert_eq!(instructions.target, PLATFORM.to_string());

        let stored = directory.find(&record.slug).await.unwrap().unwrap();
        assert_eq!(stored.custom_domain.as_deref(), Some("example.test"));
    }

    #[tokio::test]
    async fn bind_by_non_owner_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let (_, service, record, _) = setup(&dir, vec![]).await;

        let err = service
            .bind_domain(Uuid::new_v4(), OwnerType::Broker, &record.slug, "example.test")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotOwner));
    }

    #[tokio::test]
    async fn matching_dns_marks_connected_and_stamps() {
        let dir = tempfile::tempdir().unwrap();
        let (directory, service, record, owner) =
            setup(&dir, vec![("example.test".to_string(), vec![PLATFORM])]).await;

        service
            .bind_domain(owner, OwnerType::Broker, &record.slug, "example.test")
            .await
            .unwrap();
        let status = service.check_domain(&record.slug).await.unwrap();

        assert!(status.connected);
        let stored = directory.find(&record.slug).await.unwrap().unwrap();
        assert!(stored.domain_verified_at.is_some());
    }

    #[tokio::test]
    async fn mismatched_dns_stays_unverified() {
        let dir = tempfile::tempdir().unwrap();
        let wrong = Ipv4Addr::new(198, 51, 100, 7);
        let (directory, service, record, owner) =
            setup(&dir, vec![("example.test".to_string(), vec![wrong])]).await;

        service
            .bind_domain(owner, OwnerType::Broker, &record.slug, "example.test")
            .await
            .unwrap();
        let status = service.check_domain(&record.slug).await.unwrap();

        assert!(!status.connected);
        let stored = directory.find(&record.slug).await.unwrap().unwrap();
        assert!(stored.domain_verified_at.is_none());
    }

    #[tokio::test]
    async fn www_fallback_is_consulted() {
        let dir = tempfile::tempdir().unwrap();
        let (_, service, record, owner) =
            setup(&dir, vec![("www.example.test".to_string(), vec![PLATFORM])]).await;

        service
            .bind_domain(owner, OwnerType::Broker, &record.slug, "example.test")
            .await
            .unwrap();
        let status = service.check_domain(&record.slug).await.unwrap();
        assert!(status.connected);
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(normalize_domain(" Example.Test. "), Some("example.test".into()));
        assert_eq!(
            normalize_domain("https://homes.example.test/path"),
            Some("homes.example.test".into())
        );
        assert_eq!(normalize_domain("not a domain"), None);
        assert_eq!(normalize_domain("nodots"), None);
        assert_eq!(normalize_domain(""), None);
    }
}
