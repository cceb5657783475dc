use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::sites::record::SiteRecord;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("Directory write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("Directory document is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable slug -> SiteRecord map, persisted as one JSON document.
///
/// This is a flat, whole-document read/replace store: every mutation loads
/// the full map, changes it in memory and writes the full map back. Two
/// writers racing on the same document means last save wins (accepted,
/// since publish and domain operations are rare human-triggered actions).
/// The write itself is atomic (temp file + rename), so a failed save leaves
/// the prior document intact.
pub struct SiteDirectory {
    path: PathBuf,
}

impl SiteDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full directory. A missing document is an empty directory,
    /// not an error (first publish creates it).
    pub async fn load(&self) -> Result<BTreeMap<String, SiteRecord>, DirectoryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(DirectoryError::Read(e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace the full directory document.
    pub async fn save(&self, sites: &BTreeMap<String, SiteRecord>) -> Result<(), DirectoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(DirectoryError::Write)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(sites)?;

        // Write-then-rename so readers never observe a torn document
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(DirectoryError::Write)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(DirectoryError::Write)?;

        info!("Saved site directory ({} records)", sites.len());
        Ok(())
    }

    /// Look up one record by slug.
    pub async fn find(&self, slug: &str) -> Result<Option<SiteRecord>, DirectoryError> {
        Ok(self.load().await?.remove(slug))
    }

    /// Find the record, if any, whose verified custom domain matches `host`.
    pub async fn find_by_domain(&self, host: &str) -> Result<Option<SiteRecord>, DirectoryError> {
        let sites = self.load().await?;
        Ok(sites.into_values().find(|rec| {
            rec.domain_is_verified()
                && rec
                    .custom_domain
                    .as_deref()
                    .is_some_and(|d| d.eq_ignore_ascii_case(host))
        }))
    }
}
