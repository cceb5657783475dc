use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::sites::directory::{DirectoryError, SiteDirectory};
use crate::sites::record::{derive_slug, OwnerType, SiteRecord};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Template name is required")]
    MissingTemplate,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Turns an owner + template choice into a directory entry, enforcing one
/// active site per owner.
pub struct SitePublisher {
    directory: Arc<SiteDirectory>,
}

impl SitePublisher {
    pub fn new(directory: Arc<SiteDirectory>) -> Self {
        Self { directory }
    }

    /// Publish (or republish) the owner's site. After this returns the
    /// directory holds exactly one record for the owner: the one created
    /// here. Prior records are removed by owner scan, not by slug: a
    /// display-name change alters the slug, and the stale entry must go too.
    pub async fn publish(
        &self,
        owner_id: Uuid,
        owner_type: OwnerType,
        display_name: &str,
        template: &str,
        site_title: Option<String>,
    ) -> Result<SiteRecord, PublishError> {
        if template.trim().is_empty() {
            return Err(PublishError::MissingTemplate);
        }

        let slug = derive_slug(owner_type, display_name, &owner_id);
        let now = Utc::now();
        let record = SiteRecord {
            slug: slug.clone(),
            owner_id,
            owner_type,
            template: template.to_string(),
            site_title: site_title.unwrap_or_else(|| display_name.to_string()),
            custom_domain: None,
            domain_verified_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut sites = self.directory.load().await?;
        sites.retain(|_, rec| !rec.belongs_to(&owner_id, owner_type));
        sites.insert(slug.clone(), record.clone());
        self.directory.save(&sites).await?;

        info!("Published site {} ({} {})", slug, owner_type.as_str(), owner_id);
        Ok(record)
    }

    /// All records belonging to the caller (at most one, by invariant).
    pub async fn list_for_owner(
        &self,
        owner_id: Uuid,
        owner_type: OwnerType,
    ) -> Result<Vec<SiteRecord>, PublishError> {
        let sites = self.directory.load().await?;
        Ok(sites
            .into_values()
            .filter(|rec| rec.belongs_to(&owner_id, owner_type))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher(dir: &tempfile::TempDir) -> SitePublisher {
        SitePublisher::new(Arc::new(SiteDirectory::new(dir.path().join("sites.json"))))
    }

    #[tokio::test]
    async fn republish_reuses_slug_and_keeps_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(&dir);
        let owner = Uuid::new_v4();

        let first = publisher
            .publish(owner, OwnerType::Broker, "Jane Doe", "modern", None)
            .await
            .unwrap();
        let second = publisher
            .publish(owner, OwnerType::Broker, "Jane Doe", "classic", None)
            .await
            .unwrap();

        assert_eq!(first.slug, second.slug);

        let mine = publisher.list_for_owner(owner, OwnerType::Broker).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].template, "classic");
    }

    #[tokio::test]
    async fn renamed_owner_drops_stale_slug() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(&dir);
        let owner = Uuid::new_v4();

        let first = publisher
            .publish(owner, OwnerType::Broker, "Jane Doe", "modern", None)
            .await
            .unwrap();
        let second = publisher
            .publish(owner, OwnerType::Broker, "Jane Smith", "modern", None)
            .await
            .unwrap();

        assert_ne!(first.slug, second.slug);
        let mine = publisher.list_for_owner(owner, OwnerType::Broker).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].slug, second.slug);
    }

    #[tokio::test]
    async fn many_sequential_publishes_keep_last_template() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(&dir);
        let owner = Uuid::new_v4();

        for template in ["a", "b", "c", "d"] {
            publisher
                .publish(owner, OwnerType::Company, "Acme Estates", template, None)
                .await
                .unwrap();
        }

        let mine = publisher.list_for_owner(owner, OwnerType::Company).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].template, "d");
    }

    #[tokio::test]
    async fn owners_do_not_clobber_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(&dir);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        publisher
            .publish(a, OwnerType::Broker, "Jane Doe", "modern", None)
            .await
            .unwrap();
        publisher
            .publish(b, OwnerType::Broker, "Jane Doe", "modern", None)
            .await
            .unwrap();

        assert_eq!(publisher.list_for_owner(a, OwnerType::Broker).await.unwrap().len(), 1);
        assert_eq!(publisher.list_for_owner(b, OwnerType::Broker).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_template_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(&dir);
        let err = publisher
            .publish(Uuid::new_v4(), OwnerType::Broker, "Jane", "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::MissingTemplate));
    }
}
