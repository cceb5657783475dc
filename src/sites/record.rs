use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which kind of operator owns a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Broker,
    Company,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Broker => "broker",
            OwnerType::Company => "company",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "broker" => Some(OwnerType::Broker),
            "company" => Some(OwnerType::Company),
            _ => None,
        }
    }
}

/// One published site: the directory's value type, keyed by slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    pub slug: String,
    pub owner_id: Uuid,
    pub owner_type: OwnerType,
    pub template: String,
    pub site_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SiteRecord {
    pub fn belongs_to(&self, owner_id: &Uuid, owner_type: OwnerType) -> bool {
        self.owner_id == *owner_id && self.owner_type == owner_type
    }

    pub fn domain_is_verified(&self) -> bool {
        self.custom_domain.is_some() && self.domain_verified_at.is_some()
    }

    /// The slug path a site is served under.
    pub fn url_path(&self) -> String {
        format!("/site/{}", self.slug)
    }
}

/// Deterministic slug for an owner: type-qualified display name plus a short
/// id suffix. Republishing the same owner with an unchanged display name
/// yields the same slug, so a site keeps its identity across republishes.
pub fn derive_slug(owner_type: OwnerType, display_name: &str, owner_id: &Uuid) -> String {
    let qualified = format!("{}-{}", owner_type.as_str(), display_name);
    let mut slug = slugify(&qualified);
    let id = owner_id.simple().to_string();
    slug.push('-');
    slug.push_str(&id[..8]);
    slug
}

/// Lowercase, URL-safe reduction of a display name: runs of anything outside
/// [a-z0-9] collapse to single hyphens.
fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_hyphen = true; // suppress leading hyphen
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
