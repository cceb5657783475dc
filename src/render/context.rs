use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::sites::record::SiteRecord;

/// Owner profile as exposed to templates. Falls back to directory data when
/// the tenant store has no usable profile row.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerProfile {
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
}

/// One listed property, media path already normalized for serving.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyView {
    pub title: String,
    pub city: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
}

/// Everything a page template can reference.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub site_title: String,
    pub slug: String,
    pub template: String,
    pub owner: OwnerProfile,
    pub properties: Vec<PropertyView>,
    pub featured: Vec<PropertyView>,
}

/// Build the rendering context for a site. Tenant-store reads are tolerant:
/// a broken or unreachable tenant renders with directory-derived defaults
/// rather than failing the page.
pub async fn build(site: &SiteRecord, pool: Option<&PgPool>, featured_limit: usize) -> SiteContext {
    let (owner, properties) = match pool {
        Some(pool) => (
            fetch_owner_profile(pool, site).await,
            fetch_properties(pool).await,
        ),
        None => (default_profile(site), Vec::new()),
    };

    let featured = select_featured(&properties, featured_limit);

    SiteContext {
        site_title: site.site_title.clone(),
        slug: site.slug.clone(),
        template: site.template.clone(),
        owner,
        properties,
        featured,
    }
}

fn default_profile(site: &SiteRecord) -> OwnerProfile {
    OwnerProfile {
        display_name: site.site_title.clone(),
        email: None,
        phone: None,
        photo_url: None,
        bio: None,
    }
}

async fn fetch_owner_profile(pool: &PgPool, site: &SiteRecord) -> OwnerProfile {
    let sql = "SELECT row_to_json(t) AS row FROM \
               (SELECT * FROM site_users ORDER BY created_at ASC LIMIT 1) t";
    let row = match sqlx::query(sql).fetch_optional(pool).await {
        Ok(r) => r,
        Err(e) => {
            warn!("owner profile fetch failed for {} (tolerated): {}", site.slug, e);
            return default_profile(site);
        }
    };

    let map = match row.and_then(|r| r.try_get::<Value, _>("row").ok()) {
        Some(Value::Object(map)) => map,
        _ => return default_profile(site),
    };

    OwnerProfile {
        display_name: str_field(&map, "display_name")
            .unwrap_or_else(|| site.site_title.clone()),
        email: str_field(&map, "email"),
        phone: str_field(&map, "phone"),
        photo_url: str_field(&map, "photo_url").map(|p| normalize_media_url(&p)),
        bio: str_field(&map, "bio"),
    }
}

async fn fetch_properties(pool: &PgPool) -> Vec<PropertyView> {
    let sql = "SELECT row_to_json(t) AS row FROM \
               (SELECT * FROM properties ORDER BY created_at DESC) t";
    let rows = match sqlx::query(sql).fetch_all(pool).await {
        Ok(r) => r,
        Err(e) => {
            // Tenants provisioned before the listings feature have no table
            warn!("property fetch failed (tolerated): {}", e);
            return Vec::new();
        }
    };

    rows.into_iter()
        .filter_map(|r| match r.try_get::<Value, _>("row") {
            Ok(Value::Object(map)) => Some(property_from_row(&map)),
            _ => None,
        })
        .collect()
}

/// Presence-checked row decoding: tenant schemas vary, so every column
/// access tolerates absence.
fn property_from_row(map: &serde_json::Map<String, Value>) -> PropertyView {
    PropertyView {
        title: str_field(map, "title").unwrap_or_else(|| "Untitled listing".to_string()),
        city: str_field(map, "city"),
        price: num_field(map, "price").unwrap_or(0.0),
        image_url: str_field(map, "primary_image").map(|p| normalize_media_url(&p)),
    }
}

fn str_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn num_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        // numeric columns arrive as strings through row_to_json
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Absolute URLs pass through untouched; anything else is treated as an
/// upload-bucket-relative path served from /uploads, spaces percent-encoded.
pub fn normalize_media_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    let rel = raw.strip_prefix('/').unwrap_or(raw);
    let rel = rel.strip_prefix("uploads/").unwrap_or(rel);
    format!("/uploads/{}", rel.replace(' ', "%20"))
}

/// Up to `limit` properties by descending price: the derived "featured"
/// view templates show on home pages.
fn select_featured(properties: &[PropertyView], limit: usize) -> Vec<PropertyView> {
    let mut sorted: Vec<PropertyView> = properties.to_vec();
    sorted.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(limit);
    sorted
}
