use handlebars::Handlebars;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::render::assets::{AssetManifest, AssetManifestCache};
use crate::render::context;
use crate::sites::record::SiteRecord;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("View not found: {template}/{page}")]
    ViewNotFound { template: String, page: String },

    #[error("View read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template render failed: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Context serialization failed: {0}")]
    Context(#[from] serde_json::Error),
}

/// Renders a site page: view resolution, context build, handlebars render
/// with optional layout, then markup post-processing.
pub struct RenderPipeline {
    templates_dir: PathBuf,
    assets: Arc<AssetManifestCache>,
    featured_limit: usize,
    registry: Handlebars<'static>,
}

impl RenderPipeline {
    pub fn new(
        templates_dir: impl Into<PathBuf>,
        assets: Arc<AssetManifestCache>,
        featured_limit: usize,
    ) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            assets,
            featured_limit,
            registry: Handlebars::new(),
        }
    }

    /// Render `page` of the site's template with the tenant context. A
    /// missing view is a distinct not-found outcome, never conflated with a
    /// render failure.
    pub async fn render(
        &self,
        site: &SiteRecord,
        page: &str,
        pool: Option<&PgPool>,
    ) -> Result<String, RenderError> {
        let view_path =
            self.resolve_view(&site.template, page)
                .ok_or_else(|| RenderError::ViewNotFound {
                    template: site.template.clone(),
                    page: page.to_string(),
                })?;

        let ctx = context::build(site, pool, self.featured_limit).await;
        let mut data = serde_json::to_value(&ctx)?;

        // Views are read per render rather than pre-registered; templates
        // are operator-editable on disk and development wants live changes.
        let view_src = std::fs::read_to_string(&view_path)?;
        let mut markup = self.registry.render_template(&view_src, &data)?;

        // The owner's custom layout wraps the page when one exists
        let layout_path = self.views_dir(&site.template).join("layout.hbs");
        if layout_path.is_file() {
            let layout_src = std::fs::read_to_string(&layout_path)?;
            if let Some(obj) = data.as_object_mut() {
                obj.insert("body".to_string(), serde_json::Value::String(markup));
            }
            markup = self.registry.render_template(&layout_src, &data)?;
        }

        let manifest = self.assets.manifest(&site.template).await;
        debug!("Rendered {}/{} ({} bytes)", site.template, page, markup.len());
        Ok(post_process(&markup, &manifest))
    }

    fn views_dir(&self, template: &str) -> PathBuf {
        self.templates_dir.join(template).join("views")
    }

    /// Prefer the "pages" subdirectory, fall back to a flat lookup.
    fn resolve_view(&self, template: &str, page: &str) -> Option<PathBuf> {
        let views = self.views_dir(template);
        let candidates = [
            views.join("pages").join(format!("{}.hbs", page)),
            views.join(format!("{}.hbs", page)),
        ];
        candidates.into_iter().find(|p| p.is_file())
    }
}

/// Markup post-processing: base-href injection, legacy asset-tag stripping,
/// versioned asset injection, upload URL rewriting.
fn post_process(markup: &str, manifest: &AssetManifest) -> String {
    let markup = inject_base_href(markup, &manifest.base_href);
    let markup = strip_template_asset_tags(&markup, &manifest.template);
    let markup = inject_asset_tags(&markup, manifest);
    rewrite_upload_urls(&markup)
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

/// Inject (or replace) a `<base>` tag pointing at the template root so
/// relative links resolve regardless of mount path (slug path vs bare
/// domain).
fn inject_base_href(html: &str, base_href: &str) -> String {
    let tag = format!("<base href=\"{}\">", base_href);

    if let Some(start) = find_ci(html, "<base") {
        if let Some(end) = html[start..].find('>') {
            return format!("{}{}{}", &html[..start], tag, &html[start + end + 1..]);
        }
    }
    if let Some(head) = find_ci(html, "<head>") {
        let idx = head + "<head>".len();
        return format!("{}{}{}", &html[..idx], tag, &html[idx..]);
    }
    format!("{}{}", tag, html)
}

/// Drop stylesheet/script tags the view itself emitted for this template's
/// assets. Keeps injection idempotent against legacy hand-authored views
/// that carried their own asset links.
fn strip_template_asset_tags(html: &str, template: &str) -> String {
    let own_prefix = format!("/site-assets/{}/", template);
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut i = 0;

    while i < html.len() {
        let link = lower[i..].find("<link");
        let script = lower[i..].find("<script");
        let (offset, is_script) = match (link, script) {
            (Some(l), Some(s)) if l < s => (l, false),
            (Some(l), None) => (l, false),
            (_, Some(s)) => (s, true),
            (None, None) => break,
        };
        let start = i + offset;
        let tag_end = match lower[start..].find('>') {
            Some(e) => start + e + 1,
            None => break,
        };
        let span_end = if is_script {
            match lower[tag_end..].find("</script>") {
                Some(e) => tag_end + e + "</script>".len(),
                None => tag_end,
            }
        } else {
            tag_end
        };

        let open_tag = &html[start..tag_end];
        let own_asset = open_tag.contains(&own_prefix)
            || open_tag.contains("=\"assets/")
            || open_tag.contains("='assets/");

        out.push_str(&html[i..start]);
        if !own_asset {
            out.push_str(&html[start..span_end]);
        }
        i = span_end;
    }
    out.push_str(&html[i..]);
    out
}

/// Insert versioned stylesheet links before `</head>` and script tags before
/// `</body>`, appending when the anchor is absent.
fn inject_asset_tags(html: &str, manifest: &AssetManifest) -> String {
    let links: String = manifest
        .css_urls
        .iter()
        .map(|u| format!("<link rel=\"stylesheet\" href=\"{}\">", u))
        .collect();
    let scripts: String = manifest
        .js_urls
        .iter()
        .map(|u| format!("<script src=\"{}\"></script>", u))
        .collect();

    let html = match find_ci(html, "</head>") {
        Some(idx) => format!("{}{}{}", &html[..idx], links, &html[idx..]),
        None => format!("{}{}", html, links),
    };
    match find_ci(&html, "</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], scripts, &html[idx..]),
        None => format!("{}{}", html, scripts),
    }
}

/// Rewrite upload-bucket-relative attribute values through the platform's
/// /uploads serving path, percent-encoding spaces.
fn rewrite_upload_urls(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut i = 0;

    while i < html.len() {
        let quote = match html[i..].get(..2) {
            Some("=\"") => Some('"'),
            Some("='") => Some('\''),
            _ => None,
        };
        if let Some(quote) = quote {
            let rest = &html[i + 2..];
            if rest.starts_with("uploads/") || rest.starts_with("/uploads/") {
                let val_start = i + 2;
                if let Some(q) = html[val_start..].find(quote) {
                    let val = &html[val_start..val_start + q];
                    let rel = val.strip_prefix('/').unwrap_or(val);
                    let rel = rel.strip_prefix("uploads/").unwrap_or(rel);
                    out.push('=');
                    out.push(quote);
                    out.push_str("/uploads/");
                    out.push_str(&rel.replace(' ', "%20"));
                    out.push(quote);
                    i = val_start + q + 1;
                    continue;
                }
            }
        }
        match html[i..].chars().next() {
            Some(c) => {
                out.push(c);
                i += c.len_utf8();
            }
            None => break,
        }
    }
    out
}
