//! Template rendering using minijinja with embedded templates.

use minijinja::{AutoEscape, Environment, Error as JinjaError, ErrorKind};
use rust_embed::Embed;
use serde::Serialize;

use crate::detect::verdict_text;
use crate::share::ShareRecord;

/// Embedded page templates.
#[derive(Embed)]
#[folder = "templates/"]
pub struct Templates;

/// Site name shown in page titles and meta tags.
pub const SITE_NAME: &str = "SeeFood";

/// A template engine for the detector page and share pages.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with embedded templates.
    pub fn new() -> Result<Self, JinjaError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|name| {
            if name.ends_with(".html") {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });

        for file in Templates::iter() {
            let filename = file.to_string();
            if let Some(content) = Templates::get(&filename) {
                let template_str = std::str::from_utf8(content.data.as_ref())
                    .map_err(|_| JinjaError::from(ErrorKind::InvalidOperation))?;
                env.add_template_owned(filename, template_str.to_string())?;
            }
        }

        Ok(Self { env })
    }

    /// Render the detector landing page.
    pub fn render_index(&self) -> Result<String, JinjaError> {
        let template = self.env.get_template("index.html")?;
        template.render(minijinja::context! { site_name => SITE_NAME })
    }

    /// Render the page for a live share.
    pub fn render_share(&self, view: &ShareView) -> Result<String, JinjaError> {
        let template = self.env.get_template("share.html")?;
        template.render(minijinja::context! {
            site_name => SITE_NAME,
            share => view,
        })
    }

    /// Render the page shown for an unknown or expired share.
    pub fn render_not_found(&self) -> Result<String, JinjaError> {
        let template = self.env.get_template("not_found.html")?;
        template.render(minijinja::context! { site_name => SITE_NAME })
    }
}

/// View model for the share page.
#[derive(Debug, Clone, Serialize)]
pub struct ShareView {
    pub id: String,
    pub image_data: String,
    pub is_hot_dog: bool,
    pub verdict: &'static str,
    pub tagline: &'static str,
    /// Absolute URL of this page.
    pub share_url: String,
    /// Absolute URL of the preview card.
    pub card_url: String,
    pub created_at: String,
}

impl ShareView {
    /// Create a view model from a record, given the site's base URL.
    pub fn from_record(record: &ShareRecord, base_url: &str) -> Self {
        let share_url = share_url(base_url, record.id.as_str());
        Self {
            id: record.id.to_string(),
            image_data: record.image_data.clone(),
            is_hot_dog: record.is_hot_dog,
            verdict: verdict_text(record.is_hot_dog),
            tagline: if record.is_hot_dog {
                "This is definitely a hot dog!"
            } else {
                "This is definitely not a hot dog."
            },
            card_url: format!("{}/opengraph-image", share_url),
            share_url,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Absolute URL of the page for share `id`.
pub fn share_url(base_url: &str, id: &str) -> String {
    format!("{}/share/{}", base_url.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::ShareId;
    use chrono::Utc;

    fn record(image_data: &str, is_hot_dog: bool) -> ShareRecord {
        ShareRecord {
            id: ShareId::from("0123456789abcdef0123456789abcdef"),
            image_data: image_data.to_string(),
            is_hot_dog,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_template_engine_loads() {
        assert!(TemplateEngine::new().is_ok());
    }

    #[test]
    fn test_render_index() {
        let engine = TemplateEngine::new().unwrap();
        let html = engine.render_index().unwrap();
        assert!(html.contains("SeeFood"));
        assert!(html.contains("/assets/detector.js"));
    }

    #[test]
    fn test_render_share_hot_dog() {
        let engine = TemplateEngine::new().unwrap();
        let view = ShareView::from_record(
            &record("data:image/png;base64,AAA", true),
            "https://hotdogdetector.com",
        );
        let html = engine.render_share(&view).unwrap();

        assert!(html.contains("HOT DOG!"));
        assert!(!html.contains("NOT HOT DOG!"));
        assert!(html.contains("base64,AAA"));
        assert!(html.contains("og:image"));
        assert!(html.contains("opengraph-image"));
    }

    #[test]
    fn test_render_share_escapes_payload() {
        let engine = TemplateEngine::new().unwrap();
        let view = ShareView::from_record(
            &record("\"><script>alert(1)</script>", false),
            "http://localhost:3000",
        );
        let html = engine.render_share(&view).unwrap();

        assert!(html.contains("NOT HOT DOG!"));
        assert!(!html.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn test_render_not_found() {
        let engine = TemplateEngine::new().unwrap();
        let html = engine.render_not_found().unwrap();
        assert!(html.contains("SeeFood Share Not Found"));
    }

    #[test]
    fn test_share_url() {
        assert_eq!(
            share_url("https://hotdogdetector.com/", "abc"),
            "https://hotdogdetector.com/share/abc"
        );
        assert_eq!(
            share_url("http://127.0.0.1:3000", "abc"),
            "http://127.0.0.1:3000/share/abc"
        );
    }
}
