//! The navigation/content loader.
//!
//! Pages are server-rendered HTML fragments fetched by name. Loading a
//! page checks the static page-to-permission table first, falls back to
//! the `no_permission` page when the operator lacks access, injects the
//! fragment into the current view, and then starts or refreshes the
//! matching page modules. A fragment that cannot be fetched renders an
//! inline error instead and starts no modules.

use std::sync::Arc;

use tokio::sync::Mutex;

use pulverhub_core::AppResult;
use pulverhub_core::config::api::ApiConfig;

use crate::context::AppContext;
use crate::registry::ModuleRegistry;

/// Pages that require a permission to enter. Unlisted pages are open.
const PAGE_PERMISSIONS: &[(&str, &str)] = &[
    ("pulverlager", "pulver.manage"),
    ("benutzer", "user.manage"),
    ("rollenrechte", "roles.manage"),
    ("auftragsdisplay", "auftraege.manage"),
];

/// The permission required to enter a page, if any.
pub fn page_permission(page: &str) -> Option<&'static str> {
    PAGE_PERMISSIONS
        .iter()
        .find(|(name, _)| *name == page)
        .map(|(_, permission)| *permission)
}

/// The currently displayed page content.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// The displayed page name.
    pub page: String,
    /// The fetched fragment; empty while an error is shown.
    pub html: String,
    /// Inline error text replacing the content, if loading failed.
    pub error: Option<String>,
}

/// Fetches page fragments and drives module start-up.
pub struct ContentLoader {
    /// Plain HTTP client; fragments are static content, not API calls.
    http: reqwest::Client,
    /// Base URL of the fragment directory.
    content_base: String,
    /// The page-module registry.
    registry: Arc<ModuleRegistry>,
    /// The currently displayed content.
    content: Mutex<PageContent>,
}

impl ContentLoader {
    /// Creates a loader for the configured content path.
    pub fn new(api: &ApiConfig, registry: Arc<ModuleRegistry>) -> Self {
        let base = api.base_url.trim_end_matches('/');
        let path = api.content_path.trim_end_matches('/');
        Self {
            http: reqwest::Client::new(),
            content_base: format!("{base}{path}"),
            registry,
            content: Mutex::new(PageContent::default()),
        }
    }

    /// The currently displayed content.
    pub async fn current(&self) -> PageContent {
        self.content.lock().await.clone()
    }

    /// Loads a page by name, enforcing the page permission table.
    pub async fn load_page(&self, ctx: &AppContext, page: &str) -> AppResult<()> {
        let target = match page_permission(page) {
            Some(required) if !ctx.profile.has_permission(required).await? => {
                tracing::warn!("No permission for page {page}, showing no_permission");
                "no_permission"
            }
            _ => page,
        };

        tracing::info!("Loading page {target}");

        let url = format!("{}/{target}.html", self.content_base);
        let fragment = match self.fetch_fragment(&url).await {
            Ok(fragment) => fragment,
            Err(message) => {
                tracing::warn!("Page {target} failed to load: {message}");
                let mut content = self.content.lock().await;
                *content = PageContent {
                    page: target.to_string(),
                    html: String::new(),
                    error: Some(format!("Fehler: {message}")),
                };
                return Ok(());
            }
        };

        {
            let mut content = self.content.lock().await;
            *content = PageContent {
                page: target.to_string(),
                html: fragment.clone(),
                error: None,
            };
        }

        self.registry.start_modules(ctx, &fragment).await;
        Ok(())
    }

    /// Fetches one fragment; any failure is reported as inline error
    /// text rather than an `Err`.
    async fn fetch_fragment(&self, url: &str) -> Result<String, String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Seite nicht erreichbar: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("Seite nicht gefunden ({})", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("Seite nicht lesbar: {e}"))
    }
}
