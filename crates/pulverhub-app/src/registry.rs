//! The typed page-module registry.
//!
//! Every page module implements [`PageModule`] and is registered once;
//! after a fragment loads, the registry scans each module's selector
//! against the fragment and either initializes the module (first
//! activation this session) or refreshes it. Initialization therefore
//! runs at most once per module, which keeps event subscriptions from
//! stacking up across navigations.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use pulverhub_core::AppResult;

use crate::context::AppContext;

/// A page behavior module.
#[async_trait]
pub trait PageModule: Send + Sync {
    /// Stable registry key, e.g. `"users"`.
    fn key(&self) -> &'static str;

    /// Selector (`#id` or `.class`) marking the fragment this module
    /// drives.
    fn selector(&self) -> &'static str;

    /// First activation: bind subscriptions and load initial data.
    async fn init(self: Arc<Self>, ctx: AppContext) -> AppResult<()>;

    /// Re-activation on a later navigation: reload data, close any
    /// leftover edit state, never re-bind subscriptions.
    async fn refresh(self: Arc<Self>, ctx: AppContext) -> AppResult<()>;
}

/// Registry of all known page modules with their activation state.
pub struct ModuleRegistry {
    /// Registered modules in registration order.
    modules: Vec<Arc<dyn PageModule>>,
    /// Keys of modules that completed `init` this session.
    initialized: DashMap<&'static str, ()>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            initialized: DashMap::new(),
        }
    }

    /// Registers a module.
    pub fn register(&mut self, module: Arc<dyn PageModule>) {
        self.modules.push(module);
    }

    /// Whether a module has been initialized this session.
    pub fn is_initialized(&self, key: &str) -> bool {
        self.initialized.contains_key(key)
    }

    /// Scans the loaded fragment and starts or refreshes every module
    /// whose selector matches.
    ///
    /// A failing module is logged and skipped so the other modules on
    /// the page still start; a failed `init` stays uninitialized and is
    /// retried on the next navigation.
    pub async fn start_modules(&self, ctx: &AppContext, fragment: &str) {
        tracing::debug!("Scanning {} modules against fragment", self.modules.len());

        for module in &self.modules {
            if !fragment_matches(fragment, module.selector()) {
                continue;
            }

            if self.is_initialized(module.key()) {
                tracing::info!("Refreshing module {}", module.key());
                if let Err(e) = module.clone().refresh(ctx.clone()).await {
                    tracing::error!("Module {} refresh failed: {e}", module.key());
                }
            } else {
                tracing::info!("Starting module {}", module.key());
                match module.clone().init(ctx.clone()).await {
                    Ok(()) => {
                        self.initialized.insert(module.key(), ());
                    }
                    Err(e) => tracing::error!("Module {} init failed: {e}", module.key()),
                }
            }
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks whether an HTML fragment contains an element matching a
/// `#id` or `.class` selector.
///
/// This is a textual scan, not a DOM query; it only has to recognize
/// the markers the server-rendered fragments actually use.
pub fn fragment_matches(fragment: &str, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        attribute_has_value(fragment, "id", id, false)
    } else if let Some(class) = selector.strip_prefix('.') {
        attribute_has_value(fragment, "class", class, true)
    } else {
        false
    }
}

/// Scans `attr="..."` occurrences; with `token_list` the quoted value is
/// split on whitespace before comparing.
fn attribute_has_value(fragment: &str, attr: &str, wanted: &str, token_list: bool) -> bool {
    for quote in ['"', '\''] {
        let marker = format!("{attr}={quote}");
        let mut rest = fragment;
        while let Some(start) = rest.find(&marker) {
            let value_start = start + marker.len();
            let value_rest = &rest[value_start..];
            let Some(end) = value_rest.find(quote) else {
                break;
            };
            let value = &value_rest[..end];
            let matches = if token_list {
                value.split_whitespace().any(|token| token == wanted)
            } else {
                value == wanted
            };
            if matches {
                return true;
            }
            rest = &value_rest[end..];
        }
    }
    false
}
