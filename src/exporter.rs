//! Export orchestration
//!
//! Ties the pieces together: the URL picks the site and its extractor, the
//! extractor finds the messages, the flavour (explicit, else the stored
//! preference, else `base`) drives serialization.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use scraper::Html;

use crate::error::{ExportError, PreferenceError, Result};
use crate::extractors::{ExportedMessage, Extractor, MessageEntry};
use crate::flavours::{FlavourRegistry, BASE_FLAVOUR};
use crate::markdown;
use crate::sites::{SiteKey, SiteRegistry};

/// Preference key holding the user's flavour choice.
pub const FLAVOUR_PREFERENCE_KEY: &str = "markdownFlavour";

/// Environment variable read by [`EnvPreferences`].
pub const FLAVOUR_ENV: &str = "CHAT2MD_FLAVOUR";

/// Key/value store for user preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, PreferenceError>;

    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), PreferenceError>;
}

/// In-process preference store
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.into(), value.into());
        }
        self
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, PreferenceError> {
        let values = self
            .values
            .read()
            .map_err(|_| PreferenceError::Unavailable("preference lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), PreferenceError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| PreferenceError::Unavailable("preference lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read-only flavour preference taken from the environment
#[derive(Debug, Clone)]
pub struct EnvPreferences {
    variable: String,
}

impl EnvPreferences {
    pub fn new() -> Self {
        Self::with_variable(FLAVOUR_ENV)
    }

    pub fn with_variable(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl Default for EnvPreferences {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferenceStore for EnvPreferences {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, PreferenceError> {
        if key != FLAVOUR_PREFERENCE_KEY {
            return Ok(None);
        }
        match std::env::var(&self.variable) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(PreferenceError::Unavailable(format!("{}: {}", self.variable, e))),
        }
    }

    async fn set(&self, key: &str, _value: &str) -> std::result::Result<(), PreferenceError> {
        Err(PreferenceError::ReadOnly(format!(
            "cannot store '{}' in the environment",
            key
        )))
    }
}

pub struct Exporter {
    sites: SiteRegistry,
    flavours: FlavourRegistry,
    preferences: Option<Arc<dyn PreferenceStore>>,
    header: bool,
}

impl Exporter {
    pub fn new(sites: SiteRegistry, flavours: FlavourRegistry) -> Self {
        Self {
            sites,
            flavours,
            preferences: None,
            header: true,
        }
    }

    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Toggle the `# Site Conversation` header block.
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn flavours(&self) -> &FlavourRegistry {
        &self.flavours
    }

    pub fn sites(&self) -> &SiteRegistry {
        &self.sites
    }

    /// Flavour name to use: `requested` when given, else the stored
    /// preference, else `base`. A failing store is logged, never fatal.
    pub async fn resolve_flavour(&self, requested: Option<&str>) -> String {
        if let Some(name) = requested.map(str::trim).filter(|name| !name.is_empty()) {
            return name.to_string();
        }

        let Some(store) = &self.preferences else {
            return BASE_FLAVOUR.to_string();
        };
        match store.get(FLAVOUR_PREFERENCE_KEY).await {
            Ok(Some(name)) if !name.trim().is_empty() => name.trim().to_string(),
            Ok(_) => BASE_FLAVOUR.to_string(),
            Err(e) => {
                tracing::warn!("flavour preference unavailable, using base: {}", e);
                BASE_FLAVOUR.to_string()
            }
        }
    }

    /// Export the conversation in `html` as one Markdown document.
    pub async fn export(&self, html: &str, url: &str, requested: Option<&str>) -> Result<String> {
        let flavour = self.resolve_flavour(requested).await;
        self.render(html, url, &flavour)
    }

    /// Synchronous export with an already chosen flavour name.
    pub fn render(&self, html: &str, url: &str, flavour_name: &str) -> Result<String> {
        let (site, extractor) = self.extractor_for(url)?;
        let document = Html::parse_document(html);
        let entries = collect_entries(extractor, &document)?;

        let flavour = self.flavours.resolve(flavour_name);
        let body = extractor.serialize(&entries, &flavour);
        tracing::debug!(
            "exported {} messages from {} as '{}'",
            entries.len(),
            site.key(),
            flavour_name
        );

        if self.header {
            Ok(format!("{}{}", header(site, url), body))
        } else {
            Ok(body)
        }
    }

    /// Same pipeline as [`Exporter::render`], one serialized body per
    /// message.
    pub fn messages(
        &self,
        html: &str,
        url: &str,
        flavour_name: &str,
    ) -> Result<Vec<ExportedMessage>> {
        let (_, extractor) = self.extractor_for(url)?;
        let document = Html::parse_document(html);
        let entries = collect_entries(extractor, &document)?;

        let flavour = self.flavours.resolve(flavour_name);
        Ok(entries
            .iter()
            .map(|entry| ExportedMessage {
                role: entry.role,
                markdown: markdown::serialize_message(entry.container, &flavour),
            })
            .collect())
    }

    fn extractor_for(&self, url: &str) -> Result<(SiteKey, &dyn Extractor)> {
        let site = SiteKey::detect(url).ok_or_else(|| ExportError::UnsupportedSite(url.to_string()))?;
        let extractor = self
            .sites
            .resolve(site)
            .ok_or_else(|| ExportError::UnsupportedSite(site.key().to_string()))?;
        Ok((site, extractor))
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(SiteRegistry::default(), FlavourRegistry::builtin())
    }
}

fn collect_entries<'a>(
    extractor: &dyn Extractor,
    document: &'a Html,
) -> Result<Vec<MessageEntry<'a>>> {
    if !extractor.can_extract(document) {
        return Err(ExportError::NoMessages);
    }
    let entries = extractor.entries(document);
    if entries.is_empty() {
        return Err(ExportError::NoMessages);
    }
    Ok(entries)
}

fn header(site: SiteKey, url: &str) -> String {
    format!(
        "# {name} Conversation\n\n**URL:** {url}\n\n**Platform:** {name}\n\n---\n\n",
        name = site.display_name(),
    )
}
