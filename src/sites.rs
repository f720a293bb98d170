//! Supported sites and their extractors

use std::collections::HashMap;
use std::fmt;

use url::Url;

use crate::extractors::{ChatGptExtractor, Extractor, NullExtractor, RulesExtractor};
use crate::rules::SelectorConfig;

/// A chat site recognized from its hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKey {
    ChatGpt,
    Claude,
    Gemini,
    Perplexity,
}

impl SiteKey {
    pub const ALL: [SiteKey; 4] = [
        SiteKey::ChatGpt,
        SiteKey::Claude,
        SiteKey::Gemini,
        SiteKey::Perplexity,
    ];

    /// Stable identifier, also the platform name in selector configuration.
    pub fn key(&self) -> &'static str {
        match self {
            SiteKey::ChatGpt => "chatgpt",
            SiteKey::Claude => "claude",
            SiteKey::Gemini => "gemini",
            SiteKey::Perplexity => "perplexity",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SiteKey::ChatGpt => "ChatGPT",
            SiteKey::Claude => "Claude",
            SiteKey::Gemini => "Gemini",
            SiteKey::Perplexity => "Perplexity",
        }
    }

    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            SiteKey::ChatGpt => &["chat.openai.com", "chatgpt.com"],
            SiteKey::Claude => &["claude.ai"],
            SiteKey::Gemini => &["gemini.google.com"],
            SiteKey::Perplexity => &["www.perplexity.ai", "perplexity.ai"],
        }
    }

    /// Site for `url`, by exact hostname. Unparseable URLs and unknown hosts
    /// yield `None`.
    pub fn detect(url: &str) -> Option<SiteKey> {
        let parsed = Url::parse(url.trim()).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|site| site.hosts().contains(&host.as_str()))
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Maps each supported site to its extractor
pub struct SiteRegistry {
    extractors: HashMap<SiteKey, Box<dyn Extractor>>,
}

impl SiteRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// ChatGPT uses the built-in extractor, Gemini the placeholder, every
    /// other site the rules found for it in `config`.
    pub fn with_rules(config: SelectorConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(SiteKey::ChatGpt, Box::new(ChatGptExtractor::new()));
        registry.register(SiteKey::Gemini, Box::new(NullExtractor));

        for site in [SiteKey::Claude, SiteKey::Perplexity] {
            match config.platform(site.key()) {
                Some(rules) => {
                    registry.register(site, Box::new(RulesExtractor::new(site.key(), rules.clone())))
                }
                None => tracing::warn!("no extraction rules for {}, site disabled", site.key()),
            }
        }

        registry
    }

    pub fn register(&mut self, site: SiteKey, extractor: Box<dyn Extractor>) {
        self.extractors.insert(site, extractor);
    }

    pub fn resolve(&self, site: SiteKey) -> Option<&dyn Extractor> {
        self.extractors.get(&site).map(|extractor| extractor.as_ref())
    }

    pub fn contains(&self, site: SiteKey) -> bool {
        self.extractors.contains_key(&site)
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::with_rules(SelectorConfig::bundled())
    }
}

impl fmt::Debug for SiteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sites: Vec<_> = self.extractors.keys().map(SiteKey::key).collect();
        sites.sort_unstable();
        f.debug_struct("SiteRegistry").field("sites", &sites).finish()
    }
}
