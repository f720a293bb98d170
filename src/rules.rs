//! Per-platform extraction rules
//!
//! Selector lists and role-detection hints for the sites whose markup is
//! described by configuration rather than code. A copy is bundled with the
//! crate; a local JSON file may override it. Any problem with the override
//! degrades to the bundled rules.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RulesError;

const BUNDLED_SELECTORS: &str = include_str!("../config/selectors.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub platforms: HashMap<String, PlatformRules>,
}

/// Rules for one platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformRules {
    /// Selectors for message anchors, most specific first
    #[serde(default)]
    pub message_selectors: Vec<String>,
    /// Selectors for the outer container a matched node is folded into
    #[serde(default)]
    pub container_selectors: Vec<String>,
    #[serde(default)]
    pub role_detection: RoleDetection,
    /// Selectors for the renderable body inside an anchor
    #[serde(default)]
    pub content_container: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleDetection {
    /// Attribute whose value names the role
    #[serde(default)]
    pub data_attribute: Option<String>,
    #[serde(default)]
    pub user_indicators: Vec<String>,
    #[serde(default)]
    pub assistant_indicators: Vec<String>,
}

impl SelectorConfig {
    /// Rules shipped with the crate.
    pub fn bundled() -> Self {
        match serde_json::from_str(BUNDLED_SELECTORS) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("bundled selector configuration rejected: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an override file. Platforms it does not mention keep their
    /// bundled rules.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&text)?;
        for (name, rules) in Self::bundled().platforms {
            config.platforms.entry(name).or_insert(rules);
        }
        tracing::debug!(
            "loaded selector configuration v{} from {}",
            config.version,
            path.display()
        );
        Ok(config)
    }

    /// Load the override at `path` if given, otherwise or on any failure
    /// use the bundled rules.
    pub fn load_or_bundled(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::bundled();
        };

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "selector override {} unusable, using bundled rules: {}",
                    path.display(),
                    e
                );
                Self::bundled()
            }
        }
    }

    pub fn platform(&self, key: &str) -> Option<&PlatformRules> {
        self.platforms.get(key)
    }
}
