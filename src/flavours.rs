//! Markdown flavour registry
//!
//! A flavour is a named bundle of output conventions. Flavours are read from
//! a JSON table where every entry except `base` may list only the fields it
//! changes; lookups always yield a fully populated [`FlavourConfig`].

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::FlavourError;

const BUNDLED_FLAVOURS: &str = include_str!("../config/flavours.json");

/// Name of the flavour every lookup falls back to.
pub const BASE_FLAVOUR: &str = "base";

static BUILTIN: Lazy<FlavourRegistry> = Lazy::new(FlavourRegistry::builtin);

/// Process-wide registry built from the bundled flavour table.
pub fn registry() -> &'static FlavourRegistry {
    &BUILTIN
}

/// How mathematical expressions are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathMode {
    /// Raw source, no delimiters
    #[default]
    None,
    /// `$inline$` and `$$block$$`
    Dollar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlavourConfig {
    pub fence: String,
    pub inline_code: String,
    pub tables: bool,
    pub math: MathMode,
    pub normalize_whitespace: bool,
    pub collapse_blank_lines: bool,
}

impl Default for FlavourConfig {
    fn default() -> Self {
        Self {
            fence: "```".to_string(),
            inline_code: "`".to_string(),
            tables: true,
            math: MathMode::None,
            normalize_whitespace: true,
            collapse_blank_lines: true,
        }
    }
}

/// Partial flavour as written in the source table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlavourOverrides {
    #[serde(default)]
    pub fence: Option<String>,
    #[serde(default)]
    pub inline_code: Option<String>,
    #[serde(default)]
    pub tables: Option<bool>,
    #[serde(default)]
    pub math: Option<MathMode>,
    #[serde(default)]
    pub normalize_whitespace: Option<bool>,
    #[serde(default)]
    pub collapse_blank_lines: Option<bool>,
}

impl FlavourOverrides {
    /// Apply the explicit fields on top of `base`, field by field.
    pub fn apply(&self, base: &FlavourConfig) -> FlavourConfig {
        FlavourConfig {
            fence: self
                .fence
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| base.fence.clone()),
            inline_code: self
                .inline_code
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| base.inline_code.clone()),
            tables: self.tables.unwrap_or(base.tables),
            math: self.math.unwrap_or(base.math),
            normalize_whitespace: self.normalize_whitespace.unwrap_or(base.normalize_whitespace),
            collapse_blank_lines: self.collapse_blank_lines.unwrap_or(base.collapse_blank_lines),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlavourRegistry {
    base: FlavourConfig,
    flavours: BTreeMap<String, FlavourOverrides>,
}

impl FlavourRegistry {
    /// Registry from the flavour table shipped with the crate.
    ///
    /// Falls back to a registry holding only the default `base` flavour if
    /// the bundled table cannot be parsed.
    pub fn builtin() -> Self {
        match Self::from_json(BUNDLED_FLAVOURS) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!("bundled flavour table rejected: {}", e);
                Self::base_only()
            }
        }
    }

    pub fn base_only() -> Self {
        Self {
            base: FlavourConfig::default(),
            flavours: BTreeMap::new(),
        }
    }

    /// Parse a flavour table. A `base` entry, if present, is itself applied
    /// over the crate defaults.
    pub fn from_json(json: &str) -> Result<Self, FlavourError> {
        let mut flavours: BTreeMap<String, FlavourOverrides> = serde_json::from_str(json)?;
        let base = flavours
            .remove(BASE_FLAVOUR)
            .map(|o| o.apply(&FlavourConfig::default()))
            .unwrap_or_default();
        Ok(Self { base, flavours })
    }

    pub fn base(&self) -> &FlavourConfig {
        &self.base
    }

    /// Resolve a flavour by name. Unknown names silently yield `base`.
    pub fn resolve(&self, name: &str) -> FlavourConfig {
        match self.flavours.get(name.trim()) {
            Some(overrides) => overrides.apply(&self.base),
            None => {
                if name != BASE_FLAVOUR {
                    tracing::debug!("unknown flavour '{}', using base", name);
                }
                self.base.clone()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        name == BASE_FLAVOUR || self.flavours.contains_key(name)
    }

    /// Registered flavour names, `base` first.
    pub fn names(&self) -> Vec<&str> {
        std::iter::once(BASE_FLAVOUR)
            .chain(self.flavours.keys().map(String::as_str))
            .collect()
    }
}

impl Default for FlavourRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
