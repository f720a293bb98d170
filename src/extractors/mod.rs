//! Conversation extractors
//!
//! Each supported site owns one [`Extractor`]. The building blocks shared by
//! the implementations live in their own modules: message discovery
//! ([`MessageLocator`]), role classification ([`RoleClassifier`]) and content
//! container resolution ([`ContentResolver`]).

mod chatgpt_extractor;
mod classifier;
mod content;
mod locator;
mod null_extractor;
mod rules_extractor;

pub use chatgpt_extractor::*;
pub use classifier::*;
pub use content::*;
pub use locator::*;
pub use null_extractor::*;
pub use rules_extractor::*;

use std::fmt;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::flavours::{self, FlavourConfig};
use crate::markdown;

/// Conversational role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Used when classification is inconclusive
    #[default]
    Assistant,
    System,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One message located in a document.
///
/// `container` is `node` itself or one of its descendants.
#[derive(Debug, Clone, Copy)]
pub struct MessageEntry<'a> {
    pub node: ElementRef<'a>,
    pub role: Role,
    pub container: ElementRef<'a>,
}

/// Serialized message, as handed across the FFI and CLI boundaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedMessage {
    pub role: Role,
    pub markdown: String,
}

/// Capability set of a site extractor
pub trait Extractor: Send + Sync {
    /// Message anchors in document order.
    fn message_nodes<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>>;

    fn role(&self, node: ElementRef<'_>) -> Option<Role>;

    /// Element holding the renderable body of the message anchored at `node`.
    fn content_container<'a>(&self, node: ElementRef<'a>) -> Option<ElementRef<'a>>;

    fn can_extract(&self, _document: &Html) -> bool {
        true
    }

    /// Anchors paired with their role (defaulting to assistant) and
    /// content container (defaulting to the anchor).
    fn entries<'a>(&self, document: &'a Html) -> Vec<MessageEntry<'a>> {
        self.message_nodes(document)
            .into_iter()
            .map(|node| MessageEntry {
                node,
                role: self.role(node).unwrap_or_default(),
                container: self.content_container(node).unwrap_or(node),
            })
            .collect()
    }

    fn serialize(&self, entries: &[MessageEntry<'_>], flavour: &FlavourConfig) -> String {
        markdown::serialize_entries(entries, flavour)
    }

    /// Serialize with a flavour looked up by name in the built-in registry.
    fn serialize_named(&self, entries: &[MessageEntry<'_>], flavour: &str) -> String {
        self.serialize(entries, &flavours::registry().resolve(flavour))
    }
}

/// Compile selector strings, skipping (and logging) the ones that do not parse.
pub(crate) fn compile_selectors<S: AsRef<str>>(patterns: &[S]) -> Vec<Selector> {
    patterns
        .iter()
        .filter_map(|pattern| match Selector::parse(pattern.as_ref()) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!("skipping invalid selector '{}': {:?}", pattern.as_ref(), e);
                None
            }
        })
        .collect()
}

/// Nearest ancestor-or-self matching `selector`.
pub(crate) fn closest<'a>(node: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    std::iter::once(node)
        .chain(node.ancestors().filter_map(ElementRef::wrap))
        .find(|el| selector.matches(el))
}

/// Match a free-form string against role names.
pub(crate) fn normalise_role(value: &str) -> Option<Role> {
    let lower = value.to_lowercase();
    if lower.contains("assistant") {
        Some(Role::Assistant)
    } else if lower.contains("user") {
        Some(Role::User)
    } else if lower.contains("system") {
        Some(Role::System)
    } else {
        None
    }
}
