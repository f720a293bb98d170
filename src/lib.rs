//! Chat conversation to Markdown exporter
//!
//! Turns the rendered HTML of a chat assistant page into a Markdown document:
//! - Site detection from the page URL (ChatGPT, Claude, Gemini, Perplexity)
//! - Message discovery and role classification per site
//! - DOM to Markdown serialization under configurable flavours
//! - C ABI (`ffi`) and the `chat2md` command-line front end

pub mod error;
pub mod exporter;
pub mod extractors;
pub mod ffi;
pub mod flavours;
pub mod markdown;
pub mod rules;
pub mod sites;

pub use error::{ExportError, Result};
pub use exporter::{EnvPreferences, Exporter, MemoryPreferences, PreferenceStore};
pub use extractors::{ExportedMessage, Extractor, MessageEntry, Role};
pub use flavours::{FlavourConfig, FlavourRegistry, MathMode};
pub use rules::SelectorConfig;
pub use sites::{SiteKey, SiteRegistry};
