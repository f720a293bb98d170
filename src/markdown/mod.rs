//! DOM to Markdown serialization
//!
//! [`serialize`] converts one content container; [`serialize_entries`]
//! assembles a whole conversation, one `## Role` section per message. All
//! output conventions (fences, tables, math delimiters, whitespace handling)
//! come from the [`FlavourConfig`] passed in.

mod math;
mod serializer;
mod table;
mod text;

pub use math::MathKind;
pub use serializer::MarkdownSerializer;
pub use text::{code_fence, flatten, inline_code, normalize_text};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use crate::extractors::MessageEntry;
use crate::flavours::FlavourConfig;

/// Separator between consecutive messages.
pub const MESSAGE_SEPARATOR: &str = "\n\n---\n\n";

static BLANK_LINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Position of the serializer in the tree. Copied, never mutated: children
/// receive a modified copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializationContext {
    /// Inside an ordered list
    pub ordered: bool,
    /// Zero-based index of the current list item
    pub index: usize,
    /// List nesting depth
    pub depth: usize,
    /// Inside a code block: text is emitted raw
    pub in_code: bool,
}

impl SerializationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, ordered: bool, index: usize) -> Self {
        Self {
            ordered,
            index,
            ..self
        }
    }

    pub fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    pub fn in_code_block(self) -> Self {
        Self {
            in_code: true,
            ..self
        }
    }
}

/// Serialize `container` and its subtree. An empty container yields an
/// empty string.
pub fn serialize(
    container: ElementRef<'_>,
    flavour: &FlavourConfig,
    ctx: SerializationContext,
) -> String {
    MarkdownSerializer::new(flavour)
        .element(container, ctx)
        .trim()
        .to_string()
}

/// Body of a single message, blank line runs collapsed when the flavour asks
/// for it.
pub fn serialize_message(container: ElementRef<'_>, flavour: &FlavourConfig) -> String {
    let body = serialize(container, flavour, SerializationContext::new());
    if flavour.collapse_blank_lines {
        collapse_blank_lines(&body)
    } else {
        body
    }
}

/// Assemble a conversation document: a `## Role` heading per message, a
/// horizontal rule between messages, a single trailing newline.
pub fn serialize_entries(entries: &[MessageEntry<'_>], flavour: &FlavourConfig) -> String {
    let sections: Vec<String> = entries
        .iter()
        .map(|entry| {
            let body = serialize(entry.container, flavour, SerializationContext::new());
            if body.is_empty() {
                format!("## {}", entry.role.label())
            } else {
                format!("## {}\n\n{}", entry.role.label(), body)
            }
        })
        .collect();

    let mut document = sections.join(MESSAGE_SEPARATOR);
    if flavour.collapse_blank_lines {
        document = collapse_blank_lines(&document);
    }

    let document = document.trim_end();
    if document.is_empty() {
        String::new()
    } else {
        format!("{document}\n")
    }
}

/// Replace every run of three or more newlines with exactly two.
pub fn collapse_blank_lines(markdown: &str) -> String {
    BLANK_LINE_RUNS.replace_all(markdown, "\n\n").into_owned()
}
