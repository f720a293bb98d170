//! Placeholder for recognized sites without extraction support yet

use scraper::{ElementRef, Html};

use super::{Extractor, MessageEntry, Role};
use crate::flavours::FlavourConfig;

/// Yields no messages and serializes to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullExtractor;

impl Extractor for NullExtractor {
    fn message_nodes<'a>(&self, _document: &'a Html) -> Vec<ElementRef<'a>> {
        Vec::new()
    }

    fn role(&self, _node: ElementRef<'_>) -> Option<Role> {
        None
    }

    fn content_container<'a>(&self, _node: ElementRef<'a>) -> Option<ElementRef<'a>> {
        None
    }

    fn can_extract(&self, _document: &Html) -> bool {
        false
    }

    fn serialize(&self, _entries: &[MessageEntry<'_>], _flavour: &FlavourConfig) -> String {
        String::new()
    }
}
