//! Content container resolution

use once_cell::sync::{Lazy, OnceCell};
use scraper::{ElementRef, Selector};

use super::compile_selectors;

/// Tags that carry renderable content, used when no configured selector hits.
static CONTENT_TAGS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("pre, code, table, p, li, h1, h2, h3, h4, h5, h6, blockquote").unwrap()
});

#[derive(Debug)]
pub struct ContentResolver {
    patterns: Vec<String>,
    compiled: OnceCell<Vec<Selector>>,
}

impl ContentResolver {
    pub fn new<I>(patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            compiled: OnceCell::new(),
        }
    }

    fn selectors(&self) -> &[Selector] {
        self.compiled.get_or_init(|| compile_selectors(&self.patterns))
    }

    /// Element holding the message body of `anchor`: the anchor itself or a
    /// descendant. Never fails; degrades to the anchor.
    pub fn resolve<'a>(&self, anchor: ElementRef<'a>) -> ElementRef<'a> {
        for selector in self.selectors() {
            if selector.matches(&anchor) {
                return anchor;
            }
            if let Some(found) = anchor.select(selector).next() {
                return found;
            }
        }

        anchor.select(&CONTENT_TAGS).next().unwrap_or(anchor)
    }
}
