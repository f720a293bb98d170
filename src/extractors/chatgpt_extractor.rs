//! ChatGPT conversation extractor
//!
//! Tolerates several generations of ChatGPT markup: every selector below
//! contributes candidates, so messages still matched by an older, generic
//! pattern survive a change to the more specific ones.

use scraper::{ElementRef, Html};

use super::{ContentResolver, Extractor, MessageLocator, Role, RoleClassifier};

pub const CHATGPT_MESSAGE_SELECTORS: &[&str] = &[
    "[data-message-author-role]",
    r#"[data-testid^="conversation-turn"]"#,
    r#"[data-testid="conversation-message"]"#,
    r#"[data-testid="conversation-turn-main"] article"#,
    r#"article[data-testid^="message"]"#,
    "div[data-message-id]",
    r#"[role="listitem"] [data-message-author-role]"#,
    r#"[role="listitem"] article"#,
    ".group.w-full",
    r#"article[class*="message"]"#,
];

pub const CHATGPT_CONTAINER_SELECTORS: &[&str] = &[
    "[data-message-author-role]",
    r#"[data-testid^="conversation-turn"]"#,
    r#"article[data-testid^="message"]"#,
    "div[data-message-id]",
    r#"[role="listitem"] article"#,
    "article",
];

pub const CHATGPT_CONTENT_SELECTORS: &[&str] = &[
    r#"[data-testid="markdown"]"#,
    r#"[data-testid="conversation-message-viewport"]"#,
    r#"[data-testid="conversation-content"]"#,
    "[data-message-author-role] [data-message-author-role]",
    r#"[data-role="message-content"]"#,
    r#"[role="presentation"] [data-testid="markdown"]"#,
    r#"[data-testid="assistant-response"]"#,
    "[data-message-author-role]",
    ".markdown",
];

#[derive(Debug)]
pub struct ChatGptExtractor {
    locator: MessageLocator,
    classifier: RoleClassifier,
    content: ContentResolver,
}

impl ChatGptExtractor {
    pub fn new() -> Self {
        Self {
            locator: MessageLocator::new(
                CHATGPT_MESSAGE_SELECTORS.iter().copied(),
                CHATGPT_CONTAINER_SELECTORS.iter().copied(),
            ),
            classifier: RoleClassifier::new(),
            content: ContentResolver::new(CHATGPT_CONTENT_SELECTORS.iter().copied()),
        }
    }
}

impl Default for ChatGptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for ChatGptExtractor {
    fn message_nodes<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        self.locator.locate(document)
    }

    fn role(&self, node: ElementRef<'_>) -> Option<Role> {
        self.classifier.classify(node)
    }

    fn content_container<'a>(&self, node: ElementRef<'a>) -> Option<ElementRef<'a>> {
        Some(self.content.resolve(node))
    }
}
