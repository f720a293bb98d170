//! Role classification
//!
//! Heuristic cascade, first match wins:
//! 1. explicit role attributes on the node
//! 2. `data-testid` patterns
//! 3. accessibility labels
//! 4. a descendant badge element

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{compile_selectors, normalise_role, Role};

const ROLE_ATTRIBUTES: &[&str] = &["data-message-author-role", "data-author-role", "data-role"];

const LABEL_ATTRIBUTES: &[&str] = &["aria-label", "aria-labelledby"];

const BADGE_SELECTORS: &[&str] = &[
    r#"[data-testid="conversation-turn-badge"]"#,
    r#"[data-testid="author-role"]"#,
    r#"[aria-label*="assistant" i]"#,
    r#"[aria-label*="user" i]"#,
    r#"[aria-label*="system" i]"#,
];

static TEST_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)conversation-turn-?(assistant|user|system)").unwrap(),
        Regex::new(r"(?i)(assistant|user|system)-message").unwrap(),
    ]
});

#[derive(Debug, Default)]
pub struct RoleClassifier {
    badge: OnceCell<Selector>,
}

impl RoleClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combined badge selector, compiled on first use.
    fn badge_selector(&self) -> Option<&Selector> {
        self.badge
            .get_or_try_init(|| {
                let joined = BADGE_SELECTORS.join(", ");
                Selector::parse(&joined).map_err(|e| format!("{:?}", e))
            })
            .map_err(|e| tracing::warn!("badge selector rejected: {}", e))
            .ok()
    }

    /// Role of `node`, or `None` when no rule fires.
    pub fn classify(&self, node: ElementRef<'_>) -> Option<Role> {
        let element = node.value();

        if let Some(role) = ROLE_ATTRIBUTES
            .iter()
            .filter_map(|attr| element.attr(attr))
            .find_map(normalise_role)
        {
            return Some(role);
        }

        if let Some(role) = element.attr("data-testid").and_then(role_from_test_id) {
            return Some(role);
        }

        if let Some(role) = LABEL_ATTRIBUTES
            .iter()
            .filter_map(|attr| element.attr(attr))
            .find_map(normalise_role)
        {
            return Some(role);
        }

        let badge = node.select(self.badge_selector()?).next()?;
        match badge.value().attr("aria-label") {
            Some(label) => normalise_role(label),
            None => normalise_role(&badge.text().collect::<String>()),
        }
    }
}

fn role_from_test_id(test_id: &str) -> Option<Role> {
    TEST_ID_PATTERNS.iter().find_map(|pattern| {
        let captured = pattern.captures(test_id)?.get(1)?;
        normalise_role(captured.as_str())
    })
}

/// Whether `node` matches, or contains an element matching, any selector.
pub(crate) fn matches_or_contains(node: ElementRef<'_>, selectors: &[Selector]) -> bool {
    selectors
        .iter()
        .any(|selector| selector.matches(&node) || node.select(selector).next().is_some())
}

/// Compile indicator selectors for [`matches_or_contains`].
pub(crate) fn compile_indicators(patterns: &[String]) -> Vec<Selector> {
    compile_selectors(patterns)
}
