//! Extractor driven by [`PlatformRules`] configuration

use once_cell::sync::OnceCell;
use scraper::{ElementRef, Html, Selector};

use super::classifier::{compile_indicators, matches_or_contains};
use super::{normalise_role, ContentResolver, Extractor, MessageLocator, Role, RoleClassifier};
use crate::rules::PlatformRules;

#[derive(Debug)]
struct Indicators {
    user: Vec<Selector>,
    assistant: Vec<Selector>,
}

/// Extractor for sites whose markup is described by selector configuration.
#[derive(Debug)]
pub struct RulesExtractor {
    name: String,
    rules: PlatformRules,
    locator: MessageLocator,
    classifier: RoleClassifier,
    content: ContentResolver,
    indicators: OnceCell<Indicators>,
}

impl RulesExtractor {
    pub fn new(name: impl Into<String>, rules: PlatformRules) -> Self {
        Self {
            name: name.into(),
            locator: MessageLocator::new(
                rules.message_selectors.clone(),
                rules.container_selectors.clone(),
            ),
            classifier: RoleClassifier::new(),
            content: ContentResolver::new(rules.content_container.clone()),
            indicators: OnceCell::new(),
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &PlatformRules {
        &self.rules
    }

    fn indicators(&self) -> &Indicators {
        self.indicators.get_or_init(|| Indicators {
            user: compile_indicators(&self.rules.role_detection.user_indicators),
            assistant: compile_indicators(&self.rules.role_detection.assistant_indicators),
        })
    }
}

impl Extractor for RulesExtractor {
    fn message_nodes<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let nodes = self.locator.locate(document);
        tracing::debug!("{}: {} message nodes", self.name, nodes.len());
        nodes
    }

    fn role(&self, node: ElementRef<'_>) -> Option<Role> {
        let configured = self
            .rules
            .role_detection
            .data_attribute
            .as_deref()
            .and_then(|attr| node.value().attr(attr))
            .and_then(normalise_role);
        if configured.is_some() {
            return configured;
        }

        let indicators = self.indicators();
        if matches_or_contains(node, &indicators.user) {
            return Some(Role::User);
        }
        if matches_or_contains(node, &indicators.assistant) {
            return Some(Role::Assistant);
        }

        self.classifier.classify(node)
    }

    fn content_container<'a>(&self, node: ElementRef<'a>) -> Option<ElementRef<'a>> {
        Some(self.content.resolve(node))
    }
}
