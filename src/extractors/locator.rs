//! Message discovery
//!
//! Applies an ordered list of selectors to a document, folds every match into
//! its nearest container, drops duplicates and invisible nodes and returns the
//! survivors in document order.
//!
//! Generic patterns can fold into a wrapper around an anchor another pattern
//! already found. A candidate containing another candidate is the same turn
//! seen from outside and is dropped; the inner anchor is the one carrying the
//! role attributes.

use std::collections::HashSet;

use once_cell::sync::OnceCell;
use scraper::{ElementRef, Html, Selector};

use super::{closest, compile_selectors};

#[derive(Debug)]
struct CompiledSelectors {
    messages: Vec<Selector>,
    containers: Vec<Selector>,
}

#[derive(Debug)]
pub struct MessageLocator {
    message_patterns: Vec<String>,
    container_patterns: Vec<String>,
    compiled: OnceCell<CompiledSelectors>,
}

impl MessageLocator {
    /// `message_patterns` are tried most specific first; `container_patterns`
    /// name the outer boundaries a match is folded into.
    pub fn new<M, C>(message_patterns: M, container_patterns: C) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            message_patterns: message_patterns.into_iter().map(Into::into).collect(),
            container_patterns: container_patterns.into_iter().map(Into::into).collect(),
            compiled: OnceCell::new(),
        }
    }

    pub fn message_patterns(&self) -> &[String] {
        &self.message_patterns
    }

    fn selectors(&self) -> &CompiledSelectors {
        self.compiled.get_or_init(|| CompiledSelectors {
            messages: compile_selectors(&self.message_patterns),
            containers: compile_selectors(&self.container_patterns),
        })
    }

    /// Locate message anchors. Every selector contributes; an empty result
    /// is a normal outcome.
    pub fn locate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let selectors = self.selectors();
        let mut seen = HashSet::new();
        let mut collected = Vec::new();

        for selector in &selectors.messages {
            for node in document.select(selector) {
                let candidate = canonicalize(node, &selectors.containers);
                if seen.contains(&candidate.id()) || !is_visible(candidate) {
                    continue;
                }
                seen.insert(candidate.id());
                collected.push(candidate);
            }
        }

        let nested: HashSet<_> = collected
            .iter()
            .flat_map(|c| c.ancestors().map(|a| a.id()))
            .collect();
        collected.retain(|c| !nested.contains(&c.id()));

        sort_in_document_order(&mut collected);
        tracing::debug!("located {} message nodes", collected.len());
        collected
    }
}

/// Fold a match into the nearest ancestor-or-self matching a container
/// selector, trying the selectors in order.
fn canonicalize<'a>(node: ElementRef<'a>, containers: &[Selector]) -> ElementRef<'a> {
    containers
        .iter()
        .find_map(|selector| closest(node, selector))
        .unwrap_or(node)
}

/// Sibling indices from the root down to `node`. Comparing two paths
/// lexicographically is tree order: an ancestor's path is a prefix of its
/// descendants' paths and sorts first.
fn tree_path(node: ElementRef<'_>) -> Vec<usize> {
    let mut path: Vec<usize> = std::iter::once(*node)
        .chain(node.ancestors())
        .map(|n| n.prev_siblings().count())
        .collect();
    path.reverse();
    path
}

pub fn sort_in_document_order(nodes: &mut [ElementRef<'_>]) {
    nodes.sort_by_cached_key(|node| tree_path(*node));
}

/// An element is invisible only when it has no layout box and its own
/// computed style hides it.
pub fn is_visible(element: ElementRef<'_>) -> bool {
    has_layout_box(element) || !style_hides(element)
}

fn self_and_ancestors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap))
}

fn has_layout_box(element: ElementRef<'_>) -> bool {
    !self_and_ancestors(element).any(display_none)
}

fn display_none(element: ElementRef<'_>) -> bool {
    element.value().attr("hidden").is_some()
        || inline_style(element, "display").is_some_and(|v| v == "none")
}

fn style_hides(element: ElementRef<'_>) -> bool {
    if display_none(element) {
        return true;
    }

    // visibility is inherited, the nearest declaration wins
    let visibility = self_and_ancestors(element).find_map(|el| inline_style(el, "visibility"));
    if matches!(visibility.as_deref(), Some("hidden") | Some("collapse")) {
        return true;
    }

    inline_style(element, "opacity")
        .and_then(|v| v.parse::<f32>().ok())
        .is_some_and(|opacity| opacity <= 0.0)
}

/// Value of `property` in the element's inline `style`, lower-cased. The last
/// declaration wins.
fn inline_style(element: ElementRef<'_>, property: &str) -> Option<String> {
    let style = element.value().attr("style")?;
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            if !name.trim().eq_ignore_ascii_case(property) {
                return None;
            }
            let value = value.trim().to_lowercase();
            Some(value.trim_end_matches("!important").trim().to_string())
        })
        .last()
}
