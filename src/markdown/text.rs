//! Text-level helpers: whitespace normalization, inline code fences,
//! flattening.

use once_cell::sync::Lazy;
use regex::Regex;

static HORIZONTAL_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\x0B\x0C]+").unwrap());
static SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").unwrap());

/// Normalize a text node.
///
/// Line endings always become `\n`. With `collapse` set, non-breaking spaces
/// become plain spaces, horizontal whitespace runs shrink to one space and
/// spaces hugging a newline are dropped. Newlines themselves are never
/// collapsed here.
pub fn normalize_text(raw: &str, collapse: bool) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    if !collapse {
        return text;
    }

    let text = text.replace('\u{a0}', " ");
    let text = HORIZONTAL_WHITESPACE.replace_all(&text, " ");
    SPACE_AROUND_NEWLINE.replace_all(&text, "\n").into_owned()
}

/// All whitespace, newlines included, folded into single spaces.
pub fn flatten(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Longest run of `ch` in `text`.
pub fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Wrap `text` in an inline code span built from `marker`.
///
/// The fence is one character longer than the longest run of the marker
/// character inside the text, and the content is padded with a space on each
/// side when a parser would otherwise misread or strip its edges.
pub fn inline_code(text: &str, marker: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let tick = marker.chars().next().unwrap_or('`');
    let base = marker.chars().count().max(1);
    let longest = longest_run(text, tick);
    let width = if longest >= base { longest + 1 } else { base };
    let fence = tick.to_string().repeat(width);

    let space_wrapped =
        text.starts_with(' ') && text.ends_with(' ') && !text.chars().all(|c| c == ' ');
    if text.starts_with(tick) || text.ends_with(tick) || space_wrapped {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

/// Opening/closing fence for a code block, lengthened when a line of `code`
/// starts with a run of the fence character at least as long as `fence`.
pub fn code_fence(fence: &str, code: &str) -> String {
    let tick = fence.chars().next().unwrap_or('`');
    let base = fence.chars().count().max(3);
    let longest = code
        .lines()
        .map(|line| line.trim_start().chars().take_while(|c| *c == tick).count())
        .max()
        .unwrap_or(0);

    if longest >= base {
        tick.to_string().repeat(longest + 1)
    } else {
        fence.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("a  \t b", true), "a b");
        assert_eq!(normalize_text("a\u{a0}\u{a0}b", true), "a b");
        assert_eq!(normalize_text("line one\r\nline two\rthree", true), "line one\nline two\nthree");
        assert_eq!(normalize_text("\n      Hello world\n    ", true), "\nHello world\n");
        // blank lines survive normalization
        assert_eq!(normalize_text("a\n\n\n\nb", true), "a\n\n\n\nb");
    }

    #[test]
    fn test_normalize_disabled_keeps_text() {
        assert_eq!(normalize_text("a   b\n\n  c", false), "a   b\n\n  c");
        assert_eq!(normalize_text("a\r\nb", false), "a\nb");
    }

    #[test]
    fn test_flatten() {
        assert_eq!(flatten("  multi\n  line\u{a0}cell  "), "multi line cell");
        assert_eq!(flatten(" \n "), "");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(inline_code("let x = 1;", "`"), "`let x = 1;`");
        assert_eq!(inline_code("a`b", "`"), "``a`b``");
        assert_eq!(inline_code("a``b`c", "`"), "```a``b`c```");
        assert_eq!(inline_code("`tick", "`"), "`` `tick ``");
        assert_eq!(inline_code(" padded ", "`"), "`  padded  `");
        assert_eq!(inline_code("   ", "`"), "`   `");
        assert_eq!(inline_code("", "`"), "");
    }

    #[test]
    fn test_code_fence() {
        assert_eq!(code_fence("```", "console.log(1)"), "```");
        assert_eq!(code_fence("```", "```js\nnested\n```"), "````");
        assert_eq!(code_fence("~~~", "~~~~~ x"), "~~~~~~");
    }
}
