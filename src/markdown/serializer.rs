//! Element-by-element DOM to Markdown conversion

use once_cell::sync::Lazy;
use scraper::{ElementRef, Node, Selector};

use super::math::{self, MathKind};
use super::table;
use super::text::{code_fence, inline_code, normalize_text};
use super::SerializationContext;
use crate::flavours::FlavourConfig;

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dialog", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "ul",
];

/// Largest ordered list start number CommonMark accepts.
const MAX_LIST_START: usize = 999_999_999;

/// Syntax highlighters emit this when they could not tell the language.
const PLACEHOLDER_LANGUAGE: &str = "language-none";

static CODE: Lazy<Selector> = Lazy::new(|| Selector::parse("code").unwrap());

pub struct MarkdownSerializer<'f> {
    flavour: &'f FlavourConfig,
}

impl<'f> MarkdownSerializer<'f> {
    pub fn new(flavour: &'f FlavourConfig) -> Self {
        Self { flavour }
    }

    /// Serialize `el` and everything below it.
    pub fn element(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        let name = el.value().name();
        if SKIPPED_TAGS.contains(&name) {
            return String::new();
        }
        if ctx.in_code {
            return self.code_element(el, ctx);
        }
        if let Some(kind) = math::detect(el) {
            return math::render(&math::source(el), kind, self.flavour.math);
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.heading(el, ctx),
            "strong" | "b" => self.emphasis(el, ctx, "**"),
            "em" | "i" => self.emphasis(el, ctx, "*"),
            "del" | "s" | "strike" => self.emphasis(el, ctx, "~~"),
            "br" => "  \n".to_string(),
            "hr" => "---\n\n".to_string(),
            "code" => inline_code(&self.children(el, ctx.in_code_block()), &self.flavour.inline_code),
            "pre" => self.code_block(el, ctx),
            "ul" => self.list(el, ctx, false),
            "ol" => self.list(el, ctx, true),
            "blockquote" => self.blockquote(el, ctx),
            "table" => table::convert(el, self.flavour.tables),
            "a" => self.link(el, ctx),
            "img" => self.image(el),
            _ if is_block(el) => self.block(el, ctx),
            _ => self.children(el, ctx),
        }
    }

    /// Concatenate the serialized children of `el`, separating blocks by one
    /// blank line.
    pub fn children(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        let mut out = String::new();

        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    if ctx.in_code {
                        out.push_str(text);
                        continue;
                    }
                    // indentation between blocks, not content
                    let formatting = text.trim().is_empty()
                        && (child.prev_sibling().map_or(true, |n| ElementRef::wrap(n).is_some_and(is_block))
                            || child.next_sibling().map_or(true, |n| ElementRef::wrap(n).is_some_and(is_block)));
                    if !formatting {
                        out.push_str(&normalize_text(text, self.flavour.normalize_whitespace));
                    }
                }
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };
                    let chunk = self.element(child, ctx);
                    if chunk.is_empty() {
                        continue;
                    }
                    if !ctx.in_code && is_block(child) {
                        separate_block(&mut out);
                    }
                    out.push_str(&chunk);
                }
                _ => {}
            }
        }

        out
    }

    /// Inside a code block only text and line breaks matter.
    fn code_element(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        match el.value().name() {
            "br" => "\n".to_string(),
            // highlighters that wrap each line in its own block
            "div" | "p" => {
                let mut line = self.children(el, ctx);
                if !line.ends_with('\n') {
                    line.push('\n');
                }
                line
            }
            _ => self.children(el, ctx),
        }
    }

    fn block(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        let inner = self.children(el, ctx);
        let inner = inner.trim();
        if inner.is_empty() {
            String::new()
        } else {
            format!("{inner}\n\n")
        }
    }

    fn heading(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        let level = el.value().name()[1..]
            .parse::<usize>()
            .unwrap_or(1)
            .clamp(1, 6);
        let inner = self.children(el, ctx);
        let inner = inner.trim().replace('\n', " ");
        if inner.is_empty() {
            return String::new();
        }
        format!("{} {inner}\n\n", "#".repeat(level))
    }

    /// Wrap the content in `marker`, keeping surrounding whitespace outside
    /// the markers so they still bind to the text.
    fn emphasis(&self, el: ElementRef<'_>, ctx: SerializationContext, marker: &str) -> String {
        let inner = self.children(el, ctx);
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let leading = &inner[..inner.len() - inner.trim_start().len()];
        let trailing = &inner[inner.trim_end().len()..];
        format!("{leading}{marker}{trimmed}{marker}{trailing}")
    }

    fn code_block(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        let code_el = el.select(&CODE).next().unwrap_or(el);
        let language = language_of(code_el)
            .or_else(|| language_of(el))
            .unwrap_or_default();

        let mut code = self.children(code_el, ctx.in_code_block());
        if code.ends_with('\n') {
            code.pop();
        }
        if code.trim().is_empty() {
            return String::new();
        }

        let fence = code_fence(&self.flavour.fence, &code);
        format!("{fence}{language}\n{code}\n{fence}\n\n")
    }

    fn list(&self, el: ElementRef<'_>, ctx: SerializationContext, ordered: bool) -> String {
        let start = if ordered {
            el.value()
                .attr("start")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1)
                .min(MAX_LIST_START)
        } else {
            1
        };
        let indent = "  ".repeat(ctx.depth);

        let mut out = String::new();
        let items = el
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "li");
        for (index, item) in items.enumerate() {
            let item_ctx = ctx.with_list(ordered, index).nested();
            let marker = list_marker(item_ctx, start);
            let body = self.children(item, item_ctx);
            let body = self.indent_continuation(body.trim(), item_ctx.depth);
            let line = format!("{indent}{marker}{body}");
            out.push_str(line.trim_end());
            out.push('\n');
        }

        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Indent every line after the first of a list item body so it stays
    /// inside the item.
    ///
    /// Outside fenced code, runs of blank lines shrink to one and disappear
    /// before a nested list item, keeping nested lists tight. Inside a fence
    /// every line is kept; the fence closes only on a line equal to the
    /// opening fence.
    fn indent_continuation(&self, body: &str, depth: usize) -> String {
        let indent = "  ".repeat(depth);

        let mut lines = Vec::new();
        let mut open_fence: Option<String> = None;
        let mut pending_blank = false;
        for (i, line) in body.lines().enumerate() {
            if let Some(fence) = &open_fence {
                if line.trim() == fence.as_str() {
                    open_fence = None;
                }
                if line.trim().is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{indent}{line}"));
                }
                continue;
            }

            if line.trim().is_empty() {
                pending_blank = i > 0;
                continue;
            }
            if pending_blank && !is_list_item_line(line) {
                lines.push(String::new());
            }
            pending_blank = false;

            if i == 0 || line.starts_with(char::is_whitespace) {
                // indented lines belong to a nested list and are final
                if i == 0 {
                    open_fence = self.opening_fence(line);
                }
                lines.push(line.to_string());
            } else {
                open_fence = self.opening_fence(line);
                lines.push(format!("{indent}{line}"));
            }
        }
        lines.join("\n")
    }

    /// The fence run opening a code block on `line`, if any.
    fn opening_fence(&self, line: &str) -> Option<String> {
        let tick = self.flavour.fence.chars().next().unwrap_or('`');
        let base = self.flavour.fence.chars().count().max(3);
        let run: String = line.chars().take_while(|c| *c == tick).collect();
        (run.chars().count() >= base).then_some(run)
    }

    fn blockquote(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        let inner = self.children(el, ctx);
        let inner = inner.trim();
        if inner.is_empty() {
            return String::new();
        }
        let quoted: Vec<String> = inner.lines().map(|line| format!("> {line}")).collect();
        format!("{}\n\n", quoted.join("\n"))
    }

    fn link(&self, el: ElementRef<'_>, ctx: SerializationContext) -> String {
        let text = self.children(el, ctx);
        let text = text.trim();
        let href = el
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty());

        match href {
            None => text.to_string(),
            Some(href) => {
                let label = if text.is_empty() { href } else { text };
                format!("[{label}]({href}{})", title_suffix(el))
            }
        }
    }

    fn image(&self, el: ElementRef<'_>) -> String {
        let value = el.value();
        let Some(src) = value.attr("src").map(str::trim).filter(|src| !src.is_empty()) else {
            return String::new();
        };
        let alt = value.attr("alt").unwrap_or("").trim();
        format!("![{alt}]({src}{})", title_suffix(el))
    }
}

fn list_marker(item_ctx: SerializationContext, start: usize) -> String {
    if item_ctx.ordered {
        format!("{}. ", start.saturating_add(item_ctx.index))
    } else {
        "- ".to_string()
    }
}

fn is_list_item_line(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with("- ") {
        return true;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(". ")
}

fn title_suffix(el: ElementRef<'_>) -> String {
    match el.value().attr("title").map(str::trim) {
        Some(title) if !title.is_empty() => format!(" \"{}\"", title.replace('"', "\\\"")),
        _ => String::new(),
    }
}

fn is_block(el: ElementRef<'_>) -> bool {
    BLOCK_TAGS.contains(&el.value().name()) || math::detect(el) == Some(MathKind::Display)
}

fn language_of(el: ElementRef<'_>) -> Option<String> {
    el.value()
        .classes()
        .filter(|class| *class != PLACEHOLDER_LANGUAGE)
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|language| !language.is_empty())
        .map(str::to_string)
}

/// Make sure the next chunk starts after exactly one blank line.
fn separate_block(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    let kept = out.trim_end_matches([' ', '\t']).len();
    out.truncate(kept);
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavours::{registry, MathMode};
    use scraper::Html;

    fn render_with(html: &str, flavour: &FlavourConfig) -> String {
        let document = Html::parse_fragment(html);
        let serializer = MarkdownSerializer::new(flavour);
        serializer
            .element(document.root_element(), SerializationContext::new())
            .trim()
            .to_string()
    }

    fn render(html: &str) -> String {
        render_with(html, &FlavourConfig::default())
    }

    #[test]
    fn test_headings() {
        assert_eq!(render("<h1>Title</h1>"), "# Title");
        assert_eq!(render("<h3> Spaced  <em>out</em> </h3>"), "### Spaced *out*");
        assert_eq!(render("<h2>   </h2>"), "");
    }

    #[test]
    fn test_paragraphs_are_separated() {
        assert_eq!(
            render("<p>one</p>\n   <p>two</p><div>three</div>"),
            "one\n\ntwo\n\nthree"
        );
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(render("<p><strong>bold</strong> and <b>b</b></p>"), "**bold** and **b**");
        assert_eq!(render("<p><em>it</em><i>al</i></p>"), "*it**al*");
        assert_eq!(render("<p><del>gone</del> <s>x</s> <strike>y</strike></p>"), "~~gone~~ ~~x~~ ~~y~~");
        assert_eq!(render("<p>a<strong> </strong>b</p>"), "ab");
        assert_eq!(render("<p>a<strong>bold </strong>b</p>"), "a**bold** b");
        // nested emphasis is not merged
        assert_eq!(render("<p><strong><em>both</em></strong></p>"), "***both***");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(render("<p>one<br>two</p>"), "one  \ntwo");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(render("<p>run <code>cargo  test</code></p>"), "run `cargo  test`");
        assert_eq!(render("<p><code>a`b</code></p>"), "``a`b``");
    }

    #[test]
    fn test_code_block() {
        let html = r#"<pre><div>js</div><code class="hljs language-js">const a = 1;
    const b = 2;
</code></pre>"#;
        assert_eq!(render(html), "```js\nconst a = 1;\n    const b = 2;\n```");
    }

    #[test]
    fn test_code_block_without_code_element() {
        assert_eq!(render("<pre>plain\ntext</pre>"), "```\nplain\ntext\n```");
        assert_eq!(render(r#"<pre><code class="language-none">x</code></pre>"#), "```\nx\n```");
        assert_eq!(render("<pre><code></code></pre>"), "");
    }

    #[test]
    fn test_code_block_keeps_markup_out() {
        let html = r#"<pre><code class="language-rust"><span class="kw">fn</span> main() {<br>}</code></pre>"#;
        assert_eq!(render(html), "```rust\nfn main() {\n}\n```");
    }

    #[test]
    fn test_code_block_fence_lengthened() {
        let html = "<pre><code>```\ninner\n```</code></pre>";
        assert_eq!(render(html), "````\n```\ninner\n```\n````");
    }

    #[test]
    fn test_unordered_list() {
        assert_eq!(
            render("<ul><li>one</li><li>two</li><li>three</li></ul>"),
            "- one\n- two\n- three"
        );
    }

    #[test]
    fn test_ordered_list_ignores_stray_children() {
        let html = r#"<ol start="3"><li>c</li><span>noise</span><li>d</li></ol>"#;
        assert_eq!(render(html), "3. c\n4. d");
        assert_eq!(render("<ul><span>x</span></ul>"), "");
    }

    #[test]
    fn test_ordered_list_huge_start() {
        let html = r#"<ol start="18446744073709551615"><li>a</li><li>b</li></ol>"#;
        assert_eq!(render(html), "999999999. a\n1000000000. b");
        assert_eq!(render(r#"<ol start="-4"><li>a</li></ol>"#), "1. a");
    }

    #[test]
    fn test_nested_list() {
        let html = "<ul><li>parent<ul><li>child</li><li>sibling</li></ul></li><li>next</li></ul>";
        assert_eq!(render(html), "- parent\n  - child\n  - sibling\n- next");
    }

    #[test]
    fn test_list_item_with_paragraphs() {
        let html = "<ol><li><p>first para</p><p>second para</p></li></ol>";
        assert_eq!(render(html), "1. first para\n\n  second para");
    }

    #[test]
    fn test_list_item_with_lengthened_fence() {
        let html = "<ul><li><pre><code>```\n\nz\n\nw</code></pre></li></ul>";
        assert_eq!(render(html), "- ````\n  ```\n\n  z\n\n  w\n  ````");
    }

    #[test]
    fn test_list_item_text_after_code() {
        let html = "<ol><li><p>run</p><pre><code>a\n\nb</code></pre><p>done</p></li></ol>";
        assert_eq!(render(html), "1. run\n\n  ```\n  a\n\n  b\n  ```\n\n  done");
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            render("<blockquote><p>quoted</p><p>more</p></blockquote>"),
            "> quoted\n> \n> more"
        );
    }

    #[test]
    fn test_links_and_images() {
        assert_eq!(
            render(r#"<p><a href="https://example.com">site</a></p>"#),
            "[site](https://example.com)"
        );
        assert_eq!(
            render(r#"<p><a href="https://example.com" title="Ex">site</a></p>"#),
            "[site](https://example.com \"Ex\")"
        );
        assert_eq!(
            render(r#"<p><a href="https://example.com"></a></p>"#),
            "[https://example.com](https://example.com)"
        );
        assert_eq!(render("<p><a>anchor</a></p>"), "anchor");
        assert_eq!(render(r#"<p><img src="/cat.png" alt="cat"></p>"#), "![cat](/cat.png)");
        assert_eq!(render(r#"<p><img alt="no source"></p>"#), "");
    }

    #[test]
    fn test_horizontal_rule() {
        assert_eq!(render("<p>a</p><hr><p>b</p>"), "a\n\n---\n\nb");
    }

    #[test]
    fn test_skipped_and_unknown_elements() {
        assert_eq!(
            render("<p>keep<script>alert(1)</script><style>p{}</style></p>"),
            "keep"
        );
        assert_eq!(render("<p><span>in</span><custom-tag>side</custom-tag></p>"), "inside");
    }

    #[test]
    fn test_math_modes() {
        let html = r#"<p>Area <span class="katex"><math><semantics><annotation encoding="application/x-tex">\pi r^2</annotation></semantics></math></span></p><div class="math-display">E=mc^2</div>"#;

        let mut flavour = FlavourConfig::default();
        flavour.math = MathMode::Dollar;
        assert_eq!(render_with(html, &flavour), "Area $\\pi r^2$\n\n$$\nE=mc^2\n$$");

        flavour.math = MathMode::None;
        assert_eq!(render_with(html, &flavour), "Area \\pi r^2\n\nE=mc^2");
    }

    #[test]
    fn test_tables_follow_flavour() {
        let html = "<table><tr><th>A</th></tr><tr><td>1</td></tr></table>";
        assert_eq!(render(html), "| A |\n| --- |\n| 1 |");
        let commonmark = registry().resolve("commonmark");
        assert_eq!(render_with(html, &commonmark), "A\n1");
    }

    #[test]
    fn test_whitespace_normalization() {
        let html = "<p>spread   out\u{a0}text\n   wrapped</p>";
        assert_eq!(render(html), "spread out text\nwrapped");

        let obsidian = registry().resolve("obsidian");
        assert_eq!(render_with(html, &obsidian), "spread   out\u{a0}text\n   wrapped");
    }

    #[test]
    fn test_separate_block() {
        let mut out = String::from("text  ");
        separate_block(&mut out);
        assert_eq!(out, "text\n\n");

        let mut out = String::from("line\n");
        separate_block(&mut out);
        assert_eq!(out, "line\n\n");

        let mut out = String::new();
        separate_block(&mut out);
        assert_eq!(out, "");
    }
}
