//! KaTeX / MathJax / MathML detection

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use super::text::flatten;
use crate::flavours::MathMode;

const MATH_CLASSES: &[&str] = &[
    "katex",
    "katex-display",
    "MathJax",
    "MathJax_Display",
    "math-inline",
    "math-display",
];

const DISPLAY_CLASSES: &[&str] = &["katex-display", "MathJax_Display", "math-display"];

static TEX_ANNOTATION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"annotation[encoding="application/x-tex"]"#).unwrap());
static MATHML: Lazy<Selector> = Lazy::new(|| Selector::parse("math").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathKind {
    Inline,
    Display,
}

/// Whether `el` is the root of a rendered formula, and how it is laid out.
pub fn detect(el: ElementRef<'_>) -> Option<MathKind> {
    let value = el.value();
    let is_math = matches!(value.name(), "math" | "mjx-container")
        || value.classes().any(|class| MATH_CLASSES.contains(&class));
    if !is_math {
        return None;
    }

    let display = value.classes().any(|class| DISPLAY_CLASSES.contains(&class))
        || (value.name() == "mjx-container" && value.attr("display") == Some("true"))
        || (value.name() == "math" && value.attr("display") == Some("block"));

    Some(if display { MathKind::Display } else { MathKind::Inline })
}

/// TeX source of a formula: the TeX annotation when present, then an
/// `alttext` attribute, then the rendered text.
pub fn source(el: ElementRef<'_>) -> String {
    if let Some(annotation) = el.select(&TEX_ANNOTATION).next() {
        let tex = annotation.text().collect::<String>();
        let tex = tex.trim();
        if !tex.is_empty() {
            return tex.to_string();
        }
    }

    let alttext = std::iter::once(el)
        .chain(el.select(&MATHML))
        .find_map(|node| node.value().attr("alttext"))
        .map(str::trim)
        .filter(|alt| !alt.is_empty());
    if let Some(alt) = alttext {
        return alt.to_string();
    }

    flatten(&el.text().collect::<String>())
}

/// Markdown for a formula under `mode`. Display formulas are blocks.
pub fn render(source: &str, kind: MathKind, mode: MathMode) -> String {
    if source.is_empty() {
        return String::new();
    }
    match (mode, kind) {
        (MathMode::Dollar, MathKind::Display) => format!("$$\n{source}\n$$\n\n"),
        (MathMode::Dollar, MathKind::Inline) => format!("${source}$"),
        (MathMode::None, MathKind::Display) => format!("{source}\n\n"),
        (MathMode::None, MathKind::Inline) => source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const KATEX_INLINE: &str = r#"<p>Energy <span class="katex"><span class="katex-mathml"><math><semantics><mrow><mi>E</mi></mrow><annotation encoding="application/x-tex">E=mc^2</annotation></semantics></math></span><span class="katex-html" aria-hidden="true">E=mc2</span></span></p>"#;

    fn first<'a>(document: &'a Html, css: &str) -> ElementRef<'a> {
        document.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    #[test]
    fn test_detect_katex() {
        let document = Html::parse_fragment(KATEX_INLINE);
        let el = first(&document, ".katex");
        assert_eq!(detect(el), Some(MathKind::Inline));
        assert_eq!(source(el), "E=mc^2");
        assert_eq!(detect(first(&document, "p")), None);
    }

    #[test]
    fn test_detect_display_variants() {
        let html = r#"
            <span class="katex-display" id="a"></span>
            <mjx-container class="MathJax" display="true" id="b"></mjx-container>
            <div class="math-display" id="c">x</div>
            <span class="math-inline" id="d">y</span>
        "#;
        let document = Html::parse_fragment(html);
        assert_eq!(detect(first(&document, "#a")), Some(MathKind::Display));
        assert_eq!(detect(first(&document, "#b")), Some(MathKind::Display));
        assert_eq!(detect(first(&document, "#c")), Some(MathKind::Display));
        assert_eq!(detect(first(&document, "#d")), Some(MathKind::Inline));
    }

    #[test]
    fn test_alttext_fallback() {
        let html = r#"<span class="math-inline"><math alttext="\alpha"><mi>α</mi></math></span>"#;
        let document = Html::parse_fragment(html);
        assert_eq!(source(first(&document, ".math-inline")), r"\alpha");
    }

    #[test]
    fn test_render_modes() {
        assert_eq!(render("x^2", MathKind::Inline, MathMode::Dollar), "$x^2$");
        assert_eq!(render("x^2", MathKind::Display, MathMode::Dollar), "$$\nx^2\n$$\n\n");
        assert_eq!(render("x^2", MathKind::Inline, MathMode::None), "x^2");
        assert_eq!(render("", MathKind::Inline, MathMode::Dollar), "");
    }
}
