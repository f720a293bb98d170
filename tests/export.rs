use chat_markdown::{
    ExportError, Exporter, FlavourRegistry, MemoryPreferences, Role, SelectorConfig, SiteRegistry,
};
use std::sync::Arc;

const CHATGPT_URL: &str = "https://chatgpt.com/c/6700-abcd";

const CHATGPT_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<head><title>ChatGPT</title><script>window.__state = {};</script></head>
<body>
<nav><a href="/">New chat</a></nav>
<main>
    <article data-testid="conversation-turn-1">
        <h5 class="sr-only">You said:</h5>
        <div data-message-author-role="user" data-message-id="u-1">
            <div class="whitespace-pre-wrap">Hello</div>
        </div>
    </article>
    <article data-testid="conversation-turn-2">
        <h6 class="sr-only">ChatGPT said:</h6>
        <div data-message-author-role="assistant" data-message-id="a-1">
            <div class="markdown prose">
                <p>Here you go:</p>
                <pre><div class="code-header">javascript<button>Copy code</button></div><code class="hljs language-js">console.log(1)</code></pre>
                <table>
                    <thead><tr><th>A</th><th>B</th></tr></thead>
                    <tbody><tr><td>1</td><td>2</td></tr></tbody>
                </table>
            </div>
        </div>
        <div class="actions"><button aria-label="Copy">Copy</button></div>
    </article>
</main>
</body>
</html>
"#;

const EXPECTED_BODY: &str = "## User\n\nHello\n\n---\n\n## Assistant\n\nHere you go:\n\n\
```js\nconsole.log(1)\n```\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n";

fn exporter() -> Exporter {
    Exporter::default().with_header(false)
}

#[tokio::test]
async fn test_chatgpt_end_to_end() {
    let markdown = exporter().export(CHATGPT_PAGE, CHATGPT_URL, None).await.unwrap();
    assert_eq!(markdown, EXPECTED_BODY);

    assert!(markdown.contains("```js\nconsole.log(1)\n```"));
    let user = markdown.find("Hello").unwrap();
    let code = markdown.find("console.log(1)").unwrap();
    let table = markdown.find("| A | B |").unwrap();
    assert!(user < code && code < table);
}

#[tokio::test]
async fn test_header_block() {
    let markdown = Exporter::default()
        .export(CHATGPT_PAGE, CHATGPT_URL, Some("base"))
        .await
        .unwrap();
    let header = format!(
        "# ChatGPT Conversation\n\n**URL:** {}\n\n**Platform:** ChatGPT\n\n---\n\n",
        CHATGPT_URL
    );
    assert!(markdown.starts_with(&header));
    assert_eq!(&markdown[header.len()..], EXPECTED_BODY);
}

#[tokio::test]
async fn test_unknown_flavour_matches_base() {
    let exporter = exporter();
    let unknown = exporter.export(CHATGPT_PAGE, CHATGPT_URL, Some("no-such-flavour")).await.unwrap();
    let base = exporter.export(CHATGPT_PAGE, CHATGPT_URL, Some("base")).await.unwrap();
    assert_eq!(unknown, base);
}

#[tokio::test]
async fn test_commonmark_flattens_tables() {
    let preferences = Arc::new(MemoryPreferences::new().with("markdownFlavour", "commonmark"));
    let markdown = exporter()
        .with_preferences(preferences)
        .export(CHATGPT_PAGE, CHATGPT_URL, None)
        .await
        .unwrap();
    assert!(!markdown.contains("| --- |"));
    assert!(markdown.ends_with("A B\n1 2\n"));
}

#[test]
fn test_export_is_repeatable() {
    let exporter = exporter();
    let first = exporter.render(CHATGPT_PAGE, CHATGPT_URL, "gfm").unwrap();
    let second = exporter.render(CHATGPT_PAGE, CHATGPT_URL, "gfm").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_messages() {
    let messages = exporter().messages(CHATGPT_PAGE, CHATGPT_URL, "base").unwrap();
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(messages[0].markdown, "Hello");
    assert!(messages[1].markdown.starts_with("Here you go:"));
}

#[test]
fn test_unsupported_site() {
    let err = exporter()
        .render(CHATGPT_PAGE, "https://chat.example.org/c/1", "base")
        .unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedSite(_)));
}

#[test]
fn test_no_messages() {
    let err = exporter()
        .render("<html><body><main></main></body></html>", CHATGPT_URL, "base")
        .unwrap_err();
    assert!(matches!(err, ExportError::NoMessages));
    assert_eq!(err.code(), "NO_MESSAGES");
}

#[test]
fn test_claude_from_rules() {
    let page = r#"
    <div class="conversation">
        <div data-test-render-count="2">
            <div data-testid="user-message"><p>Explain <code>Option</code></p></div>
        </div>
        <div data-test-render-count="2">
            <div data-is-streaming="false">
                <div class="font-claude-message">
                    <p>It is an enum:</p>
                    <ul><li><code>Some(T)</code></li><li><code>None</code></li></ul>
                </div>
            </div>
        </div>
    </div>
    "#;
    let markdown = exporter()
        .render(page, "https://claude.ai/chat/42", "base")
        .unwrap();
    assert_eq!(
        markdown,
        "## User\n\nExplain `Option`\n\n---\n\n## Assistant\n\nIt is an enum:\n\n- `Some(T)`\n- `None`\n"
    );
}

#[test]
fn test_site_without_rules_is_unsupported() {
    let exporter = Exporter::new(
        SiteRegistry::with_rules(SelectorConfig::default()),
        FlavourRegistry::builtin(),
    );
    let err = exporter
        .render("<div data-testid=\"user-message\">hi</div>", "https://claude.ai/chat/1", "base")
        .unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedSite(_)));
}
