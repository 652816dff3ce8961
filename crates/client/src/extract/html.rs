//! Markup to plain prose.
//!
//! Strips non-content elements, picks the most content-like container and
//! flattens its text nodes one per line. Pure: identical HTML always yields
//! identical text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose whole subtree is dropped.
const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "aside", "iframe", "noscript", "form"];

static ARTICLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article").expect("invalid selector"));
static MAIN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main").expect("invalid selector"));
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").expect("invalid selector"));
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("invalid selector"));

static CONTENT_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content|entry|post|article").expect("invalid regex"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("invalid regex"));

/// Extract clean text from an HTML document.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let container = find_container(&document).unwrap_or_else(|| document.root_element());

    let mut lines = Vec::new();
    collect_text(container, &mut lines);

    let text = lines.join("\n");
    BLANK_RUNS.replace_all(&text, "\n\n").trim().to_string()
}

/// Preference order: `<article>`, `<main>`, a div with a content-like class,
/// a div with a content-like id, `<body>`.
fn find_container(document: &Html) -> Option<ElementRef<'_>> {
    first_kept(document, &ARTICLE, |_| true)
        .or_else(|| first_kept(document, &MAIN, |_| true))
        .or_else(|| first_kept(document, &DIV, |el| el.value().classes().any(|c| CONTENT_HINT.is_match(c))))
        .or_else(|| first_kept(document, &DIV, |el| el.value().id().is_some_and(|id| CONTENT_HINT.is_match(id))))
        .or_else(|| first_kept(document, &BODY, |_| true))
}

fn first_kept<'a>(
    document: &'a Html, selector: &Selector, accept: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    document.select(selector).find(|el| !is_stripped(el) && accept(el))
}

/// Whether the element sits inside (or is) a stripped element.
fn is_stripped(element: &ElementRef<'_>) -> bool {
    STRIPPED_TAGS.contains(&element.value().name())
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| STRIPPED_TAGS.contains(&ancestor.value().name()))
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Node::Element(el) if STRIPPED_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, lines);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article() {
        let html = r#"
            <html><body>
                <div class="sidebar">Sidebar links</div>
                <article><h1>US-Korea Technology Prosperity Deal</h1><p>Signed in Gyeongju.</p></article>
            </body></html>
        "#;
        assert_eq!(html_to_text(html), "US-Korea Technology Prosperity Deal\nSigned in Gyeongju.");
    }

    #[test]
    fn test_strips_non_content() {
        let html = r#"
            <html><body>
                <header>Site header</header>
                <nav><a href="/">Home</a></nav>
                <main>
                    <p>Korean Air: $36.2 billion purchase</p>
                    <script>var tracking = 1;</script>
                    <style>p { color: red; }</style>
                    <form><input name="q"/>Search</form>
                    <iframe src="https://video.example"></iframe>
                    <p>AWS: $5 billion cloud investment</p>
                </main>
                <footer>Copyright</footer>
            </body></html>
        "#;
        assert_eq!(html_to_text(html), "Korean Air: $36.2 billion purchase\nAWS: $5 billion cloud investment");
    }

    #[test]
    fn test_content_class_fallback() {
        let html = r#"
            <html><body>
                <div class="menu">Menu</div>
                <div class="wp-block Entry-Content"><p>Fact sheet body</p></div>
            </body></html>
        "#;
        assert_eq!(html_to_text(html), "Fact sheet body");
    }

    #[test]
    fn test_content_id_fallback() {
        let html = r#"<html><body><div>Intro</div><div id="main-content"><p>Body text</p></div></body></html>"#;
        // the first div has no hint, so the id match wins over <body>
        assert_eq!(html_to_text(html), "Body text");
    }

    #[test]
    fn test_article_inside_nav_is_ignored() {
        let html = r#"
            <html><body>
                <nav><article>Related story</article></nav>
                <p>Actual page text</p>
            </body></html>
        "#;
        assert_eq!(html_to_text(html), "Actual page text");
    }

    #[test]
    fn test_body_fallback() {
        let html = "<html><head><title>T</title></head><body><p>One</p><p>Two</p></body></html>";
        assert_eq!(html_to_text(html), "One\nTwo");
    }

    #[test]
    fn test_collapses_blank_runs() {
        let html = "<html><body><pre>first\n\n\n\n\nsecond</pre></body></html>";
        assert_eq!(html_to_text(html), "first\n\nsecond");
    }

    #[test]
    fn test_deterministic() {
        let html = "<article><p>Japan</p><ul><li>- $550 billion investment</li></ul></article>";
        assert_eq!(html_to_text(html), html_to_text(html));
        assert_eq!(html_to_text(html), "Japan\n- $550 billion investment");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(html_to_text(""), "");
    }
}
