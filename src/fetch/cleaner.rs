//! Markup → plain text reduction.
//!
//! The page is parsed with `scraper`; text nodes are collected in document
//! order while the subtrees of non-content elements are skipped. Entities
//! are decoded by the parser and whitespace runs are collapsed.

use scraper::{ElementRef, Html};

/// Elements whose whole subtree never contributes text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head", "meta", "link", "noscript"];

pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);
    push_text(document.root_element(), &mut text);
    collapse_whitespace(&text)
}

/// Appends the text under `element`, without separators, skipping
/// [`SKIPPED_ELEMENTS`] subtrees.
fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child)
            && !SKIPPED_ELEMENTS.contains(&child.value().name())
        {
            push_text(child, out);
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_page_to_body_text() {
        let html = "<html><head><title>x</title></head><body><script>evil()</script><p>Hello&nbsp;World</p></body></html>";
        assert_eq!(clean_html(html), "Hello World");
    }

    #[test]
    fn removes_style_and_noscript_blocks() {
        let html = r#"<style type="text/css">p { color: red }</style>
            <p>Visible</p><NOSCRIPT>Enable JS</NOSCRIPT>
            <p>text</p>"#;
        assert_eq!(clean_html(html), "Visible text");
    }

    #[test]
    fn element_names_are_case_insensitive() {
        let html = "<SCRIPT type=\"x\">alert(1)</Script>kept";
        assert_eq!(clean_html(html), "kept");
    }

    #[test]
    fn similar_names_are_not_skipped() {
        assert_eq!(clean_html("<header>Site name</header>\n<p>Body</p>"), "Site name Body");
        assert_eq!(clean_html("<scripts>k</scripts>ok"), "kok");
    }

    #[test]
    fn unterminated_script_drops_remainder() {
        let html = "<p>before</p><script>never closed <p>after</p>";
        assert_eq!(clean_html(html), "before");
    }

    #[test]
    fn strips_meta_and_link_tags_outside_head() {
        let html = r#"<body><meta charset="utf-8"><link rel="stylesheet" href="a.css"><div>Content</div></body>"#;
        assert_eq!(clean_html(html), "Content");
    }

    #[test]
    fn stray_angle_brackets_are_text() {
        assert_eq!(clean_html("<p>a < b</p>"), "a < b");
        assert_eq!(clean_html("<b>bold</b>"), "bold");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(
            clean_html("<p>&lt;a&gt; &amp; &quot;q&quot; &#39;s&apos;</p>"),
            "<a> & \"q\" 's'"
        );
    }

    #[test]
    fn entity_decoding_is_single_pass() {
        assert_eq!(clean_html("<p>&amp;lt;</p>"), "&lt;");
    }

    #[test]
    fn adjacent_inline_text_is_joined() {
        assert_eq!(clean_html("<p><b>Acme</b>Corp</p>"), "AcmeCorp");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(collapse_whitespace("  a \n\n\t b   c  "), "a b c");
    }

    #[test]
    fn markup_only_page_yields_empty_text() {
        let html = "<html><head><title>t</title></head><body><script>x()</script></body></html>";
        assert_eq!(clean_html(html), "");
    }

    #[test]
    fn multibyte_text_survives() {
        let html = "<p>日本語&nbsp;テキスト</p> <p>İstanbul</p>";
        assert_eq!(clean_html(html), "日本語 テキスト İstanbul");
    }
}
