use axum::{debug_handler, http::header, response::IntoResponse};
use pulldown_cmark::{CowStr, Event, Parser, Tag};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        include_res!(str, "/style.css"),
    )
}

#[debug_handler]
pub async fn room_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript")],
        include_res!(str, "/room.js"),
    )
}

/// Escapes text for use inside HTML element bodies and quoted attributes.
/// Braces are escaped too so the result can never name a template placeholder.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

/// Only web and mail links survive; anything else (`javascript:`, `data:`...) is dropped.
fn is_safe_url(url: &str) -> bool {
    let url: String = url.chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    let end = url.find(['/', '?', '#']).unwrap_or(url.len());

    match url[..end].split_once(':') {
        None => true,
        Some((scheme, _)) => ["http", "https", "mailto"]
            .iter()
            .any(|allowed| scheme.eq_ignore_ascii_case(allowed)),
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) { url } else { CowStr::Borrowed("#") }
}

/// Renders question content as markdown. Raw HTML is shown as text.
pub fn markdown(content: &str) -> String {
    let parser = Parser::new(content)
        .map(|event| match event {
            Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
            Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            _ => event,
        });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
        .replace('{', "&#123;")
        .replace('}', "&#125;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn escapes_placeholder_braces() {
        assert_eq!(escape("{content}"), "&#123;content&#125;");
    }

    #[test]
    fn markdown_drops_script_links() {
        for content in [
            "[x](javascript:alert(1))",
            "[x](JavaScript:alert(1))",
            "[x](javascript&#58;alert(1))",
            "![x](data:text/html;base64,AAAA)",
        ] {
            let html = markdown(content);
            assert!(!html.to_ascii_lowercase().contains("script:"), "{content} -> {html}");
            assert!(!html.contains("data:"), "{content} -> {html}");
        }
    }

    #[test]
    fn markdown_keeps_web_links() {
        assert_eq!(
            markdown("[docs](https://docs.rs/axum)"),
            "<p><a href=\"https://docs.rs/axum\">docs</a></p>\n"
        );
        assert!(markdown("[mail](mailto:host@example.com)").contains("href=\"mailto:"));
        assert!(markdown("[here](/rooms/new)").contains("href=\"/rooms/new\""));
    }

    #[test]
    fn markdown_output_has_no_placeholders() {
        let html = markdown("what about {title} and `{questions}`?");
        assert!(!html.contains('{'));
        assert!(!html.contains('}'));
    }

    #[test]
    fn markdown_keeps_formatting() {
        assert_eq!(markdown("is **this** live?"), "<p>is <strong>this</strong> live?</p>\n");
    }

    #[test]
    fn markdown_neuters_raw_html() {
        let html = markdown("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
