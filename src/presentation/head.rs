use askama::{Error as AskamaError, Template};
use thiserror::Error;

use crate::application::metadata::Metadata;

#[derive(Template)]
#[template(path = "head.html")]
struct HeadTemplate<'a> {
    meta: &'a Metadata,
    brand: &'a str,
    structured_data: String,
}

#[derive(Debug, Error)]
pub enum HeadRenderError {
    #[error("failed to serialise structured data: {0}")]
    StructuredData(#[from] serde_json::Error),
    #[error("failed to render head template: {0}")]
    Template(#[from] AskamaError),
}

/// Renders the `<head>` fragment for `meta`.
///
/// Attribute values are HTML-escaped by the template. The JSON-LD block is
/// emitted raw, so markup characters inside it are written as JSON unicode
/// escapes and a scraped title can neither close nor reopen the script.
pub fn render_head(meta: &Metadata, brand: &str) -> Result<String, HeadRenderError> {
    let structured_data = script_safe_json(&serde_json::to_string(&meta.structured_data)?);
    let template = HeadTemplate {
        meta,
        brand,
        structured_data,
    };
    Ok(template.render()?)
}

/// `<`, `>` and `&` only occur inside JSON strings, where the escaped form
/// decodes to the same value.
fn script_safe_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::metadata::TwitterCard;

    fn metadata(title: &str) -> Metadata {
        Metadata {
            title: title.to_string(),
            description: "설명".to_string(),
            canonical: "https://buzzit.kr/site/clien".to_string(),
            og_type: "website",
            og_image: "https://buzzit.kr/og-image.png".to_string(),
            twitter_card: TwitterCard::Summary,
            structured_data: json!({ "@type": "WebSite", "name": title }),
        }
    }

    #[test]
    fn renders_every_tag() {
        let html = render_head(&metadata("클리앙 인기 게시글 | Buzzit"), "Buzzit").expect("render");

        assert!(html.contains("<title>클리앙 인기 게시글 | Buzzit</title>"));
        assert!(html.contains(r#"<link rel="canonical" href="https://buzzit.kr/site/clien">"#));
        assert!(html.contains(r#"<meta property="og:site_name" content="Buzzit">"#));
        assert!(html.contains(r#"<meta name="twitter:card" content="summary">"#));
        assert!(html.contains(r#"<script type="application/ld+json">{"#));
    }

    #[test]
    fn escapes_markup_in_values() {
        let html = render_head(&metadata("<b>\"hi\"</b></script>"), "Buzzit").expect("render");

        assert!(!html.contains("<title><b>"));
        assert!(!html.contains("content=\"<b>"));
        assert!(!html.contains("</b></script>"));
        assert!(html.contains(r"\u003c/script\u003e"));
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[test]
    fn comment_and_script_openers_stay_inert_in_json_ld() {
        let title = "<!--<script>& more";
        let html = render_head(&metadata(title), "Buzzit").expect("render");

        let start = html.find(r#"<script type="application/ld+json">"#).expect("script tag")
            + r#"<script type="application/ld+json">"#.len();
        let end = start + html[start..].find("</script>").expect("closing tag");
        let block = &html[start..end];

        assert!(!block.contains('<'));
        assert!(!block.contains('>'));
        assert!(!block.contains('&'));
        assert_eq!(html.matches("<script").count(), 1);

        let decoded: serde_json::Value = serde_json::from_str(block).expect("valid json");
        assert_eq!(decoded["name"], title);
    }
}
