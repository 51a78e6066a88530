//! Open Graph metadata lookup used to fill in a note's title and description.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Longest title or description kept from a scraped page.
pub const MAX_SCRAPED_CHARS: usize = 4000;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid regex"));
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid regex"));
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F]").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("page returned HTTP {0}")]
    Status(u16),
}

#[async_trait]
pub trait MetadataScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<PageMetadata, ScrapeError>;
}

/// Fetches the page over HTTP and reads its `<meta>` and `<title>` tags.
#[derive(Debug, Clone)]
pub struct HttpMetadataScraper {
    client: reqwest::Client,
}

impl HttpMetadataScraper {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetadataScraper for HttpMetadataScraper {
    async fn scrape(&self, url: &str) -> Result<PageMetadata, ScrapeError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.8")
            .send()
            .await
            .map_err(|e| ScrapeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }
        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Request(e.to_string()))?;
        Ok(parse_metadata(&html))
    }
}

/// Title from `og:title` then `<title>`; description from `og:description`
/// then `<meta name="description">`. Missing values are empty strings.
pub fn parse_metadata(html: &str) -> PageMetadata {
    let meta = meta_contents(html);
    let title_tag = TITLE_TAG
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    PageMetadata {
        title: choose([meta.get("og:title").map(String::as_str), title_tag]),
        description: choose([
            meta.get("og:description").map(String::as_str),
            meta.get("description").map(String::as_str),
        ]),
    }
}

/// `property` or `name` (lower-cased) to `content`, first occurrence wins.
fn meta_contents(html: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for tag in META_TAG.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTRIBUTE.captures_iter(tag.as_str()) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match attr[1].to_ascii_lowercase().as_str() {
                "property" | "name" if key.is_none() => key = Some(value.to_ascii_lowercase()),
                "content" => content = Some(value),
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            out.entry(key).or_insert_with(|| decode_entities(content));
        }
    }
    out
}

fn choose<const N: usize>(candidates: [Option<&str>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|c| sanitize(&decode_entities(c), MAX_SCRAPED_CHARS))
        .find(|c| !c.is_empty())
        .unwrap_or_default()
}

/// Collapse whitespace, drop control characters, cap at `max_chars`.
pub fn sanitize(value: &str, max_chars: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = CONTROL_CHARS.replace_all(&collapsed, "");
    cleaned.chars().take(max_chars).collect()
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_open_graph() {
        let html = r#"<html><head>
            <title>Fallback title</title>
            <meta property="og:title" content="OG Title">
            <meta name="description" content="plain description">
            <meta property="og:description" content="OG description">
        </head></html>"#;
        assert_eq!(
            parse_metadata(html),
            PageMetadata {
                title: "OG Title".into(),
                description: "OG description".into(),
            }
        );
    }

    #[test]
    fn falls_back_to_title_and_name_description() {
        let html = "<head><TITLE>\n  Tokio   docs \n</TITLE>\
                    <meta content='An async runtime' name='Description'></head>";
        let meta = parse_metadata(html);
        assert_eq!(meta.title, "Tokio docs");
        assert_eq!(meta.description, "An async runtime");
    }

    #[test]
    fn blank_og_value_falls_through() {
        let html = r#"<meta property="og:title" content="   "><title>Real</title>"#;
        assert_eq!(parse_metadata(html).title, "Real");
    }

    #[test]
    fn decodes_common_entities() {
        let html = r#"<meta property="og:title" content="Rust &amp; Tokio &quot;guide&quot;">"#;
        assert_eq!(parse_metadata(html).title, "Rust & Tokio \"guide\"");
    }

    #[test]
    fn empty_page_yields_empty_fields() {
        assert_eq!(parse_metadata("<html></html>"), PageMetadata::default());
    }

    #[test]
    fn sanitize_strips_controls_and_caps_length() {
        assert_eq!(sanitize("a\u{0007}b   c", 100), "ab c");
        assert_eq!(sanitize(&"x".repeat(5000), MAX_SCRAPED_CHARS).len(), MAX_SCRAPED_CHARS);
    }
}
