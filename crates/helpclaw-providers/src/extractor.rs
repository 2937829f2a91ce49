//! HTTP content extractor.
//!
//! Fetches a page and extracts structured text: the page title, headings,
//! and the paragraph text under each heading. Deliberately tolerant — a
//! page that doesn't match the expected shape yields a single whole-page
//! document rather than an error, and only network/HTTP failures surface
//! as fetch errors.

use async_trait::async_trait;

use helpclaw_core::error::{HelpClawError, Result};
use helpclaw_core::traits::ContentExtractor;
use helpclaw_core::types::ExtractedDoc;

/// Per-document content cap, matching what the retrieval tiers can
/// usefully rank and quote.
const MAX_CONTENT_CHARS: usize = 2000;

/// Sections with less text than this are navigation chrome, not content.
const MIN_SECTION_CHARS: usize = 40;

/// Reqwest-based extractor used by the cache refresh cycle.
pub struct HttpExtractor {
    client: reqwest::Client,
}

impl HttpExtractor {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HelpClawError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    async fn extract(&self, category: &str, url: &str) -> Result<Vec<ExtractedDoc>> {
        tracing::info!("🔍 Fetching '{category}' content from {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HelpClawError::fetch(category, format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(HelpClawError::fetch(
                category,
                format!("HTTP {} from {url}", resp.status()),
            ));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| HelpClawError::fetch(category, format!("read failed: {e}")))?;

        let docs = parse_page(category, &html);
        tracing::info!("  ✓ Extracted {} docs for '{category}'", docs.len());
        Ok(docs)
    }
}

/// Turn one HTML page into extracted docs: one per heading section, or a
/// single whole-page doc when the page has no usable headings.
fn parse_page(category: &str, html: &str) -> Vec<ExtractedDoc> {
    let mut docs = Vec::new();

    for (heading, section) in split_sections(html) {
        let content = truncate(&strip_tags(&section));
        if !heading.is_empty() && content.len() >= MIN_SECTION_CHARS {
            docs.push(ExtractedDoc {
                title: heading,
                content,
            });
        }
    }

    if docs.is_empty() {
        let title = page_title(html).unwrap_or_else(|| category.to_string());
        let content = truncate(&strip_tags(main_content(html)));
        if !content.is_empty() {
            docs.push(ExtractedDoc { title, content });
        }
    }

    docs
}

/// Split a page at its h1/h2/h3 headings. Returns (heading text, section
/// body html) pairs, section body running to the next heading.
fn split_sections(html: &str) -> Vec<(String, String)> {
    let bytes = html.as_bytes();
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 3 < bytes.len() {
        if bytes[i] == b'<'
            && (bytes[i + 1] == b'h' || bytes[i + 1] == b'H')
            && (b'1'..=b'3').contains(&bytes[i + 2])
            && (bytes[i + 3] == b'>' || bytes[i + 3] == b' ')
        {
            starts.push(i);
        }
        i += 1;
    }

    let mut sections = Vec::new();
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(html.len());
        let section = &html[start..end];
        let heading = extract_between(section, ">", "</")
            .map(|h| strip_tags(&h))
            .unwrap_or_default();
        // Body = everything after the heading close tag
        let body = section
            .find("</h")
            .and_then(|idx| section[idx..].find('>').map(|close| &section[idx + close + 1..]))
            .unwrap_or("");
        sections.push((heading.trim().to_string(), body.to_string()));
    }
    sections
}

/// The <title> element's text, if any.
fn page_title(html: &str) -> Option<String> {
    let title = extract_between(html, "<title", "</title>")?;
    let text = title.split_once('>').map(|(_, t)| t).unwrap_or(&title);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Prefer <main>/<article> over the whole document when present.
fn main_content(html: &str) -> &str {
    for tag in ["main", "article", "body"] {
        let open = format!("<{tag}");
        let close = format!("</{tag}>");
        if let Some(start) = html.find(&open) {
            if let Some(end) = html[start..].find(&close) {
                return &html[start..start + end];
            }
        }
    }
    html
}

fn extract_between(text: &str, start: &str, end: &str) -> Option<String> {
    let start_idx = text.find(start)? + start.len();
    let remaining = &text[start_idx..];
    let end_idx = remaining.find(end)?;
    Some(remaining[..end_idx].to_string())
}

/// Case-insensitive ASCII substring search. The match starts at an ASCII
/// byte, so the returned index is always a char boundary.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Drop `<open>...</close>` blocks entirely (script/style contents are
/// never text).
fn remove_blocks(html: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = html;
    while let Some(start) = find_ci(cursor, open) {
        out.push_str(&cursor[..start]);
        match find_ci(&cursor[start..], close) {
            Some(end) => cursor = &cursor[start + end + close.len()..],
            None => return out,
        }
    }
    out.push_str(cursor);
    out
}

/// Remove script/style blocks and all tags, decode common entities, and
/// collapse whitespace.
fn strip_tags(html: &str) -> String {
    let without_blocks = remove_blocks(
        &remove_blocks(html, "<script", "</script>"),
        "<style",
        "</style>",
    );

    // Strip remaining tags
    let mut text = String::with_capacity(without_blocks.len());
    let mut in_tag = false;
    for c in without_blocks.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    // &amp; must decode last, or "&amp;lt;" would double-decode to "<"
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_CONTENT_CHARS {
        return text.to_string();
    }
    let mut end = MAX_CONTENT_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
