// src/extract.rs
//! Metadata extraction: raw document bytes -> title, description, author,
//! published date.
//!
//! Each field is resolved by an ordered chain of candidates. The first
//! candidate yielding non-empty trimmed text wins; the rest are not consulted.
//! Missing fields are `None`, never an error. Pure: no I/O, no state.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::decode::decode_html;
use crate::error::ExtractError;

pub const UNTITLED: &str = "Untitled";

/// Where a candidate reads its value from, once its selector matched.
#[derive(Debug, Clone, Copy)]
enum Read {
    /// Value of the named attribute.
    Attr(&'static str),
    /// Text content of the element, whitespace-collapsed.
    Text,
}

/// One step of a fallback chain: the first element matching `selector`
/// in document order, read through `read`.
struct Candidate {
    selector: Selector,
    read: Read,
}

impl Candidate {
    fn new(css: &str, read: Read) -> Self {
        Self {
            selector: Selector::parse(css).expect("static selector"),
            read,
        }
    }

    fn meta_property(key: &str) -> Self {
        Self::new(&format!(r#"meta[property="{key}"]"#), Read::Attr("content"))
    }

    fn meta_name(key: &str) -> Self {
        Self::new(&format!(r#"meta[name="{key}"]"#), Read::Attr("content"))
    }

    fn text(css: &str) -> Self {
        Self::new(css, Read::Text)
    }

    fn resolve(&self, doc: &Html) -> Option<String> {
        let el = doc.select(&self.selector).next()?;
        let value = match self.read {
            Read::Attr(name) => el.value().attr(name)?.trim().to_string(),
            Read::Text => element_text(el),
        };
        (!value.is_empty()).then_some(value)
    }
}

static TITLE_CHAIN: Lazy<Vec<Candidate>> = Lazy::new(|| {
    vec![
        Candidate::meta_property("og:title"),
        Candidate::meta_name("twitter:title"),
        Candidate::text("h1"),
        Candidate::text("title"),
    ]
});

static DESCRIPTION_CHAIN: Lazy<Vec<Candidate>> = Lazy::new(|| {
    vec![
        Candidate::meta_name("description"),
        Candidate::meta_property("og:description"),
    ]
});

static AUTHOR_CHAIN: Lazy<Vec<Candidate>> = Lazy::new(|| {
    vec![
        Candidate::meta_name("author"),
        Candidate::meta_property("article:author"),
        Candidate::text(".author"),
        Candidate::text(".author-name"),
        Candidate::text(r#"[itemprop="author"]"#),
        Candidate::text(r#"[rel~="author"]"#),
    ]
});

static PUBLISHED_DATE_CHAIN: Lazy<Vec<Candidate>> = Lazy::new(|| {
    vec![
        Candidate::meta_property("article:published_time"),
        Candidate::new("time[datetime]", Read::Attr("datetime")),
        Candidate::text(".published"),
        Candidate::text(".date"),
        Candidate::text(".post-date"),
        Candidate::text(r#"[itemprop="datePublished"]"#),
    ]
});

fn first_match(doc: &Html, chain: &[Candidate]) -> Option<String> {
    chain.iter().find_map(|c| c.resolve(doc))
}

/// Concatenated descendant text with runs of whitespace collapsed to a single
/// space and the ends trimmed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Metadata fields resolved from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
}

/// Parse `body` and resolve every field, detecting the encoding from the
/// document itself.
pub fn extract_metadata(body: &[u8], job_id: &str) -> Result<PageMetadata, ExtractError> {
    extract_metadata_with_charset(body, None, job_id)
}

/// Like [`extract_metadata`], with the charset announced by the server's
/// `Content-Type`. A byte-order mark still takes precedence.
///
/// Fails only when the bytes are not a text document at all (binary payload
/// such as an image or PDF). Any text, however broken, parses.
pub fn extract_metadata_with_charset(
    body: &[u8],
    charset: Option<&str>,
    job_id: &str,
) -> Result<PageMetadata, ExtractError> {
    let decoded = decode_html(body, charset).map_err(|e| {
        tracing::warn!(job_id, bytes = body.len(), "document_not_text");
        e
    })?;
    tracing::debug!(job_id, encoding = decoded.encoding.name(), "document_decoded");

    let doc = Html::parse_document(&decoded.text);

    let title = first_match(&doc, &TITLE_CHAIN).unwrap_or_else(|| {
        tracing::warn!(job_id, "title_not_found");
        UNTITLED.to_string()
    });
    let description = first_match(&doc, &DESCRIPTION_CHAIN);
    let author = first_match(&doc, &AUTHOR_CHAIN);
    let published_date = first_match(&doc, &PUBLISHED_DATE_CHAIN);

    tracing::debug!(
        job_id,
        has_description = description.is_some(),
        has_author = author.is_some(),
        has_published_date = published_date.is_some(),
        "metadata_extracted"
    );

    Ok(PageMetadata {
        title,
        description,
        author,
        published_date,
    })
}
