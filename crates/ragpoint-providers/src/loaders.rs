// crates/ragpoint-providers/src/loaders.rs
// ============================================================================
// Module: Document Loaders
// Description: File and URL loaders producing source-tagged documents.
// Purpose: Convert uploads and fetched pages into plain-text documents.
// Dependencies: ragpoint-core, regex, serde_json, tracing
// ============================================================================

//! ## Overview
//! Loaders are selected by file extension. Plain text and markdown load as a
//! single document, CSV loads one document per data row rendered as
//! `column: value` lines, JSON is pretty-printed, and HTML is reduced to its
//! visible text. Every document carries a `source` metadata entry so that
//! ingested chunks can later be listed and deleted by source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use ragpoint_core::Document;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::http::HttpClient;
use crate::http::HttpError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File extensions with a loader, sorted.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "htm", "html", "json", "markdown", "md", "txt"];
/// Metadata key holding a CSV row index.
pub const ROW_KEY: &str = "row";
/// Metadata key holding an HTML page title.
pub const TITLE_KEY: &str = "title";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document loading errors.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No loader handles the file extension.
    #[error("Invalid file type: {0}")]
    UnsupportedFileType(String),
    /// URL was rejected by the HTTP policy.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// File could not be read.
    #[error("loader io error: {0}")]
    Io(String),
    /// File contents could not be parsed.
    #[error("loader parse error: {0}")]
    Parse(String),
    /// Remote fetch failed.
    #[error("fetch failed: {0}")]
    Fetch(String),
}

impl From<HttpError> for LoaderError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::InvalidUrl(message) => Self::InvalidUrl(message),
            other => Self::Fetch(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: File Kinds
// ============================================================================

/// Loader selected for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Plain text.
    Text,
    /// Markdown, loaded verbatim.
    Markdown,
    /// Comma-separated values.
    Csv,
    /// JSON document.
    Json,
    /// HTML page.
    Html,
}

impl FileKind {
    /// Selects a loader by extension, ignoring case.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Selects a loader from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::UnsupportedFileType`] when no loader matches.
    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        Self::from_extension(extension)
            .ok_or_else(|| LoaderError::UnsupportedFileType(extension.to_string()))
    }
}

// ============================================================================
// SECTION: Loaders
// ============================================================================

/// File and URL loaders sharing one HTML converter and HTTP client.
#[derive(Debug, Clone)]
pub struct DocumentLoaders {
    /// HTML-to-text converter.
    html: HtmlConverter,
    /// Client used for URL ingestion.
    http: HttpClient,
}

impl DocumentLoaders {
    /// Creates loaders fetching URLs through `http`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Parse`] when the HTML patterns fail to compile.
    pub fn new(http: HttpClient) -> Result<Self, LoaderError> {
        Ok(Self {
            html: HtmlConverter::new()?,
            http,
        })
    }

    /// Returns the supported file extensions.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        SUPPORTED_EXTENSIONS.iter().map(ToString::to_string).collect()
    }

    /// Loads a file, tagging every document with `source`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError`] when the extension is unsupported or the file
    /// cannot be read or parsed.
    pub fn load_file(&self, path: &Path, source: &str) -> Result<Vec<Document>, LoaderError> {
        let kind = FileKind::from_path(path)?;
        let bytes = fs::read(path).map_err(|err| LoaderError::Io(err.to_string()))?;
        self.load_bytes(kind, &bytes, source)
    }

    /// Loads in-memory file contents.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Parse`] when structured contents are malformed.
    pub fn load_bytes(
        &self,
        kind: FileKind,
        bytes: &[u8],
        source: &str,
    ) -> Result<Vec<Document>, LoaderError> {
        let text = String::from_utf8_lossy(bytes);
        match kind {
            FileKind::Text | FileKind::Markdown => {
                Ok(vec![Document::with_source(text.into_owned(), source)])
            }
            FileKind::Csv => load_csv(&text, source),
            FileKind::Json => {
                let value: Value = serde_json::from_str(&text)
                    .map_err(|err| LoaderError::Parse(err.to_string()))?;
                let pretty = serde_json::to_string_pretty(&value)
                    .map_err(|err| LoaderError::Parse(err.to_string()))?;
                Ok(vec![Document::with_source(pretty, source)])
            }
            FileKind::Html => Ok(vec![self.html_document(&text, source)]),
        }
    }

    /// Fetches a URL and converts it into a document.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::InvalidUrl`] when the URL violates the HTTP
    /// policy and [`LoaderError::Fetch`] when the fetch fails.
    pub fn load_url(&self, url: &str) -> Result<Vec<Document>, LoaderError> {
        let page = self.http.get_text(url)?;
        tracing::debug!(url, bytes = page.body.len(), "fetched url for ingestion");
        let is_html = page.content_type.as_deref().is_none_or(|kind| kind.contains("html"))
            && looks_like_html(&page.body);
        if is_html {
            return Ok(vec![self.html_document(&page.body, url)]);
        }
        Ok(vec![Document::with_source(page.body, url)])
    }

    /// Builds a document from HTML, keeping the page title as metadata.
    fn html_document(&self, html: &str, source: &str) -> Document {
        let mut document = Document::with_source(self.html.to_text(html), source);
        if let Some(title) = self.html.title(html) {
            document.metadata.insert(TITLE_KEY.to_string(), Value::String(title));
        }
        document
    }
}

// ============================================================================
// SECTION: CSV
// ============================================================================

/// Loads one document per CSV data row.
fn load_csv(text: &str, source: &str) -> Result<Vec<Document>, LoaderError> {
    let mut records = parse_csv(text)?.into_iter();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let mut documents = Vec::new();
    for (index, record) in records.enumerate() {
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let content = header
            .iter()
            .zip(record.iter().map(String::as_str).chain(std::iter::repeat("")))
            .map(|(column, value)| format!("{}: {}", column.trim(), value.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let mut document = Document::with_source(content, source);
        document.metadata.insert(ROW_KEY.to_string(), Value::from(index));
        documents.push(document);
    }
    Ok(documents)
}

/// Parses RFC 4180 CSV into records.
fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, LoaderError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            other => field.push(other),
        }
    }
    if in_quotes {
        return Err(LoaderError::Parse("unterminated quoted csv field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

// ============================================================================
// SECTION: HTML
// ============================================================================

/// Reduces HTML to readable text.
#[derive(Debug, Clone)]
struct HtmlConverter {
    /// Script, style, and comment blocks.
    hidden: Regex,
    /// Tags that end a visual line.
    breaks: Regex,
    /// Any remaining tag.
    tags: Regex,
    /// Title element contents.
    title: Regex,
}

impl HtmlConverter {
    /// Compiles the conversion patterns.
    fn new() -> Result<Self, LoaderError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|err| LoaderError::Parse(err.to_string()))
        };
        Ok(Self {
            hidden: compile(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")?,
            breaks: compile(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|title|section|article|header|footer)\s*>")?,
            tags: compile(r"(?s)<[^>]*>")?,
            title: compile(r"(?is)<title[^>]*>(.*?)</title\s*>")?,
        })
    }

    /// Returns the visible text, one non-empty line per block.
    fn to_text(&self, html: &str) -> String {
        let visible = self.hidden.replace_all(html, " ");
        let broken = self.breaks.replace_all(&visible, "\n");
        let stripped = self.tags.replace_all(&broken, " ");
        let decoded = decode_entities(&stripped);
        decoded
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the trimmed page title, if present.
    fn title(&self, html: &str) -> Option<String> {
        let raw = self.title.captures(html)?.get(1)?.as_str();
        let title = decode_entities(raw).split_whitespace().collect::<Vec<_>>().join(" ");
        (!title.is_empty()).then_some(title)
    }
}

/// Decodes the handful of entities common in page text.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Returns true when a body looks like markup.
fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(1024).collect::<String>().to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype html") || head.contains("<body")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use proptest::prelude::*;

    use super::HtmlConverter;
    use super::parse_csv;

    #[test]
    fn csv_handles_quotes_and_crlf() {
        let records = parse_csv("a,b\r\n\"x, y\",\"say \"\"hi\"\"\"\r\n").unwrap();
        assert_eq!(records, vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["x, y".to_string(), "say \"hi\"".to_string()],
        ]);
    }

    #[test]
    fn csv_rejects_unterminated_quote() {
        assert!(parse_csv("a\n\"open").is_err());
    }

    proptest! {
        #[test]
        fn quoted_csv_fields_parse_back_verbatim(
            records in proptest::collection::vec(
                proptest::collection::vec("[a-z ,\"\r\n]{0,12}", 1..6),
                1..8,
            ),
        ) {
            let text: String = records
                .iter()
                .map(|record| {
                    let fields: Vec<String> = record
                        .iter()
                        .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
                        .collect();
                    format!("{}\r\n", fields.join(","))
                })
                .collect();
            prop_assert_eq!(parse_csv(&text).ok(), Some(records));
        }
    }

    #[test]
    fn html_drops_scripts_and_keeps_blocks() {
        let converter = HtmlConverter::new().unwrap();
        let html = "<html><head><title> Guide &amp; Notes </title><script>var x = 1;</script>\
                    </head><body><h1>Intro</h1><p>First   line</p><!-- hidden --><p>Second</p>\
                    </body></html>";
        assert_eq!(converter.to_text(html), "Guide & Notes\nIntro\nFirst line\nSecond");
        assert_eq!(converter.title(html).unwrap(), "Guide & Notes");
    }
}
