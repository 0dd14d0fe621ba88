//! Content processor: metadata, clean text, links and assets
//!
//! This module turns a fetched HTML body into a page candidate:
//! - `<title>`, first `<h1>`, meta description and `lang`
//! - Clean text with boilerplate regions stripped (pluggable strategy)
//! - Outbound `<a href>` links, absolute and deduplicated
//! - Asset references (images, stylesheets, scripts, PDFs, archives)
//! - SHA-256 content hash over the clean text

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Elements whose content never counts as page text
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "aside", "iframe", "template", "svg",
    "canvas", "object", "embed",
];

/// Class/id fragments marking advertising regions
const AD_TOKENS: &[&str] = &[
    "ad",
    "ads",
    "advert",
    "adverts",
    "advertisement",
    "adsbygoogle",
    "sponsor",
    "sponsored",
];

/// ARIA roles marking navigation chrome
const BOILERPLATE_ROLES: &[&str] = &["navigation", "contentinfo", "complementary"];

/// Why a document could not be processed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessError {
    #[error("document is empty")]
    Empty,

    #[error("document contains no HTML markup")]
    NoMarkup,
}

/// Category of an asset reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Image,
    Stylesheet,
    Script,
    Pdf,
    Archive,
    /// `<a download>` target of any other type
    Download,
}

impl AssetType {
    /// Classifies a URL by the extension of its path
    pub fn from_url(url: &Url) -> Option<Self> {
        let path = url.path().to_ascii_lowercase();
        let ext = path.rsplit_once('.').map(|(_, ext)| ext)?;
        if ext.contains('/') {
            return None;
        }

        match ext {
            "jpg" | "jpeg" | "png" | "gif" | "svg" | "ico" | "webp" | "bmp" => Some(Self::Image),
            "css" => Some(Self::Stylesheet),
            "js" | "mjs" => Some(Self::Script),
            "pdf" => Some(Self::Pdf),
            "zip" | "rar" | "gz" | "tgz" | "7z" | "tar" => Some(Self::Archive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
            Self::Pdf => "pdf",
            Self::Archive => "archive",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asset referenced by a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLink {
    pub url: Url,
    pub asset_type: AssetType,
}

/// Everything extracted from one HTML document
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub title: Option<String>,
    pub h1: Option<String>,
    pub meta_description: Option<String>,
    pub language: Option<String>,

    /// Visible text with boilerplate removed and whitespace collapsed
    pub clean_text: String,

    /// SHA-256 hex digest of `clean_text`
    pub content_hash: String,

    /// Absolute page links in document order, deduplicated
    pub links: Vec<Url>,

    /// Asset references in document order, deduplicated
    pub assets: Vec<AssetLink>,
}

/// Strategy for turning a parsed document into clean text
///
/// Implementations may be substituted (for example a readability-style
/// extractor) without changing what the processor returns.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, document: &Html) -> String;
}

/// Default extractor: walks the body and drops boilerplate subtrees
///
/// Removed: scripts, styles, navigation, footers, asides, embedded frames,
/// hidden elements and anything whose class or id marks it as advertising.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoilerplateStripper;

impl TextExtractor for BoilerplateStripper {
    fn extract_text(&self, document: &Html) -> String {
        let start = Selector::parse("body")
            .ok()
            .and_then(|body| document.select(&body).next())
            .unwrap_or_else(|| document.root_element());

        let mut raw = String::new();
        collect_text(start, &mut raw);
        collapse_whitespace(&raw)
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if !is_boilerplate(&child_element) {
                        collect_text(child_element, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Returns true if the element and its subtree are boilerplate
fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    let value = element.value();

    if BOILERPLATE_TAGS.contains(&value.name()) {
        return true;
    }

    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }

    if value
        .attr("role")
        .is_some_and(|role| BOILERPLATE_ROLES.contains(&role.to_ascii_lowercase().as_str()))
    {
        return true;
    }

    let id = value.attr("id").unwrap_or("");
    value
        .classes()
        .chain(std::iter::once(id))
        .flat_map(|token| token.split(|c: char| c == '-' || c == '_'))
        .any(|part| AD_TOKENS.contains(&part.to_ascii_lowercase().as_str()))
}

/// Parses HTML and produces a page candidate
pub struct ContentProcessor {
    extractor: Box<dyn TextExtractor>,
}

impl fmt::Debug for ContentProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentProcessor").finish_non_exhaustive()
    }
}

impl Default for ContentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentProcessor {
    /// Creates a processor using [`BoilerplateStripper`]
    pub fn new() -> Self {
        Self::with_extractor(Box::new(BoilerplateStripper))
    }

    /// Creates a processor with a custom text extraction strategy
    pub fn with_extractor(extractor: Box<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// Processes an HTML body fetched from `source_url`
    ///
    /// # Arguments
    ///
    /// * `body` - Raw response body
    /// * `source_url` - Final URL of the response, used to resolve relative links
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessedPage)` - Extracted metadata, text, links and assets
    /// * `Err(ProcessError)` - The body is empty or has no markup at all
    ///
    /// # Example
    ///
    /// ```
    /// use site_corpus::crawler::ContentProcessor;
    /// use url::Url;
    ///
    /// let html = r#"<html lang="en"><head><title>Test</title></head>
    ///     <body><h1>Hello</h1><nav>Menu</nav><a href="/page">Link</a></body></html>"#;
    /// let base = Url::parse("https://example.edu/").unwrap();
    /// let page = ContentProcessor::new().process(html.as_bytes(), &base).unwrap();
    ///
    /// assert_eq!(page.title.as_deref(), Some("Test"));
    /// assert_eq!(page.clean_text, "Hello Link");
    /// assert_eq!(page.links[0].as_str(), "https://example.edu/page");
    /// ```
    pub fn process(&self, body: &[u8], source_url: &Url) -> Result<ProcessedPage, ProcessError> {
        let html = String::from_utf8_lossy(body);

        if html.trim().is_empty() {
            return Err(ProcessError::Empty);
        }
        if !html.contains('<') {
            return Err(ProcessError::NoMarkup);
        }

        let document = Html::parse_document(&html);
        let base_url = document_base(&document, source_url);

        let clean_text = self.extractor.extract_text(&document);
        let content_hash = content_hash(&clean_text);
        let (links, assets) = extract_links_and_assets(&document, &base_url);

        Ok(ProcessedPage {
            title: first_text(&document, "title"),
            h1: first_text(&document, "h1"),
            meta_description: meta_description(&document),
            language: language(&document),
            clean_text,
            content_hash,
            links,
            assets,
        })
    }
}

/// SHA-256 hex digest of the clean text
pub fn content_hash(clean_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(clean_text.as_bytes());
    hex::encode(hasher.finalize())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first element matching `css`, whitespace collapsed
fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&selector)
        .find(|meta| {
            meta.value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
        })
        .and_then(|meta| meta.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn language(document: &Html) -> Option<String> {
    document
        .root_element()
        .value()
        .attr("lang")
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
}

/// Resolves `<base href>` against the source URL, falling back to the source URL
fn document_base(document: &Html, source_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|base| base.value().attr("href"))
                .and_then(|href| source_url.join(href.trim()).ok())
        })
        .filter(|base| base.scheme() == "http" || base.scheme() == "https")
        .unwrap_or_else(|| source_url.clone())
}

/// Extracts page links and asset references
///
/// # Link Extraction Rules
///
/// **Pages:** `<a href>` whose target does not look like a file asset.
///
/// **Assets:**
/// - `<img src>`, `<link rel="stylesheet" href>`, `<script src>`
/// - `<a href>` ending in an image, stylesheet, script, PDF or archive extension
/// - `<a href download>`
///
/// **Skipped:** `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only
/// hrefs, and anything that is not http(s) after resolution.
fn extract_links_and_assets(document: &Html, base_url: &Url) -> (Vec<Url>, Vec<AssetLink>) {
    let mut links = Vec::new();
    let mut seen_links = HashSet::new();
    let mut assets = Vec::new();
    let mut seen_assets = HashSet::new();

    let mut push_asset = |url: Url, asset_type: AssetType, assets: &mut Vec<AssetLink>| {
        if seen_assets.insert(url.to_string()) {
            assets.push(AssetLink { url, asset_type });
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let Some(url) = element.value().attr("href").and_then(|href| resolve_link(href, base_url)) else {
                continue;
            };

            if let Some(asset_type) = AssetType::from_url(&url) {
                push_asset(url, asset_type, &mut assets);
            } else if element.value().attr("download").is_some() {
                push_asset(url, AssetType::Download, &mut assets);
            } else if seen_links.insert(url.to_string()) {
                links.push(url);
            }
        }
    }

    let sources = [
        ("img[src]", "src", AssetType::Image),
        ("link[rel~=\"stylesheet\"][href]", "href", AssetType::Stylesheet),
        ("script[src]", "src", AssetType::Script),
    ];

    for (css, attr, asset_type) in sources {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(url) = element.value().attr(attr).and_then(|href| resolve_link(href, base_url)) {
                push_asset(url, asset_type, &mut assets);
            }
        }
    }

    (links, assets)
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    (absolute.scheme() == "http" || absolute.scheme() == "https").then_some(absolute)
}
