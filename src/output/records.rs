//! Record types written to the corpus

use crate::crawler::AssetType;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Storage key of a page's raw HTML: MD5 hex of its canonical URL
pub fn html_key(canonical_url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical_url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Full per-page record, stored once per content hash as `json/<hash>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Canonical URL of the first page seen with this content
    pub url: String,

    /// Key of the raw HTML under `pages/`
    pub html_key: String,

    /// Content hash, also the record's own key under `json/`
    pub json_key: String,

    pub title: Option<String>,
    pub h1: Option<String>,
    pub meta_description: Option<String>,
    pub language: Option<String>,

    pub status: u16,
    pub content_type: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,

    /// Absolute page links in document order
    pub outbound_links: Vec<String>,

    /// Absolute asset links in document order
    pub asset_links: Vec<String>,

    pub clean_text: String,
    pub fetched_at: DateTime<Utc>,
}

/// One line of `mapping.jsonl` per processed URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub url: String,
    pub html_key: String,

    /// Content hash; for a duplicate page, the hash of the existing record
    pub json_key: String,

    pub title: Option<String>,
}

/// One line of `assets.jsonl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub source_url: String,
    pub asset_url: String,
    pub asset_type: AssetType,
}

/// One line of `errors.jsonl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub url: String,

    /// HTTP status code, or a failure kind such as `timeout` or `parse`
    pub kind: String,

    pub detail: String,
    pub retry_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    /// Creates an error record stamped with the current time
    pub fn new(url: &str, kind: impl Into<String>, detail: impl Into<String>, retry_count: u32) -> Self {
        Self {
            url: url.to_string(),
            kind: kind.into(),
            detail: detail.into(),
            retry_count,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_key_is_md5_of_url() {
        // md5("https://example.edu/")
        let key = html_key("https://example.edu/");
        assert_eq!(key.len(), 32);
        assert_eq!(key, html_key("https://example.edu/"));
        assert_ne!(key, html_key("https://example.edu/a"));
        assert_eq!(html_key(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_mapping_record_fields() {
        let record = MappingRecord {
            url: "https://example.edu/".to_string(),
            html_key: "h".to_string(),
            json_key: "j".to_string(),
            title: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["url"], "https://example.edu/");
        assert_eq!(json["html_key"], "h");
        assert_eq!(json["json_key"], "j");
        assert!(json["title"].is_null());
    }

    #[test]
    fn test_asset_record_fields() {
        let record = AssetRecord {
            source_url: "https://example.edu/".to_string(),
            asset_url: "https://example.edu/a.pdf".to_string(),
            asset_type: AssetType::Pdf,
        };
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"source_url":"https://example.edu/","asset_url":"https://example.edu/a.pdf","asset_type":"pdf"}"#
        );
    }

    #[test]
    fn test_error_record_fields() {
        let record = ErrorRecord::new("https://example.edu/x", "404", "HTTP 404", 0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "404");
        assert_eq!(json["retry_count"], 0);
        assert!(json["timestamp"].is_string());
    }
}
