//! Wire types for the Custom Search JSON API plus the shapes we hand to
//! the HTTP layer. Field names follow the API's camelCase via serde renames,
//! mirroring only the subset we actually read.

use serde::{Deserialize, Serialize};

/// Sort order accepted by the API: empty string means relevance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Relevance,
    Date,
}

impl SortOrder {
    /// Value of the `sort` query param; `None` omits the param entirely.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            SortOrder::Relevance => None,
            SortOrder::Date => Some("date"),
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("date") {
            SortOrder::Date
        } else {
            SortOrder::Relevance
        }
    }
}

// ==============================
// API response
// ==============================

#[derive(Debug, Clone, Deserialize)]
pub struct CseResponse {
    #[serde(default)]
    pub items: Vec<CseItem>,
    #[serde(default)]
    pub queries: Option<CseQueries>,
    #[serde(rename = "searchInformation", default)]
    pub search_information: Option<CseSearchInformation>,
    /// Error envelope; some transports surface it inside an OK-shaped body.
    #[serde(default)]
    pub error: Option<CseApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CseItem {
    #[serde(rename = "htmlTitle", default)]
    pub html_title: String,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "displayLink", default)]
    pub display_link: String,
    #[serde(rename = "htmlSnippet", default)]
    pub html_snippet: String,
    #[serde(default)]
    pub pagemap: Option<CsePageMap>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsePageMap {
    #[serde(default)]
    pub listitem: Vec<CseListItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CseListItem {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CseQueries {
    #[serde(rename = "nextPage", default)]
    pub next_page: Vec<CseNextPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CseNextPage {
    #[serde(rename = "startIndex", default)]
    pub start_index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CseSearchInformation {
    /// The API reports this as a decimal string.
    #[serde(rename = "totalResults", default)]
    pub total_results: String,
    #[serde(rename = "searchTime", default)]
    pub search_time: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CseApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

// ==============================
// Domain types
// ==============================

/// One search hit, shaped for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub display_link: String,
    pub snippet: String,
    pub breadcrumb: String,
    /// Lowercased host with any leading `www.` stripped; grouping key.
    pub domain: String,
}

/// Outcome of one result page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageResults {
    pub results: Vec<SearchResult>,
    /// Start index of the next page; `None` at the end of the window (the
    /// API never serves past start index 100).
    pub next_start: Option<u32>,
    pub total_results: u64,
    /// API-reported search time, seconds, rounded to 2 decimals.
    pub search_time: f64,
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_param_values() {
        assert_eq!(SortOrder::Relevance.as_param(), None);
        assert_eq!(SortOrder::Date.as_param(), Some("date"));
        assert_eq!(SortOrder::parse("DATE"), SortOrder::Date);
        assert_eq!(SortOrder::parse(""), SortOrder::Relevance);
    }

    #[test]
    fn response_parses_real_shape() {
        let body = r#"{
            "queries": { "nextPage": [ { "startIndex": 11 } ] },
            "searchInformation": { "totalResults": "425", "searchTime": 0.318731 },
            "items": [
                {
                    "htmlTitle": "<b>Rust</b> language",
                    "link": "https://www.rust-lang.org/learn",
                    "displayLink": "www.rust-lang.org",
                    "htmlSnippet": "A language empowering everyone",
                    "pagemap": { "listitem": [ { "name": "Home" }, { "name": "Learn" } ] }
                }
            ]
        }"#;
        let resp: CseResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(
            resp.queries.unwrap().next_page[0].start_index,
            11
        );
        let info = resp.search_information.unwrap();
        assert_eq!(info.total_results, "425");
        assert!(resp.error.is_none());
    }

    #[test]
    fn error_envelope_parses() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let resp: CseResponse = serde_json::from_str(body).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, 429);
        assert_eq!(err.status, "RESOURCE_EXHAUSTED");
    }
}
