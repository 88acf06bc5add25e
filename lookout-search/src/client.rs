//! One-page client for the Custom Search JSON API.
//!
//! Transport-level retries are disabled on this path: quota and auth
//! failures are the rotation loop's job, and retrying a 429 here would only
//! delay the switch to the next credential pair.

use crate::breadcrumb::breadcrumb_for;
use crate::group::domain_of;
use crate::types::{CseApiError, CseResponse, PageResults, SearchResult, SortOrder, round2};
use crate::{ApiErrorKind, MAX_START, SearchError};
use lookout_http::{Auth, HttpClient, HttpError, RequestOpts};
use std::borrow::Cow;

const GOOGLE_API_BASE: &str = "https://www.googleapis.com";
const SEARCH_PATH: &str = "customsearch/v1";

#[derive(Clone)]
pub struct CseClient {
    http: HttpClient,
}

impl CseClient {
    pub fn new() -> Result<Self, SearchError> {
        Self::with_base(GOOGLE_API_BASE)
    }

    /// Anchor the client somewhere else (tests point this at a mock server).
    pub fn with_base(base: &str) -> Result<Self, SearchError> {
        Ok(Self {
            http: HttpClient::new(base)?,
        })
    }

    /// Fetch a single result page (`start` is 1-based: 1, 11, 21, ...).
    pub async fn search_page(
        &self,
        api_key: &str,
        engine_id: &str,
        query: &str,
        start: u32,
        sort: SortOrder,
    ) -> Result<PageResults, SearchError> {
        let start_s = start.to_string();
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("cx", engine_id.into()),
            ("q", query.into()),
            ("start", start_s.into()),
        ];
        if let Some(sort) = sort.as_param() {
            params.push(("sort", sort.into()));
        }

        let resp: CseResponse = self
            .http
            .get_json(
                SEARCH_PATH,
                RequestOpts {
                    auth: Some(Auth::Query {
                        name: "key",
                        value: api_key.into(),
                    }),
                    query: Some(params),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(classify_http)?;

        // Some transports hand the envelope back inside an OK body.
        if let Some(err) = resp.error {
            return Err(classify_envelope(&err));
        }

        Ok(shape_page(resp))
    }
}

fn shape_page(resp: CseResponse) -> PageResults {
    let results = resp
        .items
        .iter()
        .map(|item| SearchResult {
            title: item.html_title.clone(),
            link: item.link.clone(),
            display_link: item.display_link.clone(),
            snippet: item.html_snippet.clone(),
            breadcrumb: breadcrumb_for(item),
            domain: domain_of(&item.link, &item.display_link),
        })
        .collect();

    let next_start = resp
        .queries
        .as_ref()
        .and_then(|q| q.next_page.first())
        .map(|np| np.start_index)
        .filter(|&s| s > 0 && s <= MAX_START);

    let (total_results, search_time) = resp
        .search_information
        .map(|info| {
            (
                info.total_results.parse::<u64>().unwrap_or(0),
                round2(info.search_time),
            )
        })
        .unwrap_or((0, 0.0));

    PageResults {
        results,
        next_start,
        total_results,
        search_time,
    }
}

fn classify_envelope(err: &CseApiError) -> SearchError {
    let kind = classify(err.code, &err.status);
    SearchError::Api {
        code: err.code,
        message: err.message.clone(),
        kind,
    }
}

fn classify_http(err: HttpError) -> SearchError {
    match err {
        HttpError::Api {
            status,
            message,
            body,
        } => {
            // Prefer the Google envelope when the body carries one.
            if let Ok(resp) = serde_json::from_str::<CseResponse>(&body) {
                if let Some(env) = resp.error {
                    return classify_envelope(&env);
                }
            }
            SearchError::Api {
                code: status.as_u16(),
                message,
                kind: classify(status.as_u16(), ""),
            }
        }
        other => SearchError::Http(other),
    }
}

fn classify(code: u16, status: &str) -> ApiErrorKind {
    if code == 429 || status.eq_ignore_ascii_case("RESOURCE_EXHAUSTED") {
        ApiErrorKind::Quota
    } else if code == 401
        || code == 403
        || status.eq_ignore_ascii_case("PERMISSION_DENIED")
        || status.eq_ignore_ascii_case("UNAUTHENTICATED")
    {
        ApiErrorKind::Auth
    } else {
        ApiErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok_body() -> serde_json::Value {
        serde_json::json!({
            "queries": { "nextPage": [ { "startIndex": 11 } ] },
            "searchInformation": { "totalResults": "42", "searchTime": 0.123456 },
            "items": [
                {
                    "htmlTitle": "Hit",
                    "link": "https://www.example.com/page",
                    "displayLink": "www.example.com",
                    "htmlSnippet": "snippet"
                }
            ]
        })
    }

    #[tokio::test]
    async fn search_page_shapes_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("key", "K1"))
            .and(query_param("cx", "E1"))
            .and(query_param("q", "rust"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .mount(&server)
            .await;

        let client = CseClient::with_base(&server.uri()).unwrap();
        let page = client
            .search_page("K1", "E1", "rust", 1, SortOrder::Relevance)
            .await
            .unwrap();

        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].domain, "example.com");
        assert_eq!(page.next_start, Some(11));
        assert_eq!(page.total_results, 42);
        assert_eq!(page.search_time, 0.12);
    }

    #[tokio::test]
    async fn sort_by_date_sends_the_sort_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("sort", "date"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = CseClient::with_base(&server.uri()).unwrap();
        client
            .search_page("K1", "E1", "rust", 1, SortOrder::Date)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn quota_envelope_classifies_as_quota() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let client = CseClient::with_base(&server.uri()).unwrap();
        let err = client
            .search_page("K1", "E1", "rust", 1, SortOrder::Relevance)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::Api {
                kind: ApiErrorKind::Quota,
                ..
            }
        ));
        assert!(err.rotates());
    }

    #[tokio::test]
    async fn forbidden_classifies_as_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "Key not authorized", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let client = CseClient::with_base(&server.uri()).unwrap();
        let err = client
            .search_page("K1", "E1", "rust", 1, SortOrder::Relevance)
            .await
            .unwrap_err();
        assert!(err.rotates());
    }

    #[tokio::test]
    async fn invalid_requests_do_not_rotate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "Invalid argument", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let client = CseClient::with_base(&server.uri()).unwrap();
        let err = client
            .search_page("K1", "E1", "rust", 1, SortOrder::Relevance)
            .await
            .unwrap_err();
        assert!(!err.rotates());
    }

    #[tokio::test]
    async fn ok_body_with_embedded_envelope_is_still_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let client = CseClient::with_base(&server.uri()).unwrap();
        let err = client
            .search_page("K1", "E1", "rust", 1, SortOrder::Relevance)
            .await
            .unwrap_err();
        assert!(err.rotates());
    }
}
