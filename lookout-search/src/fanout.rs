//! Multi-page fetch: one rotated request to learn totals, then the
//! remaining pages concurrently through the winning credential pair.
//!
//! A follow-up page that fails degrades to a gap in the result list (with a
//! warning) rather than failing the whole query; pages are merged back in
//! ascending start order regardless of completion order.

use crate::client::CseClient;
use crate::rotation::{CredentialPair, Rotation};
use crate::types::{PageResults, SortOrder, round2};
use crate::{PAGE_SIZE, MAX_START, SearchError};
use futures::future::join_all;

/// Fetch up to `max_pages` pages for `query` and merge them.
pub async fn search_all(
    client: &CseClient,
    pairs: &[CredentialPair],
    query: &str,
    sort: SortOrder,
    max_pages: u32,
) -> Result<PageResults, SearchError> {
    let rotation = Rotation::new(client, pairs);
    let (winner, first) = rotation.search_page(query, 1, sort).await?;
    let pair = &pairs[winner];

    let remaining_pages = u64::min(
        max_pages.saturating_sub(1) as u64,
        first.total_results.saturating_sub(1) / PAGE_SIZE as u64,
    ) as u32;

    let Some(next_start) = first.next_start else {
        return Ok(done(first.results, first.total_results, first.search_time));
    };
    if remaining_pages == 0 {
        return Ok(done(first.results, first.total_results, first.search_time));
    }

    let starts: Vec<u32> = (0..remaining_pages)
        .map(|i| next_start + i * PAGE_SIZE)
        .filter(|&s| s <= MAX_START)
        .collect();

    let follow_ups = join_all(starts.iter().map(|&start| {
        let client = client.clone();
        async move {
            client
                .search_page(&pair.api_key, &pair.engine_id, query, start, sort)
                .await
        }
    }))
    .await;

    let mut results = first.results;
    let mut search_time = first.search_time;
    // join_all preserves input order, so pages land back in start order.
    for (start, outcome) in starts.iter().zip(follow_ups) {
        match outcome {
            Ok(page) => {
                results.extend(page.results);
                search_time += page.search_time;
            }
            Err(e) => {
                tracing::warn!(start = *start, error = %e, "follow-up page failed, skipping");
            }
        }
    }

    Ok(done(results, first.total_results, search_time))
}

fn done(
    results: Vec<crate::types::SearchResult>,
    total_results: u64,
    search_time: f64,
) -> PageResults {
    PageResults {
        results,
        next_start: None,
        total_results,
        search_time: round2(search_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::build_pairs;
    use lookout_config::DataFiles;
    use lookout_config::credentials::NamedValues;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn data_one_key() -> DataFiles {
        let mut data = DataFiles::default();
        let mut k = NamedValues::new();
        k.push("a".into(), "K1".into()).unwrap();
        let mut e = NamedValues::new();
        e.push("main".into(), "E1".into()).unwrap();
        data.api_keys = k;
        data.search_engines = e;
        data
    }

    fn page_body(start: u32, total: u32) -> serde_json::Value {
        let next = start + 10;
        let mut body = serde_json::json!({
            "searchInformation": { "totalResults": total.to_string(), "searchTime": 0.1 },
            "items": [{
                "htmlTitle": format!("hit-{start}"),
                "link": format!("https://site.example/{start}"),
                "displayLink": "site.example",
                "htmlSnippet": "s"
            }]
        });
        if next <= total {
            body["queries"] = serde_json::json!({ "nextPage": [ { "startIndex": next } ] });
        }
        body
    }

    #[tokio::test]
    async fn pages_merge_in_start_order() {
        let server = MockServer::start().await;
        for start in [1u32, 11, 21] {
            Mock::given(method("GET"))
                .and(query_param("start", start.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(page_body(start, 25)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let data = data_one_key();
        let pairs = build_pairs(&data, None).unwrap();
        let client = CseClient::with_base(&server.uri()).unwrap();

        let merged = search_all(&client, &pairs, "rust", SortOrder::Relevance, 10)
            .await
            .unwrap();
        let titles: Vec<_> = merged.results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["hit-1", "hit-11", "hit-21"]);
        assert_eq!(merged.total_results, 25);
        assert_eq!(merged.next_start, None);
        assert_eq!(merged.search_time, 0.3);
        server.verify().await;
    }

    #[tokio::test]
    async fn max_pages_caps_the_fan_out() {
        let server = MockServer::start().await;
        for start in [1u32, 11] {
            Mock::given(method("GET"))
                .and(query_param("start", start.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(page_body(start, 95)))
                .expect(1)
                .mount(&server)
                .await;
        }
        // Pages past the cap must never be requested.
        Mock::given(method("GET"))
            .and(query_param("start", "21"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(21, 95)))
            .expect(0)
            .mount(&server)
            .await;

        let data = data_one_key();
        let pairs = build_pairs(&data, None).unwrap();
        let client = CseClient::with_base(&server.uri()).unwrap();

        let merged = search_all(&client, &pairs, "rust", SortOrder::Relevance, 2)
            .await
            .unwrap();
        assert_eq!(merged.results.len(), 2);
        server.verify().await;
    }

    #[tokio::test]
    async fn failed_follow_up_pages_leave_a_gap() {
        let server = MockServer::start().await;
        for start in [1u32, 21] {
            Mock::given(method("GET"))
                .and(query_param("start", start.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(page_body(start, 25)))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(query_param("start", "11"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let data = data_one_key();
        let pairs = build_pairs(&data, None).unwrap();
        let client = CseClient::with_base(&server.uri()).unwrap();

        let merged = search_all(&client, &pairs, "rust", SortOrder::Relevance, 10)
            .await
            .unwrap();
        let titles: Vec<_> = merged.results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["hit-1", "hit-21"]);
    }

    #[tokio::test]
    async fn single_page_totals_skip_the_fan_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 1)))
            .expect(1)
            .mount(&server)
            .await;

        let data = data_one_key();
        let pairs = build_pairs(&data, None).unwrap();
        let client = CseClient::with_base(&server.uri()).unwrap();

        let merged = search_all(&client, &pairs, "rust", SortOrder::Relevance, 10)
            .await
            .unwrap();
        assert_eq!(merged.results.len(), 1);
        server.verify().await;
    }
}
