//! Partition a flat result list into per-domain groups.
//!
//! Group order is the order in which each domain is first seen; members keep
//! their original rank order. The function is pure, so re-grouping the same
//! input always yields the identical layout.

use crate::types::SearchResult;
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainGroup {
    pub domain: String,
    pub results: Vec<SearchResult>,
}

/// Grouping key for a hit: lowercased URL host without a leading `www.`,
/// falling back to the display link when the URL does not parse.
pub fn domain_of(link: &str, display_link: &str) -> String {
    let host = Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));
    let raw = match &host {
        Some(h) => h.as_str(),
        None => display_link,
    };
    let raw = raw.to_ascii_lowercase();
    raw.strip_prefix("www.").unwrap_or(&raw).to_string()
}

pub fn group_by_domain(results: &[SearchResult]) -> Vec<DomainGroup> {
    let mut groups: Vec<DomainGroup> = Vec::new();
    for result in results {
        match groups.iter_mut().find(|g| g.domain == result.domain) {
            Some(group) => group.results.push(result.clone()),
            None => groups.push(DomainGroup {
                domain: result.domain.clone(),
                results: vec![result.clone()],
            }),
        }
    }
    groups
}
