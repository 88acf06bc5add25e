//! Breadcrumb trails for search hits.
//!
//! Preferred source is the result's `pagemap.listitem` chain (minus the
//! current page, with the domain prepended). When a site ships no listitem
//! metadata the trail is derived from the URL: protocol stripped, query and
//! common file extensions dropped, long middle segments elided.

use crate::types::CseItem;
use regex::Regex;
use std::sync::OnceLock;

const SEGMENT_LIMIT: usize = 30;
const TRAIL_LIMIT: usize = 95;

fn protocol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://").expect("static regex"))
}

fn tail_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^(.*?)(\?|\.php|\.html).*$").expect("static regex"))
}

/// Build the display trail for one search hit.
pub fn breadcrumb_for(item: &CseItem) -> String {
    let names: Vec<&str> = item
        .pagemap
        .as_ref()
        .map(|pm| {
            pm.listitem
                .iter()
                .filter_map(|li| li.name.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if !names.is_empty() {
        // Last listitem is the current page; the domain leads the trail.
        let mut trail = vec![item.display_link.as_str()];
        trail.extend(&names[..names.len().saturating_sub(1)]);
        return trail.join(" > ");
    }

    from_url(&item.link)
}

/// URL fallback: `https://a.example/docs/guide.html?x=1` → `a.example > docs > guide`.
fn from_url(link: &str) -> String {
    let without_protocol = protocol_re().replace(link, "");
    let trimmed = tail_re().replace(&without_protocol, "$1");
    let segments: Vec<&str> = trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    refine(&segments)
}

fn refine(segments: &[&str]) -> String {
    let trail = match segments {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, middle @ .., last] => {
            let mut parts = vec![(*first).to_string()];
            parts.extend(middle.iter().map(|s| elide(s)));
            parts.push((*last).to_string());
            parts.join(" > ")
        }
    };
    if trail.len() > TRAIL_LIMIT {
        // Segment names may be non-ASCII; cut at a char boundary.
        let mut cut = TRAIL_LIMIT;
        while !trail.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &trail[..cut])
    } else {
        trail
    }
}

fn elide(segment: &str) -> String {
    if segment.len() > SEGMENT_LIMIT {
        "...".to_string()
    } else {
        segment.to_string()
    }
}
