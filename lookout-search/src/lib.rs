//! Google Custom Search client, credential rotation, and result shaping.
//!
//! - `client`: thin wrapper over the Custom Search JSON API (one page)
//! - `rotation`: walks (API key, engine) pairs on quota/auth failures
//! - `fanout`: multi-page concurrent fetch through the winning pair
//! - `group`: partition results by domain, order-preserving
//! - `breadcrumb`: display trails from pagemap metadata or the URL itself

pub mod breadcrumb;
pub mod client;
pub mod fanout;
pub mod group;
pub mod rotation;
pub mod types;

pub use client::CseClient;
pub use fanout::search_all;
pub use group::{DomainGroup, group_by_domain};
pub use rotation::{CredentialPair, Rotation, build_pairs};
pub use types::{PageResults, SearchResult, SortOrder};

/// Fixed limits of the Custom Search JSON API: 10 results per page, start
/// index capped at 100.
pub const PAGE_SIZE: u32 = 10;
pub const MAX_START: u32 = 100;

/// How a failed API call should be treated by the rotation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Quota exhausted on this credential pair; the next pair may work.
    Quota,
    /// Key rejected or not authorized for the engine; the next pair may work.
    Auth,
    /// Anything else: bad request, server trouble, decode failure. Trying
    /// another pair would not help.
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("empty query")]
    EmptyQuery,

    #[error("no search engines configured")]
    NoEngines,

    #[error("unknown engine '{0}'")]
    UnknownEngine(String),

    #[error("no API keys configured")]
    NoKeys,

    /// Every credential pair was tried once and rejected.
    #[error("no usable search credentials remain ({tried} pair(s) tried)")]
    CredentialsExhausted { tried: usize },

    /// The API reported an error envelope.
    #[error("search API error {code}: {message}")]
    Api {
        code: u16,
        message: String,
        kind: ApiErrorKind,
    },

    #[error(transparent)]
    Http(#[from] lookout_http::HttpError),
}

impl SearchError {
    /// Whether the rotation loop should advance to the next credential pair.
    pub fn rotates(&self) -> bool {
        matches!(
            self,
            SearchError::Api {
                kind: ApiErrorKind::Quota | ApiErrorKind::Auth,
                ..
            }
        )
    }
}
