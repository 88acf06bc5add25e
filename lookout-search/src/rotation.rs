//! Credential rotation across (API key, engine) pairs.
//!
//! The engine is fixed for the whole query; rotation walks the API keys in
//! file order, trying each pair at most once. Quota and auth failures
//! advance to the next pair; anything else aborts immediately, because a
//! malformed request will fail identically on every key.

use crate::client::CseClient;
use crate::types::{PageResults, SortOrder};
use crate::SearchError;
use lookout_config::DataFiles;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub key_name: String,
    pub api_key: String,
    pub engine_name: String,
    pub engine_id: String,
}

impl CredentialPair {
    /// Loggable identity, never including secret material.
    pub fn label(&self) -> String {
        format!("{}/{}", self.key_name, self.engine_name)
    }
}

/// Build the ordered pair list for one query: the selected engine (or the
/// first configured one) combined with every API key in file order.
pub fn build_pairs(
    data: &DataFiles,
    engine: Option<&str>,
) -> Result<Vec<CredentialPair>, SearchError> {
    if data.search_engines.is_empty() {
        return Err(SearchError::NoEngines);
    }
    if data.api_keys.is_empty() {
        return Err(SearchError::NoKeys);
    }

    let (engine_name, engine_id) = match engine.filter(|e| !e.is_empty()) {
        Some(name) => {
            let id = data
                .search_engines
                .get(name)
                .ok_or_else(|| SearchError::UnknownEngine(name.to_string()))?;
            (name.to_string(), id.to_string())
        }
        None => {
            let (name, id) = data
                .search_engines
                .first()
                .expect("checked non-empty above");
            (name.to_string(), id.to_string())
        }
    };

    Ok(data
        .api_keys
        .iter()
        .map(|(key_name, api_key)| CredentialPair {
            key_name: key_name.to_string(),
            api_key: api_key.to_string(),
            engine_name: engine_name.clone(),
            engine_id: engine_id.clone(),
        })
        .collect())
}

pub struct Rotation<'a> {
    client: &'a CseClient,
    pairs: &'a [CredentialPair],
}

impl<'a> Rotation<'a> {
    pub fn new(client: &'a CseClient, pairs: &'a [CredentialPair]) -> Self {
        Self { client, pairs }
    }

    /// Fetch one page, rotating pairs on quota/auth failures. Returns the
    /// index of the pair that served the page so follow-up pages can reuse
    /// it without re-spending the exhausted ones.
    pub async fn search_page(
        &self,
        query: &str,
        start: u32,
        sort: SortOrder,
    ) -> Result<(usize, PageResults), SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if self.pairs.is_empty() {
            return Err(SearchError::CredentialsExhausted { tried: 0 });
        }

        for (idx, pair) in self.pairs.iter().enumerate() {
            match self
                .client
                .search_page(&pair.api_key, &pair.engine_id, query, start, sort)
                .await
            {
                Ok(page) => {
                    if idx > 0 {
                        tracing::info!(pair = %pair.label(), skipped = idx, "search served by fallback pair");
                    }
                    return Ok((idx, page));
                }
                Err(e) if e.rotates() => {
                    tracing::warn!(pair = %pair.label(), error = %e, "credential pair rejected, rotating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(SearchError::CredentialsExhausted {
            tried: self.pairs.len(),
        })
    }
}
