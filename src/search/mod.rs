pub mod fallback;
pub mod tavily;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error: {0}")]
    Api(String),
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Web search collaborator for the uncertainty fallback. Implementations are
/// shared as `Arc<dyn SearchProvider>`.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        include_domains: &[&str],
        exclude_domains: &[&str],
    ) -> Result<Vec<SearchResult>, SearchError>;
}
