use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::config::TavilyConfig;
use crate::search::{SearchError, SearchProvider, SearchResult};

pub struct TavilySearch {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavilySearch {
    pub fn new(config: &TavilyConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_base.clone(),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(
        &self,
        query: &str,
        include_domains: &[&str],
        exclude_domains: &[&str],
    ) -> Result<Vec<SearchResult>, SearchError> {
        info!("Performing Tavily search for: {}", query);

        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": "advanced",
            "max_results": 5,
            "include_domains": include_domains,
            "exclude_domains": exclude_domains,
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::Api(format!("Tavily Error {}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let results = json["results"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|r| {
                        Some(SearchResult {
                            title: r["title"].as_str()?.to_string(),
                            url: r["url"].as_str()?.to_string(),
                            content: r["content"].as_str().unwrap_or_default().to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }
}
