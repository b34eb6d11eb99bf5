//! News headlines for the spoken digest
//!
//! The feed is any JSON document with an `items` list whose entries carry a
//! `title` (JSON Feed documents have this shape).

use crate::{Result, VoiceKitError};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Configuration for the news feed
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Feed URL
    pub endpoint: String,
    /// Number of headlines read out
    pub headline_count: usize,
    /// Timeout for the request in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.jsonfeed.org/feed.json".to_string(),
            headline_count: 3,
            timeout_ms: 10_000,
            user_agent: concat!("voicekit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsFeed {
    #[serde(default)]
    items: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: Option<String>,
}

/// HTTP client for the news feed
pub struct NewsClient {
    client: reqwest::Client,
    config: NewsConfig,
}

impl NewsClient {
    pub fn new(config: NewsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| VoiceKitError::ContentError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch the first `headline_count` titles from the feed
    pub async fn fetch_headlines(&self) -> Result<Vec<String>> {
        debug!(endpoint = %self.config.endpoint, "Fetching news feed");

        let response = self
            .client
            .get(&self.config.endpoint)
            .send()
            .await
            .map_err(|e| VoiceKitError::ContentError(format!("News request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| VoiceKitError::ContentError(format!("News feed returned error: {}", e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| VoiceKitError::ContentError(format!("Failed to read news feed: {}", e)))?;

        parse_headlines(&body, self.config.headline_count)
    }
}

/// Extract up to `count` non-empty titles from a feed document
pub fn parse_headlines(body: &str, count: usize) -> Result<Vec<String>> {
    let feed: NewsFeed = serde_json::from_str(body)
        .map_err(|e| VoiceKitError::ContentError(format!("Invalid news feed: {}", e)))?;

    Ok(feed
        .items
        .into_iter()
        .filter_map(|item| item.title)
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .take(count)
        .collect())
}

/// Join headlines into one spoken string
///
/// Returns `None` when there is nothing to read.
pub fn format_digest(headlines: &[String]) -> Option<String> {
    if headlines.is_empty() {
        return None;
    }

    let mut digest = String::from("Here are the latest headlines.");
    for headline in headlines {
        digest.push(' ');
        digest.push_str(headline.trim_end_matches(['.', '!', '?', ' ']));
        digest.push('.');
    }
    Some(digest)
}
