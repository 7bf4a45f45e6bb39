//! Web search grounding via the Serper and Tavily APIs.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const SERPER_URL: &str = "https://google.serper.dev/search";
const TAVILY_URL: &str = "https://api.tavily.com/search";

/// One organic search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Search provider used by the crew.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>>;
}

/// Credentials and limits for one search provider.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: SecretString,
    /// Results requested per query.
    pub max_results: usize,
    pub timeout: Duration,
}

impl SearchConfig {
    /// Serper settings. `None` when `SERPER_API_KEY` is unset.
    pub fn serper_from_env() -> Option<Self> {
        Self::from_key_var("SERPER_API_KEY")
    }

    /// Tavily settings. `None` when `TAVILY_API_KEY` is unset.
    pub fn tavily_from_env() -> Option<Self> {
        Self::from_key_var("TAVILY_API_KEY")
    }

    fn from_key_var(key_var: &str) -> Option<Self> {
        let api_key = std::env::var(key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())?;

        Some(Self {
            api_key: SecretString::from(api_key),
            max_results: std::env::var("TRIP_CREW_SEARCH_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            timeout: Duration::from_secs(20),
        })
    }

    fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}

// ── Serper ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

/// Serper (Google search) client.
pub struct SerperSearch {
    http: reqwest::Client,
    config: SearchConfig,
}

impl SerperSearch {
    pub fn new(config: SearchConfig) -> Result<Self, reqwest::Error> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl WebSearch for SerperSearch {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
        let response = self
            .http
            .post(SERPER_URL)
            .header("X-API-KEY", self.config.api_key.expose_secret())
            .json(&serde_json::json!({ "q": query, "num": self.config.max_results }))
            .send()
            .await?
            .error_for_status()?;

        let body: SerperResponse = response.json().await?;
        let mut hits = body.organic;
        hits.truncate(self.config.max_results);
        Ok(hits)
    }
}

// ── Tavily ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for SearchHit {
    fn from(r: TavilyResult) -> Self {
        Self {
            title: r.title,
            link: r.url,
            snippet: r.content,
        }
    }
}

/// Tavily search client.
pub struct TavilySearch {
    http: reqwest::Client,
    config: SearchConfig,
}

impl TavilySearch {
    pub fn new(config: SearchConfig) -> Result<Self, reqwest::Error> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
        let response = self
            .http
            .post(TAVILY_URL)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&serde_json::json!({
                "query": query,
                "max_results": self.config.max_results,
                "search_depth": "basic",
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: TavilyResponse = response.json().await?;
        Ok(body
            .results
            .into_iter()
            .take(self.config.max_results)
            .map(SearchHit::from)
            .collect())
    }
}

/// Render hits as a compact bullet list for a prompt.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("- {} ({}): {}", h.title, h.link, h.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
