use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

use crate::config::CONFIG;
use crate::data_models::{SearchResponse, SearchResult};
use crate::synthesizer;

/// Upper bound on result cards taken from `RelatedTopics`.
pub const MAX_RESULTS: usize = 3;

/// Titles whose text starts with the " - " separator are cut to this many
/// characters instead.
const TITLE_CHARS: usize = 60;

/// Anything that can turn a query into a [`SearchResponse`].
///
/// The HTTP layer only depends on this trait, so the upstream can be swapped
/// for another instant-answer provider.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<SearchResponse>;
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(e)
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub upstream_url: String,
    pub search_ui_url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn from_config() -> Self {
        Self {
            upstream_url: CONFIG.upstream_api_url.clone(),
            search_ui_url: CONFIG.search_ui_url.clone(),
            timeout: CONFIG.upstream_timeout,
        }
    }
}

/// Instant-answer payload. Only the consumed fields are modelled; odd shapes
/// (nulls, non-string answers) decode as empty rather than failing.
#[derive(Debug, Default, Deserialize)]
pub struct InstantAnswer {
    #[serde(rename = "Answer", default, deserialize_with = "lenient_string")]
    pub answer: String,
    #[serde(rename = "AbstractText", default, deserialize_with = "lenient_string")]
    pub abstract_text: String,
    #[serde(rename = "RelatedTopics", default, deserialize_with = "null_as_default")]
    pub related_topics: Vec<RelatedTopic>,
}

/// One `RelatedTopics` entry. Topic groups carry `Name`/`Topics` instead and
/// decode with both fields empty.
#[derive(Debug, Default, Deserialize)]
pub struct RelatedTopic {
    #[serde(rename = "Text", default, deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(rename = "FirstURL", default, deserialize_with = "lenient_string")]
    pub first_url: String,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

pub struct SearchGateway {
    client: Client,
    upstream_url: Url,
    search_ui_url: Url,
}

impl SearchGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("quickask/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            upstream_url: parse_url(&config.upstream_url)?,
            search_ui_url: parse_url(&config.search_ui_url)?,
        })
    }

    pub fn from_config() -> Result<Self, GatewayError> {
        Self::new(GatewayConfig::from_config())
    }

    /// Look `query` up upstream. Upstream failures are recovered here and
    /// surface only as an apologetic answer with no results.
    pub async fn search(&self, query: &str) -> SearchResponse {
        match self.fetch(query).await {
            Ok(instant) => self.compose(query, instant),
            Err(e) => {
                tracing::warn!(query, error = %e, "upstream search failed");
                SearchResponse::new(
                    Vec::new(),
                    format!(
                        "I apologize, but I encountered an error while searching for information about \"{query}\". Please try again with a different query."
                    ),
                )
            }
        }
    }

    pub async fn fetch(&self, query: &str) -> Result<InstantAnswer, GatewayError> {
        let res = self
            .client
            .get(self.upstream_url.clone())
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }

        // The API labels its JSON as javascript, so decode the bytes directly.
        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Turn an upstream payload into the response shape, filling gaps from
    /// the synthesizer.
    pub fn compose(&self, query: &str, instant: InstantAnswer) -> SearchResponse {
        let mut answer = [instant.answer, instant.abstract_text]
            .into_iter()
            .find(|s| !s.is_empty());
        let mut results = map_related_topics(&instant.related_topics);

        if answer.is_none() && results.is_empty() {
            tracing::info!(query, "no upstream answer, synthesizing one");
            answer = Some(synthesizer::synthesize(query));
            results.push(self.placeholder(query));
        }

        let answer = answer.unwrap_or_else(|| {
            format!(
                "Based on available information about \"{query}\", this appears to be a topic that would benefit from further research. The search results above provide relevant information from various sources."
            )
        });

        SearchResponse::new(results, answer)
    }

    fn placeholder(&self, query: &str) -> SearchResult {
        let mut url = self.search_ui_url.clone();
        url.query_pairs_mut().clear().append_pair("q", query);
        SearchResult {
            title: format!("Information about: {query}"),
            snippet: format!(
                "Search results and information related to {query} from various sources."
            ),
            source: url.host_str().unwrap_or_default().to_string(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SearchService for SearchGateway {
    async fn search(&self, query: &str) -> anyhow::Result<SearchResponse> {
        Ok(SearchGateway::search(self, query).await)
    }
}

/// Map the first [`MAX_RESULTS`] topics, dropping entries without text, without
/// a URL, or whose URL has no host.
pub fn map_related_topics(topics: &[RelatedTopic]) -> Vec<SearchResult> {
    topics
        .iter()
        .take(MAX_RESULTS)
        .filter(|t| !t.text.is_empty() && !t.first_url.is_empty())
        .filter_map(|t| {
            let source = match Url::parse(&t.first_url) {
                Ok(url) => url.host_str()?.to_string(),
                Err(e) => {
                    tracing::debug!("skipping topic with bad url {:?}: {}", t.first_url, e);
                    return None;
                }
            };
            Some(SearchResult {
                title: title_for(&t.text),
                snippet: t.text.clone(),
                url: t.first_url.clone(),
                source,
            })
        })
        .collect()
}

/// Text before the first " - ", or the whole text when there is none. Only an
/// empty head falls back to the first [`TITLE_CHARS`] characters.
pub fn title_for(text: &str) -> String {
    match text.split(" - ").next() {
        Some(head) if !head.is_empty() => head.to_string(),
        _ => text.chars().take(TITLE_CHARS).collect(),
    }
}

fn parse_url(raw: &str) -> Result<Url, GatewayError> {
    Url::parse(raw).map_err(|e| GatewayError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}
