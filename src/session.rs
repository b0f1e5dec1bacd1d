//! Client-side search orchestration.
//!
//! A [`SearchSession`] owns the state a UI renders from and keeps it usable
//! when the search service cannot be reached: a transport failure degrades to
//! a locally computed answer plus a soft warning instead of an empty screen.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::CONFIG;
use crate::data_models::{Query, SearchResponse, SearchResult};
use crate::synthesizer;

pub const NO_ANSWER: &str =
    "I couldn't find a specific answer for your query, but here are some relevant results.";

pub const OFFLINE_WARNING: &str =
    "The search service is unavailable right now, so this answer was generated offline.";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid search endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("search request timed out")]
    Timeout,
    #[error("search service returned status {0}")]
    Status(StatusCode),
    #[error("search request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e)
        }
    }
}

/// How a session reaches the request handler.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn send(&self, query: &str) -> Result<SearchResponse, TransportError>;
}

/// Posts `{"query": ...}` to the search endpoint. Any non-2xx status counts
/// as a failure, including the 500 envelope.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .user_agent(concat!("quickask/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config() -> Result<Self, TransportError> {
        Self::new(&CONFIG.search_endpoint)
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn send(&self, query: &str) -> Result<SearchResponse, TransportError> {
        let res = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        Ok(res.json::<SearchResponse>().await?)
    }
}

/// What a UI renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_loading: bool,
    pub results: Vec<SearchResult>,
    pub answer: Option<String>,
    /// Warning shown next to an offline answer.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank query; nothing happened.
    Ignored,
    /// The service answered and its response was adopted.
    Completed,
    /// The service could not be reached; an offline answer was adopted.
    Degraded,
    /// A newer search started meanwhile; this response was dropped.
    Superseded,
}

pub struct SearchSession {
    transport: Arc<dyn SearchTransport>,
    timeout: Duration,
    generation: AtomicU64,
    state: watch::Sender<SessionState>,
}

impl SearchSession {
    pub fn new(transport: Arc<dyn SearchTransport>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            transport,
            timeout,
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn from_config() -> Result<Self, TransportError> {
        Ok(Self::new(
            Arc::new(HttpTransport::from_config()?),
            CONFIG.client_timeout,
        ))
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub async fn search(&self, raw_query: &str) -> SearchOutcome {
        let Some(query) = Query::parse(raw_query) else {
            return SearchOutcome::Ignored;
        };

        // Generation bumps and the staleness check both run under the watch
        // lock, so they are totally ordered with every state write.
        let mut ticket = 0;
        self.state.send_modify(|state| {
            ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = SessionState {
                is_loading: true,
                ..SessionState::default()
            };
        });

        let sent = tokio::time::timeout(self.timeout, self.transport.send(query.as_str())).await;
        let result = sent.unwrap_or(Err(TransportError::Timeout));

        let (next, outcome) = match result {
            Ok(response) => {
                let answer = response
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER.to_string());
                let next = SessionState {
                    is_loading: false,
                    results: response.results,
                    answer: Some(answer),
                    error: None,
                };
                (next, SearchOutcome::Completed)
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "search service unreachable, answering offline");
                let next = SessionState {
                    is_loading: false,
                    results: Vec::new(),
                    answer: Some(synthesizer::offline_answer(query.as_str())),
                    error: Some(OFFLINE_WARNING.to_string()),
                };
                (next, SearchOutcome::Degraded)
            }
        };

        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            *state = next;
            true
        });

        if applied {
            outcome
        } else {
            tracing::debug!(query = %query, ticket, "dropping stale search response");
            SearchOutcome::Superseded
        }
    }
}
