use anyhow::Result;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quickask::gateway::{GatewayConfig, SearchGateway};

mod test_helpers {
    use super::*;
    use tokio::net::TcpListener;

    /// Serve `router` on an ephemeral local port and return its base URL.
    pub async fn spawn_upstream(router: Router) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        Ok(format!("http://{addr}/"))
    }

    pub type SeenParams = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Upstream that always answers with `payload` and records the params of
    /// every request it sees.
    pub async fn json_upstream(payload: Value) -> Result<(String, SeenParams)> {
        let seen: SeenParams = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/",
                get(
                    |State((payload, seen)): State<(Value, SeenParams)>,
                     Query(params): Query<HashMap<String, String>>| async move {
                        seen.lock().unwrap().push(params);
                        (
                            [(header::CONTENT_TYPE, "application/x-javascript")],
                            payload.to_string(),
                        )
                    },
                ),
            )
            .with_state((payload, seen.clone()));
        Ok((spawn_upstream(router).await?, seen))
    }

    pub fn gateway(upstream_url: &str, timeout: Duration) -> Result<SearchGateway> {
        Ok(SearchGateway::new(GatewayConfig {
            upstream_url: upstream_url.to_string(),
            search_ui_url: "https://duckduckgo.com/".to_string(),
            timeout,
        })?)
    }

    pub fn topic(n: usize) -> Value {
        json!({
            "Text": format!("Topic {n} - description of topic {n}"),
            "FirstURL": format!("https://duckduckgo.com/Topic_{n}"),
        })
    }

    pub fn assert_apology(answer: Option<&str>, query: &str) {
        let answer = answer.expect("an apology answer");
        assert!(answer.starts_with("I apologize"), "got {answer:?}");
        assert!(answer.contains(&format!("\"{query}\"")));
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_takes_first_three_topics_in_order() -> Result<()> {
    let payload = json!({
        "AbstractText": "Rust is a programming language.",
        "RelatedTopics": (1..=5).map(topic).collect::<Vec<_>>(),
    });
    let (url, _) = json_upstream(payload).await?;
    let response = gateway(&url, Duration::from_secs(5))?.search("rust").await;

    assert_eq!(response.answer.as_deref(), Some("Rust is a programming language."));
    assert_eq!(response.results.len(), 3);
    for (i, result) in response.results.iter().enumerate() {
        let n = i + 1;
        assert_eq!(result.title, format!("Topic {n}"));
        assert_eq!(result.snippet, format!("Topic {n} - description of topic {n}"));
        assert_eq!(result.url, format!("https://duckduckgo.com/Topic_{n}"));
        assert_eq!(result.source, "duckduckgo.com");
    }
    Ok(())
}

#[tokio::test]
async fn test_answer_wins_over_abstract() -> Result<()> {
    let payload = json!({
        "Answer": "42",
        "AbstractText": "An abstract.",
        "RelatedTopics": [],
    });
    let (url, _) = json_upstream(payload).await?;
    let response = gateway(&url, Duration::from_secs(5))?.search("answer").await;

    assert_eq!(response.answer.as_deref(), Some("42"));
    assert!(response.results.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_empty_upstream_falls_back_to_synthesized_answer() -> Result<()> {
    let payload = json!({ "Answer": "", "AbstractText": "", "RelatedTopics": [] });
    let (url, _) = json_upstream(payload).await?;
    let response = gateway(&url, Duration::from_secs(5))?
        .search("how to learn rust")
        .await;

    let answer = response.answer.expect("fallback answer");
    assert!(answer.starts_with("To learn rust,"));
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].title, "Information about: how to learn rust");
    assert_eq!(response.results[0].source, "duckduckgo.com");
    assert_eq!(
        response.results[0].url,
        "https://duckduckgo.com/?q=how+to+learn+rust"
    );
    Ok(())
}

#[tokio::test]
async fn test_sends_encoded_query_and_format_params() -> Result<()> {
    let (url, seen) = json_upstream(json!({ "Answer": "ok" })).await?;
    gateway(&url, Duration::from_secs(5))?
        .search("c++ & rust?")
        .await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let params = &seen[0];
    assert_eq!(params["q"], "c++ & rust?");
    assert_eq!(params["format"], "json");
    assert_eq!(params["no_html"], "1");
    assert_eq!(params["skip_disambig"], "1");
    Ok(())
}

#[tokio::test]
async fn test_upstream_error_status_is_recovered() -> Result<()> {
    let router = Router::new().route(
        "/",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down").into_response() }),
    );
    let url = spawn_upstream(router).await?;
    let response = gateway(&url, Duration::from_secs(5))?.search("rust").await;

    assert!(response.results.is_empty());
    assert_apology(response.answer.as_deref(), "rust");
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_recovered() -> Result<()> {
    let router = Router::new().route("/", get(|| async { "{\"Answer\": " }));
    let url = spawn_upstream(router).await?;
    let response = gateway(&url, Duration::from_secs(5))?.search("rust").await;

    assert!(response.results.is_empty());
    assert_apology(response.answer.as_deref(), "rust");
    Ok(())
}

#[tokio::test]
async fn test_timeout_is_recovered() -> Result<()> {
    let router = Router::new().route(
        "/",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{}"
        }),
    );
    let url = spawn_upstream(router).await?;
    let gateway = gateway(&url, Duration::from_millis(200))?;

    let started = std::time::Instant::now();
    let response = gateway.search("slow").await;
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(response.results.is_empty());
    assert_apology(response.answer.as_deref(), "slow");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_upstream_is_recovered() -> Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let response = gateway(&format!("http://{addr}/"), Duration::from_secs(2))?
        .search("offline")
        .await;
    assert!(response.results.is_empty());
    assert_apology(response.answer.as_deref(), "offline");
    Ok(())
}

#[tokio::test]
async fn test_fetch_reports_typed_errors() -> Result<()> {
    let router = Router::new().route(
        "/",
        get(|| async { (StatusCode::NOT_FOUND, "nope").into_response() }),
    );
    let url = spawn_upstream(router).await?;
    let err = gateway(&url, Duration::from_secs(5))?
        .fetch("rust")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        quickask::gateway::GatewayError::Status(status) if status == StatusCode::NOT_FOUND
    ));
    Ok(())
}
