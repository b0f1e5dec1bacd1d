use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        bind_addr: get_env_or_default("BIND_ADDR", "0.0.0.0:3000"),
        upstream_api_url: get_env_or_default("UPSTREAM_API_URL", "https://api.duckduckgo.com/"),
        search_ui_url: get_env_or_default("SEARCH_UI_URL", "https://duckduckgo.com/"),
        upstream_timeout: Duration::from_millis(get_env_millis("UPSTREAM_TIMEOUT_MS", 8_000)),
        static_dir: get_env_or_default("STATIC_DIR", "static"),
        search_endpoint: get_env_or_default(
            "SEARCH_ENDPOINT",
            "http://127.0.0.1:3000/api/search",
        ),
        client_timeout: Duration::from_millis(get_env_millis("CLIENT_TIMEOUT_MS", 15_000)),
    }
});

pub struct Config {
    pub bind_addr: String,
    /// Base URL of the instant-answer API.
    pub upstream_api_url: String,
    /// Human-facing search page used for placeholder results.
    pub search_ui_url: String,
    pub upstream_timeout: Duration,
    pub static_dir: String,
    /// Where `ask` sends its queries.
    pub search_endpoint: String,
    pub client_timeout: Duration,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_millis(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable {key} must be milliseconds, got {raw:?}")),
        Err(_) => default,
    }
}
