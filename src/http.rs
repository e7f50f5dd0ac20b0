use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("pricesync-api-rs/", env!("CARGO_PKG_VERSION"));

/// Outbound client for price publishers. Timeouts come from
/// `HTTP_TIMEOUT_SECS` / `HTTP_CONNECT_TIMEOUT_SECS`.
pub fn build_client() -> Client {
    let timeout = secs_from_env("HTTP_TIMEOUT_SECS", 15);
    let connect = secs_from_env("HTTP_CONNECT_TIMEOUT_SECS", 5);
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(connect)
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn secs_from_env(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
