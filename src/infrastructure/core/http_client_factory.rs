use reqwest::Client;
use std::time::Duration;

/// Per-request deadline applied to every provider call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates the HTTP client shared by the market-data adapters. Transient
    /// failures surface directly to the caller; there is no retry layer.
    pub fn create_client() -> Client {
        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}
