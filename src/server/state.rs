use crate::config::Config;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use url::Url;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared HTTP client for connection pooling
    pub http_client: Client,
    /// Parsed origin base, used for host matching during manifest rewrites
    pub origin_base: Arc<Url>,
    /// Process start, reported by the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config) -> Self {
        if config.insecure_tls {
            warn!("INSECURE_TLS enabled: origin certificate validation is off");
        }

        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .timeout(config.upstream_timeout())
            // Raw-IP origins with non-matching certs; explicit config opt-in only.
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .expect("Failed to create HTTP client");

        let origin_base =
            Url::parse(config.origin_base()).expect("ORIGIN_URL must be an absolute URL");

        Self {
            config: Arc::new(config),
            http_client,
            origin_base: Arc::new(origin_base),
            started_at: Instant::now(),
        }
    }
}
