use std::env;
use std::time::Duration;

/// Path prefix under which the proxy exposes HLS content.
pub const MOUNT_POINT: &str = "/hls";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Externally reachable base URL of this proxy. Used as the self-origin
    /// fallback when no forwarded/Host headers are available.
    pub base_url: String,
    /// Origin media server base URL, e.g. `http://203.0.113.7`.
    pub origin_url: String,
    pub is_dev: bool,
    /// Remove the `/hls` mount prefix before forwarding to the origin.
    /// Default is false: the origin is assumed to serve under `/hls` itself.
    pub strip_mount_prefix: bool,
    /// Accept origin TLS certificates that do not match the host (raw-IP
    /// origins with self-signed certs). Explicit opt-in, never a default.
    pub insecure_tls: bool,
    /// Per-request upstream timeout in seconds.
    pub upstream_timeout_secs: u64,
    /// Total upstream fetch attempts (1 initial + N-1 retries).
    pub retry_attempts: u32,
    /// Delay between upstream attempts in milliseconds.
    pub retry_backoff_ms: u64,
    /// User-Agent sent to the origin when the client supplies none.
    pub fallback_user_agent: String,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT,
    /// BASE_URL and ORIGIN_URL are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let base_url = if is_dev {
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
        } else {
            env::var("BASE_URL").map_err(|_| "BASE_URL is required in production")?
        };

        let origin_url = if is_dev {
            env::var("ORIGIN_URL").unwrap_or_else(|_| "http://origin.example.com".to_string())
        } else {
            env::var("ORIGIN_URL").map_err(|_| "ORIGIN_URL is required in production")?
        };

        // Mount-prefix handling is origin-dependent and must be an explicit
        // choice; preserve by default.
        let strip_mount_prefix = env::var("STRIP_MOUNT_PREFIX")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let insecure_tls = env::var("INSECURE_TLS")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let upstream_timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .unwrap_or(25);

        let retry_attempts = env::var("RETRY_ATTEMPTS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);

        let retry_backoff_ms = env::var("RETRY_BACKOFF_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .unwrap_or(500);

        // Some origins reject requests with missing or unusual agents.
        let fallback_user_agent =
            env::var("FALLBACK_USER_AGENT").unwrap_or_else(|_| "Mozilla/5.0".to_string());

        Ok(Config {
            port,
            base_url,
            origin_url,
            is_dev,
            strip_mount_prefix,
            insecure_tls,
            upstream_timeout_secs,
            retry_attempts,
            retry_backoff_ms,
            fallback_user_agent,
        })
    }

    /// Origin base with any trailing slash removed, ready for path concatenation.
    pub fn origin_base(&self) -> &str {
        self.origin_url.trim_end_matches('/')
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
