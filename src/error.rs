use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors surfaced by the proxy pipeline.
///
/// Origin-side error *statuses* are not errors here — they are passed
/// through to the client verbatim. This enum covers the cases where the
/// proxy itself has nothing sensible to forward.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Network-level failure or timeout reaching the origin.
    #[error("upstream fetch failed for {url}: {source}")]
    OriginFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Origin kept answering with a transient gateway status until the
    /// retry budget ran out.
    #[error("origin returned {status} for {url} after {attempts} attempts")]
    UpstreamUnavailable {
        url: String,
        status: StatusCode,
        attempts: u32,
    },

    /// Inbound path and configuration do not combine into a valid upstream URL.
    #[error("cannot build upstream target: {0}")]
    InvalidTarget(String),

    #[error("failed to assemble response: {0}")]
    ResponseBuild(#[from] axum::http::Error),
}

impl ProxyError {
    fn status(&self) -> StatusCode {
        match self {
            // Timeouts get 504 so operators can tell a slow origin from a
            // dead one; everything else transport-side is a 502.
            ProxyError::OriginFetch { source, .. } if source.is_timeout() => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ProxyError::OriginFetch { .. } | ProxyError::UpstreamUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::ResponseBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    /// Diagnostic plain-text body naming the attempted upstream URL, so
    /// proxy failures are distinguishable from origin failures. The CORS
    /// layer wraps these responses too — browser players see the status
    /// instead of an opaque network error.
    fn into_response(self) -> Response {
        let status = self.status();
        error!("{}", self);
        (status, self.to_string()).into_response()
    }
}
