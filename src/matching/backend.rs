//! Map-matching backend transport
//!
//! [`MatchBackend`] is the seam between the pipeline and the external
//! map-matching service: it ships a request and hands back the raw status
//! and body. Interpreting the reply and deciding whether to retry belongs to
//! [`MatchClient`](super::MatchClient).

use super::MatchError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// One request to the backend: a serialized track plus the vehicle profile.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    /// Track payload (GPX bytes)
    pub payload: Vec<u8>,
    /// Routing profile, e.g. `car`, `bike`, `foot`
    pub vehicle: String,
    /// Source file, for logging and for test backends that script replies
    pub label: String,
}

/// Raw backend reply before interpretation.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport to a map-matching service.
///
/// Implementations report network-level problems (timeouts, refused
/// connections, broken bodies) as [`MatchError::Timeout`] or
/// [`MatchError::Transport`] and return every HTTP reply, success or not,
/// as a [`RawReply`].
#[async_trait]
pub trait MatchBackend: Send + Sync + 'static {
    async fn submit(&self, request: &MatchRequest) -> Result<RawReply, MatchError>;

    /// Human-readable name for logging (e.g. the endpoint URL).
    fn name(&self) -> &str;
}

// ============================================================================
// GraphHopper HTTP backend
// ============================================================================

/// GraphHopper-compatible `/match` endpoint over HTTP(S).
///
/// Posts the GPX payload with `Content-Type: application/gpx+xml` and query
/// parameters `vehicle=<profile>&type=json&points_encoded=false`.
#[derive(Clone)]
pub struct GraphHopperBackend {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphHopperBackend {
    /// Build a backend with a per-request timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, MatchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MatchError::Transport {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MatchBackend for GraphHopperBackend {
    async fn submit(&self, request: &MatchRequest) -> Result<RawReply, MatchError> {
        debug!(
            endpoint = %self.endpoint,
            track = %request.label,
            bytes = request.payload.len(),
            "Submitting track for matching"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/gpx+xml")
            .query(&[
                ("vehicle", request.vehicle.as_str()),
                ("type", "json"),
                ("points_encoded", "false"),
            ])
            .body(request.payload.clone())
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(from_reqwest)?;
        Ok(RawReply { status, body })
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}

fn from_reqwest(e: reqwest::Error) -> MatchError {
    if e.is_timeout() {
        MatchError::Timeout
    } else {
        MatchError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}
