//! Retrying map-matching client
//!
//! Wraps a [`MatchBackend`] with the precondition check, the retry policy and
//! the in-flight request limit shared by every job in a run.

use super::backend::{MatchBackend, MatchRequest};
use super::response::{interpret, MatchResponse};
use super::MatchError;
use crate::acquisition::to_gpx_bytes;
use crate::types::Trajectory;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Fewest fixes the backend can match.
pub const MIN_MATCHABLE_FIXES: usize = 2;

/// Retry schedule for backend calls.
///
/// Attempt `n` (1-based) that fails retryably waits
/// `min(initial * 2^(n-1), max) + uniform(0..jitter)` before attempt `n + 1`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per trajectory, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::defaults::MATCH_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(crate::config::defaults::MATCH_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(crate::config::defaults::MATCH_MAX_BACKOFF_MS),
            jitter: Duration::from_millis(crate::config::defaults::MATCH_BACKOFF_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Deterministic part of the delay after failed attempt `attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let multiplier = 1u32 << exponent;
        self.initial_backoff
            .checked_mul(multiplier)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Delay after failed attempt `attempt`, jitter included.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        } else {
            Duration::ZERO
        };
        self.base_delay(attempt) + jitter
    }
}

/// Successful match.
#[derive(Debug, Clone)]
pub struct Matched {
    pub trajectory: Trajectory,
    /// Backend calls made, including the successful one
    pub attempts: u32,
}

/// Failed match with the number of backend calls spent on it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct MatchFailure {
    #[source]
    pub error: MatchError,
    pub attempts: u32,
}

/// Client shared by all jobs of one run.
#[derive(Clone)]
pub struct MatchClient {
    backend: Arc<dyn MatchBackend>,
    vehicle: String,
    retry: RetryPolicy,
    in_flight: Arc<Semaphore>,
}

impl MatchClient {
    /// `max_in_flight` bounds simultaneous backend calls across all clones.
    pub fn new(
        backend: Arc<dyn MatchBackend>,
        vehicle: impl Into<String>,
        retry: RetryPolicy,
        max_in_flight: usize,
    ) -> Self {
        Self {
            backend,
            vehicle: vehicle.into(),
            retry,
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Snap `trajectory` to the road network.
    ///
    /// Fewer than [`MIN_MATCHABLE_FIXES`] fixes fails with
    /// [`MatchError::Precondition`] without contacting the backend.
    /// Retryable failures are retried up to the policy's attempt limit; the
    /// last error is returned once attempts run out.
    pub async fn match_trajectory(
        &self,
        label: &str,
        trajectory: &Trajectory,
    ) -> Result<Matched, MatchFailure> {
        if trajectory.len() < MIN_MATCHABLE_FIXES {
            return Err(MatchFailure {
                error: MatchError::Precondition {
                    fixes: trajectory.len(),
                },
                attempts: 0,
            });
        }

        let payload = to_gpx_bytes(trajectory).map_err(|e| MatchFailure {
            error: MatchError::Encode(e.to_string()),
            attempts: 0,
        })?;
        let request = MatchRequest {
            payload,
            vehicle: self.vehicle.clone(),
            label: label.to_string(),
        };

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.attempt(&request).await {
                Ok(snapped) => {
                    debug!(
                        track = %label,
                        attempt,
                        fixes = snapped.len(),
                        "Track matched"
                    );
                    return Ok(Matched {
                        trajectory: snapped,
                        attempts: attempt,
                    });
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(MatchFailure {
                    error,
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay(attempt);
            warn!(
                track = %label,
                attempt,
                max_attempts,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Match attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One backend call under an in-flight permit.
    async fn attempt(&self, request: &MatchRequest) -> Result<Trajectory, MatchError> {
        let reply = {
            let _permit = self
                .in_flight
                .acquire()
                .await
                .map_err(|_| MatchError::Transport {
                    status: None,
                    message: "request limiter closed".to_string(),
                })?;
            self.backend.submit(request).await?
        };

        match interpret(&reply)? {
            MatchResponse::Snapped(trajectory) => Ok(trajectory),
            MatchResponse::Failure { status, message } => Err(MatchError::Transport {
                status: Some(status),
                message,
            }),
        }
    }
}
