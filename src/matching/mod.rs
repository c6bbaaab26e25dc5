//! Map matching against an external routing service
//!
//! - [`backend`]: transport seam ([`MatchBackend`]) and the GraphHopper HTTP
//!   implementation
//! - [`response`]: reply decoding
//! - [`client`]: precondition, retry and in-flight limit

pub mod backend;
pub mod client;
pub mod response;

pub use backend::{GraphHopperBackend, MatchBackend, MatchRequest, RawReply};
pub use client::{MatchClient, MatchFailure, Matched, RetryPolicy, MIN_MATCHABLE_FIXES};
pub use response::{decode_snapped, interpret, MatchResponse};

use crate::types::ErrorKind;
use thiserror::Error;

/// Map-matching errors
#[derive(Debug, Clone, Error)]
pub enum MatchError {
    #[error("trajectory has {fixes} fix(es); at least {} required", MIN_MATCHABLE_FIXES)]
    Precondition { fixes: usize },

    #[error("{}", transport_message(*status, message))]
    Transport { status: Option<u16>, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("undecodable match response: {0}")]
    Decode(String),

    #[error("could not serialize request: {0}")]
    Encode(String),
}

fn transport_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("backend returned {code}: {message}"),
        None => format!("transport failure: {message}"),
    }
}

impl MatchError {
    /// Whether another attempt could succeed.
    ///
    /// Network failures, timeouts, 5xx, 408 and 429 are retryable. Other
    /// statuses and local failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => *code >= 500 || *code == 408 || *code == 429,
            Self::Precondition { .. } | Self::Decode(_) | Self::Encode(_) => false,
        }
    }

    /// Classification recorded on a failed job.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition { .. } => ErrorKind::PreconditionError,
            Self::Transport { .. } | Self::Timeout => ErrorKind::TransportError,
            Self::Decode(_) => ErrorKind::DecodeError,
            Self::Encode(_) => ErrorKind::InternalError,
        }
    }
}
