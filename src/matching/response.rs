//! Backend reply interpretation
//!
//! The backend is untrusted and unversioned: any deviation from the expected
//! success shape is a decode error, never a panic.

use super::backend::RawReply;
use super::MatchError;
use crate::types::{Fix, Trajectory};
use serde::Deserialize;

/// Longest slice of a non-JSON error body quoted in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Interpreted backend reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResponse {
    /// Geometry snapped onto the road network (fixes carry no timestamps)
    Snapped(Trajectory),
    /// Non-success status with the backend's message
    Failure { status: u16, message: String },
}

#[derive(Deserialize)]
struct MatchBody {
    paths: Vec<PathBody>,
}

#[derive(Deserialize)]
struct PathBody {
    points: PointsBody,
}

#[derive(Deserialize)]
struct PointsBody {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn a raw reply into a [`MatchResponse`].
///
/// Only a success status with an undecodable body is an error here
/// ([`MatchError::Decode`]); non-success statuses become
/// [`MatchResponse::Failure`].
pub fn interpret(reply: &RawReply) -> Result<MatchResponse, MatchError> {
    if reply.is_success() {
        decode_snapped(&reply.body).map(MatchResponse::Snapped)
    } else {
        Ok(MatchResponse::Failure {
            status: reply.status,
            message: error_message(&reply.body),
        })
    }
}

/// Decode `{"paths":[{"points":{"coordinates":[[lon,lat(,ele)],...]}}]}`.
///
/// The first path is used. Coordinates are `[longitude, latitude]` with an
/// optional elevation third element.
pub fn decode_snapped(body: &str) -> Result<Trajectory, MatchError> {
    let parsed: MatchBody =
        serde_json::from_str(body).map_err(|e| MatchError::Decode(e.to_string()))?;

    let path = parsed
        .paths
        .into_iter()
        .next()
        .ok_or_else(|| MatchError::Decode("response contains no paths".to_string()))?;

    let fixes = path
        .points
        .coordinates
        .iter()
        .enumerate()
        .map(|(i, c)| match c.as_slice() {
            [lon, lat] => Ok(Fix::untimed(*lat, *lon)),
            [lon, lat, ele, ..] => Ok(Fix::untimed(*lat, *lon).with_elevation(*ele)),
            _ => Err(MatchError::Decode(format!(
                "coordinate {i} has {} component(s), expected at least 2",
                c.len()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Trajectory::from_ordered(fixes))
}

fn error_message(body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<ErrorBody>(body) {
        return err.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
