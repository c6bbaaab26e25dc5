//! Plain-text position log reader (`.pos`)
//!
//! One fix per line: `timestamp,latitude,longitude[,elevation]`.
//! Whitespace-separated lines are accepted when the timestamp is a single
//! token (ISO 8601 with a `T` separator). Timestamps without an offset are
//! taken as UTC.
//!
//! Accepted timestamp forms:
//! - `2024-05-01 08:00:00` / `2024-05-01 08:00:00.250`
//! - `2024-05-01T08:00:00` / `2024-05-01T08:00:00.250`
//! - RFC 3339 (`2024-05-01T08:00:00Z`, `2024-05-01T10:00:00+02:00`)

use super::gpx_codec::{check_ranges, CodecError};
use crate::types::{Fix, Trajectory};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Read a `.pos` file from disk.
pub fn read_pos(path: &Path) -> Result<Trajectory, CodecError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| CodecError::Io(path.to_path_buf(), e))?;
    parse_pos(&contents)
}

/// Parse `.pos` text. Blank lines and `#` / `//` comments are skipped.
pub fn parse_pos(contents: &str) -> Result<Trajectory, CodecError> {
    let mut fixes = Vec::new();

    for (i, raw) in contents.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let fields: Vec<&str> = if line.contains(',') {
            line.split(',').map(str::trim).collect()
        } else {
            line.split_whitespace().collect()
        };

        if fields.len() < 3 {
            return Err(CodecError::Malformed {
                line: line_no,
                reason: format!("expected at least 3 fields, found {}", fields.len()),
            });
        }

        let time = parse_timestamp(fields[0]).ok_or_else(|| CodecError::Malformed {
            line: line_no,
            reason: format!("unrecognised timestamp '{}'", fields[0]),
        })?;
        let latitude = parse_number(fields[1], "latitude", line_no)?;
        let longitude = parse_number(fields[2], "longitude", line_no)?;
        let elevation = match fields.get(3).filter(|s| !s.is_empty()) {
            Some(s) => Some(parse_number(s, "elevation", line_no)?),
            None => None,
        };

        fixes.push(Fix {
            time: Some(time),
            latitude,
            longitude,
            elevation,
        });
    }

    check_ranges(&fixes)?;
    Ok(Trajectory::from_fixes(fixes)?)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_number(s: &str, what: &str, line: usize) -> Result<f64, CodecError> {
    s.parse::<f64>().map_err(|_| CodecError::Malformed {
        line,
        reason: format!("invalid {what} '{s}'"),
    })
}
