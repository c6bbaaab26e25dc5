//! GPX track codec
//!
//! Reads every `<trkpt>` of every track and segment in document order into a
//! [`Trajectory`], and writes a trajectory back as a single-segment GPX 1.1
//! track. Routes and standalone waypoints are ignored.

use crate::types::{Fix, Trajectory, TrajectoryError};
use chrono::{DateTime, Utc};
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Creator string written into produced GPX files.
pub const GPX_CREATOR: &str = "snaptrack";

/// Track-format errors. All of them are fatal to the job reading the file.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error on {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed GPX: {0}")]
    Gpx(String),

    #[error("fix {index} has coordinates out of range (lat {latitude}, lon {longitude})")]
    OutOfRange {
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("fix {index} goes back in time")]
    Unordered { index: usize },

    #[error("invalid timestamp: {0}")]
    Timestamp(String),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl From<TrajectoryError> for CodecError {
    fn from(e: TrajectoryError) -> Self {
        match e {
            TrajectoryError::Unordered { index } => Self::Unordered { index },
        }
    }
}

/// Parse GPX from any reader.
pub fn parse_gpx<R: Read>(reader: R) -> Result<Trajectory, CodecError> {
    let document: Gpx = gpx::read(reader).map_err(|e| CodecError::Gpx(e.to_string()))?;

    let mut fixes = Vec::new();
    for track in &document.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                fixes.push(waypoint_to_fix(point)?);
            }
        }
    }

    check_ranges(&fixes)?;
    Ok(Trajectory::from_fixes(fixes)?)
}

/// Parse a GPX file from disk.
pub fn read_gpx(path: &Path) -> Result<Trajectory, CodecError> {
    let file = File::open(path).map_err(|e| CodecError::Io(path.to_path_buf(), e))?;
    parse_gpx(BufReader::new(file))
}

/// Serialize a trajectory into GPX 1.1 bytes.
pub fn to_gpx_bytes(trajectory: &Trajectory) -> Result<Vec<u8>, CodecError> {
    let mut segment = TrackSegment::new();
    for fix in trajectory {
        segment.points.push(fix_to_waypoint(fix)?);
    }

    let mut track = Track::new();
    track.segments.push(segment);

    let document = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(GPX_CREATOR.to_string()),
        tracks: vec![track],
        ..Default::default()
    };

    let mut out = Vec::new();
    gpx::write(&document, &mut out).map_err(|e| CodecError::Gpx(e.to_string()))?;
    Ok(out)
}

/// Write a trajectory to `path` as GPX, creating parent directories.
///
/// The file is written to a temporary sibling first and renamed into place.
pub fn write_gpx(trajectory: &Trajectory, path: &Path) -> Result<(), CodecError> {
    let bytes = to_gpx_bytes(trajectory)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CodecError::Io(parent.to_path_buf(), e))?;
    }
    let tmp_path = path.with_extension("gpx.tmp");
    let written = std::fs::write(&tmp_path, &bytes).and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(CodecError::Io(path.to_path_buf(), e));
    }
    Ok(())
}

/// Reject fixes outside [-90, 90] / [-180, 180] (NaN included).
pub(crate) fn check_ranges(fixes: &[Fix]) -> Result<(), CodecError> {
    match fixes.iter().position(|f| !f.is_valid()) {
        Some(index) => Err(CodecError::OutOfRange {
            index,
            latitude: fixes[index].latitude,
            longitude: fixes[index].longitude,
        }),
        None => Ok(()),
    }
}

fn waypoint_to_fix(point: &Waypoint) -> Result<Fix, CodecError> {
    let coords = point.point();
    let time = match &point.time {
        Some(t) => {
            let iso = t.format().map_err(|e| CodecError::Timestamp(e.to_string()))?;
            let parsed = DateTime::parse_from_rfc3339(&iso)
                .map_err(|e| CodecError::Timestamp(format!("{iso}: {e}")))?;
            Some(parsed.with_timezone(&Utc))
        }
        None => None,
    };

    Ok(Fix {
        time,
        latitude: coords.y(),
        longitude: coords.x(),
        elevation: point.elevation,
    })
}

fn fix_to_waypoint(fix: &Fix) -> Result<Waypoint, CodecError> {
    let mut point = Waypoint::new(geo_types::Point::new(fix.longitude, fix.latitude));
    point.elevation = fix.elevation;
    if let Some(t) = fix.time {
        let nanos = i128::from(t.timestamp()) * 1_000_000_000 + i128::from(t.timestamp_subsec_nanos());
        let odt = time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|e| CodecError::Timestamp(format!("{t}: {e}")))?;
        point.time = Some(odt.into());
    }
    Ok(point)
}
