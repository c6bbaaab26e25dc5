//! Track format selection
//!
//! Files ending in `.pos` are position logs; everything else is read as GPX.
//! The choice is made from the extension only, never from the content.

use super::gpx_codec::{parse_gpx, CodecError};
use super::pos_source::parse_pos;
use crate::types::Trajectory;
use std::path::Path;

/// On-disk track formats understood by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Gpx,
    Pos,
}

impl TrackFormat {
    pub fn from_path(path: &Path) -> Self {
        let is_pos = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pos"));
        if is_pos {
            Self::Pos
        } else {
            Self::Gpx
        }
    }

    /// Decode a file's raw contents.
    pub fn parse(self, bytes: &[u8]) -> Result<Trajectory, CodecError> {
        match self {
            Self::Gpx => parse_gpx(bytes),
            Self::Pos => {
                let text = std::str::from_utf8(bytes).map_err(|e| CodecError::Malformed {
                    line: 0,
                    reason: format!("position log is not UTF-8 text: {e}"),
                })?;
                parse_pos(text)
            }
        }
    }
}

/// Read a GPX file or a `.pos` log, picked by extension.
pub fn read_track(path: &Path) -> Result<Trajectory, CodecError> {
    let bytes = std::fs::read(path).map_err(|e| CodecError::Io(path.to_path_buf(), e))?;
    TrackFormat::from_path(path).parse(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_picks_the_reader() {
        assert_eq!(TrackFormat::from_path(Path::new("a/ride.pos")), TrackFormat::Pos);
        assert_eq!(TrackFormat::from_path(Path::new("ride.POS")), TrackFormat::Pos);
        assert_eq!(TrackFormat::from_path(Path::new("ride.gpx")), TrackFormat::Gpx);
        assert_eq!(TrackFormat::from_path(Path::new("ride")), TrackFormat::Gpx);
    }

    #[test]
    fn pos_bytes_are_parsed_as_a_position_log() {
        let log = b"2024-05-01 08:00:00,45.0,-122.0\n2024-05-01 08:00:02,45.0001,-122.0001\n";
        let t = TrackFormat::Pos.parse(log).expect("pos");
        assert_eq!(t.len(), 2);
        assert!(matches!(
            TrackFormat::Gpx.parse(log),
            Err(CodecError::Gpx(_))
        ));
    }

    #[test]
    fn non_utf8_log_is_malformed() {
        let err = TrackFormat::Pos.parse(&[0xff, 0xfe, b'\n']).expect_err("binary");
        assert!(matches!(err, CodecError::Malformed { line: 0, .. }));
    }
}
