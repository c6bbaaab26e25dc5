//! Track ingestion
//!
//! File discovery plus the readers and writers for track files.

pub mod format;
pub mod gpx_codec;
pub mod pos_source;
pub mod scanner;

pub use format::{read_track, TrackFormat};
pub use gpx_codec::{parse_gpx, read_gpx, to_gpx_bytes, write_gpx, CodecError};
pub use pos_source::{parse_pos, read_pos};
pub use scanner::{scan_directory, ScanOptions};
