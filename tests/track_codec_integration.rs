//! Track Codec Integration Tests
//!
//! File-level behaviour of the GPX and `.pos` codecs and of merging
//! recordings, as used by the `convert-pos` and `merge` commands.

use snaptrack::acquisition::{read_gpx, read_pos, write_gpx, CodecError};
use snaptrack::{Fix, Trajectory};

const PHONE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="phone" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>morning</name>
    <trkseg>
      <trkpt lat="52.520008" lon="13.404954"><ele>34.5</ele><time>2024-05-01T08:00:00Z</time></trkpt>
      <trkpt lat="52.520108" lon="13.405054"><time>2024-05-01T08:00:02.500Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="52.520208" lon="13.405154"><time>2024-05-01T08:00:06Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

#[test]
fn gpx_file_round_trip_keeps_fixes() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let src = dir.path().join("phone.gpx");
    std::fs::write(&src, PHONE_GPX).expect("write");

    let original = read_gpx(&src).expect("parse");
    assert_eq!(original.len(), 3, "points from every segment are read");

    let copy = dir.path().join("out/nested/copy.gpx");
    write_gpx(&original, &copy).expect("serialize");
    let reread = read_gpx(&copy).expect("reparse");

    assert_eq!(reread.len(), original.len());
    for (a, b) in original.iter().zip(reread.iter()) {
        assert_eq!(a.time, b.time);
        assert!((a.latitude - b.latitude).abs() < 1e-9);
        assert!((a.longitude - b.longitude).abs() < 1e-9);
    }
    assert_eq!(reread.fixes()[0].elevation, Some(34.5));
    assert!(!dir.path().join("out/nested/copy.gpx.tmp").exists());
}

#[test]
fn out_of_order_points_are_sorted_on_read() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("shuffled.gpx");
    std::fs::write(
        &path,
        r#"<?xml version="1.0"?>
<gpx version="1.1" creator="t" xmlns="http://www.topografix.com/GPX/1/1"><trk><trkseg>
<trkpt lat="1.0" lon="1.0"><time>2024-05-01T08:00:05Z</time></trkpt>
<trkpt lat="0.0" lon="0.0"><time>2024-05-01T08:00:00Z</time></trkpt>
</trkseg></trk></gpx>"#,
    )
    .expect("write");

    let t = read_gpx(&path).expect("parse");
    assert_eq!(t.fixes()[0].latitude, 0.0);
}

#[test]
fn out_of_range_gpx_is_rejected() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("bad.gpx");
    std::fs::write(
        &path,
        r#"<?xml version="1.0"?>
<gpx version="1.1" creator="t" xmlns="http://www.topografix.com/GPX/1/1"><trk><trkseg>
<trkpt lat="45.0" lon="-200.0"><time>2024-05-01T08:00:00Z</time></trkpt>
</trkseg></trk></gpx>"#,
    )
    .expect("write");

    // The gpx crate may reject the longitude itself; either way it is a codec error
    let err = read_gpx(&path).expect_err("lon -200");
    assert!(matches!(err, CodecError::OutOfRange { .. } | CodecError::Gpx(_)));
}

#[test]
fn missing_file_is_io_error() {
    let err = read_gpx(std::path::Path::new("/nope/missing.gpx")).expect_err("missing");
    assert!(matches!(err, CodecError::Io(..)));
}

#[test]
fn pos_log_converts_to_gpx() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let pos = dir.path().join("logger.pos");
    std::fs::write(
        &pos,
        "# timestamp,lat,lon,ele\n\
         2024-05-01 08:00:01,52.5201,13.4050,35.0\n\
         2024-05-01 08:00:03,52.5202,13.4051,35.5\n",
    )
    .expect("write");

    let trajectory = read_pos(&pos).expect("pos");
    let gpx = dir.path().join("logger.gpx");
    write_gpx(&trajectory, &gpx).expect("write gpx");

    let back = read_gpx(&gpx).expect("read gpx");
    assert_eq!(back.len(), 2);
    assert_eq!(back.fixes()[1].elevation, Some(35.5));
    assert_eq!(back.fixes()[0].time, trajectory.fixes()[0].time);
}

#[test]
fn merge_interleaves_recordings_by_time() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let gpx = dir.path().join("phone.gpx");
    std::fs::write(&gpx, PHONE_GPX).expect("write");
    let pos = dir.path().join("logger.pos");
    std::fs::write(
        &pos,
        "2024-05-01 08:00:01,52.5201,13.4050\n2024-05-01 08:00:04,52.5203,13.4052\n",
    )
    .expect("write");

    let merged =
        Trajectory::merge([read_gpx(&gpx).expect("gpx"), read_pos(&pos).expect("pos")]).expect("merge");

    let seconds: Vec<i64> = merged
        .iter()
        .filter_map(|f: &Fix| f.time)
        .map(|t| t.timestamp_millis())
        .collect();
    assert_eq!(merged.len(), 5);
    assert!(seconds.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(merged.fixes()[1].latitude, 52.5201);
}
