//! End-to-end logging sessions over in-memory streams into a file database.

use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scanlog::config::SerialConfig;
use scanlog::logger::SessionEnd;
use scanlog::{
    exit_status, open_serial, LoggerState, Session, StopHandle, Storage, StreamLineSource,
};

const DEVICE_OUTPUT: &str = "\
ESP32 servo scanner ready\r\n\
Moving servo...\r\n\
Angle: 0 | Distance: 5.00 m.\r\n\
Angle: 90 | Distance: -1 m.\r\n\
\r\n\
Angle: 180 | Distance: 3.2 m.\r\n\
Moving servo...\r\n\
Angle: 270 | Distance: -1 m.\r\n";

/// Serves its bytes, then either ends the stream or keeps timing out after
/// asking the session to stop.
struct DeviceStream {
    data: Cursor<Vec<u8>>,
    stop_when_drained: Option<StopHandle>,
    released: Arc<AtomicBool>,
}

impl DeviceStream {
    fn new(data: &[u8], stop_when_drained: Option<StopHandle>) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let stream = Self {
            data: Cursor::new(data.to_vec()),
            stop_when_drained,
            released: Arc::clone(&released),
        };
        (stream, released)
    }
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        match &self.stop_when_drained {
            Some(stop) => {
                stop.stop();
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            }
            None => Ok(0),
        }
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_disconnect_records_readings_and_releases() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scan_data.db");
    Storage::initialize(&db_path).unwrap();

    let (stream, released) = DeviceStream::new(DEVICE_OUTPUT.as_bytes(), None);
    let source = StreamLineSource::new("/dev/ttyTEST", stream);
    let session = Session::new(source, Storage::open(&db_path).unwrap());

    let report = session.run(&StopHandle::new());

    assert!(matches!(report.end, SessionEnd::Disconnected { .. }));
    assert_eq!(report.state, LoggerState::Failed);
    assert_eq!(report.stats.readings_logged, 4);
    assert_eq!(report.stats.noise_lines, 3);
    assert_eq!(report.stats.empty_lines, 1);
    assert!(report.release_error.is_none());
    assert!(released.load(Ordering::SeqCst));

    let reader = Storage::open_existing(&db_path).unwrap();
    let mut rows = reader.load_all().unwrap();
    rows.reverse();
    let pairs: Vec<(i64, f64)> = rows.iter().map(|r| (r.angle, r.distance_m)).collect();
    assert_eq!(
        pairs,
        vec![(0, 5.0), (90, -1.0), (180, 3.2), (270, -1.0)]
    );
    for pair in rows.windows(2) {
        assert!(pair[0].id < pair[1].id);
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[test]
fn test_interrupt_stops_and_releases() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scan_data.db");
    Storage::initialize(&db_path).unwrap();

    let stop = StopHandle::new();
    let (stream, released) = DeviceStream::new(
        b"Angle: 45 | Distance: 1.23 m.\nAngle: 50 | Distance: 1.30 m.\n",
        Some(stop.clone()),
    );
    let source = StreamLineSource::new("/dev/ttyTEST", stream);
    let session = Session::new(source, Storage::open(&db_path).unwrap());

    let report = session.run(&stop);

    assert_eq!(report.end, SessionEnd::Interrupted);
    assert_eq!(report.state, LoggerState::Closed);
    assert_eq!(report.stats.readings_logged, 2);
    assert!(released.load(Ordering::SeqCst));

    let rows = Storage::open_existing(&db_path).unwrap().load_all().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].angle, rows[0].distance_m), (50, 1.30));
}

#[test]
fn test_partial_line_survives_timeout() {
    struct Chunked {
        chunks: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0)?;
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scan_data.db");
    let stream = Chunked {
        chunks: vec![
            Ok(b"Angle: 12 | Dis".to_vec()),
            Err(io::Error::new(io::ErrorKind::TimedOut, "timeout")),
            Ok(b"tance: 0.5 m.\n".to_vec()),
        ],
    };
    let session = Session::new(
        StreamLineSource::new("/dev/ttyTEST", stream),
        Storage::open(&db_path).unwrap(),
    );

    let report = session.run(&StopHandle::new());
    assert_eq!(report.stats.readings_logged, 1);
    assert_eq!(report.stats.noise_lines, 0);

    let reader = Storage::open_existing(&db_path).unwrap();
    let rows = reader.load_all().unwrap();
    assert_eq!((rows[0].angle, rows[0].distance_m), (12, 0.5));
}

#[test]
fn test_reader_sees_rows_while_session_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scan_data.db");
    Storage::initialize(&db_path).unwrap();

    let (stream, _) = DeviceStream::new(b"Angle: 30 | Distance: 0.75 m.\n", None);
    let mut session = Session::new(
        StreamLineSource::new("/dev/ttyTEST", stream),
        Storage::open(&db_path).unwrap(),
    );
    session.step().unwrap();

    let reader = Storage::open_existing(&db_path).unwrap();
    assert_eq!(reader.load_all().unwrap().len(), 1);
    assert_eq!(session.state(), LoggerState::Streaming);
}

#[test]
fn test_missing_port_fails_and_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scan_data.db");
    Storage::initialize(&db_path).unwrap();

    let serial = SerialConfig {
        port: dir.path().join("no-such-port").to_string_lossy().into_owned(),
        ..SerialConfig::default()
    };
    let storage = Storage::open(&db_path).unwrap();

    let Err(failure) = Session::connect(|| open_serial(&serial), storage) else {
        panic!("expected the port to be missing");
    };
    assert_eq!(failure.state, LoggerState::Failed);
    assert!(failure.error.is_port_open());
    assert!(failure.release_error.is_none());
    assert_eq!(exit_status(&Err(failure)), 1);

    // the store was closed cleanly and holds nothing
    let rows = Storage::open_existing(&db_path).unwrap().load_all().unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_session_that_streamed_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scan_data.db");
    Storage::initialize(&db_path).unwrap();

    let (stream, _) = DeviceStream::new(b"Angle: 5 | Distance: 0.2 m.\n", None);
    let source = StreamLineSource::new("/dev/ttyTEST", stream);
    let session = Session::connect(move || Ok(source), Storage::open(&db_path).unwrap())
        .expect("in-memory stream always opens");

    let report = session.run(&StopHandle::new());
    assert!(matches!(report.end, SessionEnd::Disconnected { .. }));
    assert_eq!(exit_status(&Ok(report)), 0);
}
