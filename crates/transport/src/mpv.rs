//! mpv backend
//!
//! Drives an external `mpv --input-ipc-server=<socket>` process over its
//! JSON IPC protocol. One request per line, replies matched by
//! `request_id`; asynchronous event lines are skipped.

use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use contracts::{TransportAdapter, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Serialize)]
struct IpcRequest<'a> {
    command: &'a [Value],
    request_id: u64,
}

#[derive(Debug, Deserialize)]
struct IpcReply {
    #[serde(default)]
    request_id: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    event: Option<String>,
}

struct Connection {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
}

/// Failure of a single IPC round trip
enum IpcFailure {
    /// mpv answered with an error status
    Refused(String),
    /// No answer within the IPC timeout
    Timeout,
    /// The socket is gone
    Broken(io::Error),
}

/// mpv JSON IPC backend
pub struct MpvTransport {
    socket: PathBuf,
    timeout: Duration,
    conn: Option<Connection>,
    next_request_id: u64,
    loaded: Option<PathBuf>,
}

impl MpvTransport {
    pub fn new(socket: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket: socket.into(),
            timeout,
            conn: None,
            next_request_id: 1,
            loaded: None,
        }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    fn connect(&mut self) -> io::Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let writer = UnixStream::connect(&self.socket)?;
        writer.set_read_timeout(Some(self.timeout))?;
        writer.set_write_timeout(Some(self.timeout))?;
        let reader = BufReader::new(writer.try_clone()?);
        self.conn = Some(Connection { writer, reader });
        debug!(socket = %self.socket.display(), "connected to mpv");
        Ok(())
    }

    fn request(&mut self, command: &[Value]) -> Result<Option<Value>, IpcFailure> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let conn = self.conn.as_mut().ok_or_else(|| {
            IpcFailure::Broken(io::Error::new(ErrorKind::NotConnected, "not connected"))
        })?;

        let mut line = serde_json::to_string(&IpcRequest {
            command,
            request_id,
        })
        .map_err(|e| IpcFailure::Broken(io::Error::new(ErrorKind::InvalidInput, e)))?;
        line.push('\n');
        trace!(request = %line.trim_end(), "mpv request");

        let deadline = Instant::now() + self.timeout;
        let result = Self::exchange(conn, &line, request_id, deadline);
        if matches!(result, Err(IpcFailure::Broken(_))) {
            self.conn = None;
        }
        result
    }

    /// Write one request and wait for its reply until `deadline`.
    ///
    /// Event lines do not extend the wait.
    fn exchange(
        conn: &mut Connection,
        line: &str,
        request_id: u64,
        deadline: Instant,
    ) -> Result<Option<Value>, IpcFailure> {
        conn.writer.write_all(line.as_bytes()).map_err(classify)?;

        let mut buf = String::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(IpcFailure::Timeout);
            }
            conn.reader
                .get_ref()
                .set_read_timeout(Some(remaining))
                .map_err(IpcFailure::Broken)?;

            buf.clear();
            let read = conn.reader.read_line(&mut buf).map_err(classify)?;
            if read == 0 {
                return Err(IpcFailure::Broken(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "mpv closed the socket",
                )));
            }

            let reply: IpcReply = match serde_json::from_str(buf.trim()) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "unparseable mpv line");
                    continue;
                }
            };
            if let Some(event) = reply.event {
                trace!(event = %event, "mpv event");
                continue;
            }
            if reply.request_id != Some(request_id) {
                continue;
            }

            return match reply.error.as_deref() {
                None | Some("success") => Ok(reply.data),
                Some(error) => Err(IpcFailure::Refused(error.to_string())),
            };
        }
    }

    /// Round trip for a playback command; mpv errors are transient
    fn command(
        &mut self,
        name: &'static str,
        command: &[Value],
    ) -> Result<Option<Value>, TransportError> {
        if self.loaded.is_none() {
            return Err(TransportError::NotLoaded);
        }
        self.request(command).map_err(|failure| match failure {
            IpcFailure::Refused(message) => TransportError::rejected(name, message),
            IpcFailure::Timeout => TransportError::rejected(name, "mpv did not answer in time"),
            IpcFailure::Broken(e) => {
                self.loaded = None;
                TransportError::decoder_fault(format!("mpv connection lost: {e}"))
            }
        })
    }

    fn get_ms(&mut self, property: &'static str) -> Result<Option<f64>, TransportError> {
        let data = self.command(property, &[json!("get_property"), json!(property)])?;
        Ok(data.and_then(|v| v.as_f64()).map(|secs| secs * 1000.0))
    }
}

fn classify(e: io::Error) -> IpcFailure {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => IpcFailure::Timeout,
        _ => IpcFailure::Broken(e),
    }
}

impl TransportAdapter for MpvTransport {
    fn backend_name(&self) -> &str {
        "mpv"
    }

    #[instrument(name = "mpv_open", skip(self), fields(path = %path.display()))]
    fn open(&mut self, path: &Path) -> Result<(), TransportError> {
        let display = path.display().to_string();
        if !path.is_file() {
            return Err(TransportError::media_unavailable(display, "file not found"));
        }
        self.connect().map_err(|e| {
            TransportError::media_unavailable(
                display.clone(),
                format!("cannot reach mpv at {}: {e}", self.socket.display()),
            )
        })?;

        // Load paused; the engine seeks before it plays
        let pause = [json!("set_property"), json!("pause"), json!(true)];
        let loadfile = [json!("loadfile"), json!(display.clone()), json!("replace")];
        for command in [&pause[..], &loadfile[..]] {
            self.request(command).map_err(|failure| {
                let message = match failure {
                    IpcFailure::Refused(message) => message,
                    IpcFailure::Timeout => "mpv did not answer in time".to_string(),
                    IpcFailure::Broken(e) => e.to_string(),
                };
                TransportError::media_unavailable(display.clone(), message)
            })?;
        }

        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<(), TransportError> {
        self.command("play", &[json!("set_property"), json!("pause"), json!(false)])
            .map(drop)
    }

    fn pause(&mut self) -> Result<(), TransportError> {
        self.command("pause", &[json!("set_property"), json!("pause"), json!(true)])
            .map(drop)
    }

    fn seek(&mut self, position_ms: f64) -> Result<(), TransportError> {
        if !position_ms.is_finite() {
            return Err(TransportError::rejected("seek", "non-finite target"));
        }
        let secs = position_ms.max(0.0) / 1000.0;
        self.command("seek", &[json!("seek"), json!(secs), json!("absolute")])
            .map(drop)
    }

    fn set_rate(&mut self, rate: f64) -> Result<(), TransportError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(TransportError::rejected("set_rate", format!("invalid rate {rate}")));
        }
        self.command("set_rate", &[json!("set_property"), json!("speed"), json!(rate)])
            .map(drop)
    }

    fn position(&mut self) -> Result<f64, TransportError> {
        self.get_ms("time-pos")?
            .ok_or_else(|| TransportError::rejected("time-pos", "position not available yet"))
    }

    fn duration(&mut self) -> Option<f64> {
        self.get_ms("duration").ok().flatten()
    }

    fn close(&mut self) {
        self.loaded = None;
        // Fire and forget; never wait on the reply
        if let Some(mut conn) = self.conn.take() {
            let request_id = self.next_request_id;
            self.next_request_id += 1;
            if let Ok(mut line) = serde_json::to_string(&IpcRequest {
                command: &[json!("stop")],
                request_id,
            }) {
                line.push('\n');
                let _ = conn.writer.write_all(line.as_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Minimal mpv stand-in; records every command it receives
    fn fake_mpv(socket: &Path, log: Arc<Mutex<Vec<Value>>>) {
        let listener = UnixListener::bind(socket).unwrap();
        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut writer = stream.try_clone().unwrap();
            let reader = BufReader::new(stream);
            writeln!(writer, r#"{{"event":"idle"}}"#).unwrap();

            for line in reader.lines() {
                let Ok(line) = line else { break };
                let request: Value = serde_json::from_str(&line).unwrap();
                let id = request["request_id"].as_u64().unwrap();
                let command = request["command"].clone();
                log.lock().unwrap().push(command.clone());

                let reply = match (command[0].as_str(), command[1].as_str()) {
                    (Some("get_property"), Some("time-pos")) => {
                        json!({"error": "success", "data": 12.5, "request_id": id})
                    }
                    (Some("get_property"), Some("duration")) => {
                        json!({"error": "success", "data": 600.0, "request_id": id})
                    }
                    (Some("seek"), _) if command[1].as_f64() == Some(9999.0) => {
                        json!({"error": "invalid parameter", "request_id": id})
                    }
                    _ => json!({"error": "success", "data": null, "request_id": id}),
                };
                writeln!(writer, r#"{{"event":"playback-restart"}}"#).unwrap();
                writeln!(writer, "{reply}").unwrap();
            }
        });
    }

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf, Arc<Mutex<Vec<Value>>>) {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("mpv.sock");
        let media = dir.path().join("ride.mp4");
        std::fs::write(&media, b"").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        fake_mpv(&socket, log.clone());
        (dir, socket, media, log)
    }

    #[test]
    fn test_open_and_control() {
        let (_dir, socket, media, log) = setup();
        let mut mpv = MpvTransport::new(&socket, Duration::from_millis(2000));

        mpv.open(&media).unwrap();
        mpv.seek(30_000.0).unwrap();
        mpv.set_rate(1.1).unwrap();
        mpv.play().unwrap();
        assert_eq!(mpv.position().unwrap(), 12_500.0);
        assert_eq!(mpv.duration(), Some(600_000.0));

        let log = log.lock().unwrap();
        assert_eq!(log[0], json!(["set_property", "pause", true]));
        assert_eq!(log[1][0], json!("loadfile"));
        assert_eq!(log[2], json!(["seek", 30.0, "absolute"]));
        assert_eq!(log[3], json!(["set_property", "speed", 1.1]));
        assert_eq!(log[4], json!(["set_property", "pause", false]));
    }

    #[test]
    fn test_error_reply_is_transient() {
        let (_dir, socket, media, _log) = setup();
        let mut mpv = MpvTransport::new(&socket, Duration::from_millis(2000));
        mpv.open(&media).unwrap();

        let err = mpv.seek(9_999_000.0).unwrap_err();
        assert!(matches!(err, TransportError::Rejected { command: "seek", .. }));
        assert!(mpv.play().is_ok());
    }

    #[test]
    fn test_commands_need_media() {
        let (_dir, socket, _media, _log) = setup();
        let mut mpv = MpvTransport::new(&socket, Duration::from_millis(200));
        assert!(matches!(mpv.play(), Err(TransportError::NotLoaded)));
        assert_eq!(mpv.duration(), None);
    }

    /// Answers `loadfile` and then only chatters events
    fn chatty_mpv(socket: &Path) {
        let listener = UnixListener::bind(socket).unwrap();
        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            for _ in 0..2 {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let request: Value = serde_json::from_str(&line).unwrap();
                let id = request["request_id"].as_u64().unwrap();
                writeln!(writer, "{}", json!({"error": "success", "request_id": id})).unwrap();
            }
            loop {
                if writeln!(writer, r#"{{"event":"audio-reconfig"}}"#).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(5));
            }
        });
    }

    #[test]
    fn test_event_stream_does_not_extend_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("mpv.sock");
        let media = dir.path().join("ride.mp4");
        std::fs::write(&media, b"").unwrap();
        chatty_mpv(&socket);

        let mut mpv = MpvTransport::new(&socket, Duration::from_millis(100));
        mpv.open(&media).unwrap();

        let started = Instant::now();
        let err = mpv.position().unwrap_err();
        assert!(matches!(err, TransportError::Rejected { .. }), "got: {err}");
        assert!(started.elapsed() < Duration::from_secs(2));
        mpv.close();
    }

    #[test]
    fn test_unreachable_socket_is_media_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("ride.mp4");
        std::fs::write(&media, b"").unwrap();

        let mut mpv = MpvTransport::new(dir.path().join("absent.sock"), Duration::from_millis(200));
        let err = mpv.open(&media).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, TransportError::MediaUnavailable { .. }));
    }
}
