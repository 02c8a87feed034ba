use std::thread;
use std::time::{Duration, Instant};

use super::Logger;
use crate::protocol::{encode_text, FrameReceiver};
use crate::serial::{
    errors::{classify_error, SerialFailureKind},
    ByteLink, SerialOptions, SerialPort,
};
use crate::Result;

/// Pause between polls while `send_once` waits for a reply.
const REPLY_POLL: Duration = Duration::from_millis(5);
/// Bytes taken from the link per poll in `send_once`.
const READ_LIMIT: usize = 256;

/// Open the serial port and log the outcome.
pub(crate) fn attempt_serial_connect(
    logger: &Logger,
    device: &str,
    options: SerialOptions,
) -> std::result::Result<SerialPort, SerialFailureKind> {
    match SerialPort::connect(device, options) {
        Ok(port) => {
            logger.info(format!("serial connected ({device} @ {})", options.baud));
            Ok(port)
        }
        Err(err) => {
            let kind = classify_error(&err);
            logger.warn(format!("serial connect failed ({kind}): {err}; will retry"));
            Err(kind)
        }
    }
}

/// Frame `body`, write it, and wait up to `wait` for one reply frame.
///
/// Returns the decoded reply body, or `None` when nothing complete arrived
/// in time. Commands that never reply (tones finishing late, unknown codes)
/// come back as `None` too.
pub fn send_once<L: ByteLink + ?Sized>(
    link: &mut L,
    body: &str,
    wait: Duration,
) -> Result<Option<Vec<u8>>> {
    link.write_frame(&encode_text(body))?;

    let deadline = Instant::now() + wait;
    let mut receiver = FrameReceiver::new();
    let mut pending = Vec::new();
    loop {
        let mut chunk = Vec::new();
        link.read_available(&mut chunk, READ_LIMIT)?;
        pending.extend_from_slice(&chunk);

        let used = receiver.feed(&pending);
        pending.drain(..used);
        if let Some(frame) = receiver.take_frame() {
            return Ok(Some(frame.as_bytes().to_vec()));
        }

        if Instant::now() >= deadline {
            return Ok(None);
        }
        if chunk.is_empty() {
            thread::sleep(REPLY_POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::logger::LogLevel;
    use crate::serial::FakeSerialPort;
    use crate::Error;

    #[test]
    fn send_once_frames_body_and_returns_reply() {
        let mut link = FakeSerialPort::new(vec![Ok(b"<002|".to_vec()), Ok(b"OK>".to_vec())]);
        let reply = send_once(&mut link, "200|Room A|3000", Duration::from_millis(200)).unwrap();
        assert_eq!(reply.as_deref(), Some(&b"002|OK"[..]));
        assert_eq!(link.writes(), &[b"<200|Room A|3000>".to_vec()]);
    }

    #[test]
    fn send_once_escapes_reserved_bytes() {
        let mut link = FakeSerialPort::new(vec![]);
        let reply = send_once(&mut link, "200|a<b|0", Duration::ZERO).unwrap();
        assert!(reply.is_none());
        assert_eq!(link.writes(), &[b"<200|a\\<b|0>".to_vec()]);
    }

    #[test]
    fn send_once_times_out_without_reply() {
        let mut link = FakeSerialPort::new(vec![Ok(b"<002|O".to_vec())]);
        let reply = send_once(&mut link, "100||0", Duration::from_millis(20)).unwrap();
        assert!(reply.is_none());
    }

    #[test]
    fn send_once_propagates_read_errors() {
        let mut link = FakeSerialPort::new(vec![Err(Error::Io(std::io::Error::other("gone")))]);
        assert!(send_once(&mut link, "100||0", Duration::from_millis(20)).is_err());
    }

    #[test]
    fn connect_failure_is_classified() {
        let logger = Logger::stderr(LogLevel::Error);
        let err = attempt_serial_connect(&logger, "", SerialOptions::default()).unwrap_err();
        assert!(!err.as_str().is_empty());
    }
}
