use crate::Error;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;

/// High-level reason for a serial transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialFailureKind {
    PermissionDenied,
    DeviceMissing,
    Disconnected,
    Timeout,
    Framing,
    Busy,
    Config,
    Unknown,
}

impl SerialFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerialFailureKind::PermissionDenied => "permission_denied",
            SerialFailureKind::DeviceMissing => "device_missing",
            SerialFailureKind::Disconnected => "disconnected",
            SerialFailureKind::Timeout => "timeout",
            SerialFailureKind::Framing => "framing",
            SerialFailureKind::Busy => "busy",
            SerialFailureKind::Config => "config",
            SerialFailureKind::Unknown => "unknown",
        }
    }

    /// Worth another connection attempt later.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            SerialFailureKind::Config | SerialFailureKind::PermissionDenied
        )
    }
}

impl fmt::Display for SerialFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify_error(err: &Error) -> SerialFailureKind {
    match err {
        Error::InvalidArgs(_) => SerialFailureKind::Config,
        Error::Io(io_err) => classify_io_error(io_err),
        Error::Parse(_) | Error::Message(_) => SerialFailureKind::Framing,
    }
}

pub fn classify_io_error(err: &std::io::Error) -> SerialFailureKind {
    match err.kind() {
        ErrorKind::PermissionDenied => SerialFailureKind::PermissionDenied,
        ErrorKind::NotFound => SerialFailureKind::DeviceMissing,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => SerialFailureKind::Timeout,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            SerialFailureKind::Disconnected
        }
        ErrorKind::InvalidInput => SerialFailureKind::Config,
        ErrorKind::InvalidData => SerialFailureKind::Framing,
        _ => match err.raw_os_error() {
            // EACCES, EBUSY, ENODEV/ENXIO, EIO, ETIMEDOUT
            Some(13) => SerialFailureKind::PermissionDenied,
            Some(16) => SerialFailureKind::Busy,
            Some(19) | Some(6) => SerialFailureKind::DeviceMissing,
            Some(5) => SerialFailureKind::Disconnected,
            Some(110) => SerialFailureKind::Timeout,
            _ => SerialFailureKind::Unknown,
        },
    }
}
