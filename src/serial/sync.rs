use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::{protocol::EncodedFrame, Error, Result};

use super::{ByteLink, DtrBehavior, FlowControlMode, ParityMode, SerialOptions, StopBitsMode};

/// Upper bound on one `read_available` call.
const READ_CHUNK: usize = 256;

/// A real serial device opened with the `serialport` crate.
pub struct SerialPort {
    device: String,
    port: Box<dyn serialport::SerialPort>,
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl SerialPort {
    pub fn connect(device: &str, options: SerialOptions) -> Result<Self> {
        if device.is_empty() {
            return Err(Error::InvalidArgs(
                "device path cannot be empty".to_string(),
            ));
        }

        let mut builder = serialport::new(device, options.baud)
            .data_bits(DataBits::Eight)
            .parity(to_serial_parity(options.parity))
            .stop_bits(to_serial_stop_bits(options.stop_bits))
            .flow_control(to_serial_flow(options.flow_control))
            .timeout(Duration::from_millis(options.timeout_ms));

        builder = match options.dtr {
            DtrBehavior::Preserve => builder,
            DtrBehavior::Assert => builder.dtr_on_open(true),
            DtrBehavior::Deassert => builder.dtr_on_open(false),
        };

        let port = builder.open().map_err(map_serial_error)?;
        Ok(Self {
            device: device.to_string(),
            port,
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl ByteLink for SerialPort {
    fn read_available(&mut self, buf: &mut Vec<u8>, max: usize) -> Result<usize> {
        if max == 0 {
            return Ok(0);
        }
        let waiting = self.port.bytes_to_read().map_err(map_serial_error)? as usize;
        if waiting == 0 {
            return Ok(0);
        }
        let mut chunk = [0u8; READ_CHUNK];
        let want = waiting.min(READ_CHUNK).min(max);
        match self.port.read(&mut chunk[..want]) {
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<()> {
        self.port.write_all(frame.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }
}

fn map_serial_error(err: serialport::Error) -> Error {
    use serialport::ErrorKind;

    let kind = match err.kind() {
        ErrorKind::NoDevice => io::ErrorKind::NotFound,
        ErrorKind::InvalidInput => io::ErrorKind::InvalidInput,
        ErrorKind::Io(inner) => inner,
        ErrorKind::Unknown => io::ErrorKind::Other,
    };

    Error::Io(io::Error::new(kind, err))
}

fn to_serial_flow(mode: FlowControlMode) -> FlowControl {
    match mode {
        FlowControlMode::None => FlowControl::None,
        FlowControlMode::Software => FlowControl::Software,
        FlowControlMode::Hardware => FlowControl::Hardware,
    }
}

fn to_serial_parity(mode: ParityMode) -> Parity {
    match mode {
        ParityMode::None => Parity::None,
        ParityMode::Odd => Parity::Odd,
        ParityMode::Even => Parity::Even,
    }
}

fn to_serial_stop_bits(mode: StopBitsMode) -> StopBits {
    match mode {
        StopBitsMode::One => StopBits::One,
        StopBitsMode::Two => StopBits::Two,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_device() {
        let err = SerialPort::connect("", SerialOptions::default()).unwrap_err();
        assert!(format!("{err}").contains("device path cannot be empty"));
    }

    #[test]
    fn missing_device_is_an_io_error() {
        let res = SerialPort::connect("/dev/cristalliq-does-not-exist", SerialOptions::default());
        assert!(matches!(res, Err(Error::Io(_))));
    }

    #[test]
    fn serial_error_kinds_map_to_io_kinds() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        match map_serial_error(err) {
            Error::Io(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other}"),
        }
    }
}
