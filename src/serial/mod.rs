//! Serial link to the master device.

pub mod backoff;
pub mod errors;
pub mod fake;
pub mod sync;

use std::{fmt, str::FromStr};

use crate::{protocol::EncodedFrame, Error, Result};

pub use backoff::BackoffController;
pub use fake::FakeSerialPort;
pub use sync::SerialPort;

/// Byte transport the control loop reads frames from and writes replies to.
pub trait ByteLink {
    /// Append up to `max` waiting bytes to `buf` without blocking.
    /// Returns how many were appended; 0 means nothing was there. Bytes
    /// beyond `max` stay on the link for a later call.
    fn read_available(&mut self, buf: &mut Vec<u8>, max: usize) -> Result<usize>;

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<()>;
}

impl<T: ByteLink + ?Sized> ByteLink for Box<T> {
    fn read_available(&mut self, buf: &mut Vec<u8>, max: usize) -> Result<usize> {
        (**self).read_available(buf, max)
    }

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<()> {
        (**self).write_frame(frame)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControlMode {
    #[default]
    None,
    Software,
    Hardware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParityMode {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBitsMode {
    #[default]
    One,
    Two,
}

/// What to do with DTR when the port opens. Many boards reset on DTR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DtrBehavior {
    #[default]
    Preserve,
    Assert,
    Deassert,
}

impl FromStr for FlowControlMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "software" | "xonxoff" => Ok(Self::Software),
            "hardware" | "rtscts" => Ok(Self::Hardware),
            other => Err(Error::Parse(format!("unknown flow_control '{other}'"))),
        }
    }
}

impl FromStr for ParityMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "odd" => Ok(Self::Odd),
            "even" => Ok(Self::Even),
            other => Err(Error::Parse(format!("unknown parity '{other}'"))),
        }
    }
}

impl FromStr for StopBitsMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            other => Err(Error::Parse(format!("unknown stop_bits '{other}'"))),
        }
    }
}

impl FromStr for DtrBehavior {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "assert" | "on" | "true" => Ok(Self::Assert),
            "deassert" | "off" | "false" => Ok(Self::Deassert),
            other => Err(Error::Parse(format!("unknown dtr_on_open '{other}'"))),
        }
    }
}

impl fmt::Display for FlowControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Software => "software",
            Self::Hardware => "hardware",
        })
    }
}

impl fmt::Display for ParityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Odd => "odd",
            Self::Even => "even",
        })
    }
}

impl fmt::Display for StopBitsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::Two => "2",
        })
    }
}

impl fmt::Display for DtrBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preserve => "preserve",
            Self::Assert => "assert",
            Self::Deassert => "deassert",
        })
    }
}

/// Line settings for opening the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOptions {
    pub baud: u32,
    pub timeout_ms: u64,
    pub flow_control: FlowControlMode,
    pub parity: ParityMode,
    pub stop_bits: StopBitsMode,
    pub dtr: DtrBehavior,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud: crate::config::DEFAULT_BAUD,
            timeout_ms: crate::config::DEFAULT_SERIAL_TIMEOUT_MS,
            flow_control: FlowControlMode::default(),
            parity: ParityMode::default(),
            stop_bits: StopBitsMode::default(),
            dtr: DtrBehavior::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_settings_round_trip_through_strings() {
        for mode in [FlowControlMode::None, FlowControlMode::Software, FlowControlMode::Hardware] {
            assert_eq!(mode.to_string().parse::<FlowControlMode>().unwrap(), mode);
        }
        for mode in [ParityMode::None, ParityMode::Odd, ParityMode::Even] {
            assert_eq!(mode.to_string().parse::<ParityMode>().unwrap(), mode);
        }
        for mode in [StopBitsMode::One, StopBitsMode::Two] {
            assert_eq!(mode.to_string().parse::<StopBitsMode>().unwrap(), mode);
        }
        for mode in [DtrBehavior::Preserve, DtrBehavior::Assert, DtrBehavior::Deassert] {
            assert_eq!(mode.to_string().parse::<DtrBehavior>().unwrap(), mode);
        }
    }

    #[test]
    fn aliases_and_rejections() {
        assert_eq!("RTSCTS".parse::<FlowControlMode>().unwrap(), FlowControlMode::Hardware);
        assert_eq!("off".parse::<DtrBehavior>().unwrap(), DtrBehavior::Deassert);
        assert!("3".parse::<StopBitsMode>().is_err());
        assert!("mark".parse::<ParityMode>().is_err());
    }
}
