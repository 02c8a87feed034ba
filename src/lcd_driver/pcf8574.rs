use crate::{lcd_driver::I2cBus, Result};

#[cfg(not(target_os = "linux"))]
use crate::Error;

/// Addresses PCF8574 backpacks ship with, most common first.
pub const CANDIDATE_ADDRS: [u8; 8] = [0x27, 0x26, 0x25, 0x24, 0x23, 0x22, 0x21, 0x20];

#[cfg(target_os = "linux")]
fn map_i2c_err(err: rppal::i2c::Error) -> crate::Error {
    crate::Error::Io(std::io::Error::other(err.to_string()))
}

/// I2C bus 1 (`/dev/i2c-1`) through rppal.
#[cfg(target_os = "linux")]
pub struct RppalBus {
    inner: rppal::i2c::I2c,
}

#[cfg(target_os = "linux")]
impl RppalBus {
    pub fn new_default() -> Result<Self> {
        let inner = rppal::i2c::I2c::new().map_err(map_i2c_err)?;
        Ok(Self { inner })
    }

    /// First candidate that acknowledges a write, else `fallback`.
    pub fn detect_address(&mut self, candidates: &[u8], fallback: u8) -> u8 {
        for &addr in candidates {
            if self.inner.set_slave_address(addr as u16).is_ok()
                && self.inner.block_write(0, &[]).is_ok()
            {
                return addr;
            }
        }
        fallback
    }
}

#[cfg(target_os = "linux")]
impl I2cBus for RppalBus {
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<()> {
        self.inner
            .set_slave_address(addr.into())
            .map_err(map_i2c_err)?;
        self.inner.block_write(byte, &[]).map_err(map_i2c_err)
    }
}

/// Stand-in for non-Linux dev hosts; every call fails.
#[cfg(not(target_os = "linux"))]
pub struct RppalBus;

#[cfg(not(target_os = "linux"))]
impl RppalBus {
    pub fn new_default() -> Result<Self> {
        Err(Error::InvalidArgs(
            "I2C is only available on Linux targets".into(),
        ))
    }

    pub fn detect_address(&mut self, _candidates: &[u8], fallback: u8) -> u8 {
        fallback
    }
}

#[cfg(not(target_os = "linux"))]
impl I2cBus for RppalBus {
    fn write_byte(&mut self, _addr: u8, _byte: u8) -> Result<()> {
        Err(Error::InvalidArgs(
            "I2C is only available on Linux targets".into(),
        ))
    }
}
