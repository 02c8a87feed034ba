use crate::{config::Pcf8574Addr, Result};

use super::sink::TextDisplay;
use crate::lcd_driver::{
    pcf8574::{RppalBus, CANDIDATE_ADDRS},
    Hd44780, DEFAULT_I2C_ADDR,
};

pub const BOOT_MESSAGE: &str = "cristalliq ready";
pub const SHUTDOWN_MESSAGE: &str = "cristalliq stopped";

/// The physical 4-row LCD.
pub struct Lcd {
    driver: Hd44780<RppalBus>,
}

impl Lcd {
    pub fn new(cols: u8, rows: u8, pcf_addr: Pcf8574Addr) -> Result<Self> {
        let mut bus = RppalBus::new_default()?;
        let addr = match pcf_addr {
            Pcf8574Addr::Auto => bus.detect_address(&CANDIDATE_ADDRS, DEFAULT_I2C_ADDR),
            Pcf8574Addr::Addr(a) => a,
        };
        let driver = Hd44780::new(bus, addr, cols, rows)?;
        Ok(Self { driver })
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<()> {
        if on {
            self.driver.backlight_on()
        } else {
            self.driver.backlight_off()
        }
    }
}

impl TextDisplay for Lcd {
    fn width(&self) -> usize {
        self.driver.cols() as usize
    }

    fn rows(&self) -> usize {
        self.driver.rows() as usize
    }

    fn write_row(&mut self, row: usize, text: &str) -> Result<()> {
        let row = u8::try_from(row).unwrap_or(u8::MAX);
        self.driver.write_row(row, text)
    }

    fn clear(&mut self) -> Result<()> {
        self.driver.clear()
    }
}

/// Clear the panel and show `message` on the first row.
pub fn show_banner<D: TextDisplay + ?Sized>(display: &mut D, message: &str) -> Result<()> {
    display.clear()?;
    display.write_row(0, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MemoryDisplay;

    #[test]
    fn banner_replaces_previous_rows() {
        let mut display = MemoryDisplay::new(20, 4);
        display.write_row(2, "stale").unwrap();
        show_banner(&mut display, BOOT_MESSAGE).unwrap();
        assert_eq!(display.row(0), Some(BOOT_MESSAGE));
        assert_eq!(display.row(2), Some(""));
    }
}
