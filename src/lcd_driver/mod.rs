//! HD44780 character LCD behind a PCF8574 I2C backpack, 4-bit mode.

use std::time::Duration;

use crate::{Error, Result};

pub mod pcf8574;

/// Backlight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backlight {
    On,
    Off,
}

/// Byte-wide I2C writes, so the driver can run against a mock bus.
pub trait I2cBus {
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<()>;
}

// PCF8574 pin mapping on the common backpacks.
const MASK_RS: u8 = 0x01;
const MASK_E: u8 = 0x04;
const SHIFT_BACKLIGHT: u8 = 3;
const SHIFT_DATA: u8 = 4;

const LCD_CLR: u8 = 0x01;
const LCD_HOME: u8 = 0x02;
const LCD_ENTRY_MODE: u8 = 0x04;
const LCD_ENTRY_INC: u8 = 0x02;
const LCD_ON_CTRL: u8 = 0x08;
const LCD_ON_DISPLAY: u8 = 0x04;
const LCD_FUNCTION: u8 = 0x20;
const LCD_FUNCTION_2LINES: u8 = 0x08;
const LCD_FUNCTION_RESET: u8 = 0x30;
const LCD_DDRAM: u8 = 0x80;

pub const DEFAULT_I2C_ADDR: u8 = 0x27;
pub const MAX_COLS: u8 = 40;
pub const MAX_ROWS: u8 = 4;

pub struct Hd44780<B: I2cBus> {
    bus: B,
    addr: u8,
    cols: u8,
    rows: u8,
    backlight: Backlight,
}

impl<B: I2cBus> Hd44780<B> {
    /// Run the power-on reset sequence and switch the display on.
    pub fn new(bus: B, addr: u8, cols: u8, rows: u8) -> Result<Self> {
        let mut driver = Hd44780 {
            bus,
            addr,
            cols: cols.clamp(1, MAX_COLS),
            rows: rows.clamp(1, MAX_ROWS),
            backlight: Backlight::On,
        };

        driver.bus.write_byte(driver.addr, 0)?;
        sleep_ms(20);
        // Three reset nibbles force 8-bit mode from any state, then drop to 4-bit.
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(5);
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        driver.write_init_nibble(LCD_FUNCTION)?;
        sleep_ms(1);

        let mut cmd = LCD_FUNCTION;
        if driver.rows > 1 {
            cmd |= LCD_FUNCTION_2LINES;
        }
        driver.write_command(cmd)?;
        driver.write_command(LCD_ON_CTRL)?;
        driver.clear()?;
        driver.write_command(LCD_ENTRY_MODE | LCD_ENTRY_INC)?;
        driver.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY)?;
        Ok(driver)
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn clear(&mut self) -> Result<()> {
        self.write_command(LCD_CLR)?;
        self.write_command(LCD_HOME)
    }

    pub fn backlight_on(&mut self) -> Result<()> {
        self.backlight = Backlight::On;
        self.bus.write_byte(self.addr, 1 << SHIFT_BACKLIGHT)
    }

    pub fn backlight_off(&mut self) -> Result<()> {
        self.backlight = Backlight::Off;
        self.bus.write_byte(self.addr, 0)
    }

    /// Overwrite one row from column 0. Text is cut to the row width and
    /// never wraps into the next row; non-ASCII chars show as `?`.
    pub fn write_row(&mut self, row: u8, text: &str) -> Result<()> {
        if row >= self.rows {
            return Err(Error::InvalidArgs(format!(
                "row {row} out of bounds for display with {} rows",
                self.rows
            )));
        }
        self.write_command(LCD_DDRAM | row_address(row, self.cols))?;
        for ch in text.chars().take(self.cols as usize) {
            let byte = if ch.is_ascii() { ch as u8 } else { b'?' };
            self.write_data(byte)?;
        }
        Ok(())
    }

    fn write_init_nibble(&mut self, nibble: u8) -> Result<()> {
        let byte = ((nibble >> 4) & 0x0f) << SHIFT_DATA;
        self.bus.write_byte(self.addr, byte | MASK_E)?;
        self.bus.write_byte(self.addr, byte)
    }

    fn write_command(&mut self, cmd: u8) -> Result<()> {
        self.write_nibble(cmd, false)?;
        self.write_nibble(cmd << 4, false)?;
        if cmd <= LCD_HOME {
            sleep_ms(5);
        }
        Ok(())
    }

    fn write_data(&mut self, data: u8) -> Result<()> {
        self.write_nibble(data, true)?;
        self.write_nibble(data << 4, true)
    }

    fn write_nibble(&mut self, nibble: u8, is_data: bool) -> Result<()> {
        let mut byte = self.backlight_mask();
        if is_data {
            byte |= MASK_RS;
        }
        byte |= (nibble >> 4) << SHIFT_DATA;
        self.bus.write_byte(self.addr, byte | MASK_E)?;
        self.bus.write_byte(self.addr, byte)
    }

    fn backlight_mask(&self) -> u8 {
        match self.backlight {
            Backlight::On => 1 << SHIFT_BACKLIGHT,
            Backlight::Off => 0,
        }
    }
}

/// DDRAM address of column 0 on `row`. Rows 2 and 3 continue rows 0 and 1.
pub fn row_address(row: u8, cols: u8) -> u8 {
    let mut addr = 0;
    if row & 1 == 1 {
        addr += 0x40;
    }
    if row & 2 == 2 {
        addr += cols;
    }
    addr
}

fn sleep_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}
