use crate::{
    serial::{DtrBehavior, FlowControlMode, ParityMode, StopBitsMode},
    Error, Result,
};
use std::path::Path;

pub mod loader;

pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD: u32 = 9_600;
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 10;
pub const DEFAULT_COLS: u8 = 20;
pub const DISPLAY_ROWS: u8 = 4;
pub const DEFAULT_REFRESH_MS: u64 = 300;
pub const DEFAULT_IDLE_SLEEP_MS: u64 = 5;
pub const DEFAULT_HOLD_START_CYCLES: u16 = crate::display::viewport::DEFAULT_HOLD_START;
pub const DEFAULT_HOLD_END_CYCLES: u16 = crate::display::viewport::DEFAULT_HOLD_END;
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 0;
pub const DEFAULT_LINE_TEXTS: [&str; 4] = ["CristalLiq", "Lecture", "Speaker", "Attendee"];
pub const DEFAULT_PCF8574_ADDR: Pcf8574Addr = Pcf8574Addr::Auto;
pub const DEFAULT_DISPLAY_DRIVER: DisplayDriver = DisplayDriver::Hd44780;
pub const DEFAULT_BACKOFF_INITIAL_MS: u64 = 500;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;
pub const MIN_COLS: u8 = 8;
pub const MAX_COLS: u8 = 40;
pub const MIN_REFRESH_MS: u64 = 20;
const CONFIG_DIR_NAME: &str = ".cristalliq";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pcf8574Addr {
    Auto,
    Addr(u8),
}

impl std::str::FromStr for Pcf8574Addr {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_pcf_addr(s)
    }
}

/// Where rendered rows go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayDriver {
    Hd44780,
    /// Keep rows in memory only; for boards without a panel.
    Headless,
}

impl std::str::FromStr for DisplayDriver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hd44780" => Ok(DisplayDriver::Hd44780),
            "headless" | "none" => Ok(DisplayDriver::Headless),
            other => Err(format!("expected 'hd44780' or 'headless', got '{other}'")),
        }
    }
}

/// User-supplied settings loaded from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub device: String,
    pub baud: u32,
    pub flow_control: FlowControlMode,
    pub parity: ParityMode,
    pub stop_bits: StopBitsMode,
    pub dtr_on_open: DtrBehavior,
    pub serial_timeout_ms: u64,
    pub cols: u8,
    pub refresh_ms: u64,
    pub idle_sleep_ms: u64,
    pub hold_start_cycles: u16,
    pub hold_end_cycles: u16,
    pub frame_timeout_ms: u64,
    pub line_defaults: [String; 4],
    pub display_driver: DisplayDriver,
    pub pcf8574_addr: Pcf8574Addr,
    pub buzzer_gpio_pin: Option<u8>,
    pub success_tone_hz: u32,
    pub fail_tone_hz: u32,
    pub tone_ms: u64,
    pub fail_gap_ms: u64,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub telemetry_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let tones = crate::peripherals::ToneProfile::default();
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud: DEFAULT_BAUD,
            flow_control: FlowControlMode::default(),
            parity: ParityMode::default(),
            stop_bits: StopBitsMode::default(),
            dtr_on_open: DtrBehavior::default(),
            serial_timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
            cols: DEFAULT_COLS,
            refresh_ms: DEFAULT_REFRESH_MS,
            idle_sleep_ms: DEFAULT_IDLE_SLEEP_MS,
            hold_start_cycles: DEFAULT_HOLD_START_CYCLES,
            hold_end_cycles: DEFAULT_HOLD_END_CYCLES,
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            line_defaults: DEFAULT_LINE_TEXTS.map(String::from),
            display_driver: DEFAULT_DISPLAY_DRIVER,
            pcf8574_addr: DEFAULT_PCF8574_ADDR,
            buzzer_gpio_pin: None,
            success_tone_hz: tones.success_hz,
            fail_tone_hz: tones.fail_hz,
            tone_ms: tones.tone_ms,
            fail_gap_ms: tones.fail_gap_ms,
            backoff_initial_ms: DEFAULT_BACKOFF_INITIAL_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            telemetry_file: None,
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if !(MIN_COLS..=MAX_COLS).contains(&cfg.cols) {
        return Err(Error::InvalidArgs(format!(
            "cols must be between {MIN_COLS} and {MAX_COLS} (got {})",
            cfg.cols
        )));
    }
    if cfg.baud == 0 {
        return Err(Error::InvalidArgs("baud must be greater than zero".into()));
    }
    if cfg.refresh_ms < MIN_REFRESH_MS {
        return Err(Error::InvalidArgs(format!(
            "refresh_ms must be at least {MIN_REFRESH_MS} (got {})",
            cfg.refresh_ms
        )));
    }
    if cfg.backoff_initial_ms > cfg.backoff_max_ms {
        return Err(Error::InvalidArgs(
            "backoff_initial_ms must not exceed backoff_max_ms".into(),
        ));
    }
    Ok(())
}

fn parse_pcf_addr(raw: &str) -> std::result::Result<Pcf8574Addr, String> {
    if raw.eq_ignore_ascii_case("auto") {
        return Ok(Pcf8574Addr::Auto);
    }
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => raw.parse::<u8>().ok(),
    };
    parsed
        .map(Pcf8574Addr::Addr)
        .ok_or_else(|| "expected 'auto' or a hex/decimal address (e.g., 0x27)".to_string())
}

fn format_pcf_addr(addr: &Pcf8574Addr) -> String {
    match addr {
        Pcf8574Addr::Auto => "\"auto\"".into(),
        Pcf8574Addr::Addr(a) => format!("\"{a:#04x}\""),
    }
}

fn format_display_driver(driver: &DisplayDriver) -> &'static str {
    match driver {
        DisplayDriver::Hd44780 => "\"hd44780\"",
        DisplayDriver::Headless => "\"headless\"",
    }
}
