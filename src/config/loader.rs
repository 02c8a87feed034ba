use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{Error, Result};

use super::{Config, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

/// Load `~/.cristalliq/config.toml`, writing defaults there first if it is missing.
pub fn load_or_default() -> Result<Config> {
    load_or_create(&config_path()?)
}

pub fn load_or_create(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        save_to_path(&cfg, path)?;
        super::validate(&cfg)?;
        return Ok(cfg);
    }
    load_from_path(path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = format!(
        "# cristalliq config\n\
device = \"{}\"\n\
baud = {}\n\
flow_control = \"{}\"\n\
parity = \"{}\"\n\
stop_bits = \"{}\"\n\
dtr_on_open = \"{}\"\n\
serial_timeout_ms = {}\n\
cols = {}\n\
refresh_ms = {}\n\
idle_sleep_ms = {}\n\
hold_start_cycles = {}\n\
hold_end_cycles = {}\n\
frame_timeout_ms = {}\n\
line0_default = \"{}\"\n\
line1_default = \"{}\"\n\
line2_default = \"{}\"\n\
line3_default = \"{}\"\n\
display_driver = {}\n\
pcf8574_addr = {}\n\
buzzer_gpio_pin = {}\n\
success_tone_hz = {}\n\
fail_tone_hz = {}\n\
tone_ms = {}\n\
fail_gap_ms = {}\n\
backoff_initial_ms = {}\n\
backoff_max_ms = {}\n\
telemetry_file = {}\n",
        config.device,
        config.baud,
        config.flow_control,
        config.parity,
        config.stop_bits,
        config.dtr_on_open,
        config.serial_timeout_ms,
        config.cols,
        config.refresh_ms,
        config.idle_sleep_ms,
        config.hold_start_cycles,
        config.hold_end_cycles,
        config.frame_timeout_ms,
        config.line_defaults[0],
        config.line_defaults[1],
        config.line_defaults[2],
        config.line_defaults[3],
        super::format_display_driver(&config.display_driver),
        super::format_pcf_addr(&config.pcf8574_addr),
        config
            .buzzer_gpio_pin
            .map(|p| p.to_string())
            .unwrap_or_else(|| "null".into()),
        config.success_tone_hz,
        config.fail_tone_hz,
        config.tone_ms,
        config.fail_gap_ms,
        config.backoff_initial_ms,
        config.backoff_max_ms,
        config
            .telemetry_file
            .as_ref()
            .map(|p| format!("\"{p}\""))
            .unwrap_or_else(|| "null".into()),
    );
    fs::write(path, contents)?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let mut cfg = Config::default();

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            Error::InvalidArgs(format!("invalid config line {}: '{}'", idx + 1, line))
        })?;

        let key = key.trim();
        let value = value.trim().trim_matches('"');
        let line_no = idx + 1;
        match key {
            "device" => cfg.device = value.to_string(),
            "baud" => cfg.baud = number(key, value, line_no)?,
            "flow_control" => cfg.flow_control = setting(key, value, line_no)?,
            "parity" => cfg.parity = setting(key, value, line_no)?,
            "stop_bits" => cfg.stop_bits = setting(key, value, line_no)?,
            "dtr_on_open" => cfg.dtr_on_open = setting(key, value, line_no)?,
            "serial_timeout_ms" => cfg.serial_timeout_ms = number(key, value, line_no)?,
            "cols" => cfg.cols = number(key, value, line_no)?,
            "refresh_ms" => cfg.refresh_ms = millis(key, value, line_no)?,
            "idle_sleep_ms" => cfg.idle_sleep_ms = millis(key, value, line_no)?,
            "hold_start_cycles" => cfg.hold_start_cycles = number(key, value, line_no)?,
            "hold_end_cycles" => cfg.hold_end_cycles = number(key, value, line_no)?,
            "frame_timeout_ms" => cfg.frame_timeout_ms = millis(key, value, line_no)?,
            "line0_default" => cfg.line_defaults[0] = value.to_string(),
            "line1_default" => cfg.line_defaults[1] = value.to_string(),
            "line2_default" => cfg.line_defaults[2] = value.to_string(),
            "line3_default" => cfg.line_defaults[3] = value.to_string(),
            "display_driver" => {
                cfg.display_driver = value.parse().map_err(|e: String| {
                    Error::InvalidArgs(format!("invalid display_driver on line {line_no}: {e}"))
                })?;
            }
            "pcf8574_addr" => {
                cfg.pcf8574_addr = super::parse_pcf_addr(value).map_err(|e| {
                    Error::InvalidArgs(format!("invalid pcf8574_addr on line {line_no}: {e}"))
                })?;
            }
            "buzzer_gpio_pin" => {
                cfg.buzzer_gpio_pin = if value == "null" {
                    None
                } else {
                    Some(number(key, value, line_no)?)
                };
            }
            "success_tone_hz" => cfg.success_tone_hz = number(key, value, line_no)?,
            "fail_tone_hz" => cfg.fail_tone_hz = number(key, value, line_no)?,
            "tone_ms" => cfg.tone_ms = millis(key, value, line_no)?,
            "fail_gap_ms" => cfg.fail_gap_ms = millis(key, value, line_no)?,
            "backoff_initial_ms" => cfg.backoff_initial_ms = millis(key, value, line_no)?,
            "backoff_max_ms" => cfg.backoff_max_ms = millis(key, value, line_no)?,
            "telemetry_file" => {
                cfg.telemetry_file = if value == "null" || value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown config key '{other}' on line {line_no}"
                )));
            }
        }
    }

    super::validate(&cfg)?;
    Ok(cfg)
}

fn config_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| Error::InvalidArgs("HOME not set; cannot locate config directory".into()))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn number<T: FromStr>(key: &str, value: &str, line_no: usize) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgs(format!("invalid {key} value on line {line_no}")))
}

fn setting<T: FromStr<Err = Error>>(key: &str, value: &str, line_no: usize) -> Result<T> {
    value
        .parse()
        .map_err(|e| Error::InvalidArgs(format!("invalid {key} on line {line_no}: {e}")))
}

/// Plain milliseconds, or a humantime duration such as `300ms` or `2s`.
fn millis(key: &str, value: &str, line_no: usize) -> Result<u64> {
    if let Ok(ms) = value.parse::<u64>() {
        return Ok(ms);
    }
    humantime::parse_duration(value)
        .map(|d: Duration| d.as_millis().min(u64::MAX as u128) as u64)
        .map_err(|e| Error::InvalidArgs(format!("invalid {key} on line {line_no}: {e}")))
}
