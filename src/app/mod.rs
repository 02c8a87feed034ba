use crate::{
    cli::{RunOptions, SendOptions},
    config::{Config, DisplayDriver, Pcf8574Addr, DISPLAY_ROWS},
    display::{Lcd, MemoryDisplay, ScrollTiming, TextDisplay, LINE_COUNT},
    peripherals::{Buzzer, GpioBuzzer, SilentBuzzer, SystemRtc, ToneProfile},
    serial::{
        backoff::BackoffController, DtrBehavior, FlowControlMode, ParityMode, SerialOptions,
        SerialPort, StopBitsMode,
    },
    Result,
};
use std::{
    path::Path,
    str::FromStr,
    sync::atomic::Ordering,
    thread,
    time::{Duration, Instant},
};

mod connection;
pub mod control_loop;
pub mod dispatch;
mod lifecycle;
pub mod logger;
pub mod telemetry;

use connection::attempt_serial_connect;
pub use connection::send_once;
pub use control_loop::{Controller, LoopSettings};
use lifecycle::{create_shutdown_flag, render_boot, render_shutdown};
pub use logger::{LogLevel, Logger};
use telemetry::FrameTelemetry;

/// Config for the daemon: the file values with command-line overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
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
    pub line_defaults: [String; LINE_COUNT],
    pub display_driver: DisplayDriver,
    pub pcf8574_addr: Pcf8574Addr,
    pub buzzer_gpio_pin: Option<u8>,
    pub tones: ToneProfile,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub telemetry_file: Option<String>,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl AppConfig {
    /// Merge the command line over the file and check the result the same
    /// way a loaded file is checked.
    pub fn from_sources(mut config: Config, opts: RunOptions) -> Result<Self> {
        if let Some(device) = opts.device {
            config.device = device;
        }
        if let Some(baud) = opts.baud {
            config.baud = baud;
        }
        if let Some(cols) = opts.cols {
            config.cols = cols;
        }
        crate::config::validate(&config)?;

        let display_driver = if opts.headless {
            DisplayDriver::Headless
        } else {
            config.display_driver
        };
        Ok(Self {
            device: config.device,
            baud: config.baud,
            flow_control: config.flow_control,
            parity: config.parity,
            stop_bits: config.stop_bits,
            dtr_on_open: config.dtr_on_open,
            serial_timeout_ms: config.serial_timeout_ms,
            cols: config.cols,
            refresh_ms: config.refresh_ms,
            idle_sleep_ms: config.idle_sleep_ms,
            hold_start_cycles: config.hold_start_cycles,
            hold_end_cycles: config.hold_end_cycles,
            frame_timeout_ms: config.frame_timeout_ms,
            line_defaults: config.line_defaults,
            display_driver,
            pcf8574_addr: config.pcf8574_addr,
            buzzer_gpio_pin: config.buzzer_gpio_pin,
            tones: ToneProfile {
                success_hz: config.success_tone_hz,
                fail_hz: config.fail_tone_hz,
                tone_ms: config.tone_ms,
                fail_gap_ms: config.fail_gap_ms,
            },
            backoff_initial_ms: config.backoff_initial_ms,
            backoff_max_ms: config.backoff_max_ms,
            telemetry_file: config.telemetry_file,
            log_level: opts
                .log_level
                .as_deref()
                .and_then(|s| LogLevel::from_str(s).ok())
                .unwrap_or_default(),
            log_file: opts.log_file,
        })
    }

    pub fn serial_options(&self) -> SerialOptions {
        SerialOptions {
            baud: self.baud,
            timeout_ms: self.serial_timeout_ms,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            dtr: self.dtr_on_open,
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            width: self.cols as usize,
            timing: ScrollTiming {
                hold_start: self.hold_start_cycles,
                hold_end: self.hold_end_cycles,
            },
            refresh_ms: self.refresh_ms,
            frame_timeout_ms: self.frame_timeout_ms,
            tones: self.tones,
            line_defaults: self.line_defaults.clone(),
        }
    }
}

type Daemon = Controller<SerialPort, Box<dyn TextDisplay>, Box<dyn Buzzer>, SystemRtc>;

pub struct App {
    config: AppConfig,
    logger: Logger,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let logger = Logger::new(config.log_level, config.log_file.clone())?;
        Ok(Self { config, logger })
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = Config::load_or_default()?;
        let merged = AppConfig::from_sources(cfg_file, opts)?;
        Self::new(merged)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Entry point for the daemon. Returns after ctrl-c or a display failure.
    pub fn run(self) -> Result<()> {
        let config = self.config;
        let display = open_display(&config)?;
        let buzzer = open_buzzer(&config, &self.logger);
        let telemetry = match &config.telemetry_file {
            Some(path) => FrameTelemetry::open(Path::new(path))?.boxed(),
            None => FrameTelemetry::disabled(),
        };

        self.logger.info(format!(
            "daemon start (device={}, baud={}, cols={}, driver={:?})",
            config.device, config.baud, config.cols, config.display_driver
        ));

        let mut controller: Daemon = Controller::new(
            &config.loop_settings(),
            display,
            buzzer,
            SystemRtc::new(),
            self.logger,
        )
        .with_telemetry(telemetry);

        render_boot(controller.display_mut())?;
        controller.invalidate_rows();
        let running = create_shutdown_flag()?;
        let mut backoff = BackoffController::new(config.backoff_initial_ms, config.backoff_max_ms);
        let idle = Duration::from_millis(config.idle_sleep_ms);

        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if !controller.has_link() && backoff.should_retry(now) {
                match attempt_serial_connect(
                    controller.logger(),
                    &config.device,
                    config.serial_options(),
                ) {
                    Ok(port) => {
                        backoff.mark_success();
                        controller.attach(port);
                    }
                    Err(kind) => {
                        backoff.mark_failure(now);
                        controller.logger().debug(format!(
                            "next serial attempt in {}",
                            humantime::format_duration(backoff.time_until_retry(now))
                        ));
                        if !kind.is_transient() {
                            controller.logger().warn(format!(
                                "serial failure '{kind}' is unlikely to clear on its own"
                            ));
                        }
                    }
                }
            }

            if !controller.step()? {
                thread::sleep(idle);
            }
        }

        controller.logger().info("shutdown requested");
        render_shutdown(controller.display_mut())
    }
}

fn open_display(config: &AppConfig) -> Result<Box<dyn TextDisplay>> {
    match config.display_driver {
        DisplayDriver::Headless => Ok(Box::new(MemoryDisplay::new(
            config.cols as usize,
            DISPLAY_ROWS as usize,
        ))),
        DisplayDriver::Hd44780 => {
            let mut lcd = Lcd::new(config.cols, DISPLAY_ROWS, config.pcf8574_addr)?;
            lcd.set_backlight(true)?;
            Ok(Box::new(lcd))
        }
    }
}

/// A missing or busy buzzer pin is not fatal; the tones just go silent.
fn open_buzzer(config: &AppConfig, logger: &Logger) -> Box<dyn Buzzer> {
    let Some(pin) = config.buzzer_gpio_pin else {
        return Box::new(SilentBuzzer::new());
    };
    match GpioBuzzer::new(pin) {
        Ok(buzzer) => Box::new(buzzer),
        Err(err) => {
            logger.warn(format!("buzzer on GPIO {pin} unavailable: {err}; tones disabled"));
            Box::new(SilentBuzzer::new())
        }
    }
}

/// `cristalliq send`: push one frame at a device and print the reply body.
pub fn run_send(opts: SendOptions) -> Result<()> {
    let cfg = Config::load_or_default()?;
    let device = opts.device.unwrap_or(cfg.device);
    let options = SerialOptions {
        baud: opts.baud.unwrap_or(cfg.baud),
        timeout_ms: cfg.serial_timeout_ms,
        flow_control: cfg.flow_control,
        parity: cfg.parity,
        stop_bits: cfg.stop_bits,
        dtr: cfg.dtr_on_open,
    };
    let mut port = SerialPort::connect(&device, options)?;
    match send_once(&mut port, &opts.body, Duration::from_millis(opts.wait_ms))? {
        Some(reply) => println!("{}", String::from_utf8_lossy(&reply)),
        None => eprintln!("no reply within {} ms", opts.wait_ms),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_COLS, MIN_COLS};

    #[test]
    fn config_from_options() {
        let opts = RunOptions {
            device: Some("/dev/ttyUSB1".into()),
            baud: Some(57_600),
            cols: Some(16),
            headless: true,
            log_level: Some("debug".into()),
            log_file: None,
        };
        let cfg = AppConfig::from_sources(Config::default(), opts).unwrap();
        assert_eq!(cfg.device, "/dev/ttyUSB1");
        assert_eq!(cfg.baud, 57_600);
        assert_eq!(cfg.cols, 16);
        assert_eq!(cfg.display_driver, DisplayDriver::Headless);
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn config_prefers_file_values_when_cli_missing() {
        let cfg_file = Config {
            device: "/dev/ttyS0".into(),
            baud: 19_200,
            cols: 16,
            refresh_ms: 250,
            frame_timeout_ms: 400,
            buzzer_gpio_pin: Some(18),
            success_tone_hz: 2_500,
            line_defaults: ["a".into(), "b".into(), "c".into(), "d".into()],
            ..Config::default()
        };
        let merged = AppConfig::from_sources(cfg_file.clone(), RunOptions::default()).unwrap();
        assert_eq!(merged.device, cfg_file.device);
        assert_eq!(merged.baud, cfg_file.baud);
        assert_eq!(merged.cols, cfg_file.cols);
        assert_eq!(merged.buzzer_gpio_pin, Some(18));
        assert_eq!(merged.tones.success_hz, 2_500);
        assert_eq!(merged.display_driver, cfg_file.display_driver);
        assert_eq!(merged.log_level, LogLevel::Info);

        let settings = merged.loop_settings();
        assert_eq!(settings.width, 16);
        assert_eq!(settings.refresh_ms, 250);
        assert_eq!(settings.frame_timeout_ms, 400);
        assert_eq!(settings.line_defaults[3], "d");

        let serial = merged.serial_options();
        assert_eq!(serial.baud, 19_200);
    }

    #[test]
    fn cli_cols_outside_display_range_is_rejected() {
        for cols in [0, MIN_COLS - 1, MAX_COLS + 1] {
            let opts = RunOptions {
                cols: Some(cols),
                ..RunOptions::default()
            };
            let err = AppConfig::from_sources(Config::default(), opts).unwrap_err();
            assert!(err.to_string().contains("cols must be between"), "{err}");
        }
        let opts = RunOptions {
            cols: Some(MAX_COLS),
            ..RunOptions::default()
        };
        assert_eq!(
            AppConfig::from_sources(Config::default(), opts).unwrap().cols,
            MAX_COLS
        );
    }

    #[test]
    fn cli_zero_baud_is_rejected() {
        let opts = RunOptions {
            baud: Some(0),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), opts).is_err());
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let opts = RunOptions {
            log_level: Some("chatty".into()),
            ..RunOptions::default()
        };
        let cfg = AppConfig::from_sources(Config::default(), opts).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Info);
    }

    #[test]
    fn headless_display_has_four_rows() {
        let cfg = AppConfig::from_sources(
            Config::default(),
            RunOptions {
                headless: true,
                ..RunOptions::default()
            },
        )
        .unwrap();
        let display = open_display(&cfg).unwrap();
        assert_eq!(display.rows(), 4);
        assert_eq!(display.width(), 20);
    }

    #[test]
    fn buzzer_without_pin_is_silent() {
        let cfg = AppConfig::from_sources(Config::default(), RunOptions::default()).unwrap();
        let mut buzzer = open_buzzer(&cfg, &Logger::stderr(LogLevel::Error));
        buzzer.tone(2_000, Duration::from_millis(1)).unwrap();
    }
}
