use cristalliq::{
    app::{AppConfig, LogLevel},
    cli::{Command, RunOptions},
    config::{loader, Config, DisplayDriver},
};
use std::fs;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn file_then_cli_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "device = \"/dev/ttyAMA0\"\n\
         baud = 19200\n\
         cols = 16\n\
         refresh_ms = 1s\n\
         line0_default = \"Hall B\"\n",
    )
    .unwrap();
    let file = Config::load_from_path(&path).unwrap();
    assert_eq!(file.refresh_ms, 1_000);

    let Command::Run(opts) = Command::parse(&args(&["--baud", "115200", "--headless"])).unwrap()
    else {
        panic!("expected run");
    };
    let merged = AppConfig::from_sources(file, opts).unwrap();
    assert_eq!(merged.device, "/dev/ttyAMA0");
    assert_eq!(merged.baud, 115_200);
    assert_eq!(merged.cols, 16);
    assert_eq!(merged.display_driver, DisplayDriver::Headless);
    assert_eq!(merged.loop_settings().line_defaults[0], "Hall B");
    assert_eq!(merged.log_level, LogLevel::Info);
}

#[test]
fn cli_cols_cannot_bypass_range_check() {
    let Command::Run(opts) = Command::parse(&args(&["--cols", "0", "--headless"])).unwrap() else {
        panic!("expected run");
    };
    let err = AppConfig::from_sources(Config::default(), opts).unwrap_err();
    assert!(err.to_string().contains("cols"));
}

#[test]
fn first_run_writes_a_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".cristalliq").join("config.toml");
    let created = loader::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(created, Config::default());
    assert_eq!(Config::load_from_path(&path).unwrap(), created);
}

#[test]
fn invalid_file_is_reported_with_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "cols = 20\nscroll = fast\n").unwrap();
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn defaults_match_a_bare_run() {
    let merged = AppConfig::from_sources(Config::default(), RunOptions::default()).unwrap();
    assert_eq!(merged.device, "/dev/ttyUSB0");
    assert_eq!(merged.baud, 9_600);
    assert_eq!(merged.cols, 20);
    assert_eq!(merged.serial_options().baud, 9_600);
}
