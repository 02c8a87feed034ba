//! Wall clock with a settable offset and an optional board temperature.

use chrono::{Local, NaiveDateTime, TimeDelta};
use sysinfo::Components;

use crate::{Error, Result};

/// `SETTIME` payload layout.
pub const SET_TIME_FORMAT: &str = "%Y:%m:%d:%H:%M:%S";
/// Timestamp layout used in `TIME` replies.
pub const REPLY_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub trait WallClock {
    fn now(&self) -> NaiveDateTime;
    fn set(&mut self, when: NaiveDateTime) -> Result<()>;
    /// Degrees Celsius, `None` when there is no sensor.
    fn temperature_c(&mut self) -> Option<f32>;
}

impl<T: WallClock + ?Sized> WallClock for Box<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn set(&mut self, when: NaiveDateTime) -> Result<()> {
        (**self).set(when)
    }

    fn temperature_c(&mut self) -> Option<f32> {
        (**self).temperature_c()
    }
}

/// Parse `YYYY:MM:DD:hh:mm:ss`.
pub fn parse_set_time(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), SET_TIME_FORMAT)
        .map_err(|e| Error::Parse(format!("bad time '{text}': {e}")))
}

pub fn format_reply_time(when: NaiveDateTime) -> String {
    when.format(REPLY_TIME_FORMAT).to_string()
}

/// Host clock plus an offset; setting the time only moves the offset, so
/// the daemon never needs permission to change the system clock.
pub struct SystemRtc {
    offset: TimeDelta,
    components: Components,
}

impl Default for SystemRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRtc {
    pub fn new() -> Self {
        Self {
            offset: TimeDelta::zero(),
            components: Components::new_with_refreshed_list(),
        }
    }
}

impl WallClock for SystemRtc {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local() + self.offset
    }

    fn set(&mut self, when: NaiveDateTime) -> Result<()> {
        self.offset = when - Local::now().naive_local();
        Ok(())
    }

    fn temperature_c(&mut self) -> Option<f32> {
        self.components.refresh(false);
        self.components
            .iter()
            .filter_map(|component| component.temperature())
            .find(|t| t.is_finite())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: NaiveDateTime,
    temperature_c: Option<f32>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime, temperature_c: Option<f32>) -> Self {
        Self { now, temperature_c }
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn set(&mut self, when: NaiveDateTime) -> Result<()> {
        self.now = when;
        Ok(())
    }

    fn temperature_c(&mut self) -> Option<f32> {
        self.temperature_c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_set_time_payload() {
        let when = parse_set_time("2026:03:14:15:09:26").unwrap();
        assert_eq!(when, stamp(2026, 3, 14, 15, 9, 26));
    }

    #[test]
    fn rejects_bad_set_time_payload() {
        assert!(parse_set_time("2026-03-14 15:09:26").is_err());
        assert!(parse_set_time("2026:13:01:00:00:00").is_err());
        assert!(parse_set_time("").is_err());
    }

    #[test]
    fn reply_time_is_day_first() {
        let text = format_reply_time(stamp(2026, 1, 2, 3, 4, 5));
        assert_eq!(text, "02/01/2026 03:04:05");
    }

    #[test]
    fn system_clock_follows_set() {
        let mut rtc = SystemRtc::new();
        let target = stamp(2001, 9, 9, 1, 46, 40);
        rtc.set(target).unwrap();
        let drift = rtc.now() - target;
        assert!(drift >= TimeDelta::zero());
        assert!(drift < TimeDelta::seconds(5));
    }

    #[test]
    fn fixed_clock_reports_what_it_was_given() {
        let mut clock = FixedClock::new(stamp(2020, 2, 29, 12, 0, 0), Some(21.5));
        assert_eq!(clock.temperature_c(), Some(21.5));
        clock.set(stamp(2020, 3, 1, 0, 0, 0)).unwrap();
        assert_eq!(clock.now(), stamp(2020, 3, 1, 0, 0, 0));
    }
}
