//! The single cooperative loop: refresh, read, decode, dispatch.

use std::io::Write;
use std::time::Instant;

use super::{
    dispatch::{dispatch, Outcome},
    telemetry::{FrameEvent, FrameTelemetry},
    Logger,
};
use crate::{
    display::{DisplayBank, RefreshGate, RowCache, ScrollTiming, TextDisplay, LINE_COUNT},
    peripherals::{Buzzer, ToneProfile, WallClock},
    protocol::{parse_message, Command, DecodedFrame, FrameReceiver, Reply},
    serial::{errors::classify_error, ByteLink},
    Result,
};

/// Most bytes held between the link and the frame receiver.
pub const INBOX_CAPACITY: usize = 512;

/// Loop tuning taken from the merged config.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub width: usize,
    pub timing: ScrollTiming,
    pub refresh_ms: u64,
    pub frame_timeout_ms: u64,
    pub tones: ToneProfile,
    pub line_defaults: [String; LINE_COUNT],
}

/// Owns every piece of runtime state; nothing is global.
pub struct Controller<L, D, B, C> {
    link: Option<L>,
    display: D,
    buzzer: B,
    clock: C,
    receiver: FrameReceiver,
    bank: DisplayBank,
    gate: RefreshGate,
    rows: RowCache,
    inbox: Vec<u8>,
    tones: ToneProfile,
    telemetry: FrameTelemetry<Box<dyn Write>>,
    logger: Logger,
    started: Instant,
}

impl<L, D, B, C> Controller<L, D, B, C>
where
    L: ByteLink,
    D: TextDisplay,
    B: Buzzer,
    C: WallClock,
{
    pub fn new(settings: &LoopSettings, display: D, buzzer: B, clock: C, logger: Logger) -> Self {
        let defaults: [&str; LINE_COUNT] =
            std::array::from_fn(|i| settings.line_defaults[i].as_str());
        Self {
            link: None,
            display,
            buzzer,
            clock,
            receiver: FrameReceiver::with_timeout(settings.frame_timeout_ms),
            bank: DisplayBank::new(defaults, settings.width, settings.timing),
            gate: RefreshGate::new(settings.refresh_ms),
            rows: RowCache::default(),
            inbox: Vec::with_capacity(INBOX_CAPACITY),
            tones: settings.tones,
            telemetry: FrameTelemetry::disabled(),
            logger,
            started: Instant::now(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: FrameTelemetry<Box<dyn Write>>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Connect a link. Display state and any partial frame are kept.
    pub fn attach(&mut self, link: L) {
        self.link = Some(link);
    }

    pub fn detach(&mut self) -> Option<L> {
        self.inbox.clear();
        self.link.take()
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn buzzer(&self) -> &B {
        &self.buzzer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn bank(&self) -> &DisplayBank {
        &self.bank
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Forget what is on the panel so the next pass rewrites every row.
    pub fn invalidate_rows(&mut self) {
        self.rows.invalidate();
    }

    /// Milliseconds since the controller was built.
    pub fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis().min(u64::MAX as u128) as u64
    }

    pub fn step(&mut self) -> Result<bool> {
        let now_ms = self.uptime_ms();
        self.step_at(now_ms)
    }

    /// One loop iteration at `now_ms`.
    ///
    /// Returns `true` when the caller should step again without sleeping:
    /// a frame was handled or unread bytes are still waiting. Only display
    /// errors propagate; a failing link is detached and logged.
    pub fn step_at(&mut self, now_ms: u64) -> Result<bool> {
        if let Err(err) = self.buzzer.service() {
            self.logger.warn(format!("buzzer: {err}"));
        }

        if self.gate.due(now_ms) {
            self.refresh_pass(now_ms)?;
        }

        if self.receiver.expire_stale(now_ms) {
            self.logger.trace("partial frame abandoned after timeout");
            self.emit(now_ms, FrameEvent::Abandoned, None, None);
        }

        self.fill_inbox();

        let used = self.receiver.feed_at(&self.inbox, now_ms);
        self.inbox.drain(..used);

        let Some(frame) = self.receiver.take_frame() else {
            return Ok(false);
        };
        self.handle_frame(frame, now_ms)?;
        Ok(true)
    }

    fn refresh_pass(&mut self, now_ms: u64) -> Result<()> {
        let rendered = self.bank.refresh(now_ms);
        for (row, text) in rendered.iter().enumerate() {
            if self.rows.update(row, text) {
                self.display.write_row(row, text)?;
            }
        }
        Ok(())
    }

    fn fill_inbox(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        // Bytes that do not fit stay on the link until frames drain the inbox.
        let room = INBOX_CAPACITY.saturating_sub(self.inbox.len());
        if room == 0 {
            return;
        }
        match link.read_available(&mut self.inbox, room) {
            Ok(_) => {}
            Err(err) => {
                self.logger.warn(format!(
                    "serial read failed ({}): {err}; detaching link",
                    classify_error(&err)
                ));
                self.detach();
            }
        }
    }

    fn handle_frame(&mut self, frame: DecodedFrame, now_ms: u64) -> Result<()> {
        if frame.truncated {
            self.logger.warn("frame exceeded buffer; body truncated");
            self.emit(now_ms, FrameEvent::Truncated, None, Some("frame"));
        }

        let msg = match parse_message(frame.as_bytes()) {
            Ok(msg) => msg,
            Err(err) => {
                self.logger.warn(format!("malformed frame dropped: {err}"));
                let detail = err.to_string();
                self.emit(now_ms, FrameEvent::Malformed, None, Some(&detail));
                return Ok(());
            }
        };

        self.emit(now_ms, FrameEvent::Received, Some(msg.code), None);
        if msg.truncated {
            self.logger
                .warn(format!("message {} text truncated", msg.code));
            self.emit(now_ms, FrameEvent::Truncated, Some(msg.code), Some("text"));
        }

        let outcome = dispatch(
            &msg,
            now_ms,
            &mut self.bank,
            &mut self.buzzer,
            &mut self.clock,
            &self.tones,
        );
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.logger
                    .warn(format!("command {} failed: {err}", msg.code));
                return Ok(());
            }
        };
        self.logger.debug(format!(
            "dispatched {} (code={} ttl={}ms text='{}')",
            Command::from_code(msg.code).name(),
            msg.code,
            msg.ttl_ms,
            msg.text
        ));

        self.apply(outcome, now_ms)
    }

    fn apply(&mut self, outcome: Outcome, now_ms: u64) -> Result<()> {
        if let Some(id) = outcome.refresh_row {
            let text = self.bank.render_line(id, now_ms);
            if self.rows.update(id.index(), &text) {
                self.display.write_row(id.index(), &text)?;
            }
        }
        if let Some(reply) = outcome.reply {
            self.send_reply(&reply, now_ms);
        }
        Ok(())
    }

    fn send_reply(&mut self, reply: &Reply, now_ms: u64) {
        let Some(link) = self.link.as_mut() else {
            self.logger.debug("no link attached; reply dropped");
            return;
        };
        let frame = reply.encode();
        if frame.truncated() {
            self.logger.warn("reply truncated to fit one frame");
        }
        if let Err(err) = link.write_frame(&frame) {
            self.logger.warn(format!(
                "serial write failed ({}): {err}; detaching link",
                classify_error(&err)
            ));
            self.detach();
            return;
        }
        let body = reply.body();
        self.emit(now_ms, FrameEvent::Reply, None, Some(&body));
    }

    fn emit(&mut self, now_ms: u64, event: FrameEvent, code: Option<i32>, detail: Option<&str>) {
        if let Err(err) = self.telemetry.record(now_ms, event, code, detail) {
            self.logger.warn(format!("telemetry write failed: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::logger::LogLevel;
    use crate::display::MemoryDisplay;
    use crate::peripherals::{FixedClock, RecordingBuzzer};
    use crate::serial::FakeSerialPort;
    use crate::Error;
    use chrono::NaiveDate;

    type TestController = Controller<FakeSerialPort, MemoryDisplay, RecordingBuzzer, FixedClock>;

    fn settings() -> LoopSettings {
        LoopSettings {
            width: 10,
            timing: ScrollTiming {
                hold_start: 0,
                hold_end: 0,
            },
            refresh_ms: 100,
            frame_timeout_ms: 0,
            tones: ToneProfile {
                fail_gap_ms: 0,
                ..ToneProfile::default()
            },
            line_defaults: ["Clock".into(), "Talk".into(), "Host".into(), "Guest".into()],
        }
    }

    fn controller(script: Vec<Result<Vec<u8>>>) -> TestController {
        let clock = FixedClock::new(
            NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            None,
        );
        let mut ctl = Controller::new(
            &settings(),
            MemoryDisplay::new(10, 4),
            RecordingBuzzer::new(),
            clock,
            Logger::stderr(LogLevel::Error),
        );
        ctl.attach(FakeSerialPort::new(script));
        ctl
    }

    #[test]
    fn first_step_paints_defaults() {
        let mut ctl = controller(vec![]);
        assert!(!ctl.step_at(0).unwrap());
        assert_eq!(ctl.display().row(0), Some("Clock     "));
        assert_eq!(ctl.display().row(3), Some("Guest     "));
    }

    #[test]
    fn set_line_renders_immediately_and_acks() {
        let mut ctl = controller(vec![Ok(b"<300|Rust 101|1000>".to_vec())]);
        assert!(ctl.step_at(0).unwrap());
        assert_eq!(ctl.display().row(1), Some("Rust 101  "));
        assert_eq!(ctl.link().unwrap().writes(), &[b"<002|OK>".to_vec()]);
    }

    #[test]
    fn back_to_back_frames_in_one_read() {
        let mut ctl = controller(vec![Ok(b"<200|a|500><500|b|500>".to_vec())]);
        assert!(ctl.step_at(0).unwrap());
        assert!(ctl.step_at(1).unwrap());
        assert!(!ctl.step_at(2).unwrap());
        assert_eq!(ctl.display().row(0), Some("a         "));
        assert_eq!(ctl.display().row(3), Some("b         "));
        assert_eq!(ctl.link().unwrap().writes().len(), 2);
    }

    #[test]
    fn malformed_frame_gets_no_reply() {
        let mut ctl = controller(vec![Ok(b"<100>".to_vec())]);
        assert!(ctl.step_at(0).unwrap());
        assert!(ctl.link().unwrap().writes().is_empty());
    }

    #[test]
    fn unchanged_rows_are_not_rewritten() {
        let mut ctl = controller(vec![]);
        ctl.step_at(0).unwrap();
        let after_first = ctl.display().writes();
        ctl.step_at(100).unwrap();
        ctl.step_at(200).unwrap();
        assert_eq!(ctl.display().writes(), after_first);
    }

    #[test]
    fn refresh_is_gated() {
        let mut ctl = controller(vec![]);
        let long = "<200|abcdefghijklmno|60000>";
        ctl.link.as_mut().unwrap().push_chunk(long.as_bytes());
        ctl.step_at(0).unwrap();
        assert_eq!(ctl.display().row(0), Some("abcdefghij"));
        // inside the gate interval nothing scrolls
        ctl.step_at(50).unwrap();
        assert_eq!(ctl.bank().line(crate::protocol::LineId::Line0).scroll_offset(50), 0);
        ctl.step_at(100).unwrap();
        assert_eq!(ctl.display().row(0), Some("abcdefghij"));
        ctl.step_at(200).unwrap();
        assert_eq!(ctl.display().row(0), Some("bcdefghijk"));
    }

    #[test]
    fn read_error_detaches_link() {
        let mut ctl = controller(vec![Err(Error::Io(std::io::Error::other("unplugged")))]);
        assert!(!ctl.step_at(0).unwrap());
        assert!(!ctl.has_link());
        // the loop keeps rendering without a link
        assert!(!ctl.step_at(100).unwrap());
    }

    #[test]
    fn burst_larger_than_inbox_loses_no_frames() {
        let burst = b"<200|a|1>".repeat(60);
        assert!(burst.len() > INBOX_CAPACITY);
        let mut ctl = controller(vec![Ok(burst)]);
        let mut now = 0;
        while ctl.step_at(now).unwrap() {
            now += 1;
        }
        assert_eq!(ctl.link().unwrap().writes().len(), 60);
        assert!(ctl.link().unwrap().is_drained());
        assert_eq!(ctl.receiver.state(), crate::protocol::RxState::Idle);
    }

    #[test]
    fn partial_frame_survives_reattach() {
        let mut ctl = controller(vec![Ok(b"<200|half".to_vec())]);
        ctl.step_at(0).unwrap();
        ctl.detach();
        ctl.attach(FakeSerialPort::new(vec![Ok(b"way|100>".to_vec())]));
        assert!(ctl.step_at(1).unwrap());
        assert_eq!(ctl.display().row(0), Some("halfway   "));
    }
}
