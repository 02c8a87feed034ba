//! Four display lines, each with a timed message over a fixed default.

use crate::protocol::{accent::UNMAPPED, message::bounded_text, LineId, MessageText};

use super::viewport::{render_window, ScrollCursor, ScrollTiming};

pub const LINE_COUNT: usize = LineId::ALL.len();

/// One row: a message that expires back to a default.
#[derive(Debug, Clone)]
pub struct DisplayLine {
    current: MessageText,
    default: MessageText,
    expiry_ms: u64,
    current_cursor: ScrollCursor,
    default_cursor: ScrollCursor,
}

impl DisplayLine {
    /// The default text is fixed for the life of the line. Non-ASCII chars
    /// are replaced so the text fits the same bound as wire messages.
    pub fn new(default: &str, timing: ScrollTiming) -> Self {
        let ascii: String = default
            .chars()
            .map(|c| if c.is_ascii() { c } else { UNMAPPED as char })
            .collect();
        let (default, _) = bounded_text(&ascii);
        Self {
            current: MessageText::new(),
            default,
            expiry_ms: 0,
            current_cursor: ScrollCursor::new(timing),
            default_cursor: ScrollCursor::new(timing),
        }
    }

    /// Show `text` until `now_ms + ttl_ms`.
    pub fn set_message(&mut self, text: &str, ttl_ms: u32, now_ms: u64, timing: ScrollTiming) {
        let (text, _) = bounded_text(text);
        self.current = text;
        self.expiry_ms = now_ms.saturating_add(ttl_ms as u64);
        self.current_cursor.reset(timing);
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expiry_ms
    }

    pub fn expiry_ms(&self) -> u64 {
        self.expiry_ms
    }

    pub fn default_text(&self) -> &str {
        &self.default
    }

    pub fn active_text(&self, now_ms: u64) -> &str {
        if self.is_expired(now_ms) {
            &self.default
        } else {
            &self.current
        }
    }

    fn active_cursor(&self, now_ms: u64) -> &ScrollCursor {
        if self.is_expired(now_ms) {
            &self.default_cursor
        } else {
            &self.current_cursor
        }
    }

    /// Scroll position of whichever text is active at `now_ms`.
    pub fn scroll_offset(&self, now_ms: u64) -> usize {
        self.active_cursor(now_ms).offset
    }

    pub fn render(&self, now_ms: u64, width: usize) -> String {
        let offset = self.active_cursor(now_ms).offset;
        render_window(self.active_text(now_ms), width, offset)
    }

    /// Move the active source's cursor one refresh cycle forward.
    pub fn advance(&mut self, now_ms: u64, width: usize, timing: ScrollTiming) {
        if self.is_expired(now_ms) {
            let len = self.default.chars().count();
            self.default_cursor.advance(len, width, timing);
        } else {
            let len = self.current.chars().count();
            self.current_cursor.advance(len, width, timing);
        }
    }
}

/// Display state for all rows, owned by the control loop.
#[derive(Debug, Clone)]
pub struct DisplayBank {
    lines: [DisplayLine; LINE_COUNT],
    width: usize,
    timing: ScrollTiming,
}

impl DisplayBank {
    pub fn new(defaults: [&str; LINE_COUNT], width: usize, timing: ScrollTiming) -> Self {
        Self {
            lines: defaults.map(|text| DisplayLine::new(text, timing)),
            width,
            timing,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn timing(&self) -> ScrollTiming {
        self.timing
    }

    pub fn line(&self, id: LineId) -> &DisplayLine {
        &self.lines[id.index()]
    }

    pub fn set_line(&mut self, id: LineId, text: &str, ttl_ms: u32, now_ms: u64) {
        let timing = self.timing;
        self.lines[id.index()].set_message(text, ttl_ms, now_ms, timing);
    }

    pub fn render_line(&self, id: LineId, now_ms: u64) -> String {
        self.lines[id.index()].render(now_ms, self.width)
    }

    /// One refresh pass: render every row, then step every cursor.
    pub fn refresh(&mut self, now_ms: u64) -> [String; LINE_COUNT] {
        let rows = LineId::ALL.map(|id| self.render_line(id, now_ms));
        let (width, timing) = (self.width, self.timing);
        for line in &mut self.lines {
            line.advance(now_ms, width, timing);
        }
        rows
    }
}

/// Minimum spacing between refresh passes.
#[derive(Debug, Clone, Copy)]
pub struct RefreshGate {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl RefreshGate {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Returns `true` and arms the gate when a refresh may run at `now_ms`.
    pub fn due(&mut self, now_ms: u64) -> bool {
        let ready = match self.last_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };
        if ready {
            self.last_ms = Some(now_ms);
        }
        ready
    }
}

/// Last text written to each physical row, so unchanged rows are skipped.
#[derive(Debug, Clone, Default)]
pub struct RowCache {
    rows: [Option<String>; LINE_COUNT],
}

impl RowCache {
    /// Record `text` for `row`; `true` when it differs from what is shown.
    pub fn update(&mut self, row: usize, text: &str) -> bool {
        let Some(slot) = self.rows.get_mut(row) else {
            return false;
        };
        if slot.as_deref() == Some(text) {
            return false;
        }
        *slot = Some(text.to_string());
        true
    }

    pub fn invalidate(&mut self) {
        self.rows = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_DWELL: ScrollTiming = ScrollTiming {
        hold_start: 0,
        hold_end: 0,
    };

    fn bank(width: usize) -> DisplayBank {
        DisplayBank::new(["CLOCK", "Lecture", "Speaker", "Guest"], width, NO_DWELL)
    }

    #[test]
    fn non_ascii_default_keeps_its_length() {
        let default = format!("Caf\u{e9}{}", "x".repeat(76));
        let line = DisplayLine::new(&default, NO_DWELL);
        assert_eq!(line.default_text().len(), 80);
        assert!(line.default_text().starts_with("Caf?x"));
    }

    #[test]
    fn defaults_show_until_a_message_arrives() {
        let bank = bank(8);
        assert_eq!(bank.render_line(LineId::Line1, 0), "Lecture ");
        assert_eq!(bank.render_line(LineId::Line3, 99_999), "Guest   ");
    }

    #[test]
    fn message_is_active_for_exactly_its_ttl() {
        let mut bank = bank(8);
        let t = 10_000;
        bank.set_line(LineId::Line0, "Room A", 5_000, t);
        assert_eq!(bank.render_line(LineId::Line0, t), "Room A  ");
        assert_eq!(bank.render_line(LineId::Line0, t + 4_999), "Room A  ");
        assert_eq!(bank.render_line(LineId::Line0, t + 5_000), "CLOCK   ");
        assert_eq!(bank.render_line(LineId::Line0, t + 60_000), "CLOCK   ");
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let mut bank = bank(8);
        bank.set_line(LineId::Line2, "gone", 0, 500);
        assert_eq!(bank.render_line(LineId::Line2, 500), "Speaker ");
    }

    #[test]
    fn new_message_replaces_old_one_and_resets_scroll() {
        let mut bank = bank(4);
        bank.set_line(LineId::Line1, "ABCDEFGH", 10_000, 0);
        bank.refresh(0);
        bank.refresh(0);
        assert_eq!(bank.line(LineId::Line1).scroll_offset(0), 2);
        bank.set_line(LineId::Line1, "WXYZ1234", 10_000, 1);
        assert_eq!(bank.line(LineId::Line1).scroll_offset(1), 0);
        assert_eq!(bank.render_line(LineId::Line1, 1), "WXYZ");
    }

    #[test]
    fn sources_keep_separate_cursors() {
        let mut bank = DisplayBank::new(["DEFAULTLONG", "", "", ""], 4, NO_DWELL);
        bank.refresh(0);
        assert_eq!(bank.line(LineId::Line0).scroll_offset(0), 1);
        bank.set_line(LineId::Line0, "MESSAGELONG", 1_000, 0);
        bank.refresh(10);
        bank.refresh(20);
        assert_eq!(bank.line(LineId::Line0).scroll_offset(20), 2);
        // the default resumes where it left off
        assert_eq!(bank.line(LineId::Line0).scroll_offset(1_000), 1);
    }

    #[test]
    fn refresh_renders_before_advancing() {
        let mut bank = DisplayBank::new(["abcdef", "", "", ""], 4, NO_DWELL);
        assert_eq!(bank.refresh(0)[0], "abcd");
        assert_eq!(bank.refresh(0)[0], "bcde");
        assert_eq!(bank.refresh(0)[0], "cdef");
        assert_eq!(bank.refresh(0)[0], "abcd");
    }

    #[test]
    fn overlong_text_is_bounded() {
        let mut bank = bank(20);
        let long = "z".repeat(200);
        bank.set_line(LineId::Line3, &long, 1_000, 0);
        let len = bank.line(LineId::Line3).active_text(0).len();
        assert_eq!(len, crate::protocol::MAX_STRING);
    }

    #[test]
    fn gate_spaces_refreshes() {
        let mut gate = RefreshGate::new(300);
        assert!(gate.due(0));
        assert!(!gate.due(299));
        assert!(gate.due(300));
        assert!(!gate.due(450));
        assert!(gate.due(700));
    }

    #[test]
    fn row_cache_reports_changes_only() {
        let mut cache = RowCache::default();
        assert!(cache.update(0, "abc"));
        assert!(!cache.update(0, "abc"));
        assert!(cache.update(0, "abd"));
        assert!(!cache.update(9, "out of range"));
        cache.invalidate();
        assert!(cache.update(0, "abd"));
    }
}
