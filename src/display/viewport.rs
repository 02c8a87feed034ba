//! Fixed-width window over a line of text, plus the cursor that scrolls it.

/// Dwell lengths, in refresh cycles, at either end of a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTiming {
    pub hold_start: u16,
    pub hold_end: u16,
}

pub const DEFAULT_HOLD_START: u16 = 4;
pub const DEFAULT_HOLD_END: u16 = 4;

impl Default for ScrollTiming {
    fn default() -> Self {
        Self {
            hold_start: DEFAULT_HOLD_START,
            hold_end: DEFAULT_HOLD_END,
        }
    }
}

pub fn line_needs_scroll(text: &str, width: usize) -> bool {
    text.chars().count() > width
}

/// Exactly `width` chars of `text` starting at `offset`.
///
/// Short text is left-justified and space-padded with the offset ignored.
/// Long text clamps the offset so the window never runs past the end.
pub fn render_window(text: &str, width: usize, offset: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        let mut out = String::with_capacity(width);
        out.push_str(text);
        out.extend(std::iter::repeat(' ').take(width - len));
        return out;
    }
    let start = offset.min(len - width);
    text.chars().skip(start).take(width).collect()
}

/// Horizontal scroll position of one text source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollCursor {
    pub offset: usize,
    pub hold: u16,
}

impl ScrollCursor {
    pub fn new(timing: ScrollTiming) -> Self {
        Self {
            offset: 0,
            hold: timing.hold_start,
        }
    }

    pub fn reset(&mut self, timing: ScrollTiming) {
        *self = Self::new(timing);
    }

    /// Step one refresh cycle.
    ///
    /// The offset may pass `len - width` while dwelling at the end; it is
    /// clamped by [`render_window`], not here.
    pub fn advance(&mut self, len: usize, width: usize, timing: ScrollTiming) {
        if len <= width {
            self.offset = 0;
            return;
        }
        if self.offset == 0 && self.hold > 0 {
            self.hold -= 1;
            return;
        }
        let span = len - width + 1 + timing.hold_end as usize;
        self.offset = (self.offset + 1) % span;
        if self.offset == 0 {
            self.hold = timing.hold_start;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_DWELL: ScrollTiming = ScrollTiming {
        hold_start: 0,
        hold_end: 0,
    };

    #[test]
    fn short_text_is_padded() {
        assert_eq!(render_window("Room A", 10, 0), "Room A    ");
        assert_eq!(render_window("Room A", 10, 7), "Room A    ");
        assert_eq!(render_window("", 3, 0), "   ");
    }

    #[test]
    fn exact_fit_is_unchanged() {
        assert_eq!(render_window("abcd", 4, 2), "abcd");
    }

    #[test]
    fn long_text_windows_and_clamps() {
        assert_eq!(render_window("HELLOWORLD", 4, 0), "HELL");
        assert_eq!(render_window("HELLOWORLD", 4, 3), "LOWO");
        assert_eq!(render_window("HELLOWORLD", 4, 6), "ORLD");
        assert_eq!(render_window("HELLOWORLD", 4, 50), "ORLD");
    }

    #[test]
    fn cursor_dwells_before_scrolling() {
        let timing = ScrollTiming {
            hold_start: 2,
            hold_end: 0,
        };
        let mut cursor = ScrollCursor::new(timing);
        cursor.advance(10, 4, timing);
        cursor.advance(10, 4, timing);
        assert_eq!(cursor.offset, 0);
        assert_eq!(cursor.hold, 0);
        cursor.advance(10, 4, timing);
        assert_eq!(cursor.offset, 1);
    }

    #[test]
    fn cursor_dwells_at_end_then_wraps() {
        let timing = ScrollTiming {
            hold_start: 1,
            hold_end: 2,
        };
        let mut cursor = ScrollCursor::new(timing);
        cursor.advance(6, 4, timing); // dwell at start
        let mut seen = Vec::new();
        for _ in 0..5 {
            cursor.advance(6, 4, timing);
            seen.push(cursor.offset);
        }
        // 1, 2 scroll; 3, 4 dwell past the end; then wrap
        assert_eq!(seen, vec![1, 2, 3, 4, 0]);
        assert_eq!(cursor.hold, 1);
        assert_eq!(render_window("abcdef", 4, 4), "cdef");
    }

    #[test]
    fn cursor_returns_to_zero_after_full_span() {
        let timing = ScrollTiming {
            hold_start: 0,
            hold_end: 3,
        };
        let (len, width) = (25, 20);
        let mut cursor = ScrollCursor::new(timing);
        let span = len - width + 1 + timing.hold_end as usize;
        for step in 1..=span {
            cursor.advance(len, width, timing);
            if step < span {
                assert_ne!(cursor.offset, 0, "wrapped early at step {step}");
            }
        }
        assert_eq!(cursor.offset, 0);
    }

    #[test]
    fn fitting_text_never_scrolls() {
        let mut cursor = ScrollCursor::new(NO_DWELL);
        for _ in 0..10 {
            cursor.advance(4, 20, NO_DWELL);
        }
        assert_eq!(cursor.offset, 0);
    }
}
