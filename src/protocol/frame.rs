//! Receive side of the frame codec.
//!
//! The receiver is driven with whatever bytes the link has right now and
//! keeps its state between calls, so a frame may arrive over any number of
//! reads. Frames are delimiter-terminated, never length-prefixed.

use heapless::Vec;

use super::{END_MARKER, ESCAPE_MARKER, MAX_PROTOCOL_MESSAGE, START_MARKER};

/// Receiver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Waiting for a start marker; everything else is line noise.
    Idle,
    /// Inside a frame, accumulating body bytes.
    Receiving,
    /// The previous byte was an escape marker.
    Escaped,
    /// An end marker closed the frame; the body waits to be taken.
    Complete,
}

/// What the receiver must do with its buffer after one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxAction {
    /// Drop the byte.
    Discard,
    /// Empty the buffer; a new frame begins.
    Restart,
    /// Store the byte in the body.
    Append(u8),
    /// The body is finished.
    Finish,
}

/// Pure transition function of the receive state machine.
pub fn transition(state: RxState, byte: u8) -> (RxState, RxAction) {
    match (state, byte) {
        (RxState::Idle, START_MARKER) => (RxState::Receiving, RxAction::Restart),
        (RxState::Idle, _) => (RxState::Idle, RxAction::Discard),

        (RxState::Receiving, START_MARKER) => (RxState::Receiving, RxAction::Restart),
        (RxState::Receiving, END_MARKER) => (RxState::Complete, RxAction::Finish),
        (RxState::Receiving, ESCAPE_MARKER) => (RxState::Escaped, RxAction::Discard),
        (RxState::Receiving, other) => (RxState::Receiving, RxAction::Append(other)),

        (RxState::Escaped, START_MARKER | END_MARKER | ESCAPE_MARKER) => {
            (RxState::Receiving, RxAction::Append(byte))
        }
        // Invalid escape sequence: both bytes are lost.
        (RxState::Escaped, _) => (RxState::Receiving, RxAction::Discard),

        (RxState::Complete, START_MARKER) => (RxState::Receiving, RxAction::Restart),
        (RxState::Complete, _) => (RxState::Complete, RxAction::Discard),
    }
}

/// A frame body handed out by [`FrameReceiver::take_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub body: Vec<u8, MAX_PROTOCOL_MESSAGE>,
    /// Body bytes were dropped because the frame exceeded capacity.
    pub truncated: bool,
}

impl DecodedFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Byte-at-a-time frame decoder with a bounded body buffer.
#[derive(Debug, Clone)]
pub struct FrameReceiver {
    state: RxState,
    body: Vec<u8, MAX_PROTOCOL_MESSAGE>,
    truncated: bool,
    timeout_ms: Option<u64>,
    last_byte_ms: u64,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    /// A receiver that waits forever for a frame to close.
    pub fn new() -> Self {
        Self {
            state: RxState::Idle,
            body: Vec::new(),
            truncated: false,
            timeout_ms: None,
            last_byte_ms: 0,
        }
    }

    /// A receiver that abandons a partial frame after `timeout_ms` of silence.
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms: Some(timeout_ms).filter(|ms| *ms > 0),
            ..Self::new()
        }
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == RxState::Complete
    }

    /// Bytes accumulated so far for the frame in progress.
    pub fn pending(&self) -> &[u8] {
        &self.body
    }

    pub fn reset(&mut self) {
        self.state = RxState::Idle;
        self.body.clear();
        self.truncated = false;
    }

    /// Apply one byte and return the resulting state.
    pub fn push(&mut self, byte: u8) -> RxState {
        let (next, action) = transition(self.state, byte);
        match action {
            RxAction::Discard | RxAction::Finish => {}
            RxAction::Restart => {
                self.body.clear();
                self.truncated = false;
            }
            RxAction::Append(b) => {
                if self.body.push(b).is_err() {
                    self.truncated = true;
                }
            }
        }
        self.state = next;
        next
    }

    /// Feed bytes until a frame completes or the input runs out.
    ///
    /// Returns how many bytes were consumed. Once a frame is complete no
    /// further bytes are taken, so the caller keeps the rest for after
    /// [`take_frame`](Self::take_frame).
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let mut consumed = 0;
        for &byte in bytes {
            if self.is_complete() {
                break;
            }
            self.push(byte);
            consumed += 1;
        }
        consumed
    }

    /// Like [`feed`](Self::feed), also recording `now_ms` as the arrival
    /// time for the partial-frame timeout.
    pub fn feed_at(&mut self, bytes: &[u8], now_ms: u64) -> usize {
        let consumed = self.feed(bytes);
        if consumed > 0 {
            self.last_byte_ms = now_ms;
        }
        consumed
    }

    /// Drop a partial frame whose sender went quiet for longer than the
    /// configured timeout. Returns `true` when a frame was abandoned.
    pub fn expire_stale(&mut self, now_ms: u64) -> bool {
        let Some(timeout) = self.timeout_ms else {
            return false;
        };
        let in_frame = matches!(self.state, RxState::Receiving | RxState::Escaped);
        if in_frame && now_ms.saturating_sub(self.last_byte_ms) > timeout {
            self.reset();
            return true;
        }
        false
    }

    /// Hand out the completed body and return to `Idle`.
    pub fn take_frame(&mut self) -> Option<DecodedFrame> {
        if !self.is_complete() {
            return None;
        }
        let frame = DecodedFrame {
            body: core::mem::take(&mut self.body),
            truncated: self.truncated,
        };
        self.reset();
        Some(frame)
    }
}
