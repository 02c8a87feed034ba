//! Transmit side of the frame codec.

use heapless::Vec;

use super::{is_reserved, END_MARKER, ESCAPE_MARKER, MAX_PROTOCOL_MESSAGE, START_MARKER};

/// Worst case: every body byte escaped, plus start, end and the reserved
/// terminator slot of the wire format.
pub const MAX_ENCODED_FRAME: usize = 2 * MAX_PROTOCOL_MESSAGE + 3;

/// A closed frame ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: Vec<u8, MAX_ENCODED_FRAME>,
    truncated: bool,
}

impl EncodedFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The message did not fit and was cut short; the frame is still closed.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Wrap `message` in markers, escaping reserved bytes.
///
/// At most [`MAX_PROTOCOL_MESSAGE`] body bytes are sent. A message cut
/// short never ends in a dangling escape.
pub fn encode_frame(message: &[u8]) -> EncodedFrame {
    // start + end + terminator slot
    const BODY_BUDGET: usize = MAX_ENCODED_FRAME - 3;

    let mut bytes: Vec<u8, MAX_ENCODED_FRAME> = Vec::new();
    let mut truncated = false;
    // Capacity covers the markers, so these pushes cannot fail.
    let _ = bytes.push(START_MARKER);

    for (sent, &byte) in message.iter().enumerate() {
        let escaped = is_reserved(byte);
        let needed = if escaped { 2 } else { 1 };
        if sent == MAX_PROTOCOL_MESSAGE || (bytes.len() - 1) + needed > BODY_BUDGET {
            truncated = true;
            break;
        }
        if escaped {
            let _ = bytes.push(ESCAPE_MARKER);
        }
        let _ = bytes.push(byte);
    }

    let _ = bytes.push(END_MARKER);
    EncodedFrame { bytes, truncated }
}

/// Convenience wrapper for text bodies.
pub fn encode_text(message: &str) -> EncodedFrame {
    encode_frame(message.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameReceiver;

    #[test]
    fn wraps_plain_body() {
        let frame = encode_text("002|OK");
        assert_eq!(frame.as_bytes(), b"<002|OK>");
        assert!(!frame.truncated());
    }

    #[test]
    fn escapes_reserved_bytes() {
        let frame = encode_text(r"a<b>c\d");
        assert_eq!(frame.as_bytes(), br"<a\<b\>c\\d>");
    }

    #[test]
    fn empty_message_is_a_closed_frame() {
        assert_eq!(encode_frame(b"").as_bytes(), b"<>");
    }

    #[test]
    fn worst_case_escaping_fits_without_truncation() {
        let body = [b'\\'; MAX_PROTOCOL_MESSAGE];
        let frame = encode_frame(&body);
        assert!(!frame.truncated());
        assert_eq!(frame.len(), 2 * MAX_PROTOCOL_MESSAGE + 2);
    }

    #[test]
    fn overlong_message_is_cut_but_closed() {
        let body = [b'<'; MAX_PROTOCOL_MESSAGE + 5];
        let frame = encode_frame(&body);
        assert!(frame.truncated());
        let bytes = frame.as_bytes();
        assert_eq!(bytes.first(), Some(&START_MARKER));
        assert_eq!(bytes.last(), Some(&END_MARKER));
        // the closing marker is never swallowed by an escape
        assert_ne!(bytes[bytes.len() - 2], ESCAPE_MARKER);

        let mut rx = FrameReceiver::new();
        rx.feed(bytes);
        let decoded = rx.take_frame().unwrap();
        assert_eq!(decoded.body.len(), MAX_PROTOCOL_MESSAGE);
        assert!(!decoded.truncated);
    }

    #[test]
    fn encoded_reply_decodes_back() {
        let frame = encode_text("101|12345|0.1.0");
        let mut rx = FrameReceiver::new();
        rx.feed(frame.as_bytes());
        assert_eq!(rx.take_frame().unwrap().as_bytes(), b"101|12345|0.1.0");
    }
}
