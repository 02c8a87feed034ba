use std::fmt;

use super::{accent, FIELD_DELIMITER, MAX_STRING};

/// Bounded text carried by a message or held by a display line.
pub type MessageText = heapless::String<MAX_STRING>;

/// Application message decoded from one frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    pub code: i32,
    pub text: MessageText,
    pub ttl_ms: u32,
    /// The text was longer than [`MAX_STRING`] and was cut.
    pub truncated: bool,
}

/// A frame body that cannot become a [`ProtocolMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    /// Fewer than the three `code|text|ttl` fields were present.
    MissingFields { found: usize },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::MissingFields { found } => {
                write!(f, "expected 3 fields, found {found}")
            }
        }
    }
}

impl std::error::Error for MessageError {}

/// Split a decoded body into `code|text|ttl`.
///
/// Accents are folded first. The code runs up to the first delimiter and
/// the ttl starts after the last one, so the text keeps any delimiters of
/// its own. Numeric fields never fail: unparsable input reads as 0.
pub fn parse_message(body: &[u8]) -> Result<ProtocolMessage, MessageError> {
    let folded = accent::fold_to_string(body);

    let Some((code, rest)) = folded.split_once(FIELD_DELIMITER) else {
        return Err(MessageError::MissingFields { found: 1 });
    };
    let Some((text, ttl)) = rest.rsplit_once(FIELD_DELIMITER) else {
        return Err(MessageError::MissingFields { found: 2 });
    };

    let (text, truncated) = bounded_text(text);
    let code = lenient_int(code).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    let ttl_ms = lenient_int(ttl).clamp(0, u32::MAX as i64) as u32;

    Ok(ProtocolMessage {
        code,
        text,
        ttl_ms,
        truncated,
    })
}

/// Copy `raw` into bounded storage, dropping whatever does not fit.
pub fn bounded_text(raw: &str) -> (MessageText, bool) {
    let mut text = MessageText::new();
    for ch in raw.chars() {
        if text.push(ch).is_err() {
            return (text, true);
        }
    }
    (text, false)
}

/// C `atoi`-style parse: optional leading whitespace and sign, then as many
/// digits as there are. No digits yields 0; overflow saturates.
pub fn lenient_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    if negative {
        -value
    } else {
        value
    }
}
