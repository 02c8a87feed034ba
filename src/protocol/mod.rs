//! Framed serial protocol spoken with the master device.
//!
//! ```text
//! <  code | text | ttl  >
//! ```
//!
//! `<`, `>` and `\` are reserved; inside a frame they travel as `\<`, `\>`
//! and `\\`. The body holds three `|`-separated fields: a numeric command
//! code, free text (Windows-1252, folded to ASCII on receipt) and a
//! time-to-live in milliseconds.

pub mod accent;
pub mod command;
pub mod encode;
pub mod frame;
pub mod message;

pub use command::{Command, LineId, Reply};
pub use encode::{encode_frame, encode_text, EncodedFrame, MAX_ENCODED_FRAME};
pub use frame::{transition, DecodedFrame, FrameReceiver, RxAction, RxState};
pub use message::{parse_message, MessageError, MessageText, ProtocolMessage};

pub const START_MARKER: u8 = b'<';
pub const END_MARKER: u8 = b'>';
pub const ESCAPE_MARKER: u8 = b'\\';
pub const FIELD_DELIMITER: char = '|';

/// Longest text a single display message may carry.
pub const MAX_STRING: usize = 80;
/// Decoded body capacity: a full-length text plus `ddd|` and `|<u32 ttl>`.
pub const MAX_PROTOCOL_MESSAGE: usize = MAX_STRING + 16;

pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, START_MARKER | END_MARKER | ESCAPE_MARKER)
}
