//! Display state and rendering.
//!
//! `viewport` turns a line of text into exactly one row's worth of chars,
//! `bank` holds the four lines with their timed messages, and `sink` is the
//! seam to whatever actually shows the rows.

pub mod bank;
pub mod lcd;
pub mod sink;
pub mod viewport;

pub use bank::{DisplayBank, DisplayLine, RefreshGate, RowCache, LINE_COUNT};
pub use lcd::{show_banner, Lcd, BOOT_MESSAGE, SHUTDOWN_MESSAGE};
pub use sink::{MemoryDisplay, TextDisplay};
pub use viewport::{render_window, ScrollCursor, ScrollTiming};
