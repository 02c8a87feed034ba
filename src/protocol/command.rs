use std::fmt::Write as _;

use super::{encode::encode_text, EncodedFrame, FIELD_DELIMITER};

pub const CODE_PING: i32 = 100;
pub const CODE_SET_LINE0: i32 = 200;
pub const CODE_SET_LINE1: i32 = 300;
pub const CODE_SET_LINE2: i32 = 400;
pub const CODE_SET_LINE3: i32 = 500;
pub const CODE_SUCCESS_TONE: i32 = 600;
pub const CODE_FAIL_TONE: i32 = 601;
pub const CODE_SET_TIME: i32 = 700;
pub const CODE_GET_TIME: i32 = 701;

pub const REPLY_ACK: &str = "002";
pub const REPLY_PONG: &str = "101";
pub const REPLY_TIME: &str = "702";

/// One of the four display rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineId {
    /// Time banner.
    Line0,
    /// Lecture title.
    Line1,
    /// Speaker.
    Line2,
    /// Attendee.
    Line3,
}

impl LineId {
    pub const ALL: [LineId; 4] = [LineId::Line0, LineId::Line1, LineId::Line2, LineId::Line3];

    pub fn index(self) -> usize {
        match self {
            LineId::Line0 => 0,
            LineId::Line1 => 1,
            LineId::Line2 => 2,
            LineId::Line3 => 3,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

/// Inbound command selected by a message code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    SetLine(LineId),
    SuccessTone,
    FailTone,
    SetTime,
    GetTime,
    Unknown(i32),
}

impl Command {
    pub fn from_code(code: i32) -> Self {
        match code {
            CODE_PING => Command::Ping,
            CODE_SET_LINE0 => Command::SetLine(LineId::Line0),
            CODE_SET_LINE1 => Command::SetLine(LineId::Line1),
            CODE_SET_LINE2 => Command::SetLine(LineId::Line2),
            CODE_SET_LINE3 => Command::SetLine(LineId::Line3),
            CODE_SUCCESS_TONE => Command::SuccessTone,
            CODE_FAIL_TONE => Command::FailTone,
            CODE_SET_TIME => Command::SetTime,
            CODE_GET_TIME => Command::GetTime,
            other => Command::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::SetLine(_) => "set_line",
            Command::SuccessTone => "success_tone",
            Command::FailTone => "fail_tone",
            Command::SetTime => "set_time",
            Command::GetTime => "get_time",
            Command::Unknown(_) => "unknown",
        }
    }
}

/// Outbound reply to the master.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Generic acknowledgement of a state-changing command.
    Ack,
    Pong {
        uptime_ms: u64,
        version: &'static str,
    },
    Time {
        /// `DD/MM/YYYY hh:mm:ss`
        stamp: String,
        temperature_c: Option<f32>,
    },
}

impl Reply {
    /// Body text before framing.
    pub fn body(&self) -> String {
        let d = FIELD_DELIMITER;
        let mut out = String::new();
        match self {
            Reply::Ack => {
                let _ = write!(out, "{REPLY_ACK}{d}OK");
            }
            Reply::Pong { uptime_ms, version } => {
                let _ = write!(out, "{REPLY_PONG}{d}{uptime_ms}{d}{version}");
            }
            Reply::Time {
                stamp,
                temperature_c,
            } => {
                let _ = write!(out, "{REPLY_TIME}{d}{stamp}{d}");
                match temperature_c {
                    Some(t) => {
                        let _ = write!(out, "{t:.1}");
                    }
                    None => out.push_str("--"),
                }
            }
        }
        out
    }

    pub fn encode(&self) -> EncodedFrame {
        encode_text(&self.body())
    }
}
