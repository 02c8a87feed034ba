//! Maps a decoded message to its effect and reply.

use crate::{
    display::DisplayBank,
    peripherals::{play_failure, play_success, rtc, Buzzer, ToneProfile, WallClock},
    protocol::{Command, LineId, ProtocolMessage, Reply},
    Result,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the control loop must do after a message was handled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    pub reply: Option<Reply>,
    /// Row to render at once, skipping the refresh gate.
    pub refresh_row: Option<LineId>,
}

impl Outcome {
    fn ack() -> Self {
        Self {
            reply: Some(Reply::Ack),
            refresh_row: None,
        }
    }
}

/// Run `msg` against the display state and peripherals.
///
/// Unknown codes do nothing and get no reply. An `Err` means the command
/// failed part way; nothing is sent back in that case.
pub fn dispatch<B, C>(
    msg: &ProtocolMessage,
    now_ms: u64,
    bank: &mut DisplayBank,
    buzzer: &mut B,
    clock: &mut C,
    tones: &ToneProfile,
) -> Result<Outcome>
where
    B: Buzzer + ?Sized,
    C: WallClock + ?Sized,
{
    match Command::from_code(msg.code) {
        Command::Ping => Ok(Outcome {
            reply: Some(Reply::Pong {
                uptime_ms: now_ms,
                version: VERSION,
            }),
            refresh_row: None,
        }),
        Command::SetLine(id) => {
            bank.set_line(id, &msg.text, msg.ttl_ms, now_ms);
            Ok(Outcome {
                reply: Some(Reply::Ack),
                refresh_row: Some(id),
            })
        }
        Command::SuccessTone => {
            play_success(buzzer, tones)?;
            Ok(Outcome::ack())
        }
        Command::FailTone => {
            play_failure(buzzer, tones)?;
            Ok(Outcome::ack())
        }
        Command::SetTime => {
            let when = rtc::parse_set_time(&msg.text)?;
            clock.set(when)?;
            Ok(Outcome::ack())
        }
        Command::GetTime => Ok(Outcome {
            reply: Some(Reply::Time {
                stamp: rtc::format_reply_time(clock.now()),
                temperature_c: clock.temperature_c(),
            }),
            refresh_row: None,
        }),
        Command::Unknown(_) => Ok(Outcome::default()),
    }
}
