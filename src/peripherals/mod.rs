pub mod buzzer;
pub mod rtc;

pub use buzzer::{
    play_failure, play_success, Buzzer, GpioBuzzer, RecordingBuzzer, SilentBuzzer, ToneEvent,
    ToneProfile,
};
pub use rtc::{FixedClock, SystemRtc, WallClock};
