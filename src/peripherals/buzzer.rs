use std::thread;
use std::time::{Duration, Instant};

use crate::Result;

pub const DEFAULT_SUCCESS_HZ: u32 = 2_000;
pub const DEFAULT_FAIL_HZ: u32 = 400;
pub const DEFAULT_TONE_MS: u64 = 150;
pub const DEFAULT_FAIL_GAP_MS: u64 = 200;

/// Something that can beep.
pub trait Buzzer {
    /// Start a tone and return without waiting for it to end.
    fn tone(&mut self, freq_hz: u32, duration: Duration) -> Result<()>;

    /// Stop whatever is sounding now.
    fn silence(&mut self) -> Result<()>;

    /// Silence a tone whose duration has run out. Called every loop pass.
    fn service(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Buzzer + ?Sized> Buzzer for Box<T> {
    fn tone(&mut self, freq_hz: u32, duration: Duration) -> Result<()> {
        (**self).tone(freq_hz, duration)
    }

    fn silence(&mut self) -> Result<()> {
        (**self).silence()
    }

    fn service(&mut self) -> Result<()> {
        (**self).service()
    }
}

/// Frequencies and timings of the two feedback patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneProfile {
    pub success_hz: u32,
    pub fail_hz: u32,
    pub tone_ms: u64,
    pub fail_gap_ms: u64,
}

impl Default for ToneProfile {
    fn default() -> Self {
        Self {
            success_hz: DEFAULT_SUCCESS_HZ,
            fail_hz: DEFAULT_FAIL_HZ,
            tone_ms: DEFAULT_TONE_MS,
            fail_gap_ms: DEFAULT_FAIL_GAP_MS,
        }
    }
}

pub fn play_success<B: Buzzer + ?Sized>(buzzer: &mut B, profile: &ToneProfile) -> Result<()> {
    buzzer.tone(profile.success_hz, Duration::from_millis(profile.tone_ms))
}

/// Two low tones whose starts are `fail_gap_ms` apart.
///
/// The caller is blocked for the whole gap. The first tone is cut at
/// `tone_ms` or at the gap, whichever comes first, so the pair never
/// merges into one long beep.
pub fn play_failure<B: Buzzer + ?Sized>(buzzer: &mut B, profile: &ToneProfile) -> Result<()> {
    let duration = Duration::from_millis(profile.tone_ms);
    let gap = Duration::from_millis(profile.fail_gap_ms);
    let sounding = duration.min(gap);

    buzzer.tone(profile.fail_hz, duration)?;
    thread::sleep(sounding);
    buzzer.silence()?;
    thread::sleep(gap - sounding);
    buzzer.tone(profile.fail_hz, duration)
}

/// No hardware attached; every call succeeds and nothing happens.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBuzzer;

impl SilentBuzzer {
    pub fn new() -> Self {
        Self
    }
}

impl Buzzer for SilentBuzzer {
    fn tone(&mut self, _freq_hz: u32, _duration: Duration) -> Result<()> {
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        Ok(())
    }
}

/// What a [`RecordingBuzzer`] was told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneEvent {
    Start { freq_hz: u32, duration: Duration },
    Stop,
}

/// Test double that timestamps every start and stop.
#[derive(Debug, Default, Clone)]
pub struct RecordingBuzzer {
    events: Vec<(Instant, ToneEvent)>,
}

impl RecordingBuzzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(Instant, ToneEvent)] {
        &self.events
    }

    /// Frequency and length of every tone started, in order.
    pub fn played(&self) -> Vec<(u32, Duration)> {
        self.events
            .iter()
            .filter_map(|(_, event)| match *event {
                ToneEvent::Start { freq_hz, duration } => Some((freq_hz, duration)),
                ToneEvent::Stop => None,
            })
            .collect()
    }
}

impl Buzzer for RecordingBuzzer {
    fn tone(&mut self, freq_hz: u32, duration: Duration) -> Result<()> {
        self.events
            .push((Instant::now(), ToneEvent::Start { freq_hz, duration }));
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        self.events.push((Instant::now(), ToneEvent::Stop));
        Ok(())
    }
}

/// Piezo on a GPIO pin, driven with rppal software PWM.
#[cfg(target_os = "linux")]
pub struct GpioBuzzer {
    pin: rppal::gpio::OutputPin,
    stop_at: Option<Instant>,
}

#[cfg(target_os = "linux")]
fn map_gpio_err(err: rppal::gpio::Error) -> crate::Error {
    crate::Error::Io(std::io::Error::other(err.to_string()))
}

#[cfg(target_os = "linux")]
impl GpioBuzzer {
    /// `bcm_pin` uses Broadcom numbering.
    pub fn new(bcm_pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(map_gpio_err)?;
        let mut pin = gpio.get(bcm_pin).map_err(map_gpio_err)?.into_output_low();
        pin.set_reset_on_drop(true);
        Ok(Self { pin, stop_at: None })
    }
}

#[cfg(target_os = "linux")]
impl Buzzer for GpioBuzzer {
    fn tone(&mut self, freq_hz: u32, duration: Duration) -> Result<()> {
        if freq_hz == 0 || duration.is_zero() {
            return self.silence();
        }
        self.pin
            .set_pwm_frequency(freq_hz as f64, 0.5)
            .map_err(map_gpio_err)?;
        self.stop_at = Some(Instant::now() + duration);
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        self.pin.clear_pwm().map_err(map_gpio_err)?;
        self.pin.set_low();
        self.stop_at = None;
        Ok(())
    }

    fn service(&mut self) -> Result<()> {
        if tone_expired(self.stop_at, Instant::now()) {
            self.silence()?;
        }
        Ok(())
    }
}

/// Stand-in for non-Linux dev hosts.
#[cfg(not(target_os = "linux"))]
pub struct GpioBuzzer;

#[cfg(not(target_os = "linux"))]
impl GpioBuzzer {
    pub fn new(_bcm_pin: u8) -> Result<Self> {
        Err(crate::Error::InvalidArgs(
            "GPIO is only available on Linux targets".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl Buzzer for GpioBuzzer {
    fn tone(&mut self, _freq_hz: u32, _duration: Duration) -> Result<()> {
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        Ok(())
    }
}

fn tone_expired(stop_at: Option<Instant>, now: Instant) -> bool {
    matches!(stop_at, Some(deadline) if now >= deadline)
}
