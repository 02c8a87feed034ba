use std::time::{Duration, Instant};

/// Exponential reconnect delay between `initial` and `max`.
#[derive(Debug, Clone)]
pub struct BackoffController {
    initial: Duration,
    max: Duration,
    current: Duration,
    next_attempt: Option<Instant>,
}

impl BackoffController {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial = Duration::from_millis(initial_ms.max(1));
        let max = Duration::from_millis(max_ms.max(initial_ms.max(1)));
        Self {
            initial,
            max,
            current: initial,
            next_attempt: None,
        }
    }

    /// A connection attempt may be made at `now`.
    pub fn should_retry(&self, now: Instant) -> bool {
        self.next_attempt.map_or(true, |at| now >= at)
    }

    /// Schedule the next attempt and double the delay.
    pub fn mark_failure(&mut self, now: Instant) {
        self.next_attempt = Some(now + self.current);
        self.current = (self.current * 2).min(self.max);
    }

    pub fn mark_success(&mut self) {
        self.current = self.initial;
        self.next_attempt = None;
    }

    /// Delay that the next failure will schedule.
    pub fn current_delay(&self) -> Duration {
        self.current
    }

    pub fn time_until_retry(&self, now: Instant) -> Duration {
        self.next_attempt
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or_default()
    }
}
