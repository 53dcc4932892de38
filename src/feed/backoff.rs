use std::time::{Duration, Instant};

/// Exponential reconnect delay: `base * 2^attempt`, capped at `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            max: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Sleeps for `delay` in short slices, returning false early if `stop` turns true.
    pub(super) fn sleep_unless(&self, delay: Duration, stop: impl Fn() -> bool) -> bool {
        const SLICE: Duration = Duration::from_millis(25);
        let deadline = Instant::now() + delay;
        loop {
            if stop() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }
}
