use std::sync::Mutex;

use tokio::time::{sleep_until, Duration, Instant};

/// Minimum-interval throttle shared by every outbound geocode request,
/// retries included. `max_qps <= 0` disables throttling.
pub struct RateLimiter {
    min_interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(max_qps: f64) -> Self {
        let min_interval =
            (max_qps > 0.0).then(|| Duration::from_secs_f64(1.0 / max_qps));
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next request slot. Slots are spaced `1/max_qps` apart
    /// relative to the previous claimed slot, serializing external calls.
    pub async fn wait(&self) {
        let Some(interval) = self.min_interval else {
            return;
        };
        let target = {
            let mut slot = self.next_slot.lock().unwrap();
            let now = Instant::now();
            let target = match *slot {
                Some(t) if t > now => t,
                _ => now,
            };
            *slot = Some(target + interval);
            target
        };
        sleep_until(target).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn four_calls_at_two_qps_take_at_least_1500ms() {
        let limiter = RateLimiter::new(2.0);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_qps_never_waits() {
        let limiter = RateLimiter::new(0.0);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.wait().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
