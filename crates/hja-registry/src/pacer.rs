//! Minimum spacing between outgoing registry requests.
//!
//! The lock only guards slot assignment; callers sleep after releasing it,
//! so a slow remote call never blocks another caller's reservation.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// A pacer that never waits.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next send slot and sleep until it arrives.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consecutive_waits_are_spaced() {
        let pacer = RequestPacer::new(Duration::from_millis(500));
        let start = Instant::now();

        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(500));

        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_gap_resets_spacing() {
        let pacer = RequestPacer::new(Duration::from_millis(100));
        pacer.wait().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = Instant::now();
        pacer.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn unpaced_never_waits() {
        let pacer = RequestPacer::unpaced();
        for _ in 0..100 {
            pacer.wait().await;
        }
        assert!(pacer.interval().is_zero());
    }
}
