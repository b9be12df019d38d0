//! Minimum spacing between request starts.
use pinscrape_common::tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};
use std::{sync::Arc, time::Duration};

/// Fixed-delay throttle. Clones share the same schedule.
///
/// The schedule sits behind tokio's FIFO mutex, so pipelines sharing one throttle
/// take turns in the order they asked and the aggregate rate stays under the ceiling.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    #[inline]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a request may start and reserves the following slot.
    pub async fn acquire(&self) {
        let mut slot = self.next_slot.lock().await;

        if let Some(at) = *slot {
            if at > Instant::now() {
                sleep_until(at).await;
            }
        }

        *slot = Some(Instant::now() + self.min_interval);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_out_requests() {
        let throttle = Throttle::new(Duration::from_millis(750));
        let start = Instant::now();

        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        throttle.acquire().await;
        throttle.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_the_schedule() {
        let first = Throttle::new(Duration::from_millis(500));
        let second = first.clone();
        let start = Instant::now();

        first.acquire().await;
        second.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_waits() {
        let throttle = Throttle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            throttle.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
