//! Fixed-gap request pacing.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval};

/// Releases one token per interval.
///
/// The first token comes one interval after construction, so even the
/// first request of a run is spaced from whatever ran before it. Every
/// later token comes a full interval after it was asked for, however long
/// the work in between took. A zero period disables pacing.
pub struct Pacer {
    interval: Option<Interval>,
    issued: bool,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        let interval = (!period.is_zero()).then(|| interval_at(Instant::now() + period, period));
        Self {
            interval,
            issued: false,
        }
    }

    /// Wait for the next token.
    pub async fn ready(&mut self) {
        let Some(interval) = self.interval.as_mut() else {
            return;
        };
        if self.issued {
            interval.reset();
        }
        interval.tick().await;
        self.issued = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_token_waits_one_interval() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::from_millis(3000));

        pacer.ready().await;
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_are_spaced_by_the_period() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::from_millis(100));

        for _ in 0..3 {
            pacer.ready().await;
        }
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_work_still_gets_a_full_gap() {
        let mut pacer = Pacer::new(Duration::from_millis(100));
        pacer.ready().await;

        tokio::time::sleep(Duration::from_millis(350)).await;
        let after_slow = Instant::now();
        pacer.ready().await;
        assert_eq!(after_slow.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn work_shorter_than_the_period_is_padded_from_the_request() {
        let mut pacer = Pacer::new(Duration::from_millis(100));
        pacer.ready().await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        let asked = Instant::now();
        pacer.ready().await;
        assert_eq!(asked.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_never_waits() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::ZERO);
        pacer.ready().await;
        pacer.ready().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
