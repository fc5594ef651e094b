//! The suspense between announcing an action and revealing its result.

use std::time::Duration;

/// A fixed wait inserted into every action.
///
/// A zero duration returns immediately without touching the timer, which
/// keeps tests fast; tests that care about the timing use Tokio's paused
/// clock instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DramaticPause(Duration);

impl DramaticPause {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn none() -> Self {
        Self(Duration::ZERO)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub async fn wait(&self) {
        if self.0.is_zero() {
            return;
        }
        tokio::time::sleep(self.0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_duration() {
        let start = tokio::time::Instant::now();
        DramaticPause::new(Duration::from_secs(2)).wait().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_zero_returns_immediately() {
        let start = tokio::time::Instant::now();
        DramaticPause::none().wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
