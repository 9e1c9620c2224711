use std::time::{Duration, Instant};

/// Token bucket per connection. A tic-tac-toe client has no legitimate
/// reason to send more than a handful of messages per second.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::new_with_limits(20, Duration::from_secs(1))
    }

    pub fn new_with_limits(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_interval,
            last_refill: Instant::now(),
        }
    }

    pub async fn check_rate_limit(&mut self) -> bool {
        self.refill();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        if elapsed >= self.refill_interval {
            let intervals = (elapsed.as_millis() / self.refill_interval.as_millis()) as u32;
            self.tokens = (self.tokens + intervals).min(self.max_tokens);
            self.last_refill = Instant::now();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_drains_and_rejects() {
        let mut limiter = RateLimiter::new_with_limits(3, Duration::from_secs(60));

        assert!(limiter.check_rate_limit().await);
        assert!(limiter.check_rate_limit().await);
        assert!(limiter.check_rate_limit().await);
        assert!(!limiter.check_rate_limit().await);
    }

    #[tokio::test]
    async fn test_bucket_refills() {
        let mut limiter = RateLimiter::new_with_limits(1, Duration::from_millis(10));

        assert!(limiter.check_rate_limit().await);
        assert!(!limiter.check_rate_limit().await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(limiter.check_rate_limit().await);
    }
}
