//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds elapsed since `start`, saturating at `u64::MAX`
pub fn elapsed_millis(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_elapsed_millis_counts_sleep() {
        let start = Instant::now();
        std::thread::sleep(Duration::from_millis(15));
        assert!(elapsed_millis(start) >= 15);
    }

    #[test]
    fn test_elapsed_millis_fresh_instant_is_small() {
        let start = Instant::now();
        assert!(elapsed_millis(start) < 1_000);
    }
}
