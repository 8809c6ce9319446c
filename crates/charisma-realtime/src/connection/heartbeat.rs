//! Heartbeat timer for stream sessions.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Ticker whose first tick fires one `period` from now.
///
/// Missed ticks are delayed rather than bursted, so a slow client never
/// receives a run of back-to-back heartbeats.
pub fn ticker(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let start = Instant::now();
        let mut ticker = ticker(Duration::from_secs(30));
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }
}
