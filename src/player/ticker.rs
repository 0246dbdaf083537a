use std::future::pending;
use std::time::Duration;

use log::trace;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Owned one-second tick source.
///
/// At most one interval exists at a time. It is armed and released through
/// [`sync`](Self::sync), and released for good when the ticker is dropped, so
/// no tick can outlive the session that owns it.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        assert!(!period.is_zero(), "tick period must be non-zero");
        Self {
            period,
            interval: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Arms the interval when ticks are wanted, releases it otherwise. An
    /// already-armed interval keeps its phase.
    pub fn sync(&mut self, active: bool) {
        match (active, self.interval.is_some()) {
            (true, false) => {
                let mut interval = interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.interval = Some(interval);
                trace!("ticker armed");
            }
            (false, true) => {
                self.interval = None;
                trace!("ticker released");
            }
            _ => {}
        }
    }

    /// Resolves on the next tick. Never resolves while disarmed.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn armed_ticker_fires() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        ticker.sync(true);
        assert!(ticker.is_armed());

        let fired = timeout(Duration::from_millis(500), ticker.tick()).await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn released_ticker_never_fires() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        ticker.sync(true);
        ticker.sync(false);
        assert!(!ticker.is_armed());

        let fired = timeout(Duration::from_millis(50), ticker.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn first_tick_waits_a_full_period() {
        let mut ticker = Ticker::new(Duration::from_millis(200));
        ticker.sync(true);

        let early = timeout(Duration::from_millis(50), ticker.tick()).await;
        assert!(early.is_err());
    }
}
