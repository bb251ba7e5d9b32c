use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

/// Tells the queue manager when server state may have changed.
#[async_trait]
pub trait ChangeSource: Send {
    /// Resolves on the next hint; `None` when the source has closed for good.
    async fn next_change(&mut self) -> Option<()>;
}

/// Fixed-period polling. Ticks missed while a poll runs are skipped, not queued.
pub struct IntervalSource {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalSource {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            interval: None,
        }
    }
}

#[async_trait]
impl ChangeSource for IntervalSource {
    async fn next_change(&mut self) -> Option<()> {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;
        Some(())
    }
}

/// Push-driven source: whoever holds the sender decides when to reconcile.
pub struct NotifySource {
    rx: mpsc::Receiver<()>,
}

impl NotifySource {
    pub fn channel(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl ChangeSource for NotifySource {
    async fn next_change(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}
