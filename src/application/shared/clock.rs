use crate::domain::value_objects::timestamps::Timestamp;
use time::Duration;
use tokio::time::Instant;

/// Source of "now" for everything that stamps or compares job times.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now_utc()
    }
}

/// Wall time anchored at construction and advanced by tokio's clock,
/// so paused-time tests see deferrals and stalls expire.
pub struct TokioClock {
    anchor_wall: Timestamp,
    anchor_instant: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            anchor_wall: Timestamp::now_utc(),
            anchor_instant: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        let elapsed = self.anchor_instant.elapsed();
        let elapsed = Duration::try_from(elapsed).unwrap_or(Duration::MAX);
        self.anchor_wall.plus(elapsed)
    }
}
