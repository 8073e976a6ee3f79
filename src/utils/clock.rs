use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing time across application. The timer reads
/// [Clock::instant] which is monotonic, while stored records are stamped with [Clock::time].
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when told to. Both the wall time and the monotonic instant advance
/// together, and [Clock::sleep] advances virtual time instead of waiting.
pub struct ManualClock {
    start_time: DateTime<Utc>,
    reference: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            reference: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += duration;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn time(&self) -> DateTime<Utc> {
        self.start_time + self.offset()
    }

    fn instant(&self) -> Instant {
        self.reference + self.offset()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
