use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::trace;

use crate::utils::clock::Clock;

pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

/// Requests redraw callbacks for a running timer. At most one callback is pending at a time;
/// scheduling a new one replaces the previous request.
pub trait TickScheduler: Send + 'static {
    fn schedule_next(&mut self, callback: FrameCallback);

    /// Drops the pending callback, if any. Must be synchronous: once this returns the callback
    /// will never run.
    fn cancel(&mut self);
}

/// Frame scheduler backed by a tokio task that sleeps for one frame interval. Requires a
/// running tokio runtime.
pub struct TokioTickScheduler {
    clock: Arc<dyn Clock>,
    frame_interval: Duration,
    pending: Option<JoinHandle<()>>,
}

impl TokioTickScheduler {
    pub fn new(clock: Arc<dyn Clock>, frame_interval: Duration) -> Self {
        Self {
            clock,
            frame_interval,
            pending: None,
        }
    }
}

impl TickScheduler for TokioTickScheduler {
    fn schedule_next(&mut self, callback: FrameCallback) {
        // The previous task is either finished or is the one calling us right now. Detaching it
        // is enough, it has nothing left to await.
        let clock = self.clock.clone();
        let frame_interval = self.frame_interval;
        self.pending = Some(tokio::spawn(async move {
            clock.sleep(frame_interval).await;
            callback();
        }));
    }

    fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            trace!("Cancelling pending frame");
            pending.abort();
        }
    }
}

impl Drop for TokioTickScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler that keeps the pending callback until [ManualFrames::fire] is called. Lets a
/// caller step frames by hand, together with [ManualClock](crate::utils::clock::ManualClock).
pub struct ManualTickScheduler {
    slot: Arc<Mutex<Option<FrameCallback>>>,
}

/// Handle to the frames requested from a [ManualTickScheduler].
#[derive(Clone)]
pub struct ManualFrames {
    slot: Arc<Mutex<Option<FrameCallback>>>,
}

impl ManualTickScheduler {
    pub fn new() -> (Self, ManualFrames) {
        let slot = Arc::new(Mutex::new(None));
        (Self { slot: slot.clone() }, ManualFrames { slot })
    }
}

impl TickScheduler for ManualTickScheduler {
    fn schedule_next(&mut self, callback: FrameCallback) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn cancel(&mut self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl ManualFrames {
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Runs the pending callback. Returns `false` when nothing was scheduled.
    pub fn fire(&self) -> bool {
        // Taken out first so the callback is free to schedule the next frame.
        let callback = self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use super::{ManualTickScheduler, TickScheduler, TokioTickScheduler};
    use crate::utils::clock::DefaultClock;

    #[test]
    fn test_manual_scheduler_fire_and_cancel() {
        let (mut scheduler, frames) = ManualTickScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        scheduler.schedule_next(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(frames.is_pending());
        assert!(frames.fire());
        assert!(!frames.fire());

        let counter = hits.clone();
        scheduler.schedule_next(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        scheduler.cancel();
        assert!(!frames.fire());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_runs_after_interval() {
        let mut scheduler =
            TokioTickScheduler::new(Arc::new(DefaultClock), Duration::from_millis(16));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        scheduler.schedule_next(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let mut scheduler =
            TokioTickScheduler::new(Arc::new(DefaultClock), Duration::from_millis(16));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        scheduler.schedule_next(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        scheduler.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
