//! Stopwatch style time tracking.
//!
//! [TimerEngine] wraps a pure [TimerState] with the collaborators it needs: a [Clock] for the
//! monotonic now, a [TickScheduler] that requests redraws while running and an [IdGenerator]
//! for laps. Displayed time is always re-derived from the clock, frames only decide *when* it is
//! observed.

pub mod keys;
pub mod scheduler;
pub mod session;
pub mod state;

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use scheduler::TickScheduler;
use state::{Lap, Phase, TimerState};
use tracing::{debug, trace};

use crate::utils::{clock::Clock, ids::IdGenerator};

pub type FrameObserver = Box<dyn FnMut(Duration) + Send + 'static>;

struct EngineInner {
    state: TimerState,
    clock: Arc<dyn Clock>,
    scheduler: Box<dyn TickScheduler>,
    ids: Arc<dyn IdGenerator>,
    observer: Option<FrameObserver>,
    /// Bumped on every transition so that a frame requested before it is ignored.
    generation: u64,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.scheduler.cancel();
    }
}

/// Handle to a timer session. Clones share the same state; once the last clone is dropped the
/// pending frame is cancelled.
#[derive(Clone)]
pub struct TimerEngine {
    inner: Arc<Mutex<EngineInner>>,
}

impl TimerEngine {
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Box<dyn TickScheduler>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                state: TimerState::new(),
                clock,
                scheduler,
                ids,
                observer: None,
                generation: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the function receiving the elapsed time on every frame while running.
    pub fn set_frame_observer(&self, observer: impl FnMut(Duration) + Send + 'static) {
        self.lock().observer = Some(Box::new(observer));
    }

    pub fn start(&self) {
        let mut inner = self.lock();
        let now = inner.clock.instant();
        if inner.state.start(now) {
            debug!("Timer started");
            inner.generation += 1;
            schedule_frame(&mut inner, Arc::downgrade(&self.inner));
        }
    }

    pub fn pause(&self) {
        let mut inner = self.lock();
        let now = inner.clock.instant();
        if inner.state.pause(now) {
            debug!("Timer paused at {}ms", inner.state.accumulated_ms());
            inner.generation += 1;
            inner.scheduler.cancel();
        }
    }

    /// Same as [TimerEngine::pause]. Stopping doesn't produce a time entry.
    pub fn stop(&self) {
        self.pause();
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state.reset();
        inner.generation += 1;
        inner.scheduler.cancel();
        debug!("Timer reset");
    }

    /// Marks a lap. Ignored unless running.
    pub fn add_lap(&self) -> Option<Lap> {
        let mut inner = self.lock();
        if !inner.state.is_running() {
            trace!("Ignoring lap outside of a running timer");
            return None;
        }
        let now = inner.clock.instant();
        let id = inner.ids.next_id();
        let lap = inner.state.add_lap(now, id).cloned();
        if let Some(lap) = &lap {
            debug!("Lap {} at {}ms (+{}ms)", lap.id, lap.at_ms, lap.delta_ms);
        }
        lap
    }

    pub fn annotate_lap(&self, id: &str, note: Option<String>) -> bool {
        self.lock().state.annotate_lap(id, note)
    }

    pub fn elapsed(&self) -> Duration {
        let inner = self.lock();
        inner.state.elapsed(inner.clock.instant())
    }

    pub fn elapsed_ms(&self) -> u64 {
        let inner = self.lock();
        inner.state.elapsed_ms(inner.clock.instant())
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase()
    }

    pub fn laps(&self) -> Vec<Lap> {
        self.lock().state.laps().to_vec()
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.lock().state.accumulated_ms()
    }

    pub fn snapshot(&self) -> TimerState {
        self.lock().state.clone()
    }

    /// Cancels any pending frame without touching the tracked time. Dropping the last handle
    /// does the same.
    pub fn teardown(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.scheduler.cancel();
    }
}

fn schedule_frame(inner: &mut EngineInner, handle: Weak<Mutex<EngineInner>>) {
    let generation = inner.generation;
    inner
        .scheduler
        .schedule_next(Box::new(move || run_frame(handle, generation)));
}

fn run_frame(handle: Weak<Mutex<EngineInner>>, generation: u64) {
    let Some(engine) = handle.upgrade() else {
        return;
    };
    let mut inner = engine.lock().unwrap_or_else(PoisonError::into_inner);
    if inner.generation != generation || !inner.state.is_running() {
        return;
    }
    let elapsed = inner.state.elapsed(inner.clock.instant());
    if let Some(observer) = inner.observer.as_mut() {
        observer(elapsed);
    }
    schedule_frame(&mut inner, Arc::downgrade(&engine));
}
