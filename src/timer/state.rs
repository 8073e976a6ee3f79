use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

/// A user marked checkpoint. `at_ms` is the cumulative elapsed time when the lap was taken and
/// `delta_ms` the time since the previous lap (or since zero for the first one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub id: String,
    pub at_ms: u64,
    pub delta_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Pure state of a timer session. Every transition takes the current monotonic instant
/// explicitly, so the arithmetic can be checked without any clock at all.
///
/// `start_ts` is `Some` exactly when the phase is [Phase::Running]; `accumulated` only holds
/// completed run segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    phase: Phase,
    accumulated: Duration,
    start_ts: Option<Instant>,
    laps: Vec<Lap>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            accumulated: Duration::ZERO,
            start_ts: None,
            laps: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn accumulated_ms(&self) -> u64 {
        duration_ms(self.accumulated)
    }

    pub fn start_ts(&self) -> Option<Instant> {
        self.start_ts
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    /// Returns `true` when the phase actually changed.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.start_ts = Some(now);
        self.phase = Phase::Running;
        true
    }

    /// Banks the in-progress segment. Returns `true` when the phase actually changed.
    pub fn pause(&mut self, now: Instant) -> bool {
        let Some(start_ts) = self.start_ts.take() else {
            return false;
        };
        // Instant subtraction saturates, a clock can't push the total backwards.
        self.accumulated += now.saturating_duration_since(start_ts);
        self.phase = Phase::Paused;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.start_ts {
            Some(start_ts) if self.is_running() => {
                self.accumulated + now.saturating_duration_since(start_ts)
            }
            _ => self.accumulated,
        }
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        duration_ms(self.elapsed(now))
    }

    /// Appends a lap when running. Outside of [Phase::Running] laps are silently ignored.
    pub fn add_lap(&mut self, now: Instant, id: String) -> Option<&Lap> {
        if !self.is_running() {
            return None;
        }
        let at_ms = self.elapsed_ms(now);
        let last_at = self.laps.last().map_or(0, |lap| lap.at_ms);
        self.laps.push(Lap {
            id,
            at_ms,
            delta_ms: at_ms.saturating_sub(last_at),
            note: None,
        });
        self.laps.last()
    }

    pub fn annotate_lap(&mut self, id: &str, note: Option<String>) -> bool {
        match self.laps.iter_mut().find(|lap| lap.id == id) {
            Some(lap) => {
                lap.note = note.filter(|v| !v.trim().is_empty());
                true
            }
            None => false,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::{Phase, TimerState};

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_segments_accumulate() {
        let base = Instant::now();
        let mut state = TimerState::new();

        assert!(state.start(at(base, 0)));
        assert!(state.pause(at(base, 5000)));
        assert_eq!(state.accumulated_ms(), 5000);
        assert_eq!(state.elapsed_ms(at(base, 9000)), 5000);

        assert!(state.start(at(base, 9000)));
        assert_eq!(state.elapsed_ms(at(base, 10_000)), 6000);
        assert!(state.pause(at(base, 11_000)));
        assert_eq!(state.accumulated_ms(), 7000);
    }

    #[test]
    fn test_start_ts_tracks_phase() {
        let base = Instant::now();
        let mut state = TimerState::new();
        assert!(state.start_ts().is_none());

        state.start(base);
        assert_eq!(state.start_ts(), Some(base));
        assert!(!state.start(at(base, 100)), "start while running is a no-op");
        assert_eq!(state.start_ts(), Some(base));

        state.pause(at(base, 100));
        assert!(state.start_ts().is_none());
        assert!(!state.pause(at(base, 200)), "pause while paused is a no-op");
        assert_eq!(state.phase(), Phase::Paused);
    }

    #[test]
    fn test_laps_only_while_running() {
        let base = Instant::now();
        let mut state = TimerState::new();
        assert!(state.add_lap(base, "a".into()).is_none());

        state.start(base);
        state.add_lap(at(base, 1000), "1".into());
        state.pause(at(base, 1500));
        assert!(state.add_lap(at(base, 2000), "2".into()).is_none());
        assert_eq!(state.laps().len(), 1);
    }

    #[test]
    fn test_lap_deltas() {
        let base = Instant::now();
        let mut state = TimerState::new();
        state.start(base);
        for (i, ms) in [1000, 2500, 4000].into_iter().enumerate() {
            state.add_lap(at(base, ms), i.to_string());
        }

        let deltas = state.laps().iter().map(|l| l.delta_ms).collect::<Vec<_>>();
        assert_eq!(deltas, vec![1000, 1500, 1500]);
        let sum: u64 = deltas.iter().sum();
        assert_eq!(sum, state.laps().last().unwrap().at_ms);
    }

    #[test]
    fn test_laps_span_pauses() {
        let base = Instant::now();
        let mut state = TimerState::new();
        state.start(base);
        state.add_lap(at(base, 1000), "1".into());
        state.pause(at(base, 2000));
        state.start(at(base, 10_000));
        state.add_lap(at(base, 10_500), "2".into());

        let laps = state.laps();
        assert_eq!(laps[1].at_ms, 2500);
        assert_eq!(laps[1].delta_ms, 1500);
    }

    #[test]
    fn test_reset_from_any_phase() {
        let base = Instant::now();
        let mut state = TimerState::new();
        state.start(base);
        state.add_lap(at(base, 300), "1".into());
        state.reset();
        assert_eq!(state, TimerState::new());

        state.start(base);
        state.pause(at(base, 300));
        state.reset();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.accumulated_ms(), 0);
        assert!(state.laps().is_empty());
    }

    #[test]
    fn test_annotate_lap() {
        let base = Instant::now();
        let mut state = TimerState::new();
        state.start(base);
        state.add_lap(at(base, 300), "1".into());

        assert!(state.annotate_lap("1", Some("review".into())));
        assert_eq!(state.laps()[0].note.as_deref(), Some("review"));
        assert!(state.annotate_lap("1", Some("  ".into())));
        assert_eq!(state.laps()[0].note, None);
        assert!(!state.annotate_lap("missing", None));
    }
}
