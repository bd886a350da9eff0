//! Runtime cursor
//!
//! The cursor is the live position of the sequencer: which state is current, how
//! much of its countdown is left, and the last progress value handed to observers.

use crate::graph::StateId;
use crate::state::State;

/// Clock length given to infinite states. During navigation this is the time a looping
/// hop is shown before the route moves on; otherwise it is only a display value.
pub const PSEUDO_DURATION: f32 = 1.0;

/// Live runtime position
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    current: Option<StateId>,
    /// Seconds remaining
    clock: f32,
    /// Ceiling of the clock, used to normalize progress
    duration: f32,
    /// Last emitted progress; `None` forces the next refresh to emit
    last_progress: Option<f32>,
}

impl Cursor {
    /// Create an idle cursor
    pub fn new() -> Self {
        Self {
            current: None,
            clock: 0.0,
            duration: PSEUDO_DURATION,
            last_progress: None,
        }
    }

    /// Current state
    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    /// Seconds remaining
    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Clock ceiling
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Point the cursor at a state and restart its clock
    pub fn enter(&mut self, id: Option<StateId>, state: Option<&State>) {
        self.current = id;
        let length = match state {
            Some(s) if s.infinite_duration() => PSEUDO_DURATION,
            Some(s) => s.duration.max(0.0),
            None => 0.0,
        };
        self.clock = length;
        self.duration = if state.is_some() { length } else { PSEUDO_DURATION };
        self.last_progress = None;
    }

    /// Restore a saved position without firing any callbacks.
    ///
    /// The clock is clamped into `[0, duration]`.
    pub fn restore(&mut self, id: Option<StateId>, clock: f32, duration: f32) {
        self.current = id;
        self.duration = duration.max(0.0);
        self.clock = clock.clamp(0.0, self.duration);
        self.last_progress = None;
    }

    /// Count down by `dt`; returns `true` once the clock is spent
    pub fn advance(&mut self, dt: f32) -> bool {
        self.clock = (self.clock - dt.max(0.0)).max(0.0);
        self.clock <= 0.0
    }

    /// Normalized elapsed fraction: 0 at entry, 1 at expiry, 0 for infinite states
    pub fn progress(&self, infinite: bool) -> f32 {
        if infinite {
            return 0.0;
        }
        if self.duration <= 0.0 {
            return 1.0;
        }
        1.0 - (self.clock / self.duration).clamp(0.0, 1.0)
    }

    /// Progress value if it moved more than `epsilon` since the last emission
    pub fn progress_change(&mut self, infinite: bool, epsilon: f32) -> Option<f32> {
        let value = self.progress(infinite);
        let changed = match self.last_progress {
            Some(last) => (value - last).abs() > epsilon,
            None => true,
        };
        if changed {
            self.last_progress = Some(value);
            Some(value)
        } else {
            None
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}
