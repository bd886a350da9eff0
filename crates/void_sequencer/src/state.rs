//! State records

use crate::graph::StateId;
use crate::kind::StateKind;

/// Default duration for timed states, in seconds
pub const DEFAULT_DURATION: f32 = 3.0;

/// Default editing group
pub const DEFAULT_GROUP: &str = "Group_1";

/// A named node in the sequencing graph
#[derive(Debug, Clone)]
pub struct State {
    /// Unique name (identity)
    pub(crate) name: String,
    /// Editing group label
    pub group: String,
    /// Duration policy
    pub kind: StateKind,
    /// Countdown length for timed kinds, in seconds
    pub duration: f32,
    /// Comma-joined flags broadcast on entry
    pub set_flags: String,
    /// Successors, sorted ascending by target name
    pub(crate) transitions: Vec<StateId>,
}

impl State {
    /// Create a new timed state
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            kind: StateKind::Timed,
            duration: DEFAULT_DURATION,
            set_flags: String::new(),
            transitions: Vec::new(),
        }
    }

    /// Set kind
    pub fn with_kind(mut self, kind: StateKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set duration
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    /// Set entry flags
    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.set_flags = flags.into();
        self
    }

    /// Get the name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get outgoing transitions in tie-break order
    pub fn transitions(&self) -> &[StateId] {
        &self.transitions
    }

    /// Whether the state has no countdown of its own
    pub fn infinite_duration(&self) -> bool {
        self.kind.is_infinite()
    }

    /// Whether the state freezes the clock
    pub fn is_holding(&self) -> bool {
        self.kind.is_holding()
    }

    /// Check for a transition to `target`
    pub fn has_transition(&self, target: StateId) -> bool {
        self.transitions.contains(&target)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for State {}

impl std::hash::Hash for State {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
