//! Collaborator interfaces and emitted events
//!
//! The host supplies collaborators once when building a [`Sequencer`](crate::Sequencer).
//! A missing collaborator is simply skipped. Every side effect is also recorded as a
//! [`SequencerEvent`] that the host can drain after each tick.

/// Receives per-state lifecycle callbacks
pub trait StateObserver: Send {
    /// A state became current
    fn on_enter(&mut self, _state: &str) {}
    /// A state stopped being current
    fn on_exit(&mut self, _state: &str) {}
    /// The normalized progress of the current state changed
    fn on_progress(&mut self, _state: &str, _value: f32) {}
}

/// Plays the animation associated with a state
pub trait AnimationPlayer: Send {
    /// Start the animation named after the state; returns `false` if none exists
    fn play(&mut self, animation: &str) -> bool;
}

/// A side effect emitted by the sequencer
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    /// State exited
    Exited(String),
    /// State entered
    Entered(String),
    /// Progress value of the current state
    Progress { state: String, value: f32 },
    /// Flag string handed to the broadcaster
    Flags(String),
    /// A route was planned; holds the hop names in order
    NavigationStarted(Vec<String>),
    /// The navigation session finished or was interrupted
    NavigationCleared,
    /// The current state became none
    Idle,
}

impl SequencerEvent {
    /// Flag string carried by a `Flags` event
    pub fn flags(&self) -> Option<&str> {
        match self {
            Self::Flags(flags) => Some(flags),
            _ => None,
        }
    }
}
