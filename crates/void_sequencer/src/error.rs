//! Error and outcome types for the sequencer

use thiserror::Error;

/// Errors raised by graph edits and sequencer commands.
///
/// A command that fails leaves the graph, cursor and navigation session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// A command referenced a name that is not in the graph
    #[error("Unknown state: {0}")]
    UnknownState(String),
    /// A handle refers to a removed state
    #[error("Invalid or stale state handle")]
    InvalidHandle,
    /// Routing was requested with nothing active
    #[error("No current state to route from")]
    NoCurrentState,
    /// Breadth-first search exhausted without reaching the target
    #[error("No route found from {from} to {to}")]
    NoRoute { from: String, to: String },
    /// Add or rename would duplicate an existing name
    #[error("A state named '{0}' already exists")]
    NameCollision(String),
    /// Name generation ran out of attempts
    #[error("Too many states: no free name for '{base}' after {attempts} attempts")]
    TooManyStates { base: String, attempts: u32 },
    /// Transition edit that the graph refuses (e.g. a self-edge)
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Informational results for commands that had nothing to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// `route_to` named the state that is already current
    AlreadyInTarget,
    /// `interrupt_navigation` with no session running
    NoActiveNavigation,
    /// `continue_navigation` while the current state is not holding
    NotHolding,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInTarget => write!(f, "Already in target state"),
            Self::NoActiveNavigation => write!(f, "No active navigation to interrupt"),
            Self::NotHolding => write!(f, "Current state is not a holding state"),
        }
    }
}

/// Successful command result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command changed the sequencer
    Applied,
    /// The command was a no-op
    Info(Notice),
}

impl Outcome {
    /// Check whether the command changed anything
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Get the notice for a no-op command
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Applied => None,
            Self::Info(notice) => Some(*notice),
        }
    }
}

/// Document persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SequencerError::NoRoute {
            from: "A".into(),
            to: "C".into(),
        };
        assert_eq!(err.to_string(), "No route found from A to C");
        assert_eq!(
            SequencerError::NameCollision("Idle".into()).to_string(),
            "A state named 'Idle' already exists"
        );
    }

    #[test]
    fn test_outcome() {
        assert!(Outcome::Applied.is_applied());
        assert_eq!(Outcome::Applied.notice(), None);

        let info = Outcome::Info(Notice::NotHolding);
        assert!(!info.is_applied());
        assert_eq!(info.notice(), Some(Notice::NotHolding));
    }
}
