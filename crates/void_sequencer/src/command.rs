//! External commands
//!
//! Commands can be issued directly on the [`Sequencer`](crate::Sequencer) or posted
//! through a [`CommandSender`] from anywhere. Posted commands are drained at the start
//! of the next tick; each is received, and therefore applied, exactly once.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Command error
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Sequencer is gone")]
    Disconnected,
}

/// A single-shot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Make a state current immediately (`None` goes idle)
    SwitchState(Option<String>),
    /// Plan and start a route to a state
    RouteTo(String),
    /// Abort the running navigation
    InterruptNavigation,
    /// Release a holding state
    ContinueNavigation,
}

impl std::str::FromStr for Command {
    type Err = CommandError;

    /// Parse `switch [name]`, `route <name>`, `interrupt_navigation`, `continue_navigation`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, rest) = match s.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (s, ""),
        };

        match verb.to_lowercase().as_str() {
            "switch" | "switch_state" => Ok(Self::SwitchState(
                (!rest.is_empty()).then(|| rest.to_string()),
            )),
            "route" | "route_to" | "navigate" => {
                if rest.is_empty() {
                    Err(CommandError::MissingArgument("target state".to_string()))
                } else {
                    Ok(Self::RouteTo(rest.to_string()))
                }
            }
            "interrupt" | "interrupt_navigation" => Ok(Self::InterruptNavigation),
            "continue" | "continue_navigation" => Ok(Self::ContinueNavigation),
            _ => Err(CommandError::UnknownCommand(s.to_string())),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SwitchState(Some(name)) => write!(f, "switch {}", name),
            Self::SwitchState(None) => write!(f, "switch"),
            Self::RouteTo(name) => write!(f, "route {}", name),
            Self::InterruptNavigation => write!(f, "interrupt_navigation"),
            Self::ContinueNavigation => write!(f, "continue_navigation"),
        }
    }
}

/// Cloneable handle for posting commands to a sequencer
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: Sender<Command>,
}

impl CommandSender {
    /// Post a command for the next tick
    pub fn send(&self, command: Command) -> Result<(), CommandError> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Disconnected(_) | TrySendError::Full(_) => CommandError::Disconnected,
        })
    }

    /// Parse and post a text command
    pub fn send_text(&self, text: &str) -> Result<(), CommandError> {
        self.send(text.parse()?)
    }
}

/// Receiving end owned by the sequencer
#[derive(Debug)]
pub(crate) struct CommandMailbox {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
}

impl CommandMailbox {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub(crate) fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
        }
    }

    /// Remove and return everything posted so far
    pub(crate) fn drain(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }
}
