//! Void Sequencer - Character State Sequencing
//!
//! This crate drives a character through a directed graph of named states. Each state
//! has a duration policy, a set of flags it raises on entry and the states it may move
//! to. The sequencer advances on a per-frame tick, can plan shortest routes to a goal
//! state and walks them hop by hop.
//!
//! # Features
//!
//! - Generational state handles with unique names and sorted transitions
//! - Timed, looping, holding and settle state kinds
//! - Breadth-first route planning with deterministic tie-breaking
//! - Navigation sessions with interrupt/continue control and flag signaling
//! - Single-shot commands posted from any thread
//! - JSON and binary documents with legacy migration
//!
//! # Example
//!
//! ```ignore
//! use void_sequencer::prelude::*;
//!
//! let mut sequencer = Sequencer::new(SequencerConfig::default())
//!     .with_broadcaster(|flags: &str| println!("flags: {}", flags));
//!
//! let graph = sequencer.graph_mut();
//! let idle = graph.add_state("idle", "Base")?;
//! let wave = graph.add_state("wave", "Base")?;
//! graph.add_transition(idle, wave)?;
//!
//! sequencer.switch_state(Some("idle"))?;
//! sequencer.route_to("wave")?;
//! sequencer.tick(1.0 / 60.0);
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod flags;
pub mod graph;
pub mod kind;
pub mod observer;
pub mod persist;
pub mod router;
pub mod scheduler;
pub mod sequencer;
pub mod state;

pub mod prelude {
    pub use crate::command::{Command, CommandError, CommandSender};
    pub use crate::config::SequencerConfig;
    pub use crate::error::{ConfigError, Notice, Outcome, PersistError, SequencerError};
    pub use crate::flags::{Flag, FlagBroadcaster, FlagSet};
    pub use crate::graph::{StateGraph, StateId};
    pub use crate::kind::StateKind;
    pub use crate::observer::{AnimationPlayer, SequencerEvent, StateObserver};
    pub use crate::persist::{DocumentFormat, RestoreReport, SequenceDocument, StateRecord};
    pub use crate::router::{find_route, NavigationSession};
    pub use crate::scheduler::Cursor;
    pub use crate::sequencer::Sequencer;
    pub use crate::state::State;
}

pub use prelude::*;
