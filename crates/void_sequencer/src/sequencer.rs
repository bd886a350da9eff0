//! Sequencer controller
//!
//! The [`Sequencer`] owns the state graph, the cursor and the navigation session and is
//! the only thing that mutates them. It is driven by [`Sequencer::tick`] once per frame.
//!
//! Per tick:
//! 1. Posted commands are applied, each exactly once.
//! 2. With no current state nothing happens.
//! 3. A holding state keeps its clock and waits for a continue command.
//! 4. While navigating, the hop timer counts down and the next hop is taken when it
//!    expires (at most one hop per tick).
//! 5. Otherwise a timed state that runs out moves along a random transition, or goes
//!    idle when it has none. Infinite states stay until moved.

use crate::command::{Command, CommandMailbox, CommandSender};
use crate::config::SequencerConfig;
use crate::error::{Notice, Outcome, Result, SequencerError};
use crate::flags::{FlagBroadcaster, FlagSet};
use crate::graph::{StateGraph, StateId};
use crate::observer::{AnimationPlayer, SequencerEvent, StateObserver};
use crate::router::{find_route, NavigationSession};
use crate::scheduler::Cursor;
use crate::state::State;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Runtime controller for one character
pub struct Sequencer {
    pub(crate) graph: StateGraph,
    pub(crate) cursor: Cursor,
    pub(crate) session: NavigationSession,
    pub(crate) config: SequencerConfig,
    /// Extra flags appended to navigation-cleared broadcasts
    pub(crate) exit_flags: String,
    /// Editing context only
    pub(crate) selected_group: Option<String>,
    rng: StdRng,
    broadcaster: Option<Box<dyn FlagBroadcaster>>,
    animator: Option<Box<dyn AnimationPlayer>>,
    observer: Option<Box<dyn StateObserver>>,
    events: Vec<SequencerEvent>,
    mailbox: CommandMailbox,
}

impl Sequencer {
    /// Create a sequencer with an empty graph
    pub fn new(config: SequencerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            graph: Self::empty_graph(&config),
            cursor: Cursor::new(),
            session: NavigationSession::new(),
            exit_flags: config.exit_flags.clone(),
            selected_group: None,
            config,
            rng,
            broadcaster: None,
            animator: None,
            observer: None,
            events: Vec::new(),
            mailbox: CommandMailbox::new(),
        }
    }

    pub(crate) fn empty_graph(config: &SequencerConfig) -> StateGraph {
        StateGraph::new()
            .with_max_name_attempts(config.max_name_attempts)
            .with_legacy_prefixes(config.legacy_prefixes)
    }

    /// Replace the graph; the cursor and session are reset
    pub fn with_graph(mut self, graph: StateGraph) -> Self {
        self.graph = graph;
        self.cursor = Cursor::new();
        self.session = NavigationSession::new();
        self
    }

    /// Attach the flag broadcaster
    pub fn with_broadcaster(mut self, broadcaster: impl FlagBroadcaster + 'static) -> Self {
        self.broadcaster = Some(Box::new(broadcaster));
        self
    }

    /// Attach the animation player
    pub fn with_animator(mut self, animator: impl AnimationPlayer + 'static) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    /// Attach the state observer
    pub fn with_observer(mut self, observer: impl StateObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Get the graph
    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    /// Get the graph for editing.
    ///
    /// Remove states through [`Sequencer::remove_state`] so the cursor and any running
    /// navigation are cleaned up.
    pub fn graph_mut(&mut self) -> &mut StateGraph {
        &mut self.graph
    }

    /// Get the configuration
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Current state handle
    pub fn current(&self) -> Option<StateId> {
        self.cursor.current()
    }

    /// Current state
    pub fn current_state(&self) -> Option<&State> {
        self.cursor.current().and_then(|id| self.graph.get(id))
    }

    /// Current state name
    pub fn current_name(&self) -> Option<&str> {
        self.current_state().map(State::name)
    }

    /// Seconds left on the clock
    pub fn clock(&self) -> f32 {
        self.cursor.clock()
    }

    /// Clock ceiling
    pub fn duration(&self) -> f32 {
        self.cursor.duration()
    }

    /// Normalized progress of the current state
    pub fn progress(&self) -> f32 {
        let infinite = self
            .current_state()
            .map(State::infinite_duration)
            .unwrap_or(true);
        self.cursor.progress(infinite)
    }

    /// Get the navigation session
    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    /// Whether a navigation session is running
    pub fn is_navigating(&self) -> bool {
        self.session.is_active()
    }

    /// Extra flags appended to navigation-cleared broadcasts
    pub fn exit_flags(&self) -> &str {
        &self.exit_flags
    }

    /// Set the extra exit flags
    pub fn set_exit_flags(&mut self, flags: impl Into<String>) {
        self.exit_flags = flags.into();
    }

    /// Group selected for editing
    pub fn selected_group(&self) -> Option<&str> {
        self.selected_group.as_deref()
    }

    /// Select a group for editing
    pub fn set_selected_group(&mut self, group: Option<String>) {
        self.selected_group = group;
    }

    /// Handle for posting commands from elsewhere
    pub fn command_sender(&self) -> CommandSender {
        self.mailbox.sender()
    }

    /// Events recorded since the last drain
    pub fn events(&self) -> &[SequencerEvent] {
        &self.events
    }

    /// Take all recorded events
    pub fn drain_events(&mut self) -> Vec<SequencerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Create a state with a generated name, default duration and the given (or default) group
    pub fn new_state(&mut self, group: Option<&str>) -> Result<StateId> {
        let group = group.unwrap_or(self.config.default_group.as_str()).to_string();
        let id = self.graph.add_state_auto(&self.config.new_state_prefix, group)?;
        self.graph.set_duration(id, self.config.default_duration)?;
        Ok(id)
    }

    /// Remove a state, going idle first if it is current and stopping any navigation
    /// that depends on it
    pub fn remove_state(&mut self, id: StateId) -> Result<State> {
        if !self.graph.contains(id) {
            return Err(SequencerError::InvalidHandle);
        }

        let was_current = self.cursor.current() == Some(id);
        if was_current {
            self.enter_state(None);
        }

        if self.session.is_active() && (was_current || self.session.references(id)) {
            log::warn!("Removed state was part of the active navigation; interrupting");
            self.interrupt_navigation();
        } else if self.session.references(id) {
            // A deferred target that can no longer be exited
            self.session.interrupt();
            self.broadcast_cleared();
        }

        let state = self.graph.remove_state(id)?;
        log::debug!("Removed state '{}'", state.name());
        Ok(state)
    }

    /// Remove every state of a group; returns how many were removed
    pub fn remove_group(&mut self, group: &str) -> Result<usize> {
        let members = self.graph.states_in_group(group);
        for &id in &members {
            self.remove_state(id)?;
        }
        if self.selected_group.as_deref() == Some(group) {
            self.selected_group = self.graph.groups().first().map(|g| g.to_string());
        }
        Ok(members.len())
    }

    /// Apply a command
    pub fn apply(&mut self, command: Command) -> Result<Outcome> {
        match command {
            Command::SwitchState(name) => self.switch_state(name.as_deref()),
            Command::RouteTo(name) => self.route_to(&name),
            Command::InterruptNavigation => Ok(self.interrupt_navigation()),
            Command::ContinueNavigation => Ok(self.continue_navigation()),
        }
    }

    /// Make a state current immediately; `None` goes idle
    pub fn switch_state(&mut self, name: Option<&str>) -> Result<Outcome> {
        let target = name.map(|n| self.graph.resolve(n)).transpose()?;
        self.switch_to(target)
    }

    /// Make a state current immediately by handle
    pub fn switch_to(&mut self, target: Option<StateId>) -> Result<Outcome> {
        if let Some(id) = target {
            if !self.graph.contains(id) {
                return Err(SequencerError::InvalidHandle);
            }
        }
        self.enter_state(target);
        Ok(Outcome::Applied)
    }

    /// Plan the shortest route to a state and take the first hop
    pub fn route_to(&mut self, name: &str) -> Result<Outcome> {
        if self.current_state().is_none() {
            return Err(SequencerError::NoCurrentState);
        }
        let target = self.graph.resolve(name)?;
        self.route_to_id(target)
    }

    /// Plan the shortest route to a state by handle and take the first hop
    pub fn route_to_id(&mut self, target: StateId) -> Result<Outcome> {
        let start = self
            .current_state()
            .and(self.cursor.current())
            .ok_or(SequencerError::NoCurrentState)?;
        let target_state = self.graph.get(target).ok_or(SequencerError::InvalidHandle)?;

        if start == target {
            log::info!("Already in target state '{}'", target_state.name());
            return Ok(Outcome::Info(Notice::AlreadyInTarget));
        }

        let deferred = target_state
            .kind
            .defers_navigation_clear()
            .then_some(target);

        let path = find_route(&self.graph, start, target).ok_or_else(|| SequencerError::NoRoute {
            from: self.graph.name_of(start).unwrap_or_default().to_string(),
            to: self.graph.name_of(target).unwrap_or_default().to_string(),
        })?;

        let hops: Vec<String> = path
            .iter()
            .filter_map(|&id| self.graph.name_of(id))
            .map(str::to_string)
            .collect();
        log::info!("Navigating: {}", hops.join(" -> "));

        self.events.push(SequencerEvent::NavigationStarted(hops));
        let started = FlagSet::navigation_started(&self.config.navigation_flag).to_string();
        self.broadcast(&started);

        self.session.begin(path, deferred);
        self.advance_navigation();
        Ok(Outcome::Applied)
    }

    /// Abort the running navigation and broadcast the cleared flags
    pub fn interrupt_navigation(&mut self) -> Outcome {
        if self.session.interrupt() {
            log::info!("Navigation interrupted");
            self.broadcast_cleared();
            Outcome::Applied
        } else {
            log::info!("No active navigation to interrupt");
            Outcome::Info(Notice::NoActiveNavigation)
        }
    }

    /// Release a holding state: take the next hop if navigating, else a random transition
    pub fn continue_navigation(&mut self) -> Outcome {
        let holding = self.current_state().map(State::is_holding).unwrap_or(false);
        if !holding {
            log::info!("Continue received but the current state is not holding");
            return Outcome::Info(Notice::NotHolding);
        }

        if self.session.is_active() && self.session.has_pending_hop() {
            self.advance_navigation();
        } else {
            self.follow_random_transition();
        }
        Outcome::Applied
    }

    /// Advance the sequencer by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        for command in self.mailbox.drain() {
            match self.apply(command.clone()) {
                Ok(Outcome::Applied) => {}
                Ok(Outcome::Info(notice)) => log::info!("{}: {}", command, notice),
                Err(e) => log::warn!("Command '{}' rejected: {}", command, e),
            }
        }

        let Some(current) = self.cursor.current() else {
            return;
        };
        let Some(state) = self.graph.get(current) else {
            log::warn!("Current state was removed behind the sequencer's back; going idle");
            self.interrupt_navigation();
            self.cursor.enter(None, None);
            self.events.push(SequencerEvent::Idle);
            return;
        };
        let holding = state.is_holding();
        let infinite = state.infinite_duration();

        if holding {
            self.refresh_progress();
            return;
        }

        if self.session.is_active() {
            if self.cursor.advance(dt) {
                self.advance_navigation();
            } else {
                self.refresh_progress();
            }
            return;
        }

        let expired = self.cursor.advance(dt);
        if !infinite && expired {
            self.follow_random_transition();
        } else {
            self.refresh_progress();
        }
    }

    /// Exit the current state, enter `target` and fire the side effects of both
    fn enter_state(&mut self, target: Option<StateId>) {
        let previous = self.cursor.current();

        if let Some(name) = previous.and_then(|id| self.graph.name_of(id)).map(str::to_string) {
            if let Some(observer) = self.observer.as_mut() {
                observer.on_exit(&name);
            }
            self.events.push(SequencerEvent::Exited(name));
        }

        let entered = target.and_then(|id| self.graph.get(id));
        self.cursor.enter(target, entered);

        match entered.map(|s| (s.name().to_string(), s.set_flags.clone())) {
            Some((name, flags)) => {
                log::debug!("Entered state '{}'", name);
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_enter(&name);
                }
                self.events.push(SequencerEvent::Entered(name.clone()));
                if let Some(animator) = self.animator.as_mut() {
                    if !animator.play(&name) {
                        log::debug!("No animation for state '{}'", name);
                    }
                }
                self.broadcast(&flags);
            }
            None => {
                log::debug!("Sequencer idle");
                self.events.push(SequencerEvent::Idle);
            }
        }

        if let Some(previous) = previous {
            if self.session.take_deferred_clear(previous) {
                self.broadcast_cleared();
            }
        }
    }

    /// Take one hop of the running navigation
    fn advance_navigation(&mut self) {
        match self.session.pop_hop() {
            Some(next) if self.graph.contains(next) => {
                self.enter_state(Some(next));
                if !self.session.has_pending_hop() {
                    self.finish_navigation();
                }
            }
            Some(_) => {
                log::warn!("Planned hop no longer exists; interrupting navigation");
                self.interrupt_navigation();
            }
            None => self.finish_navigation(),
        }
    }

    /// Runs as soon as the last hop is entered, not when its timer runs out, so the
    /// cleared flags go out with the arrival unless the target defers them.
    fn finish_navigation(&mut self) {
        if self.session.finish() {
            log::info!("Navigation complete");
            self.broadcast_cleared();
        } else {
            log::debug!("Navigation complete; clear deferred until the target is exited");
        }
    }

    fn follow_random_transition(&mut self) {
        let transitions = self
            .current_state()
            .map(|s| s.transitions().to_vec())
            .unwrap_or_default();
        let next = if transitions.is_empty() {
            None
        } else {
            Some(transitions[self.rng.random_range(0..transitions.len())])
        };
        self.enter_state(next);
    }

    fn refresh_progress(&mut self) {
        let Some(state) = self.current_state() else {
            return;
        };
        let name = state.name().to_string();
        let infinite = state.infinite_duration();

        if let Some(value) = self
            .cursor
            .progress_change(infinite, self.config.progress_epsilon)
        {
            if let Some(observer) = self.observer.as_mut() {
                observer.on_progress(&name, value);
            }
            self.events.push(SequencerEvent::Progress { state: name, value });
        }
    }

    fn broadcast(&mut self, flags: &str) {
        if flags.is_empty() {
            return;
        }
        log::debug!("Flags set: {}", flags);
        self.events.push(SequencerEvent::Flags(flags.to_string()));
        if let Some(broadcaster) = self.broadcaster.as_mut() {
            broadcaster.broadcast(flags);
        }
    }

    fn broadcast_cleared(&mut self) {
        let flags = FlagSet::navigation_cleared(&self.config.navigation_flag, &self.exit_flags);
        self.broadcast(&flags.to_string());
        self.events.push(SequencerEvent::NavigationCleared);
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(SequencerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::StateKind;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn seeded() -> SequencerConfig {
        SequencerConfig {
            seed: Some(7),
            ..SequencerConfig::default()
        }
    }

    /// Build a sequencer from `(name, kind, duration)` states and `(from, to)` edges
    fn build(states: &[(&str, StateKind, f32)], edges: &[(&str, &str)]) -> Sequencer {
        let mut seq = Sequencer::new(seeded());
        for &(name, kind, duration) in states {
            seq.graph_mut()
                .insert(State::new(name, "G").with_kind(kind).with_duration(duration))
                .unwrap();
        }
        for &(from, to) in edges {
            let graph = seq.graph_mut();
            let (from, to) = (graph.id_of(from).unwrap(), graph.id_of(to).unwrap());
            graph.add_transition(from, to).unwrap();
        }
        seq
    }

    fn flags(events: &[SequencerEvent]) -> Vec<&str> {
        events.iter().filter_map(SequencerEvent::flags).collect()
    }

    #[test]
    fn test_switch_fires_exit_then_enter() {
        let mut seq = build(
            &[("A", StateKind::Timed, 1.0), ("B", StateKind::Timed, 1.0)],
            &[],
        );
        let b = seq.graph().id_of("B").unwrap();
        seq.graph_mut().set_flags(b, "b_on").unwrap();

        seq.switch_state(Some("A")).unwrap();
        seq.drain_events();
        seq.switch_state(Some("B")).unwrap();

        assert_eq!(
            seq.drain_events(),
            vec![
                SequencerEvent::Exited("A".into()),
                SequencerEvent::Entered("B".into()),
                SequencerEvent::Flags("b_on".into()),
            ]
        );
    }

    #[test]
    fn test_switch_unknown_state() {
        let mut seq = build(&[("A", StateKind::Timed, 1.0)], &[]);
        assert_eq!(
            seq.switch_state(Some("Z")).unwrap_err(),
            SequencerError::UnknownState("Z".into())
        );
        assert_eq!(seq.current(), None);
    }

    #[test]
    fn test_timed_state_without_transitions_goes_idle() {
        let mut seq = build(&[("A", StateKind::Timed, 1.0)], &[]);
        seq.switch_state(Some("A")).unwrap();
        seq.tick(0.6);
        seq.tick(0.6);
        assert_eq!(seq.current(), None);
        assert_eq!(seq.events().last(), Some(&SequencerEvent::Idle));
    }

    #[test]
    fn test_looping_state_persists() {
        let mut seq = build(
            &[("A", StateKind::Looping, 1.0), ("B", StateKind::Timed, 1.0)],
            &[("A", "B")],
        );
        seq.switch_state(Some("A")).unwrap();
        for _ in 0..20 {
            seq.tick(0.5);
        }
        assert_eq!(seq.current_name(), Some("A"));
    }

    #[test]
    fn test_holding_state_freezes_clock() {
        let mut seq = build(
            &[("hold", StateKind::Holding, 1.0), ("B", StateKind::Timed, 1.0)],
            &[("hold", "B")],
        );
        seq.switch_state(Some("hold")).unwrap();
        let clock = seq.clock();
        for _ in 0..10 {
            seq.tick(1.0);
        }
        assert_eq!(seq.clock(), clock);
        assert_eq!(seq.current_name(), Some("hold"));

        assert_eq!(seq.continue_navigation(), Outcome::Applied);
        assert_eq!(seq.current_name(), Some("B"));
    }

    #[test]
    fn test_continue_requires_holding() {
        let mut seq = build(&[("A", StateKind::Timed, 1.0)], &[]);
        assert_eq!(seq.continue_navigation(), Outcome::Info(Notice::NotHolding));
        seq.switch_state(Some("A")).unwrap();
        assert_eq!(seq.continue_navigation(), Outcome::Info(Notice::NotHolding));
        assert_eq!(seq.current_name(), Some("A"));
    }

    #[test]
    fn test_route_errors_leave_state_untouched() {
        let mut seq = build(
            &[("A", StateKind::Timed, 1.0), ("B", StateKind::Timed, 1.0)],
            &[("B", "A")],
        );
        assert_eq!(seq.route_to("B").unwrap_err(), SequencerError::NoCurrentState);

        seq.switch_state(Some("A")).unwrap();
        seq.drain_events();
        assert_eq!(
            seq.route_to("Q").unwrap_err(),
            SequencerError::UnknownState("Q".into())
        );
        assert!(matches!(seq.route_to("B"), Err(SequencerError::NoRoute { .. })));
        assert_eq!(seq.route_to("A").unwrap(), Outcome::Info(Notice::AlreadyInTarget));

        assert!(!seq.is_navigating());
        assert!(seq.drain_events().is_empty());
        assert_eq!(seq.current_name(), Some("A"));
    }

    #[test]
    fn test_route_through_looping_hop_uses_pseudo_duration() {
        let mut seq = build(
            &[
                ("A", StateKind::Timed, 5.0),
                ("L", StateKind::Looping, 5.0),
                ("C", StateKind::Looping, 5.0),
            ],
            &[("A", "L"), ("L", "C")],
        );
        seq.switch_state(Some("A")).unwrap();
        seq.route_to("C").unwrap();
        assert_eq!(seq.current_name(), Some("L"));
        assert_eq!(seq.clock(), 1.0);

        seq.tick(0.5);
        assert_eq!(seq.current_name(), Some("L"));
        seq.tick(0.5);
        assert_eq!(seq.current_name(), Some("C"));
        assert!(!seq.is_navigating());
    }

    #[test]
    fn test_one_hop_per_tick() {
        let mut seq = build(
            &[
                ("A", StateKind::Timed, 1.0),
                ("B", StateKind::Timed, 0.1),
                ("C", StateKind::Timed, 0.1),
                ("D", StateKind::Timed, 0.1),
            ],
            &[("A", "B"), ("B", "C"), ("C", "D")],
        );
        seq.switch_state(Some("A")).unwrap();
        seq.route_to("D").unwrap();
        assert_eq!(seq.current_name(), Some("B"));

        // A huge step still only moves one hop
        seq.tick(100.0);
        assert_eq!(seq.current_name(), Some("C"));
        seq.tick(100.0);
        assert_eq!(seq.current_name(), Some("D"));
    }

    #[test]
    fn test_settle_target_defers_clear_until_exit() {
        let mut seq = build(
            &[
                ("A", StateKind::Timed, 1.0),
                ("B", StateKind::Timed, 1.0),
                ("wave", StateKind::Settle, 1.0),
            ],
            &[("A", "B"), ("B", "wave"), ("wave", "A")],
        );
        seq.set_exit_flags("ready");
        seq.switch_state(Some("A")).unwrap();
        seq.route_to("wave").unwrap();
        assert_eq!(seq.session().deferred_clear_target(), seq.graph().id_of("wave"));

        seq.tick(1.0);
        assert_eq!(seq.current_name(), Some("wave"));
        assert!(!seq.is_navigating());
        assert!(!flags(seq.events()).contains(&"!nav,ready"));

        // wave finishes its own timer, moves on, and only then clears
        seq.tick(1.0);
        assert_eq!(seq.current_name(), Some("A"));
        let events = seq.drain_events();
        let exit_at = events
            .iter()
            .position(|e| *e == SequencerEvent::Exited("wave".into()))
            .unwrap();
        let clear_at = events
            .iter()
            .position(|e| e.flags() == Some("!nav,ready"))
            .unwrap();
        assert!(exit_at < clear_at);
        assert_eq!(seq.session().deferred_clear_target(), None);
    }

    #[test]
    fn test_interrupt_is_idempotent() {
        let mut seq = build(
            &[
                ("A", StateKind::Timed, 1.0),
                ("B", StateKind::Timed, 1.0),
                ("C", StateKind::Settle, 1.0),
            ],
            &[("A", "B"), ("B", "C")],
        );
        seq.switch_state(Some("A")).unwrap();
        seq.route_to("C").unwrap();
        seq.drain_events();

        assert_eq!(seq.interrupt_navigation(), Outcome::Applied);
        assert_eq!(flags(&seq.drain_events()), vec!["!nav"]);
        assert_eq!(seq.session().deferred_clear_target(), None);

        assert_eq!(
            seq.interrupt_navigation(),
            Outcome::Info(Notice::NoActiveNavigation)
        );
        assert!(seq.drain_events().is_empty());

        // Free-running again: B times out into C
        seq.tick(1.0);
        assert_eq!(seq.current_name(), Some("C"));
    }

    #[test]
    fn test_continue_takes_next_hop() {
        let mut seq = build(
            &[
                ("A", StateKind::Timed, 1.0),
                ("NAV_wait", StateKind::Holding, 1.0),
                ("C", StateKind::Timed, 1.0),
                ("X", StateKind::Timed, 1.0),
            ],
            &[("A", "NAV_wait"), ("NAV_wait", "C"), ("NAV_wait", "X")],
        );
        seq.switch_state(Some("A")).unwrap();
        seq.route_to("C").unwrap();
        assert_eq!(seq.current_name(), Some("NAV_wait"));

        seq.tick(5.0);
        assert_eq!(seq.current_name(), Some("NAV_wait"));
        assert!(seq.is_navigating());

        assert_eq!(seq.continue_navigation(), Outcome::Applied);
        assert_eq!(seq.current_name(), Some("C"));
        assert!(!seq.is_navigating());
    }

    #[test]
    fn test_remove_current_state() {
        let mut seq = build(
            &[("A", StateKind::Timed, 1.0), ("B", StateKind::Timed, 1.0)],
            &[("A", "B")],
        );
        let b = seq.graph().id_of("B").unwrap();
        seq.switch_state(Some("B")).unwrap();

        seq.remove_state(b).unwrap();
        assert_eq!(seq.current(), None);
        let a = seq.graph().id_of("A").unwrap();
        assert!(seq.graph().get(a).unwrap().transitions().is_empty());
    }

    #[test]
    fn test_remove_state_on_route_interrupts() {
        let mut seq = build(
            &[
                ("A", StateKind::Timed, 1.0),
                ("B", StateKind::Timed, 1.0),
                ("C", StateKind::Timed, 1.0),
            ],
            &[("A", "B"), ("B", "C")],
        );
        seq.switch_state(Some("A")).unwrap();
        seq.route_to("C").unwrap();
        seq.drain_events();

        let c = seq.graph().id_of("C").unwrap();
        seq.remove_state(c).unwrap();
        assert!(!seq.is_navigating());
        assert_eq!(flags(&seq.drain_events()), vec!["!nav"]);
        assert_eq!(seq.current_name(), Some("B"));
    }

    #[test]
    fn test_remove_group() {
        let mut seq = Sequencer::new(seeded());
        let a = seq.new_state(Some("Talk")).unwrap();
        seq.new_state(Some("Talk")).unwrap();
        seq.new_state(None).unwrap();
        seq.set_selected_group(Some("Talk".into()));
        seq.switch_to(Some(a)).unwrap();

        assert_eq!(seq.remove_group("Talk").unwrap(), 2);
        assert_eq!(seq.graph().len(), 1);
        assert_eq!(seq.current(), None);
        assert_eq!(seq.selected_group(), Some("Group_1"));
    }

    #[test]
    fn test_new_state_defaults() {
        let mut seq = Sequencer::new(seeded());
        let id = seq.new_state(None).unwrap();
        let state = seq.graph().get(id).unwrap();
        assert_eq!(state.name(), "state_1");
        assert_eq!(state.group, "Group_1");
        assert_eq!(state.duration, 3.0);
    }

    #[test]
    fn test_progress_notifications() {
        let mut seq = build(&[("A", StateKind::Timed, 2.0)], &[]);
        seq.switch_state(Some("A")).unwrap();
        seq.drain_events();

        seq.tick(0.5);
        seq.tick(0.0);
        seq.tick(0.5);
        let values: Vec<f32> = seq
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SequencerEvent::Progress { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![0.25, 0.5]);
    }

    #[test]
    fn test_mailbox_commands_applied_once() {
        let mut seq = build(
            &[("A", StateKind::Looping, 1.0), ("B", StateKind::Looping, 1.0)],
            &[("A", "B")],
        );
        let sender = seq.command_sender();
        sender.send_text("switch A").unwrap();
        sender.send_text("route B").unwrap();

        seq.tick(0.0);
        assert_eq!(seq.current_name(), Some("B"));
        seq.switch_state(Some("A")).unwrap();

        // Nothing is replayed on later ticks
        seq.tick(0.0);
        seq.tick(0.0);
        assert_eq!(seq.current_name(), Some("A"));
    }

    #[test]
    fn test_injected_collaborators() {
        #[derive(Clone, Default)]
        struct Recorder(Arc<Mutex<Vec<String>>>);

        impl FlagBroadcaster for Recorder {
            fn broadcast(&mut self, flags: &str) {
                self.0.lock().push(format!("flags:{}", flags));
            }
        }

        impl AnimationPlayer for Recorder {
            fn play(&mut self, animation: &str) -> bool {
                self.0.lock().push(format!("play:{}", animation));
                true
            }
        }

        impl StateObserver for Recorder {
            fn on_enter(&mut self, state: &str) {
                self.0.lock().push(format!("enter:{}", state));
            }
            fn on_exit(&mut self, state: &str) {
                self.0.lock().push(format!("exit:{}", state));
            }
        }

        let recorder = Recorder::default();
        let mut seq = build(
            &[("A", StateKind::Timed, 1.0), ("B", StateKind::Timed, 1.0)],
            &[("A", "B")],
        )
        .with_broadcaster(recorder.clone())
        .with_animator(recorder.clone())
        .with_observer(recorder.clone());
        // with_* keeps the graph
        assert_eq!(seq.graph().len(), 2);

        seq.switch_state(Some("A")).unwrap();
        seq.route_to("B").unwrap();

        assert_eq!(
            *recorder.0.lock(),
            vec![
                "enter:A", "play:A", "flags:nav", "exit:A", "enter:B", "play:B", "flags:!nav",
            ]
        );
    }

    #[test]
    fn test_random_choice_is_seeded() {
        let run = || {
            let mut seq = build(
                &[
                    ("A", StateKind::Timed, 1.0),
                    ("B", StateKind::Timed, 1.0),
                    ("C", StateKind::Timed, 1.0),
                ],
                &[("A", "B"), ("A", "C"), ("B", "A"), ("C", "A")],
            );
            seq.switch_state(Some("A")).unwrap();
            let mut visited = Vec::new();
            for _ in 0..20 {
                seq.tick(1.0);
                visited.push(seq.current_name().unwrap().to_string());
            }
            visited
        };
        assert_eq!(run(), run());
    }
}
