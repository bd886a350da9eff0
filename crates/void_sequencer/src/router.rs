//! Route planning and navigation sessions
//!
//! Routes are unweighted shortest paths found by breadth-first search. Each state is
//! visited at most once and keeps the predecessor that reached it first; because
//! transition lists are sorted by target name, equal-length paths resolve in
//! ascending-name order.

use crate::graph::{StateGraph, StateId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Find the shortest hop path from `start` to `target`.
///
/// The returned path excludes `start` and ends with `target`. Returns an empty path
/// when `start == target` and `None` when the target is unreachable.
pub fn find_route(graph: &StateGraph, start: StateId, target: StateId) -> Option<Vec<StateId>> {
    if !graph.contains(start) || !graph.contains(target) {
        return None;
    }
    if start == target {
        return Some(Vec::new());
    }

    let mut previous: HashMap<StateId, StateId> = HashMap::new();
    let mut visited: HashSet<StateId> = HashSet::new();
    let mut frontier: VecDeque<StateId> = VecDeque::new();

    visited.insert(start);
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        if current == target {
            let mut path = Vec::new();
            let mut step = target;
            while step != start {
                path.push(step);
                step = previous[&step];
            }
            path.reverse();
            return Some(path);
        }

        let Some(state) = graph.get(current) else {
            continue;
        };
        for &neighbor in state.transitions() {
            if visited.insert(neighbor) {
                previous.insert(neighbor, current);
                frontier.push_back(neighbor);
            }
        }
    }

    None
}

/// An active multi-hop plan, consumed one hop at a time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationSession {
    /// States still to visit
    queue: VecDeque<StateId>,
    /// Whether the session is running
    active: bool,
    /// Final state whose exit closes the navigation
    deferred_clear_target: Option<StateId>,
}

impl NavigationSession {
    /// Create an inactive session
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a planned path and start the session
    pub fn begin(&mut self, path: Vec<StateId>, deferred_clear_target: Option<StateId>) {
        self.queue = path.into();
        self.active = true;
        self.deferred_clear_target = deferred_clear_target;
    }

    /// Whether the session is running
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Remaining hops
    pub fn queue(&self) -> &VecDeque<StateId> {
        &self.queue
    }

    /// Whether more hops remain
    pub fn has_pending_hop(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Take the next hop
    pub fn pop_hop(&mut self) -> Option<StateId> {
        self.queue.pop_front()
    }

    /// Deactivate after the last hop.
    ///
    /// Returns `true` if the cleared signal should be sent now, `false` if it waits
    /// for the deferred target to be exited.
    pub fn finish(&mut self) -> bool {
        self.active = false;
        self.queue.clear();
        self.deferred_clear_target.is_none()
    }

    /// Stop the session and forget any deferred target.
    ///
    /// Returns `true` if a session was running.
    pub fn interrupt(&mut self) -> bool {
        let was_active = self.active;
        self.queue.clear();
        self.active = false;
        self.deferred_clear_target = None;
        was_active
    }

    /// Deferred clear target, if any
    pub fn deferred_clear_target(&self) -> Option<StateId> {
        self.deferred_clear_target
    }

    /// Consume the deferred target if `exited` matches it and no session is running
    pub fn take_deferred_clear(&mut self, exited: StateId) -> bool {
        if !self.active && self.deferred_clear_target == Some(exited) {
            self.deferred_clear_target = None;
            true
        } else {
            false
        }
    }

    /// Whether the plan refers to `id`
    pub fn references(&self, id: StateId) -> bool {
        self.queue.contains(&id) || self.deferred_clear_target == Some(id)
    }
}
