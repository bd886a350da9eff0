//! State graph
//!
//! States live in a single arena and are addressed by generational [`StateId`]
//! handles, so transitions are plain handle lists and renaming a state never touches
//! the edges that point at it. A removed state's slot is reused with a bumped
//! generation, which makes any handle still pointing at it stale.

use crate::error::{Result, SequencerError};
use crate::kind::StateKind;
use crate::state::State;
use std::collections::HashMap;
use std::fmt;

/// Default cap for generated-name retries
pub const DEFAULT_MAX_NAME_ATTEMPTS: u32 = 999;

/// Handle to a state in a [`StateGraph`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId {
    index: u32,
    generation: u32,
}

impl StateId {
    /// Slot index
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({}v{})", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    state: Option<State>,
}

/// Derive the next candidate name by incrementing a trailing `_N` suffix.
///
/// `walk_3` becomes `walk_4`; names without a numeric suffix get `_1` appended.
pub fn next_name(base: &str) -> String {
    if let Some((prefix, suffix)) = base.rsplit_once('_') {
        if !suffix.is_empty() {
            if let Some(next) = suffix.parse::<u32>().ok().and_then(|n| n.checked_add(1)) {
                return format!("{}_{}", prefix, next);
            }
        }
    }
    format!("{}_1", base)
}

/// Arena of states with unique names and directed transitions
pub struct StateGraph {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    /// Name index
    names: HashMap<String, StateId>,
    /// Authoring order
    order: Vec<StateId>,
    /// Cap for generated-name retries
    max_name_attempts: u32,
    /// Reclassify kinds from legacy name prefixes on add/duplicate/rename
    legacy_prefixes: bool,
}

impl StateGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            names: HashMap::new(),
            order: Vec::new(),
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            legacy_prefixes: false,
        }
    }

    /// Set the retry cap for generated names
    pub fn with_max_name_attempts(mut self, attempts: u32) -> Self {
        self.max_name_attempts = attempts.max(1);
        self
    }

    /// Enable kind inference from legacy name prefixes
    pub fn with_legacy_prefixes(mut self, enabled: bool) -> Self {
        self.legacy_prefixes = enabled;
        self
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check if a handle refers to a live state
    pub fn contains(&self, id: StateId) -> bool {
        self.get(id).is_some()
    }

    /// Check if a name is taken
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Get a state
    pub fn get(&self, id: StateId) -> Option<&State> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_ref())
    }

    /// Get a mutable state (name and transitions stay graph-controlled)
    pub fn get_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_mut())
    }

    fn state(&self, id: StateId) -> Result<&State> {
        self.get(id).ok_or(SequencerError::InvalidHandle)
    }

    fn state_mut(&mut self, id: StateId) -> Result<&mut State> {
        self.get_mut(id).ok_or(SequencerError::InvalidHandle)
    }

    /// Look up a handle by name
    pub fn id_of(&self, name: &str) -> Option<StateId> {
        self.names.get(name).copied()
    }

    /// Look up a handle by name, failing with `UnknownState`
    pub fn resolve(&self, name: &str) -> Result<StateId> {
        self.id_of(name)
            .ok_or_else(|| SequencerError::UnknownState(name.to_string()))
    }

    /// Get the name of a state
    pub fn name_of(&self, id: StateId) -> Option<&str> {
        self.get(id).map(State::name)
    }

    /// Handles in authoring order
    pub fn ids(&self) -> &[StateId] {
        &self.order
    }

    /// Iterate states in authoring order
    pub fn iter(&self) -> impl Iterator<Item = (StateId, &State)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.get(id).map(|state| (id, state)))
    }

    /// Insert a fully built state
    pub fn insert(&mut self, mut state: State) -> Result<StateId> {
        if self.names.contains_key(&state.name) {
            return Err(SequencerError::NameCollision(state.name));
        }
        self.apply_naming_convention(&mut state);

        let id = match self.free_list.pop() {
            Some(index) => StateId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    state: None,
                });
                StateId { index, generation: 0 }
            }
        };

        // Only handles that are live in this graph survive
        state.transitions.retain(|&t| self.contains(t));
        state.transitions = self.sorted_by_name(std::mem::take(&mut state.transitions));

        self.names.insert(state.name.clone(), id);
        self.slots[id.index as usize].state = Some(state);
        self.order.push(id);
        Ok(id)
    }

    /// Add a new timed state
    pub fn add_state(&mut self, name: impl Into<String>, group: impl Into<String>) -> Result<StateId> {
        self.insert(State::new(name, group))
    }

    /// Add a state named `prefix` + the first free number starting at 1
    pub fn add_state_auto(&mut self, prefix: &str, group: impl Into<String>) -> Result<StateId> {
        let name = (1..=self.max_name_attempts)
            .map(|i| format!("{}{}", prefix, i))
            .find(|name| !self.names.contains_key(name))
            .ok_or_else(|| SequencerError::TooManyStates {
                base: prefix.to_string(),
                attempts: self.max_name_attempts,
            })?;
        self.add_state(name, group)
    }

    /// Duplicate a state, keeping its outgoing transitions
    pub fn duplicate_state(&mut self, source: StateId) -> Result<StateId> {
        let original = self.state(source)?.clone();

        let mut candidate = next_name(&original.name);
        let mut attempts = 1;
        while self.names.contains_key(&candidate) {
            if attempts >= self.max_name_attempts {
                return Err(SequencerError::TooManyStates {
                    base: original.name,
                    attempts,
                });
            }
            candidate = next_name(&candidate);
            attempts += 1;
        }

        let mut copy = original;
        copy.name = candidate;
        self.insert(copy)
    }

    /// Rename a state
    pub fn rename_state(&mut self, id: StateId, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        let old_name = self.state(id)?.name.clone();
        if old_name == new_name {
            return Ok(());
        }
        if self.names.contains_key(&new_name) {
            return Err(SequencerError::NameCollision(new_name));
        }

        self.names.remove(&old_name);
        self.names.insert(new_name.clone(), id);

        let legacy = self.legacy_prefixes;
        let state = self.state_mut(id)?;
        state.name = new_name;
        if legacy {
            if let Some(kind) = StateKind::from_legacy_name(&state.name) {
                state.kind = kind;
            }
        }

        // Keep ascending-name order in every list that points here
        let referrers: Vec<StateId> = self
            .iter()
            .filter(|(_, s)| s.has_transition(id))
            .map(|(sid, _)| sid)
            .collect();
        for referrer in referrers {
            self.resort_transitions(referrer);
        }
        Ok(())
    }

    /// Remove a state and purge it from every transition set
    pub fn remove_state(&mut self, id: StateId) -> Result<State> {
        self.state(id)?;

        let slot = &mut self.slots[id.index as usize];
        let state = slot.state.take().ok_or(SequencerError::InvalidHandle)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);

        self.names.remove(&state.name);
        self.order.retain(|&other| other != id);
        for slot in &mut self.slots {
            if let Some(other) = slot.state.as_mut() {
                other.transitions.retain(|&t| t != id);
            }
        }
        Ok(state)
    }

    /// Add a transition; returns `false` if it already existed
    pub fn add_transition(&mut self, from: StateId, to: StateId) -> Result<bool> {
        self.state(to)?;
        if from == to {
            return Err(SequencerError::InvalidTransition(format!(
                "'{}' cannot transition to itself",
                self.state(from)?.name
            )));
        }
        if self.state(from)?.has_transition(to) {
            return Ok(false);
        }

        // Insert at the ascending-name position
        let target_name = self.state(to)?.name.clone();
        let pos = {
            let from_state = self.state(from)?;
            from_state
                .transitions
                .iter()
                .position(|&t| self.name_of(t).map(|n| n > target_name.as_str()).unwrap_or(false))
                .unwrap_or(from_state.transitions.len())
        };
        self.state_mut(from)?.transitions.insert(pos, to);
        Ok(true)
    }

    /// Remove a transition; returns `false` if it was absent
    pub fn remove_transition(&mut self, from: StateId, to: StateId) -> Result<bool> {
        let state = self.state_mut(from)?;
        let before = state.transitions.len();
        state.transitions.retain(|&t| t != to);
        Ok(state.transitions.len() != before)
    }

    /// Replace the whole transition set of a state
    pub fn set_transitions(&mut self, from: StateId, targets: &[StateId]) -> Result<()> {
        self.state(from)?;
        for &target in targets {
            self.state(target)?;
            if target == from {
                return Err(SequencerError::InvalidTransition(format!(
                    "'{}' cannot transition to itself",
                    self.state(from)?.name
                )));
            }
        }

        let mut unique: Vec<StateId> = Vec::with_capacity(targets.len());
        for &target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        let sorted = self.sorted_by_name(unique);
        self.state_mut(from)?.transitions = sorted;
        Ok(())
    }

    /// Set the kind of a state
    pub fn set_kind(&mut self, id: StateId, kind: StateKind) -> Result<()> {
        self.state_mut(id)?.kind = kind;
        Ok(())
    }

    /// Set the duration of a state (clamped to be non-negative)
    pub fn set_duration(&mut self, id: StateId, duration: f32) -> Result<()> {
        self.state_mut(id)?.duration = duration.max(0.0);
        Ok(())
    }

    /// Set the entry flags of a state
    pub fn set_flags(&mut self, id: StateId, flags: impl Into<String>) -> Result<()> {
        self.state_mut(id)?.set_flags = flags.into();
        Ok(())
    }

    /// Move a state to another group
    pub fn set_group(&mut self, id: StateId, group: impl Into<String>) -> Result<()> {
        self.state_mut(id)?.group = group.into();
        Ok(())
    }

    /// Distinct groups in authoring order
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for (_, state) in self.iter() {
            if !state.group.is_empty() && !groups.contains(&state.group.as_str()) {
                groups.push(&state.group);
            }
        }
        groups
    }

    /// States in a group, in authoring order
    pub fn states_in_group(&self, group: &str) -> Vec<StateId> {
        self.iter()
            .filter(|(_, s)| s.group == group)
            .map(|(id, _)| id)
            .collect()
    }

    /// Rename a group; returns the number of states moved
    pub fn rename_group(&mut self, old: &str, new: &str) -> usize {
        let mut count = 0;
        for slot in &mut self.slots {
            if let Some(state) = slot.state.as_mut() {
                if state.group == old {
                    state.group = new.to_string();
                    count += 1;
                }
            }
        }
        count
    }

    /// First unused `Group_N` label
    pub fn next_group_name(&self) -> Result<String> {
        let groups = self.groups();
        (1..=self.max_name_attempts)
            .map(|i| format!("Group_{}", i))
            .find(|name| !groups.contains(&name.as_str()))
            .ok_or(SequencerError::TooManyStates {
                base: "Group_".to_string(),
                attempts: self.max_name_attempts,
            })
    }

    /// Swap a state with the previous member of its group
    pub fn move_up(&mut self, id: StateId) -> bool {
        self.swap_in_group(id, false)
    }

    /// Swap a state with the next member of its group
    pub fn move_down(&mut self, id: StateId) -> bool {
        self.swap_in_group(id, true)
    }

    fn swap_in_group(&mut self, id: StateId, forward: bool) -> bool {
        let group = match self.get(id) {
            Some(state) => state.group.clone(),
            None => return false,
        };
        let members: Vec<usize> = self
            .order
            .iter()
            .enumerate()
            .filter(|&(_, &sid)| self.get(sid).map(|s| s.group == group).unwrap_or(false))
            .map(|(pos, _)| pos)
            .collect();

        let Some(at) = members.iter().position(|&pos| self.order[pos] == id) else {
            return false;
        };
        let other = if forward {
            members.get(at + 1)
        } else {
            at.checked_sub(1).and_then(|i| members.get(i))
        };
        match other {
            Some(&other) => {
                self.order.swap(members[at], other);
                true
            }
            None => false,
        }
    }

    /// Reorder states ascending by name
    pub fn sort_by_name(&mut self) {
        let order = std::mem::take(&mut self.order);
        self.order = self.sorted_by_name(order);
    }

    /// States that may be offered as new transitions from `from`
    pub fn transition_candidates(&self, from: StateId) -> Result<Vec<StateId>> {
        let source = self.state(from)?;
        Ok(self
            .iter()
            .filter(|&(id, target)| {
                id != from && !source.has_transition(id) && source.kind.pairs_with(target.kind)
            })
            .map(|(id, _)| id)
            .collect())
    }

    fn sorted_by_name(&self, mut ids: Vec<StateId>) -> Vec<StateId> {
        ids.sort_by(|a, b| {
            let a = self.name_of(*a).unwrap_or("");
            let b = self.name_of(*b).unwrap_or("");
            a.cmp(b)
        });
        ids
    }

    fn resort_transitions(&mut self, id: StateId) {
        let transitions = match self.get_mut(id) {
            Some(state) => std::mem::take(&mut state.transitions),
            None => return,
        };
        let sorted = self.sorted_by_name(transitions);
        if let Some(state) = self.get_mut(id) {
            state.transitions = sorted;
        }
    }

    fn apply_naming_convention(&self, state: &mut State) {
        if self.legacy_prefixes {
            if let Some(kind) = StateKind::from_legacy_name(&state.name) {
                state.kind = kind;
            }
        }
    }
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, state)| {
                let targets: Vec<&str> = state
                    .transitions
                    .iter()
                    .filter_map(|&t| self.name_of(t))
                    .collect();
                (state.name(), targets)
            }))
            .finish()
    }
}
