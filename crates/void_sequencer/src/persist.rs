//! Document save/load
//!
//! A [`SequenceDocument`] is the persisted form of a sequencer: the state list with
//! transitions stored by name, plus the runtime position. Restoring runs in two
//! passes (create every state, then link transitions) so forward references work.
//! Unknown transition targets, duplicate names and nameless records are dropped with a
//! warning.
//!
//! JSON documents are read leniently: numbers and booleans may also arrive as strings,
//! and a scalar that cannot be read falls back to its default instead of failing the
//! whole document.

use crate::error::PersistError;
use crate::graph::{StateGraph, StateId};
use crate::kind::StateKind;
use crate::router::NavigationSession;
use crate::scheduler::PSEUDO_DURATION;
use crate::sequencer::Sequencer;
use crate::state::{State, DEFAULT_DURATION, DEFAULT_GROUP};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_duration() -> f32 {
    DEFAULT_DURATION
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

/// Tolerant readers for hand-edited and older JSON documents.
///
/// Binary input is not self-describing, so it is always decoded strictly.
mod lenient {
    use crate::kind::StateKind;
    use crate::state::DEFAULT_DURATION;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn maybe_f32(value: Value) -> Option<f32> {
        if value.is_null() {
            return None;
        }
        let parsed = number(&value).map(|n| n as f32).filter(|n| n.is_finite());
        if parsed.is_none() {
            log::warn!("Ignoring non-numeric document value {}", value);
        }
        parsed
    }

    pub fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        if !deserializer.is_human_readable() {
            return f32::deserialize(deserializer);
        }
        Ok(maybe_f32(Value::deserialize(deserializer)?).unwrap_or(DEFAULT_DURATION))
    }

    pub fn optional_f32<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f32>, D::Error> {
        if !deserializer.is_human_readable() {
            return Option::<f32>::deserialize(deserializer);
        }
        Ok(maybe_f32(Value::deserialize(deserializer)?))
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        if !deserializer.is_human_readable() {
            return bool::deserialize(deserializer);
        }
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
            Value::Null => Some(false),
            other => number(other).map(|n| n != 0.0),
        };
        Ok(parsed.unwrap_or_else(|| {
            log::warn!("Ignoring non-boolean document value {}", value);
            false
        }))
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        if !deserializer.is_human_readable() {
            return String::deserialize(deserializer);
        }
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn names<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        if !deserializer.is_human_readable() {
            return Vec::<String>::deserialize(deserializer);
        }
        let value = Value::deserialize(deserializer)?;
        let Value::Array(items) = value else {
            if !value.is_null() {
                log::warn!("Ignoring non-list transitions {}", value);
            }
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                other => {
                    log::warn!("Ignoring non-string transition target {}", other);
                    None
                }
            })
            .collect())
    }

    pub fn kind<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<StateKind>, D::Error> {
        if !deserializer.is_human_readable() {
            return Option::<StateKind>::deserialize(deserializer);
        }
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            Value::String(s) => match s.parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    log::warn!("{}; migrating from the name instead", e);
                    None
                }
            },
            other => {
                log::warn!("Ignoring state kind {}", other);
                None
            }
        })
    }
}

/// One persisted state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateRecord {
    /// Records without a name are skipped on restore
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub infinite_duration: bool,
    #[serde(default = "default_duration", deserialize_with = "lenient::duration")]
    pub duration: f32,
    #[serde(default = "default_group", deserialize_with = "lenient::text")]
    pub group: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub set_flags: String,
    /// Target state names
    #[serde(default, deserialize_with = "lenient::names")]
    pub transitions: Vec<String>,
    /// Absent in older documents; migrated from the name and `InfiniteDuration`
    #[serde(default, deserialize_with = "lenient::kind")]
    pub kind: Option<StateKind>,
}

impl StateRecord {
    fn capture(graph: &StateGraph, state: &State) -> Self {
        Self {
            name: state.name().to_string(),
            infinite_duration: state.infinite_duration(),
            duration: state.duration,
            group: state.group.clone(),
            set_flags: state.set_flags.clone(),
            transitions: state
                .transitions()
                .iter()
                .filter_map(|&id| graph.name_of(id))
                .map(str::to_string)
                .collect(),
            kind: Some(state.kind),
        }
    }

    /// Resolved kind
    pub fn kind(&self) -> StateKind {
        self.kind
            .unwrap_or_else(|| StateKind::migrate(&self.name, self.infinite_duration))
    }
}

/// Persisted sequencer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SequenceDocument {
    #[serde(default)]
    pub states: Vec<StateRecord>,
    /// Name of the current state
    #[serde(default)]
    pub initial_state: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_f32")]
    pub clock: Option<f32>,
    #[serde(default, deserialize_with = "lenient::optional_f32")]
    pub duration: Option<f32>,
    #[serde(default)]
    pub exit_flags: Option<String>,
    #[serde(default)]
    pub selected_group: Option<String>,
}

/// What was dropped while restoring a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Names that appeared more than once; the first record wins
    pub duplicate_states: Vec<String>,
    /// `(from, to)` pairs whose target did not exist or pointed at itself
    pub dropped_transitions: Vec<(String, String)>,
    /// Saved current state that no longer exists
    pub missing_initial_state: Option<String>,
    /// Records skipped because their name was empty
    pub nameless_states: usize,
}

impl RestoreReport {
    /// Whether anything was dropped
    pub fn is_clean(&self) -> bool {
        self.duplicate_states.is_empty()
            && self.dropped_transitions.is_empty()
            && self.missing_initial_state.is_none()
            && self.nameless_states == 0
    }
}

impl SequenceDocument {
    /// Build a graph from the records
    pub fn build_graph(&self, mut graph: StateGraph) -> (StateGraph, RestoreReport) {
        let mut report = RestoreReport::default();
        let mut linked: Vec<(StateId, &StateRecord)> = Vec::with_capacity(self.states.len());

        for record in &self.states {
            if record.name.trim().is_empty() {
                log::warn!("Skipping state record without a name");
                report.nameless_states += 1;
                continue;
            }
            let state = State::new(record.name.clone(), record.group.clone())
                .with_kind(record.kind())
                .with_duration(record.duration)
                .with_flags(record.set_flags.clone());
            match graph.insert(state) {
                Ok(id) => linked.push((id, record)),
                Err(e) => {
                    log::warn!("Skipping state record: {}", e);
                    report.duplicate_states.push(record.name.clone());
                }
            }
        }

        for (from, record) in linked {
            for target in &record.transitions {
                let added = graph
                    .id_of(target)
                    .map(|to| graph.add_transition(from, to).is_ok())
                    .unwrap_or(false);
                if !added {
                    log::warn!(
                        "Dropping transition '{}' -> '{}'",
                        record.name,
                        target
                    );
                    report
                        .dropped_transitions
                        .push((record.name.clone(), target.clone()));
                }
            }
        }

        (graph, report)
    }

    /// Encode in the given format
    pub fn to_bytes(&self, format: DocumentFormat) -> Result<Vec<u8>, PersistError> {
        match format {
            DocumentFormat::Json => serde_json::to_vec_pretty(self)
                .map_err(|e| PersistError::Serialization(e.to_string())),
            DocumentFormat::Binary => {
                bincode::serialize(self).map_err(|e| PersistError::Serialization(e.to_string()))
            }
        }
    }

    /// Decode from the given format
    pub fn from_bytes(bytes: &[u8], format: DocumentFormat) -> Result<Self, PersistError> {
        match format {
            DocumentFormat::Json => serde_json::from_slice(bytes)
                .map_err(|e| PersistError::Deserialization(e.to_string())),
            DocumentFormat::Binary => bincode::deserialize(bytes)
                .map_err(|e| PersistError::Deserialization(e.to_string())),
        }
    }

    /// Read a document, choosing the format from the file extension
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, DocumentFormat::from_path(path))
    }

    /// Write a document, choosing the format from the file extension
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes(DocumentFormat::from_path(path))?)?;
        Ok(())
    }
}

impl Sequencer {
    /// Capture the graph and runtime position
    pub fn snapshot(&self) -> SequenceDocument {
        let current = self.current_state();
        SequenceDocument {
            states: self
                .graph
                .iter()
                .map(|(_, state)| StateRecord::capture(&self.graph, state))
                .collect(),
            initial_state: current.map(|s| s.name().to_string()),
            clock: current.map(|_| self.cursor.clock()),
            duration: current.map(|_| self.cursor.duration()),
            exit_flags: Some(self.exit_flags.clone()),
            selected_group: self.selected_group.clone(),
        }
    }

    /// Replace everything with the document's contents.
    ///
    /// No callbacks fire and no flags are broadcast; any navigation is dropped.
    pub fn restore(&mut self, document: &SequenceDocument) -> RestoreReport {
        let loading = StateGraph::new().with_max_name_attempts(self.config.max_name_attempts);
        let (graph, mut report) = document.build_graph(loading);
        // Explicit kinds win over name prefixes while loading
        self.graph = graph.with_legacy_prefixes(self.config.legacy_prefixes);
        self.session = NavigationSession::new();

        let current = match document.initial_state.as_deref() {
            Some(name) => {
                let id = self.graph.id_of(name);
                if id.is_none() {
                    log::warn!("Saved current state '{}' no longer exists", name);
                    report.missing_initial_state = Some(name.to_string());
                }
                id
            }
            None => None,
        };

        match current.and_then(|id| self.graph.get(id)) {
            Some(state) => {
                let base = if state.infinite_duration() {
                    PSEUDO_DURATION
                } else {
                    state.duration
                };
                let duration = document.duration.unwrap_or(base);
                let clock = document.clock.unwrap_or(base);
                self.cursor.restore(current, clock, duration);
            }
            None => self.cursor.restore(None, 0.0, PSEUDO_DURATION),
        }

        if let Some(flags) = &document.exit_flags {
            self.exit_flags = flags.clone();
        }

        let groups = self.graph.groups();
        self.selected_group = match document.selected_group.as_deref() {
            Some(group) if groups.contains(&group) => Some(group.to_string()),
            _ => groups.first().map(|g| g.to_string()),
        };

        log::info!(
            "Restored {} states (current: {})",
            self.graph.len(),
            self.current_name().unwrap_or("none")
        );
        report
    }
}

/// Document encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// JSON (human readable)
    Json,
    /// Binary (compact)
    Binary,
}

impl Default for DocumentFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl DocumentFormat {
    /// File extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "seq",
        }
    }

    /// `.seq` is binary, anything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("seq") => Self::Binary,
            _ => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SequencerConfig;

    fn sample() -> Sequencer {
        let mut seq = Sequencer::new(SequencerConfig {
            seed: Some(1),
            ..SequencerConfig::default()
        });
        let graph = seq.graph_mut();
        let idle = graph.add_state("idle", "Base").unwrap();
        let walk = graph
            .insert(
                State::new("walk", "Base")
                    .with_duration(2.0)
                    .with_flags("moving"),
            )
            .unwrap();
        let wave = graph
            .insert(State::new("wave", "Social").with_kind(StateKind::Settle))
            .unwrap();
        graph.add_transition(idle, walk).unwrap();
        graph.add_transition(walk, wave).unwrap();
        graph.add_transition(wave, idle).unwrap();
        seq.set_exit_flags("!busy");
        seq.set_selected_group(Some("Social".into()));
        seq.switch_state(Some("walk")).unwrap();
        seq.tick(0.5);
        seq
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let seq = sample();
        let document = seq.snapshot();
        assert_eq!(document.initial_state.as_deref(), Some("walk"));
        assert_eq!(document.clock, Some(1.5));

        let mut restored = Sequencer::default();
        let report = restored.restore(&document);
        assert!(report.is_clean());
        assert_eq!(restored.current_name(), Some("walk"));
        assert_eq!(restored.clock(), 1.5);
        assert_eq!(restored.exit_flags(), "!busy");
        assert_eq!(restored.snapshot(), document);
    }

    #[test]
    fn test_restore_fires_no_callbacks() {
        let document = sample().snapshot();
        let mut restored = Sequencer::default();
        restored.restore(&document);
        assert!(restored.events().is_empty());
    }

    #[test]
    fn test_forward_references_and_unknown_targets() {
        let json = r#"{
            "States": [
                { "Name": "a", "Transitions": ["b", "ghost", "a"] },
                { "Name": "b", "Transitions": [] },
                { "Name": "a", "Duration": 9.0 }
            ]
        }"#;
        let document: SequenceDocument = serde_json::from_str(json).unwrap();

        let mut seq = Sequencer::default();
        let report = seq.restore(&document);

        assert_eq!(seq.graph().len(), 2);
        let a = seq.graph().id_of("a").unwrap();
        let b = seq.graph().id_of("b").unwrap();
        assert_eq!(seq.graph().get(a).unwrap().transitions(), &[b]);
        assert_eq!(seq.graph().get(a).unwrap().duration, 3.0);
        assert_eq!(report.duplicate_states, vec!["a".to_string()]);
        assert_eq!(
            report.dropped_transitions,
            vec![
                ("a".to_string(), "ghost".to_string()),
                ("a".to_string(), "a".to_string())
            ]
        );
        assert_eq!(seq.current(), None);
        assert_eq!(seq.duration(), 1.0);
    }

    #[test]
    fn test_legacy_records_migrate() {
        let json = r#"{
            "States": [
                { "Name": "VS_idle", "InfiniteDuration": true },
                { "Name": "VT_wave" },
                { "Name": "nav_state_wait" },
                { "Name": "sit", "InfiniteDuration": true },
                { "Name": "VS_explicit", "Kind": "Timed" }
            ],
            "InitialState": "VS_idle",
            "Clock": 50.0
        }"#;
        let document: SequenceDocument = serde_json::from_str(json).unwrap();
        let mut seq = Sequencer::default();
        seq.restore(&document);

        let kind = |name: &str| seq.graph().get(seq.graph().id_of(name).unwrap()).unwrap().kind;
        assert_eq!(kind("VS_idle"), StateKind::Looping);
        assert_eq!(kind("VT_wave"), StateKind::Settle);
        assert_eq!(kind("nav_state_wait"), StateKind::Holding);
        assert_eq!(kind("sit"), StateKind::Looping);
        assert_eq!(kind("VS_explicit"), StateKind::Timed);

        // Infinite current state: pseudo duration, clock clamped
        assert_eq!(seq.duration(), 1.0);
        assert_eq!(seq.clock(), 1.0);
    }

    #[test]
    fn test_string_scalars_are_accepted() {
        let json = r#"{
            "States": [
                { "Name": "A", "InfiniteDuration": "false", "Duration": "2", "Transitions": ["B"] },
                { "Name": "B", "InfiniteDuration": "true", "Duration": "junk", "Kind": "sideways" }
            ],
            "InitialState": "A",
            "Clock": "1.5",
            "Duration": "2.0"
        }"#;
        let document =
            SequenceDocument::from_bytes(json.as_bytes(), DocumentFormat::Json).unwrap();
        assert_eq!(document.clock, Some(1.5));
        assert_eq!(document.states[1].duration, 3.0);
        assert_eq!(document.states[1].kind, None);

        let mut seq = Sequencer::default();
        assert!(seq.restore(&document).is_clean());

        let a = seq.graph().get(seq.graph().id_of("A").unwrap()).unwrap();
        assert_eq!(a.kind, StateKind::Timed);
        assert_eq!(a.duration, 2.0);
        let b = seq.graph().get(seq.graph().id_of("B").unwrap()).unwrap();
        assert_eq!(b.kind, StateKind::Looping);
        assert_eq!(seq.current_name(), Some("A"));
        assert_eq!(seq.clock(), 1.5);
    }

    #[test]
    fn test_nameless_record_skipped() {
        let json = r#"{"States":[{"Duration":2.0},{"Name":"B","Transitions":["", 7]}]}"#;
        let document =
            SequenceDocument::from_bytes(json.as_bytes(), DocumentFormat::Json).unwrap();

        let mut seq = Sequencer::default();
        let report = seq.restore(&document);
        assert_eq!(report.nameless_states, 1);
        assert!(!report.is_clean());
        assert_eq!(seq.graph().len(), 1);
        assert!(seq.graph().contains_name("B"));
        let b = seq.graph().get(seq.graph().id_of("B").unwrap()).unwrap();
        assert!(b.transitions().is_empty());
    }

    #[test]
    fn test_missing_initial_state() {
        let document = SequenceDocument {
            states: vec![],
            initial_state: Some("gone".into()),
            ..SequenceDocument::default()
        };
        let mut seq = Sequencer::default();
        let report = seq.restore(&document);
        assert_eq!(report.missing_initial_state.as_deref(), Some("gone"));
        assert_eq!(seq.current(), None);
    }

    #[test]
    fn test_binary_roundtrip() {
        let document = sample().snapshot();
        let bytes = document.to_bytes(DocumentFormat::Binary).unwrap();
        let decoded = SequenceDocument::from_bytes(&bytes, DocumentFormat::Binary).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn test_path_format_detection() {
        let dir = tempfile::tempdir().unwrap();
        let document = sample().snapshot();

        let binary = dir.path().join("npc.seq");
        document.save_to_path(&binary).unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&std::fs::read(&binary).unwrap()).is_err());
        assert_eq!(SequenceDocument::load_from_path(&binary).unwrap(), document);

        let json = dir.path().join("npc.json");
        document.save_to_path(&json).unwrap();
        assert_eq!(SequenceDocument::load_from_path(&json).unwrap(), document);
    }
}
