//! State kinds
//!
//! A state's kind decides how its clock behaves. Older documents encoded the kind in
//! the state name (`VS_`, `VT_`, `NAV_state` prefixes); [`StateKind::from_legacy_name`]
//! migrates those.

use serde::{Deserialize, Serialize};

/// Legacy prefix for holding states (matched case-insensitively)
const HOLDING_PREFIX: &str = "NAV_state";
/// Legacy prefix for looping states
const LOOPING_PREFIX: &str = "VS_";
/// Legacy prefix for settle states
const SETTLE_PREFIX: &str = "VT_";

/// Duration policy of a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    /// Counts down its duration, then moves along a random transition
    Timed,
    /// Runs until moved externally
    Looping,
    /// Freezes the clock until a continue command arrives
    Holding,
    /// Timed; as the final hop of a route it closes the navigation on exit
    Settle,
}

impl Default for StateKind {
    fn default() -> Self {
        Self::Timed
    }
}

impl StateKind {
    /// Whether the state has no countdown of its own
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Looping | Self::Holding)
    }

    /// Whether the clock is frozen
    pub fn is_holding(&self) -> bool {
        matches!(self, Self::Holding)
    }

    /// Whether reaching this state ends a navigation only when it is exited
    pub fn defers_navigation_clear(&self) -> bool {
        matches!(self, Self::Settle)
    }

    /// Infer a kind from the naming convention used by older documents.
    ///
    /// Returns `None` when the name carries no recognised prefix.
    pub fn from_legacy_name(name: &str) -> Option<Self> {
        let holding = name
            .get(..HOLDING_PREFIX.len())
            .map(|p| p.eq_ignore_ascii_case(HOLDING_PREFIX))
            .unwrap_or(false);

        if holding {
            Some(Self::Holding)
        } else if name.starts_with(LOOPING_PREFIX) {
            Some(Self::Looping)
        } else if name.starts_with(SETTLE_PREFIX) {
            Some(Self::Settle)
        } else {
            None
        }
    }

    /// Migrate a legacy record (name plus infinite-duration flag) to a kind
    pub fn migrate(name: &str, infinite_duration: bool) -> Self {
        Self::from_legacy_name(name).unwrap_or(if infinite_duration {
            Self::Looping
        } else {
            Self::Timed
        })
    }

    /// Whether a transition between two states of these kinds is offered while editing.
    ///
    /// Looping-to-looping and settle-to-settle pairs are left out of the candidate list.
    pub fn pairs_with(&self, other: StateKind) -> bool {
        !matches!(
            (self, other),
            (Self::Looping, Self::Looping) | (Self::Settle, Self::Settle)
        )
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timed => write!(f, "timed"),
            Self::Looping => write!(f, "looping"),
            Self::Holding => write!(f, "holding"),
            Self::Settle => write!(f, "settle"),
        }
    }
}

impl std::str::FromStr for StateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "timed" => Ok(Self::Timed),
            "looping" | "loop" | "infinite" => Ok(Self::Looping),
            "holding" | "hold" => Ok(Self::Holding),
            "settle" => Ok(Self::Settle),
            _ => Err(format!("Unknown state kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_prefixes() {
        assert_eq!(StateKind::from_legacy_name("NAV_state_wait"), Some(StateKind::Holding));
        assert_eq!(StateKind::from_legacy_name("nav_STATE_1"), Some(StateKind::Holding));
        assert_eq!(StateKind::from_legacy_name("VS_idle"), Some(StateKind::Looping));
        assert_eq!(StateKind::from_legacy_name("VT_wave"), Some(StateKind::Settle));
        assert_eq!(StateKind::from_legacy_name("walk"), None);
        assert_eq!(StateKind::from_legacy_name("NAV"), None);
    }

    #[test]
    fn test_migrate_falls_back_to_flag() {
        assert_eq!(StateKind::migrate("walk", true), StateKind::Looping);
        assert_eq!(StateKind::migrate("walk", false), StateKind::Timed);
        // Prefix wins over the stored flag
        assert_eq!(StateKind::migrate("VT_bow", true), StateKind::Settle);
    }

    #[test]
    fn test_kind_properties() {
        assert!(StateKind::Looping.is_infinite());
        assert!(StateKind::Holding.is_infinite());
        assert!(!StateKind::Settle.is_infinite());
        assert!(StateKind::Holding.is_holding());
        assert!(StateKind::Settle.defers_navigation_clear());
        assert!(!StateKind::Timed.defers_navigation_clear());
    }

    #[test]
    fn test_pairing() {
        assert!(!StateKind::Looping.pairs_with(StateKind::Looping));
        assert!(!StateKind::Settle.pairs_with(StateKind::Settle));
        assert!(StateKind::Looping.pairs_with(StateKind::Settle));
        assert!(StateKind::Timed.pairs_with(StateKind::Timed));
    }

    #[test]
    fn test_parse() {
        assert_eq!("Holding".parse::<StateKind>(), Ok(StateKind::Holding));
        assert_eq!("loop".parse::<StateKind>(), Ok(StateKind::Looping));
        assert!("sometimes".parse::<StateKind>().is_err());
    }
}
