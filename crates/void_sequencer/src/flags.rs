//! Flag signaling
//!
//! Flags are string tokens broadcast to another subsystem. A bare token sets a flag,
//! a token prefixed with `!` clears it, and several tokens travel comma-joined in a
//! single broadcast: `"nav,!idle"`.

use std::fmt;

/// Marker that turns a token into a clear
pub const NEGATION_MARKER: char = '!';

/// Receives flag broadcasts
pub trait FlagBroadcaster: Send {
    /// Deliver a comma-joined flag string (never empty)
    fn broadcast(&mut self, flags: &str);
}

impl<F> FlagBroadcaster for F
where
    F: FnMut(&str) + Send,
{
    fn broadcast(&mut self, flags: &str) {
        self(flags)
    }
}

/// A single flag token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flag {
    /// Flag name
    pub name: String,
    /// Whether this token clears the flag
    pub clear: bool,
}

impl Flag {
    /// A token that sets `name`
    pub fn set(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clear: false,
        }
    }

    /// A token that clears `name`
    pub fn clear(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clear: true,
        }
    }

    /// Parse one token; empty tokens yield `None`
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        match token.strip_prefix(NEGATION_MARKER) {
            Some(name) if !name.trim().is_empty() => Some(Self::clear(name.trim())),
            Some(_) => None,
            None if token.is_empty() => None,
            None => Some(Self::set(token)),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clear {
            write!(f, "{}{}", NEGATION_MARKER, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// An ordered list of flag tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flags: Vec<Flag>,
}

impl FlagSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-joined flag string, skipping empty tokens
    pub fn parse(flags: &str) -> Self {
        Self {
            flags: flags.split(',').filter_map(Flag::parse).collect(),
        }
    }

    /// Append a token
    pub fn push(&mut self, flag: Flag) {
        self.flags.push(flag);
    }

    /// Append every token of another set
    pub fn extend(&mut self, other: FlagSet) {
        self.flags.extend(other.flags);
    }

    /// Iterate tokens
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags broadcast when navigation starts
    pub fn navigation_started(token: &str) -> Self {
        let mut set = Self::new();
        set.push(Flag::set(token));
        set
    }

    /// Flags broadcast when navigation is cleared: the negated navigation token
    /// followed by the configured extra exit flags
    pub fn navigation_cleared(token: &str, exit_flags: &str) -> Self {
        let mut set = Self::new();
        set.push(Flag::clear(token));
        set.extend(Self::parse(exit_flags));
        set
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, flag) in self.flags.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", flag)?;
        }
        Ok(())
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}
