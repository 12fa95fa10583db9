//! Hostname allow-list.
//!
//! Entries are matched against the hostname as written in the URL, never
//! against an address the hostname resolves to. Letting a resolved address
//! satisfy the allow-list would let anyone point a domain at an allow-listed IP.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// A single allow-list entry.
#[derive(Debug, Clone)]
pub enum AllowEntry {
    /// Exact, case-sensitive match against the hostname.
    Literal(String),
    /// Regular expression tested against the hostname. Not implicitly anchored.
    Pattern(Regex),
}

impl AllowEntry {
    /// A literal hostname entry.
    pub fn literal(host: impl Into<String>) -> Self {
        Self::Literal(host.into())
    }

    /// Compile a pattern entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn pattern(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|source| Error::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Does this entry match `host`?
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == host,
            Self::Pattern(regex) => regex.is_match(host),
        }
    }

    /// The literal text or pattern source.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(literal) => literal,
            Self::Pattern(regex) => regex.as_str(),
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

// Patterns compare by source text; inline flags like `(?i)` are part of it.
impl PartialEq for AllowEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for AllowEntry {}

impl From<&str> for AllowEntry {
    fn from(host: &str) -> Self {
        Self::Literal(host.to_string())
    }
}

impl From<String> for AllowEntry {
    fn from(host: String) -> Self {
        Self::Literal(host)
    }
}

impl From<Regex> for AllowEntry {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl fmt::Display for AllowEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// On-disk form: a bare string is a literal, `{ pattern = "..." }` is a regex.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Literal(String),
    Pattern { pattern: String },
}

impl<'de> Deserialize<'de> for AllowEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawEntry::deserialize(deserializer)? {
            RawEntry::Literal(host) => Ok(Self::Literal(host)),
            RawEntry::Pattern { pattern } => {
                Self::pattern(&pattern).map_err(serde::de::Error::custom)
            }
        }
    }
}

impl Serialize for AllowEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(host) => RawEntry::Literal(host.clone()),
            Self::Pattern(regex) => RawEntry::Pattern {
                pattern: regex.as_str().to_string(),
            },
        }
        .serialize(serializer)
    }
}

/// Ordered collection of [`AllowEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<AllowEntry>,
}

impl AllowList {
    pub fn new(entries: Vec<AllowEntry>) -> Self {
        Self { entries }
    }

    /// The first entry matching `host`, if any.
    pub fn find_match(&self, host: &str) -> Option<&AllowEntry> {
        self.entries.iter().find(|entry| entry.matches(host))
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        self.find_match(host).is_some()
    }

    /// Append entries.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = AllowEntry>) {
        self.entries.extend(entries);
    }

    /// Remove every entry equal by value to one of `entries`.
    pub fn remove(&mut self, entries: impl IntoIterator<Item = AllowEntry>) {
        let doomed: Vec<AllowEntry> = entries.into_iter().collect();
        self.entries.retain(|entry| !doomed.contains(entry));
    }

    /// An owned copy of the entries.
    pub fn to_vec(&self) -> Vec<AllowEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
