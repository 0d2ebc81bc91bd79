//! The caller-facing value representation: an ordered sequence of
//! (child name, value) pairs (spec §3 "sequence of alternating
//! (child-name, child-value) pairs, preserving caller's order").
//!
//! Scalars travel as their canonical FIX wire-format string (the
//! engine itself does the numeric/decimal/date rendering); `DATA` and
//! `XMLDATA` travel as raw bytes since they may legitimately contain
//! the field separator.

/// One field's worth of value, or a nested composite's own payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Canonical wire-format text for every scalar type except
    /// `DATA`/`XMLDATA`.
    Str(String),
    /// Raw bytes for `DATA`/`XMLDATA`, length-delimited rather than
    /// separator-delimited.
    Bytes(Vec<u8>),
    /// A single nested `Component`.
    Component(Payload),
    /// Zero or more repetitions of a `Group`.
    Group(Vec<Payload>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

pub type Payload = Vec<(String, Value)>;
