//! Error taxonomy (spec §7): schema loading, payload validation, and
//! wire framing each get their own enum rather than one catch-all, the
//! way the grounding crate splits `dictionary::Error` from its
//! messages-side codec errors.

use thiserror::Error;

/// Failures while resolving an XML document into a [`crate::model::Protocol`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate field definition: {0}")]
    DuplicateField(String),
    #[error("duplicate component definition: {0}")]
    DuplicateComponent(String),
    #[error("duplicate message definition: {0}")]
    DuplicateMessage(String),
    #[error("component or group `{referrer}` is empty")]
    EmptyContainer { referrer: String },
    #[error("`{referrer}` declares child `{name}` more than once")]
    DuplicateChild { referrer: String, name: String },
    #[error("`{referrer}` references undefined field or component `{name}`")]
    UnresolvedReference { name: String, referrer: String },
    #[error("schema defines no `MsgType` field, required to serve as every group's delimiter basis")]
    MissingMsgTypeField,
    #[error("no dictionary document was loaded into this builder")]
    NoDictionaryLoaded,
    #[error("invalid message type: {0}")]
    InvalidMsgType(#[from] crate::xml::MsgTypeError),
    #[error("extension protocol id `{extension}` does not match base protocol id `{base}`")]
    ProtocolMismatch { base: String, extension: String },
    #[error("failed to read schema document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse schema XML: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Failures while turning a caller-supplied payload into wire bytes,
/// or a parsed wire message back into one (spec §7).
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("unknown child `{name}` in `{composite}`")]
    UnknownChild { composite: String, name: String },
    #[error("duplicate child `{name}` in `{composite}`")]
    DuplicateChild { composite: String, name: String },
    #[error("missing required child `{name}` in `{composite}`")]
    MissingRequired { composite: String, name: String },
    #[error("payload sets managed field `{name}`, which is controlled by the envelope")]
    ManagedConflict { name: String },
    #[error("invalid value `{value}` for field `{field}`")]
    InvalidValue { field: String, value: String },
    #[error("field `{field}` expects a scalar value, not a nested payload")]
    ExpectedScalar { field: String },
    #[error("field `{field}` expects raw bytes, not a scalar value")]
    ExpectedBytes { field: String },
    #[error(
        "group `{group}` repetition {index} must start with delimiter `{expected}`, found `{found}`"
    )]
    GroupDelimiterMismatch {
        group: String,
        index: usize,
        expected: String,
        found: String,
    },
    #[error("group `{group}` declares count {declared} but {actual} repetitions were supplied")]
    GroupCountMismatch {
        group: String,
        declared: usize,
        actual: usize,
    },
}

/// Failures while framing or decoding the outermost tag=value stream
/// (spec §4.7, §7).
#[derive(Debug, Error)]
pub enum WireError {
    #[error("incomplete message: need more bytes")]
    NeedMore,
    #[error("message does not begin with a `BeginString` field")]
    MissingBeginString,
    #[error("BeginString mismatch: expected `{expected}`, found `{found}`")]
    BeginStringMismatch { expected: String, found: String },
    #[error("BodyLength mismatch: header declared {declared}, body is {actual} bytes")]
    BodyLengthMismatch { declared: usize, actual: usize },
    #[error("checksum mismatch: expected {expected:03}, found {found:03}")]
    ChecksumMismatch { expected: u8, found: u8 },
    #[error("malformed tag=value field at byte offset {offset}")]
    MalformedField { offset: usize },
    #[error("unknown message type `{0}`")]
    UnknownMessageType(String),
    #[error("unknown tag {tag} in `{context}`")]
    UnknownTag { tag: u16, context: String },
    #[error("tag {tag} appears out of declared order in `{context}`")]
    OutOfOrder { tag: u16, context: String },
    #[error("group `{group}` declares count {declared} but {seen} repetitions were found on the wire")]
    CountMismatch { group: String, declared: usize, seen: usize },
    #[error(transparent)]
    Payload(#[from] PayloadError),
}
