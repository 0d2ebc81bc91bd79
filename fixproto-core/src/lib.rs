//! Scalar wire types shared between the FIX schema loader and the
//! runtime composite model.
//!
//! Nothing in this crate knows about the XML schema or the composite
//! graph built from it; it only deals with how a single scalar value is
//! represented once you already know its declared [`FieldType`].

mod fixstr;
pub mod types;

pub use fixstr::{FixStr, FixStrError, FixString};

/// The FIX field separator, SOH (0x01).
pub const SOH: u8 = 0x01;

/// Wire names of the four composites the serializer computes itself.
/// Callers must never supply these in a payload (spec §3 "Managed
/// composites").
pub const MANAGED_FIELDS: [&str; 4] = ["BeginString", "BodyLength", "MsgType", "CheckSum"];

pub fn is_managed_field(name: &str) -> bool {
    MANAGED_FIELDS.contains(&name)
}

/// Renders raw wire bytes with every SOH shown as `" | "`, for logging
/// and error messages. Not an inverse of any serialization (spec §4.8):
/// a humanized string cannot be parsed back.
pub fn humanize(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\u{1}', " | ")
}
