//! Rust types backing each FIX scalar wire type (spec §3).
//!
//! Numeric and decimal aliases reuse `rust_decimal` and `chrono` rather
//! than hand-rolled parsing, the way the teacher crate's
//! `fields::basic_types` module does.

pub use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
pub use rust_decimal::Decimal;

/// INT, SEQNUM share this on the wire; callers pick the narrower Rust
/// type appropriate to the field (tag numbers fit in `u16`, sequence
/// numbers in `u32`).
pub type Int = i64;
pub type TagNum = u16;
pub type SeqNum = u32;
pub type NumInGroup = u16;

/// FLOAT, PRICE, QTY, AMT, PERCENTAGE, PRICEOFFSET are all
/// arbitrary-precision decimals on the wire.
pub type Float = Decimal;

pub type Boolean = bool;
pub type Char = u8;

/// LENGTH-prefixed raw bytes (DATA, XMLDATA).
pub type Data = Vec<u8>;

pub type UtcTimestamp = DateTime<Utc>;
pub type UtcDateOnly = NaiveDate;
pub type UtcTimeOnly = NaiveTime;
