//! Deserialized shape of a FIX XML schema document.
//!
//! This module only concerns itself with getting the raw XML tree into
//! Rust structures via `serde`/`quick-xml`; cross-reference resolution,
//! forward-reference handling, and validation happen one layer up in
//! [`crate::loader`]. Field/Component/Group/Message here are the XML
//! shapes, not yet the resolved composite graph (`crate::model`).

use std::{fmt, str};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

mod required_flag {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "Y" | "YES" | "y" | "yes" => Ok(true),
            "N" | "NO" | "n" | "no" => Ok(false),
            _ => Err(de::Error::custom(format!("invalid `required` flag value: {s}"))),
        }
    }

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_char(if *value { 'Y' } else { 'N' })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Member {
    #[serde(rename = "field")]
    Field(MemberRef),
    #[serde(rename = "component")]
    Component(MemberRef),
    #[serde(rename = "group")]
    Group(Group),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Field(r) => &r.name,
            Member::Component(r) => &r.name,
            Member::Group(g) => &g.name,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Member::Field(r) => r.required,
            Member::Component(r) => r.required,
            Member::Group(g) => g.required,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberRef {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@required")]
    #[serde(with = "required_flag")]
    pub required: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "$value")]
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Trailer {
    #[serde(rename = "$value")]
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "$value")]
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@required")]
    #[serde(with = "required_flag")]
    pub required: bool,
    #[serde(rename = "$value")]
    #[serde(default)]
    pub members: Vec<Member>,
}

/// The closed set of FIX scalar data types (spec §3).
#[derive(Clone, Copy, Debug, Deserialize, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Amt,
    Boolean,
    Char,
    Country,
    Currency,
    Data,
    Exchange,
    Float,
    #[serde(alias = "LONG")]
    Int,
    Language,
    Length,
    LocalMktDate,
    MonthYear,
    MultipleCharValue,
    MultipleStringValue,
    MultipleValueString,
    NumInGroup,
    Percentage,
    Price,
    PriceOffset,
    Qty,
    SeqNum,
    String,
    TzTimeOnly,
    TzTimestamp,
    UtcDateOnly,
    UtcTimeOnly,
    UtcTimestamp,
    XmlData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "@number")]
    pub number: u16,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type")]
    pub field_type: FieldType,
    #[serde(rename = "$value")]
    pub values: Option<Vec<Value>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Value {
    #[serde(rename = "@enum")]
    pub value_enum: String,
    #[serde(rename = "@description")]
    pub description: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MsgCat {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "app")]
    App,
}

#[derive(Debug, thiserror::Error)]
pub enum MsgTypeError {
    #[error("empty message type")]
    Empty,
    #[error("invalid character in message type: {0:#04x}")]
    InvalidChar(u8),
    #[error("message type too long: expected 1-2 bytes, got {0}")]
    TooLong(usize),
}

fn is_valid_char(byte: u8) -> bool {
    matches!(byte, b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z')
}

/// A 1-2 character FIX message type code (spec §3 Message).
#[derive(Clone, Copy, Eq)]
pub struct MsgType {
    buf: [u8; 2],
}

impl MsgType {
    pub fn from_bytes(bytes: &[u8]) -> Result<MsgType, MsgTypeError> {
        match *bytes {
            [] => Err(MsgTypeError::Empty),
            [b0] if is_valid_char(b0) => Ok(MsgType { buf: [b0, 0] }),
            [b0] => Err(MsgTypeError::InvalidChar(b0)),
            [b0, b1] if is_valid_char(b0) && is_valid_char(b1) => Ok(MsgType { buf: [b0, b1] }),
            [b0, b1] => Err(MsgTypeError::InvalidChar(if is_valid_char(b0) { b1 } else { b0 })),
            _ => Err(MsgTypeError::TooLong(bytes.len())),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self.buf {
            [_, 0] => &self.buf[..1],
            [_, _] => &self.buf,
        }
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: validated alphanumeric ASCII at construction.
        unsafe { str::from_utf8_unchecked(self.as_bytes()) }
    }
}

impl fmt::Debug for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MsgType({:?})", self.as_str())
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl str::FromStr for MsgType {
    type Err = MsgTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MsgType::from_bytes(s.as_bytes())
    }
}

impl PartialEq for MsgType {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl std::hash::Hash for MsgType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl Serialize for MsgType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MsgType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = MsgType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string with 1-2 alphanumeric characters")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                MsgType::from_bytes(value.as_bytes()).map_err(|e| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@msgtype")]
    pub msg_type: MsgType,
    #[serde(rename = "@msgcat")]
    pub msg_cat: MsgCat,
    #[serde(rename = "$value")]
    #[serde(default)]
    pub members: Vec<Member>,
}

fn unwrap_messages<'de, D>(deserializer: D) -> Result<Vec<Message>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct List {
        #[serde(default)]
        message: Vec<Message>,
    }
    Ok(List::deserialize(deserializer)?.message)
}

fn unwrap_components<'de, D>(deserializer: D) -> Result<Vec<Component>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct List {
        #[serde(default)]
        component: Vec<Component>,
    }
    Ok(List::deserialize(deserializer)?.component)
}

fn unwrap_fields<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct List {
        #[serde(default)]
        field: Vec<Field>,
    }
    Ok(List::deserialize(deserializer)?.field)
}

/// Root `<fix type="FIX" major="4" minor="4">` document (spec §6).
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "@type")]
    pub fix_type: String,
    #[serde(rename = "@major")]
    pub major: u8,
    #[serde(rename = "@minor")]
    pub minor: u8,
    #[serde(default)]
    pub header: Header,
    #[serde(default)]
    pub trailer: Trailer,
    #[serde(deserialize_with = "unwrap_messages")]
    pub messages: Vec<Message>,
    #[serde(deserialize_with = "unwrap_components")]
    pub components: Vec<Component>,
    #[serde(deserialize_with = "unwrap_fields")]
    pub fields: Vec<Field>,
}

impl Document {
    /// "TYPE.MAJOR.MINOR", e.g. "FIX.4.4" (spec §4.5 step 5).
    pub fn protocol_id(&self) -> String {
        format!("{}.{}.{}", self.fix_type, self.major, self.minor)
    }
}
