//! Frames a byte buffer into a complete FIX message, validates its
//! envelope, and reconstructs the nested payload against the
//! declaration in a [`Protocol`] (spec §4.7).
//!
//! Framing is delegated to `nom`'s streaming combinators, the same
//! approach the grounding crate's `parser.rs` uses for `RawMessage`:
//! `nom::Err::Incomplete` maps directly onto `WireError::NeedMore`, so
//! a caller that fed a truncated buffer gets told to come back with
//! more bytes rather than seeing a parse error. Walking the tokenized
//! body against the schema is, like the grounding crate's
//! `deserializer.rs`, done by hand rather than with `nom`: the grammar
//! at that point depends on the loaded dictionary, not on a fixed
//! wire shape.

use std::sync::Arc;

use nom::{
    bytes::streaming::{tag, take_until},
    character::streaming::{u32 as dec_u32, u8 as dec_u8},
    sequence::delimited,
    IResult,
};

use crate::{
    error::WireError,
    model::{Group, Member, MemberDefinition, Message, Protocol},
    payload::{Payload, Value},
    xml::FieldType,
};

/// A fully validated, framed message: the matched [`Message`]
/// declaration plus its header/body/trailer payloads and the number
/// of bytes consumed from the input buffer (spec §4.7 step 7).
#[derive(Debug)]
pub struct Parsed {
    pub message: Arc<Message>,
    pub header: Payload,
    pub body: Payload,
    pub trailer: Payload,
    pub consumed: usize,
}

fn begin_string_field(i: &[u8]) -> IResult<&[u8], &[u8]> {
    delimited(tag("8="), take_until("\x01"), tag("\x01"))(i)
}

fn body_length_field(i: &[u8]) -> IResult<&[u8], usize> {
    let (rest, (_, n, _)) = nom::sequence::tuple((tag("9="), dec_u32, tag("\x01")))(i)?;
    Ok((rest, n as usize))
}

fn checksum_field(i: &[u8]) -> IResult<&[u8], u8> {
    delimited(tag("10="), dec_u8, tag("\x01"))(i)
}

fn map_framing_err(err: nom::Err<nom::error::Error<&[u8]>>) -> WireError {
    match err {
        nom::Err::Incomplete(_) => WireError::NeedMore,
        nom::Err::Error(_) | nom::Err::Failure(_) => WireError::MissingBeginString,
    }
}

/// Parses one complete message out of the front of `buffer`. Returns
/// `Err(WireError::NeedMore)` (no bytes consumed) when the buffer
/// holds a prefix of a message; callers accumulate more bytes and
/// retry (spec §4.7).
pub fn parse(protocol: &Protocol, buffer: &[u8]) -> Result<Parsed, WireError> {
    let (after_begin, begin_string) = begin_string_field(buffer).map_err(map_framing_err)?;
    let (after_len, body_len) = body_length_field(after_begin)
        .map_err(|e| if matches!(e, nom::Err::Incomplete(_)) { WireError::NeedMore } else { WireError::MalformedField { offset: buffer.len() - after_begin.len() } })?;

    if after_len.len() < body_len {
        return Err(WireError::NeedMore);
    }
    let body = &after_len[..body_len];
    let after_body = &after_len[body_len..];

    let (after_checksum, declared_checksum) = checksum_field(after_body)
        .map_err(|e| if matches!(e, nom::Err::Incomplete(_)) { WireError::NeedMore } else { WireError::MalformedField { offset: buffer.len() - after_body.len() } })?;

    let checksummed_len = buffer.len() - after_body.len();
    let computed_checksum = buffer[..checksummed_len].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if computed_checksum != declared_checksum {
        return Err(WireError::ChecksumMismatch { expected: computed_checksum, found: declared_checksum });
    }

    if begin_string != protocol.begin_string() {
        return Err(WireError::BeginStringMismatch {
            expected: String::from_utf8_lossy(protocol.begin_string()).into_owned(),
            found: String::from_utf8_lossy(begin_string).into_owned(),
        });
    }

    let consumed = buffer.len() - after_checksum.len();
    let parsed = parse_body(protocol, body)?;
    Ok(Parsed { message: parsed.0, header: parsed.1, body: parsed.2, trailer: parsed.3, consumed })
}

type BodyParts = (Arc<Message>, Payload, Payload, Payload);

fn parse_body(protocol: &Protocol, body: &[u8]) -> Result<BodyParts, WireError> {
    let mut cursor = Cursor { buf: body, offset: 0 };
    let mut data_len_hint: Option<usize> = None;

    let (tag, msg_type_raw) = cursor.take_field(None)?;
    if tag != 35 {
        return Err(WireError::MalformedField { offset: 0 });
    }
    let msg_type_code = std::str::from_utf8(msg_type_raw)
        .ok()
        .and_then(|s| crate::xml::MsgType::from_bytes(s.as_bytes()).ok())
        .ok_or_else(|| WireError::UnknownMessageType(String::from_utf8_lossy(msg_type_raw).into_owned()))?;
    let message = protocol
        .message_by_type(msg_type_code)
        .cloned()
        .ok_or_else(|| WireError::UnknownMessageType(String::from_utf8_lossy(msg_type_raw).into_owned()))?;

    let header = walk_members(&protocol.header().base.members, &mut cursor, "Header", &mut data_len_hint, false)?;
    let msg_body = walk_members(&message.base.members, &mut cursor, message.name(), &mut data_len_hint, false)?;
    let trailer = walk_members(&protocol.trailer().base.members, &mut cursor, "Trailer", &mut data_len_hint, false)?;

    if let Some(tag) = cursor.peek_tag()? {
        return Err(WireError::UnknownTag { tag, context: "message".to_string() });
    }

    Ok((message, header, msg_body, trailer))
}

struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn peek_tag(&self) -> Result<Option<u16>, WireError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let eq = memchr::memchr(b'=', self.buf).ok_or(WireError::MalformedField { offset: self.offset })?;
        if eq == 0 {
            return Err(WireError::MalformedField { offset: self.offset });
        }
        let tag_str = std::str::from_utf8(&self.buf[..eq]).map_err(|_| WireError::MalformedField { offset: self.offset })?;
        let tag: u16 = tag_str.parse().map_err(|_| WireError::MalformedField { offset: self.offset })?;
        Ok(Some(tag))
    }

    /// Consumes one `tag=value` field. `data_len`, when set, takes
    /// exactly that many raw bytes as the value regardless of any
    /// embedded SOH (spec §9 Open Question (c): DATA fields are
    /// length-prefixed, not separator-delimited).
    fn take_field(&mut self, data_len: Option<usize>) -> Result<(u16, &'a [u8]), WireError> {
        let eq = memchr::memchr(b'=', self.buf).ok_or(WireError::MalformedField { offset: self.offset })?;
        if eq == 0 {
            return Err(WireError::MalformedField { offset: self.offset });
        }
        let tag_str = std::str::from_utf8(&self.buf[..eq]).map_err(|_| WireError::MalformedField { offset: self.offset })?;
        let tag: u16 = tag_str.parse().map_err(|_| WireError::MalformedField { offset: self.offset })?;
        let rest = &self.buf[eq + 1..];
        let (value, after) = match data_len {
            Some(n) => {
                if rest.len() < n + 1 || rest[n] != fixproto_core::SOH {
                    return Err(WireError::MalformedField { offset: self.offset });
                }
                (&rest[..n], &rest[n + 1..])
            }
            None => {
                let soh = memchr::memchr(fixproto_core::SOH, rest).ok_or(WireError::MalformedField { offset: self.offset })?;
                (&rest[..soh], &rest[soh + 1..])
            }
        };
        self.offset += self.buf.len() - after.len();
        self.buf = after;
        Ok((tag, value))
    }
}

/// Whether `member` is the direct owner of `tag` at this level.
/// Components are transparent (their inner tags belong to them
/// recursively); groups are only matched by their own NUMINGROUP tag
/// here — the repetitions themselves are consumed by [`parse_group`].
fn member_reaches(member: &Member, tag: u16) -> bool {
    match &member.definition {
        MemberDefinition::Field(field) => field.number == tag,
        MemberDefinition::Component(component) => component.base.reachable_tags().contains(&tag),
        MemberDefinition::Group(group) => group.num_in_group.number == tag,
    }
}

fn owner_index(members: &[Member], tag: u16) -> Option<usize> {
    members.iter().position(|m| member_reaches(m, tag))
}

/// Consumes as many of `members`' tags as appear next on the wire, in
/// declared order, recursing into components and groups (spec §4.7
/// step 6).
///
/// `repetition_mode` is set only when walking one repetition of a
/// group's own members: there, encountering a tag that belongs to an
/// *earlier* position (almost always the delimiter reappearing) ends
/// the repetition rather than signalling `Duplicate`/`OutOfOrder` —
/// per spec §4.4, the delimiter's reappearance is exactly what begins
/// the next repetition.
fn walk_members(
    members: &[Member],
    cursor: &mut Cursor,
    owner: &str,
    data_len_hint: &mut Option<usize>,
    repetition_mode: bool,
) -> Result<Payload, WireError> {
    let mut payload = Vec::new();
    let mut consumed = vec![false; members.len()];
    let mut pointer = 0usize;
    let mut last_idx: Option<usize> = None;

    loop {
        let Some(tag) = cursor.peek_tag()? else { break };
        let Some(idx) = owner_index(members, tag) else { break };

        if idx < pointer {
            if repetition_mode {
                break;
            }
            if last_idx == Some(idx) {
                return Err(crate::error::PayloadError::DuplicateChild {
                    composite: owner.to_string(),
                    name: members[idx].name().to_string(),
                }
                .into());
            }
            return Err(WireError::OutOfOrder { tag, context: owner.to_string() });
        }

        match &members[idx].definition {
            MemberDefinition::Field(field) => {
                let data_len = matches!(field.field_type, FieldType::Data | FieldType::XmlData)
                    .then(|| data_len_hint.take())
                    .flatten();
                let (_, raw) = cursor.take_field(data_len)?;
                if field.field_type == FieldType::Length {
                    let n: usize = std::str::from_utf8(raw)
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .ok_or(WireError::MalformedField { offset: cursor.offset })?;
                    *data_len_hint = Some(n);
                }
                let value = field.deserialize(raw)?;
                payload.push((field.name.clone(), value));
            }
            MemberDefinition::Component(component) => {
                let nested = walk_members(&component.base.members, cursor, &component.base.name, data_len_hint, false)?;
                payload.push((component.base.name.clone(), Value::Component(nested)));
            }
            MemberDefinition::Group(group) => {
                let repetitions = parse_group(group, cursor, data_len_hint)?;
                payload.push((group.name.clone(), Value::Group(repetitions)));
            }
        }
        consumed[idx] = true;
        last_idx = Some(idx);
        pointer = idx + 1;
    }

    for (idx, member) in members.iter().enumerate() {
        if member.required && !consumed[idx] {
            return Err(crate::error::PayloadError::MissingRequired {
                composite: owner.to_string(),
                name: member.name().to_string(),
            }
            .into());
        }
    }
    Ok(payload)
}

fn parse_group(group: &Group, cursor: &mut Cursor, data_len_hint: &mut Option<usize>) -> Result<Vec<Payload>, WireError> {
    let (_, raw) = cursor.take_field(None)?;
    let declared: usize = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(WireError::MalformedField { offset: cursor.offset })?;

    let mut repetitions = Vec::with_capacity(declared);
    for seen in 0..declared {
        match cursor.peek_tag()? {
            Some(tag) if member_reaches(&group.base.members[0], tag) => {
                let repetition = walk_members(&group.base.members, cursor, &group.name, data_len_hint, true)?;
                repetitions.push(repetition);
            }
            _ => {
                return Err(WireError::CountMismatch { group: group.name.clone(), declared, seen });
            }
        }
    }
    if let Some(tag) = cursor.peek_tag()? {
        if member_reaches(&group.base.members[0], tag) {
            return Err(WireError::CountMismatch { group: group.name.clone(), declared, seen: declared + 1 });
        }
    }
    Ok(repetitions)
}
