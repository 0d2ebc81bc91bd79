//! Turns caller payloads into wire bytes (spec §4.1, §4.3, §4.4, §4.6).
//!
//! Scalar rendering borrows the grounding crate's
//! `serializer::Serializer` approach (itoa for integers, `Decimal`'s
//! own `Display` for floats, raw bytes for DATA) but is driven by the
//! runtime [`crate::model::Field`] rather than a generated per-type
//! method, since the set of fields is only known once a schema loads.

use std::str::FromStr;

use fixproto_core::FixStr;
use rust_decimal::Decimal;

use crate::{
    error::PayloadError,
    model::{BaseComposite, Field, Group, MemberDefinition, Message, Protocol},
    payload::Value,
};

impl Field {
    /// Renders this field as a complete `tag=value` span, with no
    /// trailing separator.
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>, PayloadError> {
        let rendered = self.render(value)?;
        let mut out = Vec::with_capacity(rendered.len() + 6);
        let mut buf = itoa::Buffer::new();
        out.extend_from_slice(buf.format(self.number).as_bytes());
        out.push(b'=');
        out.extend_from_slice(&rendered);
        Ok(out)
    }

    fn render(&self, value: &Value) -> Result<Vec<u8>, PayloadError> {
        use crate::xml::FieldType::*;
        match self.field_type {
            Data | XmlData => {
                let bytes = value
                    .as_bytes()
                    .ok_or_else(|| PayloadError::ExpectedBytes { field: self.name.clone() })?;
                Ok(bytes.to_vec())
            }
            _ => {
                let text = value
                    .as_str()
                    .ok_or_else(|| PayloadError::ExpectedScalar { field: self.name.clone() })?;
                self.render_scalar(text)
            }
        }
    }

    fn render_scalar(&self, text: &str) -> Result<Vec<u8>, PayloadError> {
        use crate::xml::FieldType::*;
        let invalid = || PayloadError::InvalidValue { field: self.name.clone(), value: text.to_string() };
        let is_multi_valued = matches!(self.field_type, MultipleCharValue | MultipleStringValue | MultipleValueString);
        let text = if self.enum_values.is_some() && !is_multi_valued {
            self.enum_token_for(text).ok_or_else(invalid)?
        } else {
            text
        };
        match self.field_type {
            Int | SeqNum | NumInGroup | Length => {
                let n: i64 = text.parse().map_err(|_| invalid())?;
                let mut buf = itoa::Buffer::new();
                Ok(buf.format(n).as_bytes().to_vec())
            }
            Float | Qty | Price | PriceOffset | Amt | Percentage => {
                let d = Decimal::from_str(text).map_err(|_| invalid())?;
                Ok(d.to_string().into_bytes())
            }
            Boolean => match text {
                "Y" | "N" => Ok(text.as_bytes().to_vec()),
                _ => Err(invalid()),
            },
            Char => {
                if text.len() == 1 && text.is_ascii() {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(invalid())
                }
            }
            MultipleCharValue => {
                if !text.is_empty() && text.split(' ').all(|tok| tok.len() == 1 && tok.is_ascii()) {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(invalid())
                }
            }
            _ => {
                FixStr::from_ascii(text.as_bytes()).map_err(|_| invalid())?;
                Ok(text.as_bytes().to_vec())
            }
        }
    }
}

/// Shared validation + dispatch for Component, Group repetitions, and
/// Message bodies (spec §4.1's BaseComposite contract). Returns the
/// concatenation of every dispatched child, joined by a single SOH —
/// callers that need a *terminated* block append one more SOH
/// themselves (spec §4.6 step 1).
fn serialize_base(base: &BaseComposite, payload: &[(String, Value)]) -> Result<Vec<u8>, PayloadError> {
    let mut seen = std::collections::HashSet::new();
    let mut chunks = Vec::with_capacity(payload.len());
    for (name, value) in payload {
        if !seen.insert(name.as_str()) {
            return Err(PayloadError::DuplicateChild { composite: base.name.clone(), name: name.clone() });
        }
        let member = base.find(name).ok_or_else(|| PayloadError::UnknownChild {
            composite: base.name.clone(),
            name: name.clone(),
        })?;
        chunks.push(dispatch_member(&member.definition, value)?);
    }
    for member in &base.members {
        if member.required && !payload.iter().any(|(name, _)| name == member.name()) {
            return Err(PayloadError::MissingRequired {
                composite: base.name.clone(),
                name: member.name().to_string(),
            });
        }
    }
    Ok(chunks.join(&fixproto_core::SOH))
}

fn dispatch_member(definition: &MemberDefinition, value: &Value) -> Result<Vec<u8>, PayloadError> {
    match definition {
        MemberDefinition::Field(field) => field.serialize(value),
        MemberDefinition::Component(component) => {
            let nested = match value {
                Value::Component(p) => p,
                _ => return Err(PayloadError::ExpectedScalar { field: component.base.name.clone() }),
            };
            serialize_base(&component.base, nested)
        }
        MemberDefinition::Group(group) => {
            let repetitions = match value {
                Value::Group(g) => g,
                _ => return Err(PayloadError::ExpectedScalar { field: group.name.clone() }),
            };
            serialize_group(group, repetitions)
        }
    }
}

fn serialize_group(group: &Group, repetitions: &[Payload]) -> Result<Vec<u8>, PayloadError> {
    let mut count_buf = itoa::Buffer::new();
    let mut out = Vec::new();
    let mut number_buf = itoa::Buffer::new();
    out.extend_from_slice(number_buf.format(group.num_in_group.number).as_bytes());
    out.push(b'=');
    out.extend_from_slice(count_buf.format(repetitions.len()).as_bytes());

    for (index, repetition) in repetitions.iter().enumerate() {
        match repetition.first() {
            Some((name, _)) if name == &group.first => {}
            Some((name, _)) => {
                return Err(PayloadError::GroupDelimiterMismatch {
                    group: group.name.clone(),
                    index,
                    expected: group.first.clone(),
                    found: name.clone(),
                });
            }
            None => {
                return Err(PayloadError::GroupDelimiterMismatch {
                    group: group.name.clone(),
                    index,
                    expected: group.first.clone(),
                    found: String::new(),
                });
            }
        }
        out.push(fixproto_core::SOH);
        out.extend_from_slice(&serialize_base(&group.base, repetition)?);
    }
    Ok(out)
}

impl Message {
    /// Assembles the full wire envelope (spec §4.6): `BeginString`,
    /// `BodyLength`, `MsgType`, header, body, trailer, `CheckSum`.
    ///
    /// `header`/`body`/`trailer` are three independent payloads rather
    /// than one flat list the engine splits by name: the spec's step 1
    /// treats header and trailer fields as arriving from a source
    /// distinct from `P` (the message's own payload), and the session
    /// layer that would own CompIDs/sequence numbers is out of scope
    /// here, so the caller supplies all three explicitly.
    pub fn serialize(
        &self,
        protocol: &Protocol,
        header: &[(String, Value)],
        body: &[(String, Value)],
        trailer: &[(String, Value)],
    ) -> Result<Vec<u8>, PayloadError> {
        reject_managed_keys(header)?;
        reject_managed_keys(body)?;
        reject_managed_keys(trailer)?;

        let mut envelope_body = Vec::new();
        envelope_body.extend_from_slice(b"35=");
        envelope_body.extend_from_slice(self.msg_type.as_bytes());
        envelope_body.push(fixproto_core::SOH);

        let header_bytes = serialize_base(&protocol.header.base, header)?;
        if !header_bytes.is_empty() {
            envelope_body.extend_from_slice(&header_bytes);
            envelope_body.push(fixproto_core::SOH);
        }

        let body_bytes = serialize_base(&self.base, body)?;
        if !body_bytes.is_empty() {
            envelope_body.extend_from_slice(&body_bytes);
            envelope_body.push(fixproto_core::SOH);
        }

        let trailer_bytes = serialize_base(&protocol.trailer.base, trailer)?;
        if !trailer_bytes.is_empty() {
            envelope_body.extend_from_slice(&trailer_bytes);
            envelope_body.push(fixproto_core::SOH);
        }

        let mut out = Vec::with_capacity(envelope_body.len() + protocol.begin_string.len() + 32);
        out.extend_from_slice(b"8=");
        out.extend_from_slice(&protocol.begin_string);
        out.push(fixproto_core::SOH);
        out.extend_from_slice(b"9=");
        let mut len_buf = itoa::Buffer::new();
        out.extend_from_slice(len_buf.format(envelope_body.len()).as_bytes());
        out.push(fixproto_core::SOH);
        out.extend_from_slice(&envelope_body);

        let checksum = out.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        out.extend_from_slice(format!("10={checksum:03}", checksum = checksum).as_bytes());
        out.push(fixproto_core::SOH);
        Ok(out)
    }
}

fn reject_managed_keys(payload: &[(String, Value)]) -> Result<(), PayloadError> {
    for (name, _) in payload {
        if fixproto_core::is_managed_field(name) {
            return Err(PayloadError::ManagedConflict { name: name.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
