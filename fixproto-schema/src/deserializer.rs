//! Turns raw wire bytes for a single field back into a [`Value`] (spec
//! §4.1 `deserialize`), the inverse of [`crate::serializer`]'s
//! `Field::serialize`.
//!
//! Unlike the wire, a resolved [`crate::model::Field`] always tells us
//! its declared type up front, so validation here mirrors
//! `render_scalar` step for step rather than sniffing the shape of the
//! bytes the way a schema-less parser would have to.

use std::str::FromStr;

use fixproto_core::FixStr;
use rust_decimal::Decimal;

use crate::{error::PayloadError, model::Field, payload::Value};

impl Field {
    /// `raw` is the value half of a `tag=value` pair, with no
    /// surrounding separator.
    pub fn deserialize(&self, raw: &[u8]) -> Result<Value, PayloadError> {
        use crate::xml::FieldType::*;
        if matches!(self.field_type, Data | XmlData) {
            return Ok(Value::Bytes(raw.to_vec()));
        }

        let invalid = || PayloadError::InvalidValue {
            field: self.name.clone(),
            value: String::from_utf8_lossy(raw).into_owned(),
        };
        let text = std::str::from_utf8(raw).map_err(|_| invalid())?;

        let is_multi_valued = matches!(self.field_type, MultipleCharValue | MultipleStringValue | MultipleValueString);
        if self.enum_values.is_some() && !is_multi_valued && !self.token_is_known(text) {
            return Err(invalid());
        }

        match self.field_type {
            Int | SeqNum | NumInGroup | Length => {
                text.parse::<i64>().map_err(|_| invalid())?;
            }
            Float | Qty | Price | PriceOffset | Amt | Percentage => {
                Decimal::from_str(text).map_err(|_| invalid())?;
            }
            Boolean => {
                if !matches!(text, "Y" | "N") {
                    return Err(invalid());
                }
            }
            Char => {
                if text.len() != 1 || !text.is_ascii() {
                    return Err(invalid());
                }
            }
            MultipleCharValue => {
                if text.is_empty() || !text.split(' ').all(|tok| tok.len() == 1 && tok.is_ascii()) {
                    return Err(invalid());
                }
            }
            _ => {
                FixStr::from_ascii(raw).map_err(|_| invalid())?;
            }
        }
        Ok(Value::str(text.to_string()))
    }

    /// Whether `text` is a raw enum token already on the wire (the
    /// description is a serialize-time convenience only; once parsed,
    /// only the token form is legal, spec §4.1).
    fn token_is_known(&self, text: &str) -> bool {
        self.enum_values
            .as_ref()
            .map(|values| values.iter().any(|(token, _)| token == text))
            .unwrap_or(true)
    }
}
