use std::str::FromStr;

use assert_matches::assert_matches;

use crate::{
    error::PayloadError,
    loader::load_document,
    payload::Value,
    xml::{
        Component as XmlComponent, Field as XmlField, FieldType, Group as XmlGroup, Header,
        Member, MemberRef, Message as XmlMessage, MsgCat, MsgType, Trailer,
    },
};

fn field_ref(name: &str, required: bool) -> Member {
    Member::Field(MemberRef { name: name.to_string(), required })
}

fn field(name: &str, number: u16, field_type: FieldType) -> XmlField {
    XmlField { number, name: name.to_string(), field_type, values: None }
}

fn field_with_enum(name: &str, number: u16, field_type: FieldType, values: &[(&str, &str)]) -> XmlField {
    XmlField {
        number,
        name: name.to_string(),
        field_type,
        values: Some(
            values
                .iter()
                .map(|(value_enum, description)| xml::Value {
                    value_enum: value_enum.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        ),
    }
}

fn fix44_logon_protocol() -> crate::model::Protocol {
    let doc = xml::Document {
        fix_type: "FIX".to_string(),
        major: 4,
        minor: 4,
        header: Header {
            members: vec![
                field_ref("BeginString", true),
                field_ref("BodyLength", true),
                field_ref("MsgType", true),
                field_ref("SenderCompID", true),
                field_ref("TargetCompID", true),
                field_ref("MsgSeqNum", true),
                field_ref("SendingTime", true),
            ],
        },
        trailer: Trailer { members: vec![field_ref("CheckSum", true)] },
        messages: vec![
            XmlMessage {
                name: "Logon".to_string(),
                msg_type: MsgType::from_str("A").unwrap(),
                msg_cat: MsgCat::Admin,
                members: vec![field_ref("EncryptMethod", true), field_ref("HeartBtInt", true)],
            },
            XmlMessage {
                name: "NewOrderSingle".to_string(),
                msg_type: MsgType::from_str("D").unwrap(),
                msg_cat: MsgCat::App,
                members: vec![
                    field_ref("ClOrdID", true),
                    field_ref("Symbol", true),
                    Member::Group(XmlGroup {
                        name: "NoAllocs".to_string(),
                        required: false,
                        members: vec![field_ref("AllocAccount", true), field_ref("AllocQty", true)],
                    }),
                ],
            },
        ],
        components: vec![],
        fields: vec![
            field("BeginString", 8, FieldType::String),
            field("BodyLength", 9, FieldType::Length),
            field("MsgType", 35, FieldType::String),
            field("SenderCompID", 49, FieldType::String),
            field("TargetCompID", 56, FieldType::String),
            field("MsgSeqNum", 34, FieldType::SeqNum),
            field("SendingTime", 52, FieldType::UtcTimestamp),
            field("CheckSum", 10, FieldType::String),
            field_with_enum("EncryptMethod", 98, FieldType::Int, &[("0", "NONE_OTHER"), ("1", "PKCS")]),
            field("HeartBtInt", 108, FieldType::Int),
            field("ClOrdID", 11, FieldType::String),
            field("Symbol", 55, FieldType::String),
            field("NoAllocs", 78, FieldType::NumInGroup),
            field("AllocAccount", 79, FieldType::String),
            field("AllocQty", 80, FieldType::Qty),
        ],
    };
    load_document(doc).unwrap()
}

use crate::xml;

fn sample_header() -> Vec<(String, Value)> {
    vec![
        ("SenderCompID".to_string(), Value::str("CLIENT1")),
        ("TargetCompID".to_string(), Value::str("BROKER1")),
        ("MsgSeqNum".to_string(), Value::str("1")),
        ("SendingTime".to_string(), Value::str("20260727-00:00:00")),
    ]
}

#[test]
fn serializes_logon_with_correct_framing() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("Logon").unwrap();
    let header = sample_header();
    let body = vec![
        ("EncryptMethod".to_string(), Value::str("0")),
        ("HeartBtInt".to_string(), Value::str("30")),
    ];
    let wire = message.serialize(&protocol, &header, &body, &[]).unwrap();
    let text = String::from_utf8(wire.clone()).unwrap();

    assert!(text.starts_with("8=FIX.4.4\u{1}9="));
    assert!(text.contains("\u{1}35=A\u{1}"));
    assert!(text.contains("\u{1}49=CLIENT1\u{1}"));
    assert!(text.ends_with('\u{1}'));
    assert!(text.matches("10=").count() == 1);

    let checksum_pos = text.rfind("10=").unwrap();
    let declared: u8 = text[checksum_pos + 3..checksum_pos + 6].parse().unwrap();
    let computed = wire[..checksum_pos].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    assert_eq!(declared, computed);
}

#[test]
fn serializes_enum_description_as_raw_token() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("Logon").unwrap();
    let header = sample_header();
    let body = vec![
        ("EncryptMethod".to_string(), Value::str("NONE_OTHER")),
        ("HeartBtInt".to_string(), Value::str("30")),
    ];
    let wire = message.serialize(&protocol, &header, &body, &[]).unwrap();
    let text = String::from_utf8(wire).unwrap();
    assert!(text.contains("\u{1}98=0\u{1}"), "description form must render as the enum token: {text}");
}

#[test]
fn rejects_enum_value_outside_token_and_description_set() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("Logon").unwrap();
    let body = vec![
        ("EncryptMethod".to_string(), Value::str("BOGUS")),
        ("HeartBtInt".to_string(), Value::str("30")),
    ];
    let err = message.serialize(&protocol, &sample_header(), &body, &[]).unwrap_err();
    assert_matches!(err, PayloadError::InvalidValue { field, .. } if field == "EncryptMethod");
}

#[test]
fn rejects_managed_field_in_body_payload() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("Logon").unwrap();
    let body = vec![("MsgType".to_string(), Value::str("A"))];
    let err = message.serialize(&protocol, &[], &body, &[]).unwrap_err();
    assert_matches!(err, PayloadError::ManagedConflict { .. });
}

#[test]
fn rejects_missing_required_field() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("Logon").unwrap();
    let body = vec![("EncryptMethod".to_string(), Value::str("0"))];
    let err = message.serialize(&protocol, &sample_header(), &body, &[]).unwrap_err();
    assert_matches!(err, PayloadError::MissingRequired { name, .. } if name == "HeartBtInt");
}

#[test]
fn serializes_group_with_count_and_delimiter() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("NewOrderSingle").unwrap();
    let body = vec![
        ("ClOrdID".to_string(), Value::str("ORDER-1")),
        ("Symbol".to_string(), Value::str("EUR/USD")),
        (
            "NoAllocs".to_string(),
            Value::Group(vec![
                vec![
                    ("AllocAccount".to_string(), Value::str("ACC1")),
                    ("AllocQty".to_string(), Value::str("50")),
                ],
                vec![
                    ("AllocAccount".to_string(), Value::str("ACC2")),
                    ("AllocQty".to_string(), Value::str("50")),
                ],
            ]),
        ),
    ];
    let wire = message.serialize(&protocol, &sample_header(), &body, &[]).unwrap();
    let text = String::from_utf8(wire).unwrap();
    assert!(text.contains("\u{1}78=2\u{1}79=ACC1\u{1}80=50\u{1}79=ACC2\u{1}80=50\u{1}"));
}

#[test]
fn rejects_group_repetition_with_wrong_delimiter() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("NewOrderSingle").unwrap();
    let body = vec![
        ("ClOrdID".to_string(), Value::str("ORDER-1")),
        ("Symbol".to_string(), Value::str("EUR/USD")),
        (
            "NoAllocs".to_string(),
            Value::Group(vec![vec![("AllocQty".to_string(), Value::str("50"))]]),
        ),
    ];
    let err = message.serialize(&protocol, &sample_header(), &body, &[]).unwrap_err();
    assert_matches!(err, PayloadError::GroupDelimiterMismatch { .. });
}

#[test]
fn rejects_invalid_string_value_containing_soh() {
    let protocol = fix44_logon_protocol();
    let message = protocol.message_by_name("NewOrderSingle").unwrap();
    let body = vec![
        ("ClOrdID".to_string(), Value::str("ORDER\u{1}1")),
        ("Symbol".to_string(), Value::str("EUR/USD")),
    ];
    let err = message.serialize(&protocol, &sample_header(), &body, &[]).unwrap_err();
    assert_matches!(err, PayloadError::InvalidValue { field, .. } if field == "ClOrdID");
}
