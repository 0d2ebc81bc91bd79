use std::str::FromStr;

use assert_matches::assert_matches;

use crate::{
    error::SchemaError,
    loader::{extend_protocol, load_document},
    xml,
};
use crate::xml::{Component as XmlComponent, Field as XmlField, FieldType, Group as XmlGroup, Header, Member, MemberRef, Message as XmlMessage, MsgCat, MsgType, Trailer};

fn field_ref(name: &str, required: bool) -> Member {
    Member::Field(MemberRef { name: name.to_string(), required })
}

fn component_ref(name: &str, required: bool) -> Member {
    Member::Component(MemberRef { name: name.to_string(), required })
}

fn field(name: &str, number: u16, field_type: FieldType) -> XmlField {
    XmlField { number, name: name.to_string(), field_type, values: None }
}

fn document(
    header_members: Vec<Member>,
    trailer_members: Vec<Member>,
    messages: Vec<XmlMessage>,
    components: Vec<XmlComponent>,
    fields: Vec<XmlField>,
) -> xml::Document {
    xml::Document {
        fix_type: "FIX".to_string(),
        major: 4,
        minor: 4,
        header: Header { members: header_members },
        trailer: Trailer { members: trailer_members },
        messages,
        components,
        fields,
    }
}

#[test]
fn resolves_forward_referenced_components() {
    // Instrument declared before Leg, but Instrument references Leg.
    let instrument = XmlComponent {
        name: "Instrument".to_string(),
        members: vec![field_ref("Symbol", true), component_ref("Leg", false)],
    };
    let leg = XmlComponent { name: "Leg".to_string(), members: vec![field_ref("LegSymbol", true)] };

    let doc = document(
        vec![field_ref("BeginString", true)],
        vec![field_ref("CheckSum", true)],
        vec![XmlMessage {
            name: "NewOrderSingle".to_string(),
            msg_type: MsgType::from_str("D").unwrap(),
            msg_cat: MsgCat::App,
            members: vec![component_ref("Instrument", true)],
        }],
        vec![instrument, leg],
        vec![
            field("BeginString", 8, FieldType::String),
            field("CheckSum", 10, FieldType::String),
            field("Symbol", 55, FieldType::String),
            field("LegSymbol", 600, FieldType::String),
        ],
    );

    let protocol = load_document(doc).expect("forward references across components resolve");
    let message = protocol.message_by_name("NewOrderSingle").unwrap();
    assert_eq!(message.base.members.len(), 1);
    let leg_component = protocol.component("Leg").expect("Leg resolved");
    assert_eq!(leg_component.base.members[0].name(), "LegSymbol");
}

#[test]
fn genuine_cycle_reports_unresolved_reference() {
    let a = XmlComponent { name: "A".to_string(), members: vec![component_ref("B", true)] };
    let b = XmlComponent { name: "B".to_string(), members: vec![component_ref("A", true)] };

    let doc = document(vec![], vec![], vec![], vec![a, b], vec![]);

    let err = load_document(doc).unwrap_err();
    assert_matches!(err, SchemaError::UnresolvedReference { .. });
}

#[test]
fn missing_component_reference_is_fatal() {
    let a = XmlComponent { name: "A".to_string(), members: vec![component_ref("Ghost", true)] };
    let doc = document(vec![], vec![], vec![], vec![a], vec![]);
    let err = load_document(doc).unwrap_err();
    assert_matches!(err, SchemaError::UnresolvedReference { name, .. } if name == "Ghost");
}

#[test]
fn duplicate_child_in_message_declaration_is_fatal() {
    let doc = document(
        vec![field_ref("BeginString", true)],
        vec![field_ref("CheckSum", true)],
        vec![XmlMessage {
            name: "NewOrderSingle".to_string(),
            msg_type: MsgType::from_str("D").unwrap(),
            msg_cat: MsgCat::App,
            members: vec![field_ref("Symbol", true), field_ref("Symbol", true)],
        }],
        vec![],
        vec![
            field("BeginString", 8, FieldType::String),
            field("CheckSum", 10, FieldType::String),
            field("Symbol", 55, FieldType::String),
        ],
    );

    let err = load_document(doc).unwrap_err();
    assert_matches!(err, SchemaError::DuplicateChild { name, .. } if name == "Symbol");
}

#[test]
fn duplicate_child_in_component_declaration_is_fatal() {
    let instrument = XmlComponent {
        name: "Instrument".to_string(),
        members: vec![field_ref("Symbol", true), field_ref("Symbol", false)],
    };
    let doc = document(vec![], vec![], vec![], vec![instrument], vec![field("Symbol", 55, FieldType::String)]);

    let err = load_document(doc).unwrap_err();
    assert_matches!(err, SchemaError::DuplicateChild { referrer, name } if referrer == "Instrument" && name == "Symbol");
}

#[test]
fn group_base_field_name_matches_group_name() {
    let doc = document(
        vec![field_ref("BeginString", true)],
        vec![field_ref("CheckSum", true)],
        vec![XmlMessage {
            name: "NewOrderSingle".to_string(),
            msg_type: MsgType::from_str("D").unwrap(),
            msg_cat: MsgCat::App,
            members: vec![Member::Group(XmlGroup {
                name: "NoAllocs".to_string(),
                required: false,
                members: vec![field_ref("AllocAccount", true), field_ref("AllocQty", true)],
            })],
        }],
        vec![],
        vec![
            field("BeginString", 8, FieldType::String),
            field("CheckSum", 10, FieldType::String),
            field("NoAllocs", 78, FieldType::NumInGroup),
            field("AllocAccount", 79, FieldType::String),
            field("AllocQty", 80, FieldType::Qty),
        ],
    );

    let protocol = load_document(doc).unwrap();
    let message = protocol.message_by_name("NewOrderSingle").unwrap();
    let group = message.base.members[0].definition.as_group().expect("group member");
    assert_eq!(group.name, "NoAllocs");
    assert_eq!(group.num_in_group.name, "NoAllocs");
    assert_eq!(group.first, "AllocAccount");
}

#[test]
fn extension_is_additive_and_atomic_on_mismatch() {
    let base_doc = document(
        vec![field_ref("BeginString", true)],
        vec![field_ref("CheckSum", true)],
        vec![XmlMessage {
            name: "Heartbeat".to_string(),
            msg_type: MsgType::from_str("0").unwrap(),
            msg_cat: MsgCat::Admin,
            members: vec![],
        }],
        vec![],
        vec![field("BeginString", 8, FieldType::String), field("CheckSum", 10, FieldType::String)],
    );
    let mut protocol = load_document(base_doc).unwrap();
    assert!(protocol.message_by_name("TestRequest").is_none());

    let mismatched = xml::Document { fix_type: "FIX".to_string(), major: 4, minor: 2, ..document(vec![], vec![], vec![], vec![], vec![]) };
    let err = extend_protocol(&mut protocol, mismatched).unwrap_err();
    assert_matches!(err, SchemaError::ProtocolMismatch { .. });
    assert!(protocol.message_by_name("TestRequest").is_none(), "failed extension must not mutate the base protocol");

    let extension = document(
        vec![],
        vec![],
        vec![XmlMessage {
            name: "TestRequest".to_string(),
            msg_type: MsgType::from_str("1").unwrap(),
            msg_cat: MsgCat::Admin,
            members: vec![field_ref("TestReqID", true)],
        }],
        vec![],
        vec![field("TestReqID", 112, FieldType::String)],
    );
    extend_protocol(&mut protocol, extension).unwrap();
    assert!(protocol.message_by_name("Heartbeat").is_some(), "base messages survive extension");
    assert!(protocol.message_by_name("TestRequest").is_some());
}
