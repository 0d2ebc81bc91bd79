//! The resolved composite graph: [`Field`], [`Component`], [`Group`],
//! [`Message`] and the top-level [`Protocol`] container (spec §3).
//!
//! Definitions form a DAG of shared, reference-counted nodes (Design
//! Notes §9: "model with shared ownership plus name-based lookups
//! rather than parent back-pointers"). `Arc` rather than the grounding
//! crate's `Rc` is used throughout so a built `Protocol` is `Send +
//! Sync` and safe to share read-only across threads (spec §5).

use std::{collections::HashMap, sync::Arc};

pub use crate::xml::{FieldType, MsgCat, MsgType};

/// A named grouping that can serialize itself: the capability the
/// distilled spec calls "is_composite", realized here as a typed
/// variant rather than a duck-typed structural check (§9 REDESIGN
/// FLAGS).
#[derive(Clone, Debug)]
pub enum MemberDefinition {
    Field(Arc<Field>),
    Component(Arc<Component>),
    Group(Arc<Group>),
}

impl MemberDefinition {
    pub fn name(&self) -> &str {
        match self {
            MemberDefinition::Field(f) => &f.name,
            MemberDefinition::Component(c) => &c.base.name,
            MemberDefinition::Group(g) => &g.name,
        }
    }

    pub fn as_field(&self) -> Option<&Arc<Field>> {
        match self {
            MemberDefinition::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Arc<Group>> {
        match self {
            MemberDefinition::Group(g) => Some(g),
            _ => None,
        }
    }
}

/// A use of a field/component/group within an enclosing composite:
/// the definition plus whether it is required *here* (the same
/// component can be required in one message and optional in another).
#[derive(Clone, Debug)]
pub struct Member {
    pub required: bool,
    pub definition: MemberDefinition,
}

impl Member {
    pub fn name(&self) -> &str {
        self.definition.name()
    }
}

/// Identity, type, and optional enumeration of a single scalar tag
/// (spec §3 Field, §4.1).
#[derive(Clone, Debug)]
pub struct Field {
    pub number: u16,
    pub name: String,
    pub field_type: FieldType,
    /// (raw enum token, human description) pairs, declaration order.
    pub enum_values: Option<Vec<(String, String)>>,
}

impl Field {
    pub fn enum_token_for(&self, value: &str) -> Option<&str> {
        let values = self.enum_values.as_ref()?;
        values
            .iter()
            .find(|(token, description)| token == value || description == value)
            .map(|(token, _)| token.as_str())
    }
}

/// Ordered list of (child, required) pairs shared by Component, Group
/// and Message (spec §3 BaseComposite).
#[derive(Debug)]
pub struct BaseComposite {
    pub name: String,
    pub members: Vec<Member>,
}

impl BaseComposite {
    pub fn find(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// The flat set of field tags reachable through this composite,
    /// including through nested components and groups (used by the
    /// parser to map a tag back to the composite that declares it).
    pub fn reachable_tags(&self) -> Vec<u16> {
        let mut tags = Vec::new();
        collect_tags(&self.members, &mut tags);
        tags
    }
}

fn collect_tags(members: &[Member], out: &mut Vec<u16>) {
    for member in members {
        match &member.definition {
            MemberDefinition::Field(field) => out.push(field.number),
            MemberDefinition::Component(component) => collect_tags(&component.base.members, out),
            MemberDefinition::Group(group) => {
                out.push(group.num_in_group.number);
                collect_tags(&group.base.members, out);
            }
        }
    }
}

/// A named reusable grouping, inlined at every reference site (spec
/// §3/§4.3 Component).
#[derive(Debug)]
pub struct Component {
    pub base: BaseComposite,
}

/// A repeating structure keyed by a NUMINGROUP count field (spec
/// §3/§4.4 Group). `first` names the delimiter: the first declared
/// child, which must lead every repetition on the wire.
#[derive(Debug)]
pub struct Group {
    pub name: String,
    pub num_in_group: Arc<Field>,
    pub first: String,
    pub base: BaseComposite,
}

/// A top-level composite with a category and message-type code (spec
/// §3/§4.6 Message).
#[derive(Debug)]
pub struct Message {
    pub base: BaseComposite,
    pub msg_type: MsgType,
    pub category: MsgCat,
}

impl Message {
    pub fn name(&self) -> &str {
        &self.base.name
    }
}

/// Top-level container: lookup tables plus the pre-serialized
/// BeginString (spec §3/§4.5 step 5).
#[derive(Debug)]
pub struct Protocol {
    pub(crate) protocol_id: String,
    pub(crate) begin_string: Vec<u8>,
    pub(crate) fields_by_name: HashMap<String, Arc<Field>>,
    pub(crate) fields_by_number: HashMap<u16, Arc<Field>>,
    pub(crate) components: HashMap<String, Arc<Component>>,
    pub(crate) messages_by_name: HashMap<String, Arc<Message>>,
    pub(crate) messages_by_type: HashMap<MsgType, Arc<Message>>,
    pub(crate) header: Arc<Component>,
    pub(crate) trailer: Arc<Component>,
}

impl Protocol {
    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    pub fn begin_string(&self) -> &[u8] {
        &self.begin_string
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields_by_name.get(name)
    }

    pub fn field_by_number(&self, number: u16) -> Option<&Arc<Field>> {
        self.fields_by_number.get(&number)
    }

    pub fn component(&self, name: &str) -> Option<&Arc<Component>> {
        self.components.get(name)
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Arc<Message>> {
        self.messages_by_name.get(name)
    }

    pub fn message_by_type(&self, msg_type: MsgType) -> Option<&Arc<Message>> {
        self.messages_by_type.get(&msg_type)
    }

    pub fn header(&self) -> &Arc<Component> {
        &self.header
    }

    pub fn trailer(&self) -> &Arc<Component> {
        &self.trailer
    }

    pub fn messages(&self) -> impl Iterator<Item = &Arc<Message>> {
        self.messages_by_name.values()
    }
}
