//! Resolves a parsed [`crate::xml::Document`] into a [`Protocol`]
//! (spec §4.5).
//!
//! Components may reference components declared later in the same
//! document (or, during an extension load, only defined in the base
//! protocol). The grounding crate's `MembersDb` resolves this with
//! recursion guarded by a `visited: HashSet`; this loader instead
//! drains an explicit work queue, requiring at least one entry to
//! resolve on every full pass and failing fast the instant a pass
//! makes no progress, so a genuine cycle is reported immediately
//! rather than recursing until the call stack gives up.

use std::{collections::HashMap, collections::VecDeque, sync::Arc};

use crate::{
    error::SchemaError,
    model::{BaseComposite, Component, Field, Group, Member, MemberDefinition, Message, Protocol},
    xml,
};

type FieldTable = HashMap<String, Arc<Field>>;
type ComponentTable = HashMap<String, Arc<Component>>;

/// Configures how strictly the loader treats schema oddities that are
/// not outright contradictions (spec §4.5's worklist is otherwise
/// silent on this). Grounded on the `ProtocolBuilder` ambient-stack
/// addition in `SPEC_FULL.md` §4.
#[derive(Clone, Copy, Debug)]
pub struct LoaderOptions {
    /// When `false`, a `<component>` or `<group>` with no children is
    /// accepted as an empty composite instead of failing with
    /// `EmptyContainer`.
    pub strict_unused_elements: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions { strict_unused_elements: true }
    }
}

pub fn load_document(document: xml::Document) -> Result<Protocol, SchemaError> {
    load_document_with_options(document, LoaderOptions::default())
}

pub fn load_document_with_options(document: xml::Document, options: LoaderOptions) -> Result<Protocol, SchemaError> {
    let (fields_by_name, fields_by_number) = build_fields(document.fields)?;
    let components = resolve_components(document.components, &fields_by_name, ComponentTable::new(), options)?;

    let header = Arc::new(Component {
        base: BaseComposite {
            name: "Header".to_string(),
            members: drop_managed_members(build_members(&document.header.members, &fields_by_name, &components, "Header", options)?),
        },
    });
    let trailer = Arc::new(Component {
        base: BaseComposite {
            name: "Trailer".to_string(),
            members: drop_managed_members(build_members(&document.trailer.members, &fields_by_name, &components, "Trailer", options)?),
        },
    });

    let (messages_by_name, messages_by_type) =
        build_messages(document.messages, &fields_by_name, &components, options)?;

    let begin_string = format!("{}.{}.{}", document.fix_type, document.major, document.minor).into_bytes();

    Ok(Protocol {
        protocol_id: document.protocol_id(),
        begin_string,
        fields_by_name,
        fields_by_number,
        components,
        messages_by_name,
        messages_by_type,
        header,
        trailer,
    })
}

/// Merge an extension document into an already-built protocol (spec
/// §4.5 "Extension repeats steps 2 and 6"). Everything is built in
/// local scratch tables first; `protocol`'s tables are only mutated
/// once every fallible step below has succeeded, so a failed
/// extension leaves the base protocol exactly as it was.
pub fn extend_protocol(protocol: &mut Protocol, document: xml::Document) -> Result<(), SchemaError> {
    extend_protocol_with_options(protocol, document, LoaderOptions::default())
}

pub fn extend_protocol_with_options(
    protocol: &mut Protocol,
    document: xml::Document,
    options: LoaderOptions,
) -> Result<(), SchemaError> {
    let extension_id = document.protocol_id();
    if extension_id != protocol.protocol_id {
        return Err(SchemaError::ProtocolMismatch {
            base: protocol.protocol_id.clone(),
            extension: extension_id,
        });
    }

    let mut fields_by_name = protocol.fields_by_name.clone();
    let mut fields_by_number = protocol.fields_by_number.clone();
    for raw in document.fields {
        let field = Arc::new(Field {
            number: raw.number,
            name: raw.name.clone(),
            field_type: raw.field_type,
            enum_values: build_enum_values(raw.values),
        });
        fields_by_number.insert(field.number, field.clone());
        fields_by_name.insert(field.name.clone(), field);
    }

    let components = resolve_components(document.components, &fields_by_name, protocol.components.clone(), options)?;

    let (new_messages_by_name, new_messages_by_type) =
        build_messages(document.messages, &fields_by_name, &components, options)?;

    let mut messages_by_name = protocol.messages_by_name.clone();
    messages_by_name.extend(new_messages_by_name);
    let mut messages_by_type = protocol.messages_by_type.clone();
    messages_by_type.extend(new_messages_by_type);

    protocol.fields_by_name = fields_by_name;
    protocol.fields_by_number = fields_by_number;
    protocol.components = components;
    protocol.messages_by_name = messages_by_name;
    protocol.messages_by_type = messages_by_type;
    Ok(())
}

fn build_enum_values(values: Option<Vec<xml::Value>>) -> Option<Vec<(String, String)>> {
    values.map(|values| values.into_iter().map(|v| (v.value_enum, v.description)).collect())
}

fn build_fields(raw_fields: Vec<xml::Field>) -> Result<(FieldTable, HashMap<u16, Arc<Field>>), SchemaError> {
    let mut by_name = FieldTable::new();
    let mut by_number = HashMap::new();
    for raw in raw_fields {
        let field = Arc::new(Field {
            number: raw.number,
            name: raw.name.clone(),
            field_type: raw.field_type,
            enum_values: build_enum_values(raw.values),
        });
        if by_name.insert(field.name.clone(), field.clone()).is_some() {
            return Err(SchemaError::DuplicateField(field.name.clone()));
        }
        by_number.insert(field.number, field);
    }
    Ok((by_name, by_number))
}

/// Queue-based resolution of `<component>` definitions (spec §4.5
/// step 3). `seed` lets an extension load start from the base
/// protocol's already-resolved components.
fn resolve_components(
    raw_components: Vec<xml::Component>,
    fields: &FieldTable,
    seed: ComponentTable,
    options: LoaderOptions,
) -> Result<ComponentTable, SchemaError> {
    let mut pending: HashMap<String, xml::Component> = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    for raw in raw_components {
        if pending.contains_key(&raw.name) || seed.contains_key(&raw.name) {
            return Err(SchemaError::DuplicateComponent(raw.name));
        }
        queue.push_back(raw.name.clone());
        pending.insert(raw.name.clone(), raw);
    }

    let mut resolved = seed;
    while !queue.is_empty() {
        let pass_len = queue.len();
        let mut progressed = false;
        for _ in 0..pass_len {
            let name = queue.pop_front().expect("pass_len bounds this loop");
            let missing = {
                let raw = pending.get(&name).expect("queued name stays in pending until resolved");
                first_missing_component_ref(&raw.members, &resolved)
            };
            match missing {
                Some(_) => queue.push_back(name),
                None => {
                    let raw = pending.remove(&name).expect("looked up above");
                    if raw.members.is_empty() && options.strict_unused_elements {
                        return Err(SchemaError::EmptyContainer { referrer: name });
                    }
                    let members = build_members(&raw.members, fields, &resolved, &name, options)?;
                    tracing::debug!(component = %name, "resolved component definition");
                    resolved.insert(name.clone(), Arc::new(Component {
                        base: BaseComposite { name, members },
                    }));
                    progressed = true;
                }
            }
        }
        if !progressed {
            let stuck = queue.front().expect("queue non-empty").clone();
            let missing = first_missing_component_ref(&pending[&stuck].members, &resolved)
                .unwrap_or_else(|| stuck.clone());
            tracing::warn!(referrer = %stuck, missing = %missing, "component resolution made no progress this pass");
            return Err(SchemaError::UnresolvedReference { name: missing, referrer: stuck });
        }
    }
    Ok(resolved)
}

/// First `<component>` reference (searched recursively through inline
/// groups) not yet present in `resolved`, or `None` if every
/// component reference reachable from `members` is ready.
fn first_missing_component_ref(members: &[xml::Member], resolved: &ComponentTable) -> Option<String> {
    for member in members {
        match member {
            xml::Member::Component(r) => {
                if !resolved.contains_key(&r.name) {
                    return Some(r.name.clone());
                }
            }
            xml::Member::Group(g) => {
                if let Some(missing) = first_missing_component_ref(&g.members, resolved) {
                    return Some(missing);
                }
            }
            xml::Member::Field(_) => {}
        }
    }
    None
}

/// `BeginString`, `BodyLength`, `MsgType` and `CheckSum` are declared
/// as ordinary header/trailer members in a FIX dictionary, but the
/// envelope assembler renders them itself and rejects them from a
/// caller's payload (spec §4.6 "managed"); dropping them here keeps
/// the stored header/trailer composite in sync with what callers are
/// actually allowed to supply.
fn drop_managed_members(members: Vec<Member>) -> Vec<Member> {
    members.into_iter().filter(|m| !fixproto_core::is_managed_field(m.name())).collect()
}

fn build_members(
    raw_members: &[xml::Member],
    fields: &FieldTable,
    components: &ComponentTable,
    owner: &str,
    options: LoaderOptions,
) -> Result<Vec<Member>, SchemaError> {
    reject_duplicate_children(raw_members, owner)?;
    raw_members.iter().map(|m| build_member(m, fields, components, owner, options)).collect()
}

/// A BaseComposite invariant (spec §3 "no child appears twice"), checked
/// against the XML-declared member list itself — distinct from the
/// payload-level `PayloadError::DuplicateChild` check in
/// `serializer.rs`/`parser.rs`, which guards a caller's payload against
/// the already-resolved declaration rather than the declaration against
/// itself.
fn reject_duplicate_children(raw_members: &[xml::Member], owner: &str) -> Result<(), SchemaError> {
    let mut seen = std::collections::HashSet::new();
    for member in raw_members {
        if !seen.insert(member.name()) {
            return Err(SchemaError::DuplicateChild { referrer: owner.to_string(), name: member.name().to_string() });
        }
    }
    Ok(())
}

fn build_member(
    raw: &xml::Member,
    fields: &FieldTable,
    components: &ComponentTable,
    owner: &str,
    options: LoaderOptions,
) -> Result<Member, SchemaError> {
    match raw {
        xml::Member::Field(r) => {
            let field = fields.get(&r.name).cloned().ok_or_else(|| SchemaError::UnresolvedReference {
                name: r.name.clone(),
                referrer: owner.to_string(),
            })?;
            Ok(Member { required: r.required, definition: MemberDefinition::Field(field) })
        }
        xml::Member::Component(r) => {
            let component = components.get(&r.name).cloned().ok_or_else(|| SchemaError::UnresolvedReference {
                name: r.name.clone(),
                referrer: owner.to_string(),
            })?;
            Ok(Member { required: r.required, definition: MemberDefinition::Component(component) })
        }
        xml::Member::Group(g) => {
            let num_in_group = fields.get(&g.name).cloned().ok_or_else(|| SchemaError::UnresolvedReference {
                name: g.name.clone(),
                referrer: owner.to_string(),
            })?;
            if g.members.is_empty() && options.strict_unused_elements {
                return Err(SchemaError::EmptyContainer { referrer: g.name.clone() });
            }
            let members = build_members(&g.members, fields, components, &g.name, options)?;
            let first = members.first().map(|m| m.name().to_string()).unwrap_or_default();
            Ok(Member {
                required: g.required,
                definition: MemberDefinition::Group(Arc::new(Group {
                    name: g.name.clone(),
                    num_in_group,
                    first,
                    base: BaseComposite { name: g.name.clone(), members },
                })),
            })
        }
    }
}

fn build_messages(
    raw_messages: Vec<xml::Message>,
    fields: &FieldTable,
    components: &ComponentTable,
    options: LoaderOptions,
) -> Result<(HashMap<String, Arc<Message>>, HashMap<xml::MsgType, Arc<Message>>), SchemaError> {
    let mut by_name = HashMap::new();
    let mut by_type = HashMap::new();
    for raw in raw_messages {
        if by_name.contains_key(&raw.name) {
            return Err(SchemaError::DuplicateMessage(raw.name));
        }
        let members = build_members(&raw.members, fields, components, &raw.name, options)?;
        let message = Arc::new(Message { base: BaseComposite { name: raw.name.clone(), members }, msg_type: raw.msg_type, category: raw.msg_cat });
        by_type.insert(raw.msg_type, message.clone());
        by_name.insert(raw.name, message);
    }
    Ok((by_name, by_type))
}

#[cfg(test)]
mod tests;
