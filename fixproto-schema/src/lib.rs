//! Schema loading, composite model, serializer and parser for FIX
//! protocol dictionaries (spec §3-§7).
//!
//! A [`Protocol`] is built from one or more XML dictionary documents
//! via [`ProtocolBuilder`] (or the lower-level [`loader`] functions
//! directly), then used to [`Message::serialize`] caller payloads into
//! wire bytes and [`parser::parse`] wire bytes back into payloads.

pub mod deserializer;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod payload;
pub mod serializer;
pub mod xml;

pub use error::{PayloadError, SchemaError, WireError};
pub use model::{Component, Field, Group, Member, MemberDefinition, Message, Protocol};
pub use parser::{parse, Parsed};
pub use payload::{Payload, Value};

use std::path::Path;

use loader::LoaderOptions;

/// Builds a [`Protocol`] from one base dictionary plus zero or more
/// extensions, with configurable strictness (spec §4.5, ambient
/// `ProtocolBuilder` addition in `SPEC_FULL.md` §4).
///
/// ```no_run
/// # use fixproto_schema::ProtocolBuilder;
/// let protocol = ProtocolBuilder::new()
///     .lenient()
///     .load_path("dictionaries/fix44.xml")?
///     .build()?;
/// # Ok::<(), fixproto_schema::SchemaError>(())
/// ```
pub struct ProtocolBuilder {
    options: LoaderOptions,
    protocol: Option<Protocol>,
}

impl ProtocolBuilder {
    pub fn new() -> Self {
        ProtocolBuilder { options: LoaderOptions::default(), protocol: None }
    }

    /// Accepts empty `<component>`/`<group>` elements instead of
    /// rejecting them with `SchemaError::EmptyContainer`.
    pub fn lenient(mut self) -> Self {
        self.options.strict_unused_elements = false;
        self
    }

    /// Reads and parses `path` as the base dictionary, or as an
    /// extension if a base has already been loaded on this builder.
    pub fn load_path(mut self, path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        self.load_str_mut(&text)?;
        Ok(self)
    }

    /// Parses `xml` as the base dictionary, or as an extension if a
    /// base has already been loaded on this builder.
    pub fn load_str(mut self, xml: &str) -> Result<Self, SchemaError> {
        self.load_str_mut(xml)?;
        Ok(self)
    }

    fn load_str_mut(&mut self, xml: &str) -> Result<(), SchemaError> {
        let document: xml::Document = quick_xml::de::from_str(xml)?;
        match self.protocol.as_mut() {
            None => {
                self.protocol = Some(loader::load_document_with_options(document, self.options)?);
            }
            Some(protocol) => {
                loader::extend_protocol_with_options(protocol, document, self.options)?;
            }
        }
        Ok(())
    }

    /// Finishes the build. Fails if no dictionary was ever loaded.
    pub fn build(self) -> Result<Protocol, SchemaError> {
        self.protocol.ok_or(SchemaError::NoDictionaryLoaded)
    }
}

impl Default for ProtocolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol {
    /// Loads a single dictionary file as a fresh, strict [`Protocol`].
    /// For extensions or lenient loading use [`ProtocolBuilder`].
    pub fn load(path: impl AsRef<Path>) -> Result<Protocol, SchemaError> {
        ProtocolBuilder::new().load_path(path)?.build()
    }

    /// Merges an extension dictionary file into this protocol in
    /// place (spec §4.5 "Extension").
    pub fn extend(&mut self, path: impl AsRef<Path>) -> Result<(), SchemaError> {
        let text = std::fs::read_to_string(path)?;
        let document: xml::Document = quick_xml::de::from_str(&text)?;
        loader::extend_protocol(self, document)
    }
}
