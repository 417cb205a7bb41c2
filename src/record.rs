use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::atom_mappings::{AtomMapping, AtomMappingSource};
use crate::cache::Dereference;
use crate::error::CycError;
use crate::identity::Identity;
use crate::link::{Link, Refs};
use crate::models;
use crate::schema::{Cardinality, FieldDecl, Schema, ValueKind};
use crate::value::Value;
use crate::xml::{Document, Item, Node};

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Slot {
    Value(Value),
    Link(Link),
}

/// A parsed record of some kind.
///
/// Fields are populated once, in declaration order, when the record is
/// parsed. Only relationship fields change afterwards, when they resolve.
#[derive(Debug, Clone)]
pub struct Record {
    kind: &'static str,
    identity: Option<Identity>,
    detail: Option<String>,
    slots: Vec<(&'static str, Slot)>,
    atom_mappings: OnceCell<Vec<AtomMapping>>,
}

impl Record {
    /// Parses an element whose tag names its kind (`Enzymatic-Reaction`, `Pathway`, ...).
    pub fn parse(node: Node<'_>) -> Result<Self, CycError> {
        let tag = node
            .name()
            .ok_or_else(|| CycError::UnknownKind(node.describe()))?;
        Self::compose(models::registry().lookup_element(tag)?, node)
    }

    /// Parses an element as the given canonical kind regardless of its tag.
    pub fn parse_as(kind: &str, node: Node<'_>) -> Result<Self, CycError> {
        Self::compose(models::registry().lookup(kind)?, node)
    }

    /// Every identified object at the top level of a `ptools-xml` document,
    /// in document order. Metadata and unregistered tags are skipped.
    pub fn parse_all(document: &Document) -> Result<Vec<Self>, CycError> {
        let mut records = Vec::new();
        for node in document.root().child_elements() {
            let Some(tag) = node.name() else { continue };
            match models::registry().lookup_element(tag) {
                Ok(schema) if schema.is_identified() => records.push(Self::compose(schema, node)?),
                _ => debug!(tag, "skipping element"),
            }
        }
        Ok(records)
    }

    pub fn compose(schema: &Schema, node: Node<'_>) -> Result<Self, CycError> {
        let mut record = Self::empty(schema, node)?;
        for (index, decl) in schema.fields().iter().enumerate() {
            match decl.kind {
                ValueKind::Reference => apply_reference(&mut record, index, node, decl)?,
                _ => apply_field(&mut record, index, node, decl)?,
            }
        }
        debug!(kind = record.kind, id = ?record.identity, "composed record");
        Ok(record)
    }

    fn empty(schema: &Schema, node: Node<'_>) -> Result<Self, CycError> {
        let (identity, detail) = if schema.is_identified() {
            let orgid = required_attribute(schema.name(), "orgid", node)?;
            let frameid = required_attribute(schema.name(), "frameid", node)?;
            let detail = node.attribute("detail").map(str::to_string);
            (Some(Identity::new(orgid, frameid)?), detail)
        } else {
            (None, None)
        };
        let slots = schema
            .fields()
            .iter()
            .map(|decl| {
                let slot = match decl.kind {
                    ValueKind::Reference => Slot::Link(Link::new(decl.name, decl.cardinality)),
                    _ => Slot::Value(Value::Null),
                };
                (decl.name, slot)
            })
            .collect();
        Ok(Self {
            kind: schema.name(),
            identity,
            detail,
            slots,
            atom_mappings: OnceCell::new(),
        })
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The `detail` level the server reported for this record.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &Slot)> {
        self.slots.iter().map(|(name, slot)| (*name, slot))
    }

    fn slot(&self, name: &str) -> Result<&Slot, CycError> {
        self.slots
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, slot)| slot)
            .ok_or_else(|| self.unknown(name))
    }

    /// Value of a scalar or nested-record field.
    pub fn get(&self, name: &str) -> Result<&Value, CycError> {
        match self.slot(name)? {
            Slot::Value(value) => Ok(value),
            Slot::Link(_) => Err(self.unknown(name)),
        }
    }

    pub fn link(&self, name: &str) -> Result<&Link, CycError> {
        match self.slot(name)? {
            Slot::Link(link) => Ok(link),
            Slot::Value(_) => Err(self.unknown(name)),
        }
    }

    /// Identifier view of a relationship; never fetches.
    pub fn ids(&self, name: &str) -> Result<Refs<Identity>, CycError> {
        Ok(self.link(name)?.ids())
    }

    /// Resolved view of a relationship; fetches through `resolver` on first read.
    pub fn resolve(
        &self,
        name: &str,
        resolver: &dyn Dereference,
    ) -> Result<Refs<Arc<Record>>, CycError> {
        self.link(name)?.resolve(resolver)
    }

    /// Atom mappings of a reaction, downloaded on first call and kept on the record.
    pub fn atom_mappings(
        &self,
        source: &dyn AtomMappingSource,
    ) -> Result<&[AtomMapping], CycError> {
        let identity = match (self.kind, &self.identity) {
            ("Reaction", Some(identity)) => identity,
            _ => return Err(self.unknown("atom_mappings")),
        };
        self.atom_mappings
            .get_or_try_init(|| source.atom_mappings(identity))
            .map(Vec::as_slice)
    }

    fn unknown(&self, name: &str) -> CycError {
        CycError::UnknownField {
            kind: self.kind.to_string(),
            field: name.to_string(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", self.kind)?;
        if let Some(identity) = &self.identity {
            map.serialize_entry("id", identity)?;
        }
        if let Some(detail) = &self.detail {
            map.serialize_entry("detail", detail)?;
        }
        for (name, slot) in &self.slots {
            map.serialize_entry(name, slot)?;
        }
        map.end()
    }
}

fn required_attribute<'a>(kind: &str, name: &str, node: Node<'a>) -> Result<&'a str, CycError> {
    node.attribute(name)
        .ok_or_else(|| object_invalid(kind, name, node))
}

fn object_invalid(kind: &str, field: &str, node: Node<'_>) -> CycError {
    CycError::ObjectInvalid {
        kind: kind.to_string(),
        field: field.to_string(),
        node: node.describe(),
    }
}

/// Attribute processor: select, cast each candidate, apply the null policy,
/// transform, then assign. Nothing is assigned if any step fails.
fn apply_field(
    record: &mut Record,
    index: usize,
    node: Node<'_>,
    decl: &FieldDecl,
) -> Result<(), CycError> {
    let items = node.select(decl.compiled_selector()?);
    let values = items
        .iter()
        .map(|item| cast(decl, item))
        .collect::<Result<Vec<_>, _>>()?;

    let value = if values.is_empty() {
        if !decl.nullable {
            return Err(object_invalid(record.kind, decl.name, node));
        }
        decl.empty_value()
    } else {
        match decl.cardinality {
            Cardinality::Collection => Value::List(values),
            Cardinality::Single => values.into_iter().next().unwrap_or(Value::Null),
        }
    };

    let value = match decl.transform {
        Some(transform) => transform(value),
        None => value,
    };
    record.slots[index].1 = Slot::Value(value);
    Ok(())
}

fn cast(decl: &FieldDecl, item: &Item<'_>) -> Result<Value, CycError> {
    match decl.kind {
        ValueKind::Scalar(scalar) => scalar.cast(item),
        ValueKind::Record(kind) => {
            let element = item.as_element().ok_or_else(|| CycError::InvalidNodeKind {
                scalar: kind.to_string(),
                node: item.describe(),
            })?;
            Ok(Value::Record(Box::new(Record::parse_as(kind, element)?)))
        }
        ValueKind::Reference => Err(CycError::InvalidNodeKind {
            scalar: "reference".to_string(),
            node: item.describe(),
        }),
    }
}

/// Reference processor: stores identifiers only; resolution happens on read.
fn apply_reference(
    record: &mut Record,
    index: usize,
    node: Node<'_>,
    decl: &FieldDecl,
) -> Result<(), CycError> {
    let items = node.select(decl.compiled_selector()?);
    let ids = items
        .iter()
        .map(|item| reference_identity(record.kind, decl, item))
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() && !decl.nullable {
        return Err(object_invalid(record.kind, decl.name, node));
    }
    let refs = match decl.cardinality {
        Cardinality::Single => Refs::One(ids.into_iter().next()),
        Cardinality::Collection => Refs::Many(ids),
    };

    if let Slot::Link(link) = &record.slots[index].1 {
        link.set_ids(refs);
    }
    Ok(())
}

fn reference_identity(kind: &str, decl: &FieldDecl, item: &Item<'_>) -> Result<Identity, CycError> {
    let element = item.as_element().ok_or_else(|| CycError::InvalidNodeKind {
        scalar: "reference".to_string(),
        node: item.describe(),
    })?;
    let orgid = element
        .attribute("orgid")
        .ok_or_else(|| object_invalid(kind, decl.name, element))?;
    let frameid = element
        .attribute("frameid")
        .ok_or_else(|| object_invalid(kind, decl.name, element))?;
    Identity::new(orgid, frameid)
}
