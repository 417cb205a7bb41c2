use std::collections::HashMap;

use once_cell::sync::OnceCell;

use crate::error::CycError;
use crate::value::{ScalarType, Value};
use crate::xml::Selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar(ScalarType),
    /// A nested record parsed in place from the selected element.
    Record(&'static str),
    /// A cross-reference built from the selected element's `orgid`/`frameid`.
    Reference,
}

pub type Transform = fn(Value) -> Value;

/// How to extract one named field from a record element.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: &'static str,
    pub selector: &'static str,
    pub cardinality: Cardinality,
    pub nullable: bool,
    pub default: Option<Value>,
    pub kind: ValueKind,
    pub transform: Option<Transform>,
    compiled: OnceCell<Selector>,
}

impl FieldDecl {
    /// A nullable single string field.
    pub fn attr(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            selector,
            cardinality: Cardinality::Single,
            nullable: true,
            default: None,
            kind: ValueKind::Scalar(ScalarType::String),
            transform: None,
            compiled: OnceCell::new(),
        }
    }

    /// A cross-reference field. Only `required` applies to references: an
    /// empty reference is always an empty slot, never a default value.
    pub fn reference(
        name: &'static str,
        selector: &'static str,
        cardinality: Cardinality,
    ) -> ReferenceDecl {
        ReferenceDecl(Self {
            cardinality,
            kind: ValueKind::Reference,
            ..Self::attr(name, selector)
        })
    }

    pub fn scalar(mut self, scalar: ScalarType) -> Self {
        self.kind = ValueKind::Scalar(scalar);
        self
    }

    pub fn record(mut self, kind: &'static str) -> Self {
        self.kind = ValueKind::Record(kind);
        self
    }

    pub fn collection(mut self) -> Self {
        self.cardinality = Cardinality::Collection;
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn is_reference(&self) -> bool {
        self.kind == ValueKind::Reference
    }

    /// Compiled once per declaration and shared by every parse.
    pub fn compiled_selector(&self) -> Result<&Selector, CycError> {
        self.compiled
            .get_or_try_init(|| Selector::parse(self.selector))
    }

    /// Value used when the selector matches nothing and the field is nullable.
    pub fn empty_value(&self) -> Value {
        match (&self.default, self.cardinality) {
            (Some(value), _) => value.clone(),
            (None, Cardinality::Collection) => Value::List(Vec::new()),
            (None, Cardinality::Single) => Value::Null,
        }
    }
}

/// Builder for a relationship declaration; converts into a [`FieldDecl`].
#[derive(Debug, Clone)]
pub struct ReferenceDecl(FieldDecl);

impl ReferenceDecl {
    pub fn required(self) -> Self {
        Self(self.0.required())
    }
}

impl From<ReferenceDecl> for FieldDecl {
    fn from(decl: ReferenceDecl) -> Self {
        decl.0
    }
}

/// A record kind: its canonical name and ordered field declarations.
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    identified: bool,
    fields: Vec<FieldDecl>,
}

impl Schema {
    /// A kind whose elements carry `orgid`, `frameid` and `detail` attributes.
    pub fn identified(name: &'static str) -> Self {
        Self {
            name,
            identified: true,
            fields: Vec::new(),
        }
    }

    /// A kind that only ever appears nested inside another record.
    pub fn nested(name: &'static str) -> Self {
        Self {
            name,
            identified: false,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, decl: impl Into<FieldDecl>) -> Self {
        self.fields.push(decl.into());
        self
    }

    pub fn has_one(self, name: &'static str, selector: &'static str) -> Self {
        self.field(FieldDecl::reference(name, selector, Cardinality::Single))
    }

    pub fn has_many(self, name: &'static str, selector: &'static str) -> Self {
        self.field(FieldDecl::reference(name, selector, Cardinality::Collection))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_identified(&self) -> bool {
        self.identified
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn decl(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|decl| decl.name == name)
    }

    /// Compiles every selector, reporting the first one that does not parse.
    pub fn validate(&self) -> Result<(), CycError> {
        for decl in &self.fields {
            decl.compiled_selector()?;
        }
        Ok(())
    }
}

/// Canonical kind name → schema.
#[derive(Debug, Default)]
pub struct Registry {
    schemas: HashMap<&'static str, Schema>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: Schema) -> &mut Self {
        self.schemas.insert(schema.name, schema);
        self
    }

    pub fn lookup(&self, kind: &str) -> Result<&Schema, CycError> {
        self.schemas
            .get(kind)
            .ok_or_else(|| CycError::UnknownKind(kind.to_string()))
    }

    /// Resolves an element tag such as `Enzymatic-Reaction` to its kind.
    pub fn lookup_element(&self, tag: &str) -> Result<&Schema, CycError> {
        self.lookup(&canonical_kind(tag))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

pub fn canonical_kind(tag: &str) -> String {
    tag.chars().filter(|ch| *ch != '-').collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn canonical_kind_strips_hyphens() {
        assert_eq!(canonical_kind("Enzymatic-Reaction"), "EnzymaticReaction");
        assert_eq!(canonical_kind("DNA-Binding-Site"), "DNABindingSite");
        assert_eq!(canonical_kind("Pathway"), "Pathway");
    }

    #[test]
    fn registry_lookup() {
        let mut registry = Registry::new();
        registry.register(Schema::identified("EvidenceCode"));
        assert_eq!(registry.lookup_element("Evidence-Code").unwrap().name(), "EvidenceCode");
        assert_matches!(registry.lookup("Gene"), Err(CycError::UnknownKind(_)));
    }

    #[test]
    fn empty_value_follows_cardinality_and_default() {
        assert!(FieldDecl::attr("a", "a/text()").empty_value().is_null());
        let list = FieldDecl::attr("a", "a/text()").collection().empty_value();
        assert_eq!(list.as_list().map(<[Value]>::len), Some(0));
        let flag = FieldDecl::attr("a", "@a").scalar(ScalarType::Boolean).default(false);
        assert_eq!(flag.empty_value().as_bool(), Some(false));
    }

    #[test]
    fn reference_declarations_have_no_default() {
        let decl: FieldDecl =
            FieldDecl::reference("owner", "owner/*", Cardinality::Single).required().into();
        assert!(decl.is_reference());
        assert!(!decl.nullable);
        assert!(decl.default.is_none());
        let many: FieldDecl = FieldDecl::reference("parts", "part/*", Cardinality::Collection).into();
        assert_eq!(many.cardinality, Cardinality::Collection);
    }

    #[test]
    fn invalid_selector_reported_by_validate() {
        let schema = Schema::nested("Broken").field(FieldDecl::attr("a", "a[b]"));
        assert_matches!(schema.validate(), Err(CycError::InvalidSelector { .. }));
    }
}
