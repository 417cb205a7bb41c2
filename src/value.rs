use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::CycError;
use crate::quantity::Quantity;
use crate::record::Record;
use crate::xml::{Item, NodeKind};

/// A typed field value produced by a field declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    IntegerQuantity(Quantity<i64>),
    FloatQuantity(Quantity<f64>),
    Record(Box<Record>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_integer_quantity(&self) -> Option<&Quantity<i64>> {
        match self {
            Value::IntegerQuantity(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_float_quantity(&self) -> Option<&Quantity<f64>> {
        match self {
            Value::FloatQuantity(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// String items of a list value; non-string items are skipped.
    pub fn strings(&self) -> Vec<&str> {
        self.as_list()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

/// Named decoders for a single leaf (attribute, text or CDATA) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Boolean,
    Integer,
    Float,
    Date,
    IntegerWithUnits,
    FloatWithUnits,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Boolean => "boolean",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Date => "date",
            ScalarType::IntegerWithUnits => "integer_with_units",
            ScalarType::FloatWithUnits => "float_with_units",
        }
    }

    pub fn cast(&self, item: &Item<'_>) -> Result<Value, CycError> {
        let text = self.leaf_text(item)?;
        let value = match self {
            ScalarType::String => Value::String(text),
            ScalarType::Boolean => Value::Boolean(text == "true"),
            ScalarType::Integer => self.integer(&text)?.map_or(Value::Null, Value::Integer),
            ScalarType::Float => self.float(&text)?.map_or(Value::Null, Value::Float),
            ScalarType::Date => self.date(&text)?.map_or(Value::Null, Value::Date),
            ScalarType::IntegerWithUnits => match self.integer(&text)? {
                Some(value) => Value::IntegerQuantity(Quantity::new(value, units_of(item))),
                None => Value::Null,
            },
            ScalarType::FloatWithUnits => match self.float(&text)? {
                Some(value) => Value::FloatQuantity(Quantity::new(value, units_of(item))),
                None => Value::Null,
            },
        };
        Ok(value)
    }

    fn leaf_text(&self, item: &Item<'_>) -> Result<String, CycError> {
        match item {
            Item::Attribute { value, .. } => Ok(value.trim().to_string()),
            Item::Node(node) if matches!(node.kind(), NodeKind::Text | NodeKind::CData) => {
                Ok(node.text().trim().to_string())
            }
            Item::Node(node) => Err(CycError::InvalidNodeKind {
                scalar: self.name().to_string(),
                node: node.describe(),
            }),
        }
    }

    fn integer(&self, text: &str) -> Result<Option<i64>, CycError> {
        if text.is_empty() {
            return Ok(None);
        }
        text.parse().map(Some).map_err(|_| self.invalid(text))
    }

    fn float(&self, text: &str) -> Result<Option<f64>, CycError> {
        if text.is_empty() {
            return Ok(None);
        }
        text.parse().map(Some).map_err(|_| self.invalid(text))
    }

    fn date(&self, text: &str) -> Result<Option<NaiveDate>, CycError> {
        if text.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| self.invalid(text))
    }

    fn invalid(&self, text: &str) -> CycError {
        CycError::InvalidValue {
            scalar: self.name().to_string(),
            text: text.to_string(),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Units live on the element that owns the value, not on the value node.
fn units_of(item: &Item<'_>) -> Option<String> {
    item.parent()
        .and_then(|parent| parent.attribute("units"))
        .map(|units| units.trim().to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::xml::{Document, Selector};

    fn cast(doc: &str, selector: &str, scalar: ScalarType) -> Result<Value, CycError> {
        let doc = Document::parse(doc).unwrap();
        let items = doc.root().select(&Selector::parse(selector).unwrap());
        scalar.cast(&items[0])
    }

    #[test]
    fn string_trims_whitespace() {
        let value = cast("<a>  hello  </a>", "text()", ScalarType::String).unwrap();
        assert_eq!(value.as_str(), Some("hello"));
        let value = cast(r#"<a id=" x "/>"#, "@id", ScalarType::String).unwrap();
        assert_eq!(value.as_str(), Some("x"));
    }

    #[test]
    fn string_rejects_elements() {
        let err = cast("<a><b/></a>", "b", ScalarType::String).unwrap_err();
        assert_matches!(err, CycError::InvalidNodeKind { .. });
    }

    #[test]
    fn boolean_is_literal_true_only() {
        let yes = cast("<a>true</a>", "text()", ScalarType::Boolean).unwrap();
        assert_eq!(yes.as_bool(), Some(true));
        let no = cast("<a>TRUE</a>", "text()", ScalarType::Boolean).unwrap();
        assert_eq!(no.as_bool(), Some(false));
        let no = cast(r#"<a class=""/>"#, "@class", ScalarType::Boolean).unwrap();
        assert_eq!(no.as_bool(), Some(false));
    }

    #[test]
    fn numbers_and_absent_values() {
        let value = cast("<a>42</a>", "text()", ScalarType::Integer).unwrap();
        assert_eq!(value.as_i64(), Some(42));
        let value = cast("<a>-1.5e2</a>", "text()", ScalarType::Float).unwrap();
        assert_eq!(value.as_f64(), Some(-150.0));
        let value = cast(r#"<a n=" "/>"#, "@n", ScalarType::Integer).unwrap();
        assert!(value.is_null());
        let err = cast("<a>4x</a>", "text()", ScalarType::Integer).unwrap_err();
        assert_matches!(err, CycError::InvalidValue { .. });
    }

    #[test]
    fn dates_parse_iso() {
        let value = cast("<a>2011-03-09</a>", "text()", ScalarType::Date).unwrap();
        assert_eq!(value.as_date(), NaiveDate::from_ymd_opt(2011, 3, 9));
        let err = cast("<a>09/03/2011</a>", "text()", ScalarType::Date).unwrap_err();
        assert_matches!(err, CycError::InvalidValue { .. });
    }

    #[test]
    fn quantities_read_units_from_parent() {
        let doc = r#"<c><molecular-weight datatype="float" units="Da">18.015</molecular-weight></c>"#;
        let value = cast(doc, "molecular-weight/text()", ScalarType::FloatWithUnits).unwrap();
        assert_eq!(
            value.as_float_quantity(),
            Some(&Quantity::new(18.015, Some("Da".to_string())))
        );

        let value = cast("<km><value>12</value></km>", "value/text()", ScalarType::IntegerWithUnits)
            .unwrap();
        assert_eq!(value.as_integer_quantity(), Some(&Quantity::unitless(12)));
    }
}
