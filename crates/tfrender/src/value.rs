//! value representation
//!
//! Everything that flows through block bodies, variables and collection outputs is a [Value]:
//! - null
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Additionally there are three engine types:
//! - [Reference]: rendered as its interpolation text, e.g. `${aws_iam_user.peanut.arn}`
//! - [Path]: rendered as its plain path string
//! - [Block]: usable while producing configuration (outputs, variables) but it has no textual form, so
//!   final output containing one is rejected with [Error::Unrenderable]
//!
//! [Path]: std::path::PathBuf
use crate::block::{Block, Reference};
use crate::error::{Error, Result};
use crate::visit::{Location, VisitValues};
use serde::{
    ser::{Error as _, SerializeMap, SerializeSeq},
    Serializer,
};
use std::path::PathBuf;

/// Ordered string keyed mapping, the shape of block bodies and flattened blocks
pub type Mapping = indexmap::IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Mapping),
    Reference(Reference),
    Path(PathBuf),
    Block(Block),
}

impl Value {
    /// Name of the value type, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Reference(_) => "reference",
            Value::Path(_) => "path",
            Value::Block(_) => "block",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Mapping> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Value::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Equality the way the provisioning tool sees it
    ///
    /// Numbers compare by magnitude (`1` is the same as `1.0`), also inside arrays and objects.
    /// Object key order does not matter.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(int), Value::Decimal(decimal))
            | (Value::Decimal(decimal), Value::Integer(int)) => *int as f64 == *decimal,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_value(b))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, a)| b.get(key).is_some_and(|b| a.same_value(b)))
            }
            _ => self == other,
        }
    }

    /// Attribute access
    ///
    /// Blocks and references derive a new [Reference] for any name, objects look the key up.
    /// Every other type has no attributes.
    pub fn attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Block(block) => Some(block.attr(name).into()),
            Value::Reference(reference) => Some(reference.attr(name).into()),
            Value::Object(object) => object.get(name).cloned(),
            _ => None,
        }
    }

    /// Checks that this value (and everything nested in it) has a textual form
    pub fn ensure_renderable(&self) -> Result<()> {
        ensure_renderable(self, &mut Location::default())
    }

    /// Converts into a [serde_json::Value]
    ///
    /// Fails with [Error::Unrenderable] if a [Block] is nested anywhere in the value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.ensure_renderable()?;
        Ok(serde_json::to_value(self)?)
    }
}

/// Walks `subject` and reports the first value without a textual form
pub(crate) fn ensure_renderable(
    subject: &impl VisitValues,
    location: &mut Location,
) -> Result<()> {
    let mut unrenderable = None;
    subject.visit_values(location, &mut |location: &Location, value: &Value| {
        if unrenderable.is_none() && matches!(value, Value::Block(_)) {
            unrenderable = Some(Error::Unrenderable {
                kind: value.kind(),
                location: location.to_string(),
            });
        }
    });

    match unrenderable {
        Some(err) => {
            tracing::debug!(%err, "unrenderable value found");
            Err(err)
        }
        None => Ok(()),
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Reference(reference) => write!(f, "{reference}"),
            Value::Path(path) => write!(f, "{}", path.display()),
            Value::Block(block) => write!(f, "{block}"),
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Array(_) | Value::Object(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(std::fmt::Error),
            },
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<Reference> for Value {
    fn from(value: Reference) -> Self {
        Self::Reference(value)
    }
}

impl From<Block> for Value {
    fn from(value: Block) -> Self {
        Self::Block(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<indexmap::IndexMap<K, V>> for Value {
    fn from(value: indexmap::IndexMap<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Number> for Value {
    fn from(value: serde_json::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        // u64 beyond i64::MAX and floats both end up as decimals
        value.as_f64().map_or(Value::Null, Value::Decimal)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => n.into(),
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(a) => a.into(),
            serde_json::Value::Object(o) => Value::Object(
                o.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Reference(reference) => serializer.collect_str(reference),
            Value::Path(path) => serializer.collect_str(&path.display()),
            Value::Block(block) => Err(S::Error::custom(format!(
                "block {block} has no textual form"
            ))),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn references_and_paths_render_as_text() {
        let value: Value = indexmap::indexmap! {
            "arn" => Value::from(Reference::new("aws_iam_user.peanut.arn")),
            "file" => Value::from(PathBuf::from("files/policy.json")),
        }
        .into();

        assert_eq!(
            value.to_json().unwrap(),
            serde_json::json!({
                "arn": "${aws_iam_user.peanut.arn}",
                "file": "files/policy.json",
            })
        );
    }

    #[test]
    fn nested_block_is_unrenderable() {
        let value = Value::Array(vec![
            Value::Integer(1),
            indexmap::indexmap! {
                "user" => Value::from(Block::new("resource.aws_iam_user.peanut")),
            }
            .into(),
        ]);

        let err = value.to_json().expect_err("must error");
        let Error::Unrenderable { kind, location } = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(kind, "block");
        assert_eq!(location, "1.user");
    }

    #[test]
    fn numbers_compare_by_magnitude() {
        assert!(Value::Integer(1).same_value(&Value::Decimal(1.0)));
        assert!(Value::Decimal(1.0).same_value(&Value::Integer(1)));
        assert!(!Value::Integer(1).same_value(&Value::Decimal(1.5)));
        assert!(!Value::Integer(1).same_value(&Value::from("1")));

        let ints = Value::from(serde_json::json!({"counts": [1, 2], "name": "peanut"}));
        let decimals = Value::from(serde_json::json!({"name": "peanut", "counts": [1.0, 2.0]}));
        assert!(ints.same_value(&decimals));

        let other = Value::from(serde_json::json!({"counts": [1, 3], "name": "peanut"}));
        assert!(!ints.same_value(&other));
        assert!(!ints.same_value(&Value::from(serde_json::json!({"counts": [1, 2]}))));
    }

    #[test]
    fn attribute_access() {
        let user = Value::from(Block::new("resource.aws_iam_user.peanut"));
        assert_eq!(
            user.attr("arn"),
            Some(Value::from(Reference::new("aws_iam_user.peanut.arn")))
        );

        let object: Value = indexmap::indexmap! { "name" => "peanut" }.into();
        assert_eq!(object.attr("name"), Some(Value::from("peanut")));
        assert_eq!(object.attr("nope"), None);
        assert_eq!(Value::Integer(1).attr("name"), None);
    }

    #[test]
    fn from_json() {
        let value = Value::from(serde_json::json!({"a": [1, 2.5, "x", null, true]}));
        assert_eq!(
            value,
            Value::from(indexmap::indexmap! {
                "a" => Value::Array(vec![
                    Value::Integer(1),
                    Value::Decimal(2.5),
                    Value::from("x"),
                    Value::Null,
                    Value::Boolean(true),
                ])
            })
        );
    }
}
