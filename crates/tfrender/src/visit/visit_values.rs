use super::{Location, Visit};
use crate::value::{Mapping, Value};

/// Recursively visit all [Value]s, containers before their elements
pub trait VisitValues {
    fn visit_values(&self, location: &mut Location, visitor: &mut dyn Visit<Value>);
}

impl VisitValues for Value {
    fn visit_values(&self, location: &mut Location, visitor: &mut dyn Visit<Value>) {
        visitor.visit(location, self);

        match self {
            Value::Array(array) => {
                for (index, element) in array.iter().enumerate() {
                    location.push(index);
                    element.visit_values(location, visitor);
                    location.pop();
                }
            }
            Value::Object(object) => object.visit_values(location, visitor),
            // a block body is not part of the rendered value, the block itself is
            _ => {}
        }
    }
}

impl VisitValues for Mapping {
    fn visit_values(&self, location: &mut Location, visitor: &mut dyn Visit<Value>) {
        for (key, value) in self {
            location.push(key);
            value.visit_values(location, visitor);
            location.pop();
        }
    }
}

impl<T: VisitValues> VisitValues for [T] {
    fn visit_values(&self, location: &mut Location, visitor: &mut dyn Visit<Value>) {
        for (index, element) in self.iter().enumerate() {
            location.push(index);
            element.visit_values(location, visitor);
            location.pop();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn visits_in_order_with_locations() {
        let value = Value::from(serde_json::json!({"a": [1, {"b": 2}], "c": 3}));

        let mut seen = vec![];
        value.visit_values(
            &mut Location::default(),
            &mut |location: &Location, value: &Value| {
                seen.push((location.to_string(), value.kind()))
            },
        );

        assert_eq!(
            seen,
            vec![
                ("".to_string(), "object"),
                ("a".to_string(), "array"),
                ("a.0".to_string(), "integer"),
                ("a.1".to_string(), "object"),
                ("a.1.b".to_string(), "integer"),
                ("c".to_string(), "integer"),
            ]
        );
    }
}
