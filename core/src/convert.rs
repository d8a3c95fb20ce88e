//! Attribute-converter bridge: turns a raw bound value into the literal
//! representation a backend expects, per entity field.

use crate::query::{Condition, Payload, Query, Value, ValueRef};
use std::collections::HashMap;

pub trait ValueConverter {
    fn convert(&self, value: Value) -> Value;
}

/// Converter registry keyed by (entity, field); fields without an entry
/// pass their values through unchanged.
#[derive(Default)]
pub struct ConverterRegistry {
    by_field: HashMap<(String, String), Box<dyn ValueConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        converter: Box<dyn ValueConverter>,
    ) {
        self.by_field
            .insert((entity.into(), field.into()), converter);
    }

    pub fn convert(&self, entity: &str, field: &str, value: Value) -> Value {
        match self.by_field.get(&(entity.to_string(), field.to_string())) {
            Some(converter) => converter.convert(value),
            None => value,
        }
    }

    /// Runs every literal in the query through its field's converter.
    pub fn apply(&self, query: Query) -> Query {
        match query {
            Query::Select(mut q) => {
                q.condition = q.condition.map(|c| self.convert_condition(&q.entity, c));
                Query::Select(q)
            }
            Query::Delete(mut q) => {
                q.condition = q.condition.map(|c| self.convert_condition(&q.entity, c));
                Query::Delete(q)
            }
            Query::Insert(mut q) => {
                q.payload = self.convert_payload(&q.entity, q.payload);
                Query::Insert(q)
            }
            Query::Update(mut q) => {
                q.payload = self.convert_payload(&q.entity, q.payload);
                Query::Update(q)
            }
            other => other,
        }
    }

    fn convert_condition(&self, entity: &str, condition: Condition) -> Condition {
        match condition {
            Condition::Leaf {
                field,
                op,
                value: ValueRef::Literal(literal),
            } => {
                let converted = self.convert(entity, &field, literal);
                Condition::Leaf {
                    field,
                    op,
                    value: ValueRef::Literal(converted),
                }
            }
            leaf @ Condition::Leaf { .. } => leaf,
            Condition::Not(inner) => {
                Condition::Not(Box::new(self.convert_condition(entity, *inner)))
            }
            Condition::Group {
                connector,
                children,
            } => Condition::Group {
                connector,
                children: children
                    .into_iter()
                    .map(|c| self.convert_condition(entity, c))
                    .collect(),
            },
        }
    }

    fn convert_payload(&self, entity: &str, payload: Payload) -> Payload {
        match payload {
            Payload::Assignments(assignments) => Payload::Assignments(
                assignments
                    .into_iter()
                    .map(|(field, value)| match value {
                        ValueRef::Literal(literal) => {
                            let converted = self.convert(entity, &field, literal);
                            (field, ValueRef::Literal(converted))
                        }
                        parameter => (field, parameter),
                    })
                    .collect(),
            ),
            document => document,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Operator, select};
    use pretty_assertions::assert_eq;

    struct Uppercase;

    impl ValueConverter for Uppercase {
        fn convert(&self, value: Value) -> Value {
            match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            }
        }
    }

    #[test]
    fn test_converter_applies_to_matching_field_only() {
        let mut registry = ConverterRegistry::new();
        registry.register("Person", "country", Box::new(Uppercase));

        let query = Query::Select(
            select()
                .from("Person")
                .and(Condition::leaf("country", Operator::Equals, ValueRef::literal("br")).unwrap())
                .and(Condition::leaf("name", Operator::Equals, ValueRef::literal("ada")).unwrap())
                .build()
                .unwrap(),
        );

        match registry.apply(query) {
            Query::Select(q) => {
                let expected = Condition::leaf("country", Operator::Equals, ValueRef::literal("BR"))
                    .unwrap()
                    .and(Condition::leaf("name", Operator::Equals, ValueRef::literal("ada")).unwrap());
                assert_eq!(q.condition, Some(expected));
            }
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn test_placeholders_are_not_converted() {
        let mut registry = ConverterRegistry::new();
        registry.register("Person", "country", Box::new(Uppercase));

        let converted = registry.convert("Person", "country", Value::String("br".into()));
        assert_eq!(converted, Value::String("BR".into()));

        let untouched = registry.convert("Person", "name", Value::String("br".into()));
        assert_eq!(untouched, Value::String("br".into()));
    }
}
