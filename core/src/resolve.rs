//! Field-resolver bridge: translates logical field names to the physical
//! column names a backend expects. Pure passthrough when unmapped.

use crate::query::{Payload, Query, Value};
use std::collections::HashMap;

pub trait FieldResolver {
    fn resolve(&self, entity: &str, field: &str) -> String;
}

/// The default bridge: logical names are physical names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl FieldResolver for Passthrough {
    fn resolve(&self, _entity: &str, field: &str) -> String {
        field.to_string()
    }
}

/// Explicit (entity, logical) -> physical table with passthrough fallback.
#[derive(Debug, Clone, Default)]
pub struct MappedResolver {
    mappings: HashMap<(String, String), String>,
}

impl MappedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(
        mut self,
        entity: impl Into<String>,
        logical: impl Into<String>,
        physical: impl Into<String>,
    ) -> Self {
        self.mappings
            .insert((entity.into(), logical.into()), physical.into());
        self
    }
}

impl FieldResolver for MappedResolver {
    fn resolve(&self, entity: &str, field: &str) -> String {
        self.mappings
            .get(&(entity.to_string(), field.to_string()))
            .cloned()
            .unwrap_or_else(|| field.to_string())
    }
}

/// Rewrites every logical field name in the query: projection, condition
/// leaves, sort keys and payload assignment names. Key-value keys are not
/// fields and pass through untouched.
pub fn apply(query: Query, resolver: &dyn FieldResolver) -> Query {
    match query {
        Query::Select(mut q) => {
            let entity = q.entity.clone();
            q.fields = q
                .fields
                .into_iter()
                .map(|f| resolver.resolve(&entity, &f))
                .collect();
            q.condition = q
                .condition
                .map(|c| c.map_fields(&|f| resolver.resolve(&entity, f)));
            for sort in &mut q.sort {
                sort.field = resolver.resolve(&entity, &sort.field);
            }
            Query::Select(q)
        }
        Query::Delete(mut q) => {
            let entity = q.entity.clone();
            q.fields = q
                .fields
                .into_iter()
                .map(|f| resolver.resolve(&entity, &f))
                .collect();
            q.condition = q
                .condition
                .map(|c| c.map_fields(&|f| resolver.resolve(&entity, f)));
            Query::Delete(q)
        }
        Query::Insert(mut q) => {
            q.payload = resolve_payload(q.payload, &q.entity, resolver);
            Query::Insert(q)
        }
        Query::Update(mut q) => {
            q.payload = resolve_payload(q.payload, &q.entity, resolver);
            Query::Update(q)
        }
        other => other,
    }
}

fn resolve_payload(payload: Payload, entity: &str, resolver: &dyn FieldResolver) -> Payload {
    match payload {
        Payload::Assignments(assignments) => Payload::Assignments(
            assignments
                .into_iter()
                .map(|(field, value)| (resolver.resolve(entity, &field), value))
                .collect(),
        ),
        Payload::Document(Value::Document(fields)) => Payload::Document(Value::Document(
            fields
                .into_iter()
                .map(|(field, value)| (resolver.resolve(entity, &field), value))
                .collect(),
        )),
        other => other,
    }
}
