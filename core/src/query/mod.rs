pub mod builder;
pub mod condition;
pub mod value;

pub use builder::{delete, insert, select, update};
pub use condition::{Condition, Connector, Operator, ParamSpec, append};
pub use value::{Value, ValueRef};

use crate::error::{QuarryError, QuarryResult};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: Direction,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Sort lists are nearly always one or two entries.
pub type SortList = SmallVec<[SortSpec; 2]>;

/// The canonical, database-agnostic query. Built once by the derivation or
/// text front ends and handed unchanged to a backend executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Select(SelectQuery),
    Delete(DeleteQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Get(GetQuery),
    Put(PutQuery),
    Remove(RemoveQuery),
}

/// `skip`/`limit` at or below zero mean "no bound".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    pub entity: String,
    pub fields: Vec<String>,
    pub condition: Option<Condition>,
    pub sort: SortList,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteQuery {
    pub entity: String,
    pub fields: Vec<String>,
    pub condition: Option<Condition>,
}

/// Insert payload: explicit field assignments or one JSON document. The
/// two forms are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Assignments(Vec<(String, ValueRef)>),
    Document(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertQuery {
    pub entity: String,
    pub payload: Payload,
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateQuery {
    pub entity: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetQuery {
    pub entity: String,
    pub keys: Vec<ValueRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutQuery {
    pub entity: String,
    pub key: ValueRef,
    pub value: ValueRef,
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveQuery {
    pub entity: String,
    pub keys: Vec<ValueRef>,
}

impl Query {
    pub fn entity(&self) -> &str {
        match self {
            Self::Select(q) => &q.entity,
            Self::Delete(q) => &q.entity,
            Self::Insert(q) => &q.entity,
            Self::Update(q) => &q.entity,
            Self::Get(q) => &q.entity,
            Self::Put(q) => &q.entity,
            Self::Remove(q) => &q.entity,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Select(q) => q.condition.as_ref(),
            Self::Delete(q) => q.condition.as_ref(),
            _ => None,
        }
    }

    /// Declared placeholders, in query order: condition leaves first, then
    /// payload slots, then key-value refs.
    pub fn parameter_specs(&self) -> Vec<ParamSpec> {
        let mut out = Vec::new();
        match self {
            Self::Select(q) => {
                if let Some(c) = &q.condition {
                    c.collect_parameters(&mut out);
                }
            }
            Self::Delete(q) => {
                if let Some(c) = &q.condition {
                    c.collect_parameters(&mut out);
                }
            }
            Self::Insert(q) => collect_payload_parameters(&q.payload, &mut out),
            Self::Update(q) => collect_payload_parameters(&q.payload, &mut out),
            Self::Get(q) => collect_ref_parameters(&q.keys, &mut out),
            Self::Put(q) => {
                collect_ref_parameters(std::slice::from_ref(&q.key), &mut out);
                collect_ref_parameters(std::slice::from_ref(&q.value), &mut out);
            }
            Self::Remove(q) => collect_ref_parameters(&q.keys, &mut out),
        }
        out
    }

    /// Substitutes every placeholder named `name` with the literal value.
    pub fn bind_parameter(self, name: &str, value: &Value) -> QuarryResult<Self> {
        match self {
            Self::Select(mut q) => {
                q.condition = bind_condition(q.condition, name, value)?;
                Ok(Self::Select(q))
            }
            Self::Delete(mut q) => {
                q.condition = bind_condition(q.condition, name, value)?;
                Ok(Self::Delete(q))
            }
            Self::Insert(mut q) => {
                q.payload = bind_payload(q.payload, name, value);
                Ok(Self::Insert(q))
            }
            Self::Update(mut q) => {
                q.payload = bind_payload(q.payload, name, value);
                Ok(Self::Update(q))
            }
            Self::Get(mut q) => {
                q.keys = q.keys.into_iter().map(|k| bind_ref(k, name, value)).collect();
                Ok(Self::Get(q))
            }
            Self::Put(mut q) => {
                q.key = bind_ref(q.key, name, value);
                q.value = bind_ref(q.value, name, value);
                Ok(Self::Put(q))
            }
            Self::Remove(mut q) => {
                q.keys = q.keys.into_iter().map(|k| bind_ref(k, name, value)).collect();
                Ok(Self::Remove(q))
            }
        }
    }

    /// True when the query still carries unresolved placeholders.
    pub fn has_parameters(&self) -> bool {
        !self.parameter_specs().is_empty()
    }
}

fn collect_payload_parameters(payload: &Payload, out: &mut Vec<ParamSpec>) {
    if let Payload::Assignments(assignments) = payload {
        for (_, value) in assignments {
            if let ValueRef::Parameter(name) = value {
                out.push(ParamSpec {
                    name: name.clone(),
                    op: Operator::Equals,
                });
            }
        }
    }
}

fn collect_ref_parameters(refs: &[ValueRef], out: &mut Vec<ParamSpec>) {
    for r in refs {
        if let ValueRef::Parameter(name) = r {
            out.push(ParamSpec {
                name: name.clone(),
                op: Operator::Equals,
            });
        }
    }
}

fn bind_condition(
    condition: Option<Condition>,
    name: &str,
    value: &Value,
) -> QuarryResult<Option<Condition>> {
    condition.map(|c| c.bind_parameter(name, value)).transpose()
}

fn bind_payload(payload: Payload, name: &str, value: &Value) -> Payload {
    match payload {
        Payload::Assignments(assignments) => Payload::Assignments(
            assignments
                .into_iter()
                .map(|(field, v)| (field, bind_ref(v, name, value)))
                .collect(),
        ),
        document @ Payload::Document(_) => document,
    }
}

fn bind_ref(r: ValueRef, name: &str, value: &Value) -> ValueRef {
    match r {
        ValueRef::Parameter(param) if param == name => ValueRef::Literal(value.clone()),
        other => other,
    }
}

/// Validates a TTL duration: zero-length TTLs are meaningless and rejected
/// at build time rather than at a backend.
pub(crate) fn check_ttl(ttl: Duration) -> QuarryResult<Duration> {
    if ttl.is_zero() {
        return Err(QuarryError::InvalidArgument(
            "ttl duration must be positive".to_string(),
        ));
    }
    Ok(ttl)
}
