//! Reference in-memory backend. Evaluates condition trees row by row with
//! no indexes; used by tests and the `quarryq` binary. TTLs are accepted
//! and ignored since the store has no clock.

use super::{Executor, Row, RowIter};
use crate::error::{QuarryError, QuarryResult};
use crate::query::{
    Condition, Connector, DeleteQuery, Direction, GetQuery, InsertQuery, Operator, Payload,
    PutQuery, Query, RemoveQuery, SelectQuery, UpdateQuery, Value, ValueRef,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

static NULL: Value = Value::Null;

#[derive(Default)]
pub struct MemoryExecutor {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    buckets: RwLock<HashMap<String, Vec<(Value, Value)>>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/demo helper: loads rows into an entity's table directly.
    pub fn seed(&self, entity: &str, rows: Vec<Row>) {
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(entity.to_string())
            .or_default()
            .extend(rows);
    }

    fn select(&self, query: &SelectQuery) -> QuarryResult<Vec<Row>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let rows = tables.get(&query.entity).cloned().unwrap_or_default();
        drop(tables);

        let mut rows = filter(rows, query.condition.as_ref())?;
        sort_rows(&mut rows, query);
        let rows = bound(rows, query.skip, query.limit);
        Ok(project(rows, &query.fields))
    }

    fn delete(&self, query: &DeleteQuery) -> QuarryResult<Vec<Row>> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let rows = tables.entry(query.entity.clone()).or_default();

        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for row in rows.drain(..) {
            if matches(&row, query.condition.as_ref())? {
                removed.push(row);
            } else {
                kept.push(row);
            }
        }
        *rows = kept;

        Ok(project(removed, &query.fields))
    }

    fn insert(&self, query: &InsertQuery) -> QuarryResult<Vec<Row>> {
        let row = payload_row(&query.payload)?;
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(query.entity.clone())
            .or_default()
            .push(row.clone());
        Ok(vec![row])
    }

    fn update(&self, query: &UpdateQuery) -> QuarryResult<Vec<Row>> {
        let patch = payload_row(&query.payload)?;
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let rows = tables.entry(query.entity.clone()).or_default();

        // No key semantics here: the patch applies to every row.
        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            for (column, value) in &patch.data {
                row.insert(column.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    fn get(&self, query: &GetQuery) -> QuarryResult<Vec<Row>> {
        let keys = literal_keys(&query.keys)?;
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        let pairs = buckets.get(&query.entity).cloned().unwrap_or_default();
        drop(buckets);

        let mut rows = Vec::new();
        for key in keys {
            for (stored_key, stored_value) in &pairs {
                if values_equal(stored_key, &key) {
                    rows.push(pair_row(stored_key, stored_value));
                }
            }
        }
        Ok(rows)
    }

    fn put(&self, query: &PutQuery) -> QuarryResult<Vec<Row>> {
        let key = literal(&query.key)?.clone();
        let value = literal(&query.value)?.clone();

        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let pairs = buckets.entry(query.entity.clone()).or_default();
        pairs.retain(|(stored_key, _)| !values_equal(stored_key, &key));
        pairs.push((key.clone(), value.clone()));

        Ok(vec![pair_row(&key, &value)])
    }

    fn remove(&self, query: &RemoveQuery) -> QuarryResult<Vec<Row>> {
        let keys = literal_keys(&query.keys)?;
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let pairs = buckets.entry(query.entity.clone()).or_default();

        let mut removed = Vec::new();
        pairs.retain(|(stored_key, stored_value)| {
            if keys.iter().any(|key| values_equal(stored_key, key)) {
                removed.push(pair_row(stored_key, stored_value));
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

impl Executor for MemoryExecutor {
    fn execute(&self, query: &Query) -> QuarryResult<RowIter> {
        let rows = match query {
            Query::Select(q) => self.select(q)?,
            Query::Delete(q) => self.delete(q)?,
            Query::Insert(q) => self.insert(q)?,
            Query::Update(q) => self.update(q)?,
            Query::Get(q) => self.get(q)?,
            Query::Put(q) => self.put(q)?,
            Query::Remove(q) => self.remove(q)?,
        };
        Ok(Box::new(rows.into_iter()))
    }
}

fn filter(rows: Vec<Row>, condition: Option<&Condition>) -> QuarryResult<Vec<Row>> {
    let mut kept = Vec::new();
    for row in rows {
        if matches(&row, condition)? {
            kept.push(row);
        }
    }
    Ok(kept)
}

fn matches(row: &Row, condition: Option<&Condition>) -> QuarryResult<bool> {
    match condition {
        Some(condition) => eval(condition, row),
        None => Ok(true),
    }
}

fn eval(condition: &Condition, row: &Row) -> QuarryResult<bool> {
    match condition {
        Condition::Leaf { field, op, value } => {
            let expected = literal(value)?;
            let actual = row.get(field).unwrap_or(&NULL);
            eval_leaf(*op, actual, expected)
        }
        Condition::Not(inner) => Ok(!eval(inner, row)?),
        Condition::Group {
            connector,
            children,
        } => match connector {
            Connector::And => {
                for child in children {
                    if !eval(child, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Connector::Or => {
                for child in children {
                    if eval(child, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
    }
}

fn eval_leaf(op: Operator, actual: &Value, expected: &Value) -> QuarryResult<bool> {
    match op {
        Operator::Equals => Ok(values_equal(actual, expected)),
        Operator::GreaterThan => Ok(compare(actual, expected) == Some(Ordering::Greater)),
        Operator::GreaterThanEqual => Ok(matches!(
            compare(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        Operator::LessThan => Ok(compare(actual, expected) == Some(Ordering::Less)),
        Operator::LessThanEqual => Ok(matches!(
            compare(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        )),
        Operator::Like => like_match(actual, expected),
        Operator::In => match expected {
            Value::Array(items) => Ok(items.iter().any(|item| values_equal(actual, item))),
            other => Err(QuarryError::Backend(format!(
                "in expects an array operand, got {}",
                other.type_name()
            ))),
        },
        Operator::Between => match expected {
            Value::Array(items) if items.len() == 2 => Ok(matches!(
                compare(actual, &items[0]),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare(actual, &items[1]),
                Some(Ordering::Less | Ordering::Equal)
            )),
            other => Err(QuarryError::Backend(format!(
                "between expects a two-element array operand, got {}",
                other.type_name()
            ))),
        },
    }
}

/// Integers and decimals compare across the numeric variants; everything
/// else must match variant-for-variant.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(l), Value::Decimal(r)) | (Value::Decimal(r), Value::Integer(l)) => {
            (*l as f64) == *r
        }
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
        (Value::Decimal(l), Value::Decimal(r)) => l.partial_cmp(r),
        (Value::Integer(l), Value::Decimal(r)) => (*l as f64).partial_cmp(r),
        (Value::Decimal(l), Value::Integer(r)) => l.partial_cmp(&(*r as f64)),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn like_match(actual: &Value, pattern: &Value) -> QuarryResult<bool> {
    let Value::String(pattern) = pattern else {
        return Err(QuarryError::Backend(format!(
            "like pattern must be a string, got {}",
            pattern.type_name()
        )));
    };
    let Value::String(actual) = actual else {
        return Ok(false);
    };
    Ok(wildcard_match(actual, pattern))
}

/// `%` matches any run of characters; there are no other wildcards.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    if !pattern.contains('%') {
        return text == pattern;
    }

    let segments: Vec<&str> = pattern.split('%').collect();
    let mut rest = text;
    let last = segments.len() - 1;

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(segment) {
                Some(stripped) => rest = stripped,
                None => return false,
            }
        } else if i == last {
            return rest.ends_with(segment);
        } else {
            match rest.find(segment) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
    }
    true
}

fn sort_rows(rows: &mut [Row], query: &SelectQuery) {
    if query.sort.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for spec in &query.sort {
            let left = a.get(&spec.field).unwrap_or(&NULL);
            let right = b.get(&spec.field).unwrap_or(&NULL);
            let ordering = compare(left, right).unwrap_or(Ordering::Equal);
            let ordering = match spec.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn bound(rows: Vec<Row>, skip: i64, limit: i64) -> Vec<Row> {
    let mut iter = rows.into_iter();
    if skip > 0 {
        for _ in 0..skip {
            if iter.next().is_none() {
                break;
            }
        }
    }
    if limit > 0 {
        iter.take(limit as usize).collect()
    } else {
        iter.collect()
    }
}

fn project(rows: Vec<Row>, fields: &[String]) -> Vec<Row> {
    if fields.is_empty() {
        return rows;
    }
    rows.into_iter()
        .map(|row| {
            let mut projected = Row::new();
            for field in fields {
                if let Some(value) = row.get(field) {
                    projected.insert(field.clone(), value.clone());
                }
            }
            projected
        })
        .collect()
}

fn payload_row(payload: &Payload) -> QuarryResult<Row> {
    let mut row = Row::new();
    match payload {
        Payload::Assignments(assignments) => {
            for (field, value) in assignments {
                row.insert(field.clone(), literal(value)?.clone());
            }
        }
        Payload::Document(document) => match document {
            Value::Document(fields) => {
                for (field, value) in fields {
                    row.insert(field.clone(), value.clone());
                }
            }
            other => {
                return Err(QuarryError::Backend(format!(
                    "document payload must be a document, got {}",
                    other.type_name()
                )));
            }
        },
    }
    Ok(row)
}

fn literal(value: &ValueRef) -> QuarryResult<&Value> {
    value.as_literal().ok_or_else(|| {
        QuarryError::Backend("unbound placeholder reached the backend".to_string())
    })
}

fn literal_keys(keys: &[ValueRef]) -> QuarryResult<Vec<Value>> {
    keys.iter().map(|key| literal(key).cloned()).collect()
}

fn pair_row(key: &Value, value: &Value) -> Row {
    let mut row = Row::new();
    row.insert("key", key.clone());
    row.insert("value", value.clone());
    row
}
