//! Fluent, fail-fast builders for the canonical query model. Builders are
//! plain value accumulators; every structural check happens in `build()` so
//! a malformed query never reaches a backend.

use crate::error::{QuarryError, QuarryResult};
use crate::query::condition::{Condition, Connector, append};
use crate::query::value::{Value, ValueRef};
use crate::query::{
    DeleteQuery, GetQuery, InsertQuery, Payload, PutQuery, RemoveQuery, SelectQuery, SortList,
    SortSpec, UpdateQuery, check_ttl,
};
use std::time::Duration;

pub fn select() -> SelectBuilder {
    SelectBuilder::default()
}

pub fn delete() -> DeleteBuilder {
    DeleteBuilder::default()
}

pub fn insert(entity: impl Into<String>) -> InsertBuilder {
    InsertBuilder {
        entity: entity.into(),
        assignments: Vec::new(),
        document: None,
        ttl: None,
    }
}

pub fn update(entity: impl Into<String>) -> UpdateBuilder {
    UpdateBuilder {
        entity: entity.into(),
        assignments: Vec::new(),
        document: None,
    }
}

#[derive(Debug, Default)]
pub struct SelectBuilder {
    fields: Vec<String>,
    entity: String,
    condition: Option<Condition>,
    sort: SortList,
    skip: i64,
    limit: i64,
}

impl SelectBuilder {
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn from(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    /// Replaces the whole condition. For incremental composition use
    /// [`Self::and`] / [`Self::or`].
    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.condition = Some(append(self.condition.take(), Connector::And, condition));
        self
    }

    pub fn or(mut self, condition: Condition) -> Self {
        self.condition = Some(append(self.condition.take(), Connector::Or, condition));
        self
    }

    /// Sort entries layer in call order; duplicates are kept as given.
    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn build(self) -> QuarryResult<SelectQuery> {
        check_entity(&self.entity)?;
        check_fields(&self.fields)?;
        for sort in &self.sort {
            if sort.field.is_empty() {
                return Err(QuarryError::InvalidArgument(
                    "sort field name is empty".to_string(),
                ));
            }
        }
        Ok(SelectQuery {
            entity: self.entity,
            fields: self.fields,
            condition: self.condition,
            sort: self.sort,
            skip: self.skip,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Default)]
pub struct DeleteBuilder {
    fields: Vec<String>,
    entity: String,
    condition: Option<Condition>,
}

impl DeleteBuilder {
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn from(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.condition = Some(append(self.condition.take(), Connector::And, condition));
        self
    }

    pub fn or(mut self, condition: Condition) -> Self {
        self.condition = Some(append(self.condition.take(), Connector::Or, condition));
        self
    }

    pub fn build(self) -> QuarryResult<DeleteQuery> {
        check_entity(&self.entity)?;
        check_fields(&self.fields)?;
        Ok(DeleteQuery {
            entity: self.entity,
            fields: self.fields,
            condition: self.condition,
        })
    }
}

#[derive(Debug)]
pub struct InsertBuilder {
    entity: String,
    assignments: Vec<(String, ValueRef)>,
    document: Option<Value>,
    ttl: Option<Duration>,
}

impl InsertBuilder {
    pub fn set(mut self, field: impl Into<String>, value: ValueRef) -> Self {
        self.assignments.push((field.into(), value));
        self
    }

    pub fn document(mut self, json: serde_json::Value) -> Self {
        self.document = Some(Value::from_json(json));
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn build(self) -> QuarryResult<InsertQuery> {
        check_entity(&self.entity)?;
        let payload = build_payload("insert", self.assignments, self.document)?;
        let ttl = self.ttl.map(check_ttl).transpose()?;
        Ok(InsertQuery {
            entity: self.entity,
            payload,
            ttl,
        })
    }
}

#[derive(Debug)]
pub struct UpdateBuilder {
    entity: String,
    assignments: Vec<(String, ValueRef)>,
    document: Option<Value>,
}

impl UpdateBuilder {
    pub fn set(mut self, field: impl Into<String>, value: ValueRef) -> Self {
        self.assignments.push((field.into(), value));
        self
    }

    pub fn document(mut self, json: serde_json::Value) -> Self {
        self.document = Some(Value::from_json(json));
        self
    }

    pub fn build(self) -> QuarryResult<UpdateQuery> {
        check_entity(&self.entity)?;
        let payload = build_payload("update", self.assignments, self.document)?;
        Ok(UpdateQuery {
            entity: self.entity,
            payload,
        })
    }
}

impl GetQuery {
    pub fn new(entity: impl Into<String>, keys: Vec<ValueRef>) -> QuarryResult<Self> {
        let entity = entity.into();
        check_entity(&entity)?;
        if keys.is_empty() {
            return Err(QuarryError::InvalidArgument(
                "get requires at least one key".to_string(),
            ));
        }
        Ok(Self { entity, keys })
    }
}

impl PutQuery {
    pub fn new(
        entity: impl Into<String>,
        key: ValueRef,
        value: ValueRef,
        ttl: Option<Duration>,
    ) -> QuarryResult<Self> {
        let entity = entity.into();
        check_entity(&entity)?;
        let ttl = ttl.map(check_ttl).transpose()?;
        Ok(Self {
            entity,
            key,
            value,
            ttl,
        })
    }
}

impl RemoveQuery {
    pub fn new(entity: impl Into<String>, keys: Vec<ValueRef>) -> QuarryResult<Self> {
        let entity = entity.into();
        check_entity(&entity)?;
        if keys.is_empty() {
            return Err(QuarryError::InvalidArgument(
                "remove requires at least one key".to_string(),
            ));
        }
        Ok(Self { entity, keys })
    }
}

fn check_entity(entity: &str) -> QuarryResult<()> {
    if entity.is_empty() {
        return Err(QuarryError::InvalidArgument(
            "entity name is empty".to_string(),
        ));
    }
    Ok(())
}

fn check_fields(fields: &[String]) -> QuarryResult<()> {
    if fields.iter().any(String::is_empty) {
        return Err(QuarryError::InvalidArgument(
            "projection field name is empty".to_string(),
        ));
    }
    Ok(())
}

fn build_payload(
    verb: &str,
    assignments: Vec<(String, ValueRef)>,
    document: Option<Value>,
) -> QuarryResult<Payload> {
    match (assignments.is_empty(), document) {
        (false, Some(_)) => Err(QuarryError::InvalidArgument(format!(
            "{verb} accepts either assignments or a document payload, not both"
        ))),
        (true, Some(doc)) => Ok(Payload::Document(doc)),
        (false, None) => {
            if assignments.iter().any(|(field, _)| field.is_empty()) {
                return Err(QuarryError::InvalidArgument(
                    "assignment field name is empty".to_string(),
                ));
            }
            Ok(Payload::Assignments(assignments))
        }
        (true, None) => Err(QuarryError::InvalidArgument(format!(
            "{verb} requires assignments or a document payload"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, Operator};
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;

    #[test]
    fn test_select_round_trip() {
        let condition = Condition::leaf(
            "age",
            Operator::GreaterThan,
            ValueRef::literal(21i64),
        )
        .unwrap();

        let query = select()
            .fields(["name", "age"])
            .from("Person")
            .filter(condition.clone())
            .order_by(SortSpec::asc("name"))
            .order_by(SortSpec::desc("age"))
            .skip(3)
            .limit(10)
            .build()
            .unwrap();

        assert_eq!(query.entity, "Person");
        assert_eq!(query.fields, vec!["name".to_string(), "age".to_string()]);
        assert_eq!(query.condition, Some(condition));
        let expected: SortList = smallvec![SortSpec::asc("name"), SortSpec::desc("age")];
        assert_eq!(query.sort, expected);
        assert_eq!(query.skip, 3);
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_select_defaults_mean_unset() {
        let query = select().from("Person").build().unwrap();
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 0);
        assert_eq!(query.condition, None);
        assert!(query.fields.is_empty());
        assert!(query.sort.is_empty());
    }

    #[test]
    fn test_missing_entity_fails_at_build() {
        assert!(matches!(
            select().build(),
            Err(QuarryError::InvalidArgument(_))
        ));
        assert!(matches!(
            delete().build(),
            Err(QuarryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_duplicate_sort_keys_are_layered() {
        let query = select()
            .from("Person")
            .order_by(SortSpec::asc("name"))
            .order_by(SortSpec::desc("name"))
            .build()
            .unwrap();

        assert_eq!(query.sort.len(), 2);
        assert_eq!(query.sort[0].direction, Direction::Asc);
        assert_eq!(query.sort[1].direction, Direction::Desc);
    }

    #[test]
    fn test_builder_and_or_use_merge_rule() {
        let a = Condition::eq("a", ValueRef::literal(1i64)).unwrap();
        let b = Condition::eq("b", ValueRef::literal(2i64)).unwrap();
        let c = Condition::eq("c", ValueRef::literal(3i64)).unwrap();

        let query = select()
            .from("Person")
            .and(a.clone())
            .and(b.clone())
            .or(c.clone())
            .build()
            .unwrap();

        assert_eq!(
            query.condition,
            Some(Condition::Group {
                connector: Connector::Or,
                children: vec![
                    Condition::Group {
                        connector: Connector::And,
                        children: vec![a, b],
                    },
                    c,
                ],
            })
        );
    }

    #[test]
    fn test_update_payload_exclusivity() {
        let both = update("Person")
            .set("name", ValueRef::literal("Diana"))
            .document(serde_json::json!({"name": "Diana"}))
            .build();
        assert!(matches!(both, Err(QuarryError::InvalidArgument(_))));

        let neither = update("Person").build();
        assert!(matches!(neither, Err(QuarryError::InvalidArgument(_))));
    }

    #[test]
    fn test_insert_ttl_must_be_positive() {
        let query = insert("Person")
            .set("name", ValueRef::literal("Diana"))
            .ttl(Duration::ZERO)
            .build();
        assert!(matches!(query, Err(QuarryError::InvalidArgument(_))));
    }
}
