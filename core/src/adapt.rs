//! Dynamic return adaptation: shapes a lazily produced row sequence into
//! the return form a repository method declared. Shapes form a closed enum
//! resolved once per method at compile time, not per call.

use crate::error::{QuarryError, QuarryResult};
use crate::exec::{Executor, Row, RowIter};
use crate::query::{Query, SortSpec, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Fire the query, surface nothing.
    Unit,
    /// Exactly one row expected; absence maps to null at the boundary.
    Single,
    /// Zero or one row.
    Optional,
    List,
    Stream,
    Page,
}

/// Skip/limit carrier smuggled through a method's argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    /// Bounds of the following page.
    pub fn next(self) -> Self {
        Self {
            skip: self.skip.max(0) + self.limit.max(0),
            limit: self.limit,
        }
    }
}

/// One invocation argument. Carriers are recognized by their structural
/// type, never by position.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Pagination(Pagination),
    Sort(Vec<SortSpec>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Specials {
    pub pagination: Option<Pagination>,
    pub sort: Vec<SortSpec>,
}

/// Splits pagination/sort carriers out of an argument list, returning the
/// plain values left over for parameter binding.
pub fn extract_specials(args: Vec<Arg>) -> (Vec<Value>, Specials) {
    let mut values = Vec::new();
    let mut specials = Specials::default();

    for arg in args {
        match arg {
            Arg::Value(value) => values.push(value),
            Arg::Pagination(pagination) => specials.pagination = Some(pagination),
            Arg::Sort(sort) => specials.sort.extend(sort),
        }
    }
    (values, specials)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub content: Vec<Row>,
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn next_pagination(&self) -> Pagination {
        Pagination::new(self.skip, self.limit).next()
    }
}

/// The adapted result handed back to the caller.
pub enum ReturnValue {
    Unit,
    Single(Option<Row>),
    List(Vec<Row>),
    Stream(RowIter),
    Page(Page),
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "Unit"),
            Self::Single(row) => f.debug_tuple("Single").field(row).finish(),
            Self::List(rows) => f.debug_tuple("List").field(rows).finish(),
            Self::Stream(_) => write!(f, "Stream(..)"),
            Self::Page(page) => f.debug_tuple("Page").field(page).finish(),
        }
    }
}

/// Executes the query and adapts the result to the declared shape. Any
/// failure propagates immediately; no step retries.
pub fn adapt(
    shape: ReturnShape,
    query: &Query,
    executor: &dyn Executor,
) -> QuarryResult<ReturnValue> {
    tracing::trace!(?shape, entity = query.entity(), "adapting result");

    match shape {
        ReturnShape::Unit => {
            executor.execute(query)?;
            Ok(ReturnValue::Unit)
        }
        ReturnShape::Single | ReturnShape::Optional => {
            // "not found" is never an error here; "too many" always is
            Ok(ReturnValue::Single(executor.execute_single(query)?))
        }
        ReturnShape::List => Ok(ReturnValue::List(executor.execute(query)?.collect())),
        ReturnShape::Stream => Ok(ReturnValue::Stream(executor.execute(query)?)),
        ReturnShape::Page => {
            if !executor.paginates() {
                return Err(QuarryError::UnsupportedOperation(format!(
                    "backend cannot paginate results for '{}'",
                    query.entity()
                )));
            }
            let (skip, limit) = match query {
                Query::Select(select) => (select.skip, select.limit),
                _ => (0, 0),
            };
            let content = executor.execute(query)?.collect();
            Ok(ReturnValue::Page(Page {
                content,
                skip,
                limit,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::MemoryExecutor;
    use crate::query::select;
    use pretty_assertions::assert_eq;

    struct Traversal;

    impl Executor for Traversal {
        fn execute(&self, _query: &Query) -> QuarryResult<RowIter> {
            Ok(Box::new(std::iter::empty()))
        }

        fn paginates(&self) -> bool {
            false
        }
    }

    fn row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("name", Value::String(name.to_string()));
        row
    }

    fn people(names: &[&str]) -> MemoryExecutor {
        let executor = MemoryExecutor::new();
        executor.seed("Person", names.iter().map(|n| row(n)).collect());
        executor
    }

    fn person_query() -> Query {
        Query::Select(select().from("Person").build().unwrap())
    }

    #[test]
    fn test_extract_specials_by_structure() {
        let (values, specials) = extract_specials(vec![
            Arg::Value(Value::Integer(30)),
            Arg::Pagination(Pagination::new(10, 5)),
            Arg::Value(Value::String("Diana".into())),
            Arg::Sort(vec![SortSpec::asc("name")]),
        ]);

        assert_eq!(
            values,
            vec![Value::Integer(30), Value::String("Diana".into())]
        );
        assert_eq!(specials.pagination, Some(Pagination::new(10, 5)));
        assert_eq!(specials.sort, vec![SortSpec::asc("name")]);
    }

    #[test]
    fn test_single_shape_arity() {
        let query = person_query();

        let none = adapt(ReturnShape::Single, &query, &people(&[])).unwrap();
        assert!(matches!(none, ReturnValue::Single(None)));

        let one = adapt(ReturnShape::Single, &query, &people(&["Ada"])).unwrap();
        match one {
            ReturnValue::Single(Some(row)) => {
                assert_eq!(row.get("name"), Some(&Value::String("Ada".into())));
            }
            other => panic!("expected one row, got {other:?}"),
        }

        let two = adapt(ReturnShape::Single, &query, &people(&["Ada", "Brian"]));
        assert!(matches!(two, Err(QuarryError::NonUniqueResult(_))));
    }

    #[test]
    fn test_list_and_stream_shapes() {
        let query = person_query();
        let executor = people(&["Ada", "Brian"]);

        match adapt(ReturnShape::List, &query, &executor).unwrap() {
            ReturnValue::List(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }

        match adapt(ReturnShape::Stream, &query, &executor).unwrap() {
            ReturnValue::Stream(rows) => assert_eq!(rows.count(), 2),
            other => panic!("expected stream, got {other:?}"),
        }
    }

    #[test]
    fn test_page_carries_bounds() {
        let query = Query::Select(
            select()
                .from("Person")
                .skip(1)
                .limit(1)
                .build()
                .unwrap(),
        );
        let executor = people(&["Ada", "Brian", "Cleo"]);

        match adapt(ReturnShape::Page, &query, &executor).unwrap() {
            ReturnValue::Page(page) => {
                assert_eq!(page.content.len(), 1);
                assert_eq!(page.skip, 1);
                assert_eq!(page.limit, 1);
                assert_eq!(page.next_pagination(), Pagination::new(2, 1));
            }
            other => panic!("expected page, got {other:?}"),
        }
    }

    #[test]
    fn test_page_refused_without_skip_limit_support() {
        let result = adapt(ReturnShape::Page, &person_query(), &Traversal);
        assert!(matches!(
            result,
            Err(QuarryError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_unit_shape() {
        let value = adapt(ReturnShape::Unit, &person_query(), &people(&["Ada"])).unwrap();
        assert!(matches!(value, ReturnValue::Unit));
    }
}
