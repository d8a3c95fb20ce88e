//! Prepared queries: placeholder tracking, bind-before-execute enforcement
//! and the shared single-result rule.

use crate::error::{QuarryError, QuarryResult};
use crate::exec::{Executor, Row, RowIter};
use crate::query::{ParamSpec, Query, Value};
use std::collections::HashMap;

/// Declared placeholder names and the values bound to them so far. Created
/// at prepare time, read at execute time, confined to one logical call.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    declared: Vec<String>,
    bound: HashMap<String, Value>,
}

impl ParameterSet {
    pub fn new(specs: &[ParamSpec]) -> Self {
        let mut declared: Vec<String> = Vec::new();
        for spec in specs {
            if !declared.contains(&spec.name) {
                declared.push(spec.name.clone());
            }
        }
        Self {
            declared,
            bound: HashMap::new(),
        }
    }

    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    pub fn bind(&mut self, name: &str, value: Value) -> QuarryResult<()> {
        if !self.declared.iter().any(|declared| declared == name) {
            return Err(QuarryError::UnknownParameter(name.to_string()));
        }
        self.bound.insert(name.to_string(), value);
        Ok(())
    }

    /// Names still awaiting a value, in declaration order.
    pub fn unbound(&self) -> Vec<String> {
        self.declared
            .iter()
            .filter(|name| !self.bound.contains_key(*name))
            .cloned()
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.unbound().is_empty()
    }
}

/// A built query still carrying placeholders. Binds accumulate by
/// mutation; execution materializes a fully-literal [`Query`].
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    query: Query,
    params: ParameterSet,
}

impl PreparedQuery {
    pub fn new(query: Query) -> Self {
        let params = ParameterSet::new(&query.parameter_specs());
        Self { query, params }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn bind(&mut self, name: &str, value: Value) -> QuarryResult<&mut Self> {
        self.params.bind(name, value)?;
        Ok(self)
    }

    pub fn unbound(&self) -> Vec<String> {
        self.params.unbound()
    }

    /// Substitutes every bound placeholder and returns the literal query.
    /// Fails while any declared name is still unbound, so a template can
    /// never reach a backend half-filled.
    pub fn resolve(&self) -> QuarryResult<Query> {
        let unbound = self.params.unbound();
        if !unbound.is_empty() {
            return Err(QuarryError::unbound(unbound));
        }

        let mut query = self.query.clone();
        for (name, value) in &self.params.bound {
            query = query.bind_parameter(name, value)?;
        }
        Ok(query)
    }

    pub fn execute(&self, executor: &dyn Executor) -> QuarryResult<RowIter> {
        executor.execute(&self.resolve()?)
    }

    pub fn execute_single(&self, executor: &dyn Executor) -> QuarryResult<Option<Row>> {
        let query = self.resolve()?;
        let rows = executor.execute(&query)?;
        single(rows, query.entity())
    }
}

/// The single-result rule shared by the key-value get path and the
/// select-single path: zero rows is `None`, one row is `Some`, anything
/// more is an error naming the offending query. Consumes at most two
/// elements of the sequence.
pub fn single<I>(mut rows: I, source: &str) -> QuarryResult<Option<Row>>
where
    I: Iterator<Item = Row>,
{
    let first = rows.next();
    if first.is_some() && rows.next().is_some() {
        return Err(QuarryError::NonUniqueResult(source.to_string()));
    }
    Ok(first)
}
