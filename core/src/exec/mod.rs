mod memory;

pub use memory::MemoryExecutor;

use crate::error::QuarryResult;
use crate::prepare::single;
use crate::query::{Query, Value};
use std::collections::HashMap;

/// One backend result record: a flat column-to-value mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub data: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.data.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }
}

/// Lazily produced result sequence; the backend decides how eager it is.
pub type RowIter = Box<dyn Iterator<Item = Row>>;

/// Backend collaborator contract. The engine builds fully-literal queries
/// and hands them here; backend failures propagate opaquely.
pub trait Executor {
    fn execute(&self, query: &Query) -> QuarryResult<RowIter>;

    fn execute_single(&self, query: &Query) -> QuarryResult<Option<Row>> {
        let rows = self.execute(query)?;
        single(rows, query.entity())
    }

    /// Whether the backend honors skip/limit bounds. Page adaptation is
    /// refused for backends that don't.
    fn paginates(&self) -> bool {
        true
    }
}
