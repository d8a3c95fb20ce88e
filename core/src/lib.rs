//! Quarry - query derivation and condition-algebra engine
//!
//! Repository method names (`findByNameAndAgeGreaterThan`) and a small
//! SQL-like text language both compile into one canonical immutable query
//! model, executed through pluggable backend executors and adapted to the
//! caller's declared return shape.

pub mod adapt;
pub mod convert;
pub mod derive;
pub mod error;
pub mod exec;
pub mod prepare;
pub mod query;
pub mod registry;
pub mod repository;
pub mod resolve;
pub mod text;

pub use adapt::{Arg, Page, Pagination, ReturnShape, ReturnValue};
pub use error::{QuarryError, QuarryResult};
pub use exec::{Executor, MemoryExecutor, Row, RowIter};
pub use prepare::{ParameterSet, PreparedQuery};
pub use query::{
    Condition, Connector, Direction, Operator, Query, SortSpec, Value, ValueRef,
};
pub use registry::{BackendKind, BackendRegistry};
pub use repository::{CompiledMethod, MethodSignature};
pub use resolve::FieldResolver;
pub use text::Statement;
