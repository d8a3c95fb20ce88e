//! Query derivation from repository method names. `scan` turns the name
//! into tokens, `derive` folds the tokens into a condition tree plus sort
//! list using the same precedence-climbing merge as the text language.

pub mod scanner;

pub use scanner::{MethodToken, scan};

use crate::error::{QuarryError, QuarryResult};
use crate::query::{
    Condition, Connector, DeleteQuery, Operator, Query, SelectQuery, SortList, SortSpec, ValueRef,
    append,
};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Find,
    Delete,
}

/// A derived query before an entity is attached: the repository layer knows
/// the entity, the method name only encodes filter and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodQuery {
    pub kind: MethodKind,
    pub condition: Option<Condition>,
    pub sort: SortList,
}

impl MethodQuery {
    pub fn into_query(self, entity: impl Into<String>) -> QuarryResult<Query> {
        let entity = entity.into();
        if entity.is_empty() {
            return Err(QuarryError::InvalidArgument(
                "entity name is empty".to_string(),
            ));
        }
        match self.kind {
            MethodKind::Find => Ok(Query::Select(SelectQuery {
                entity,
                fields: Vec::new(),
                condition: self.condition,
                sort: self.sort,
                skip: 0,
                limit: 0,
            })),
            MethodKind::Delete => Ok(Query::Delete(DeleteQuery {
                entity,
                fields: Vec::new(),
                condition: self.condition,
            })),
        }
    }
}

/// Derives filter and ordering from a method name. Placeholders are
/// positional (`?1`, `?2`, …) in leaf order; the invocation layer binds
/// them from the argument list.
pub fn derive(method: &str) -> QuarryResult<MethodQuery> {
    let tokens = scan(method)?;
    tracing::debug!(method, "deriving query from method name");
    fold(method, &tokens)
}

fn fold(method: &str, tokens: &[MethodToken]) -> QuarryResult<MethodQuery> {
    let mut iter = tokens.iter();
    let kind = match iter.next() {
        Some(MethodToken::Find) => MethodKind::Find,
        Some(MethodToken::Delete) => MethodKind::Delete,
        _ => return Err(QuarryError::Syntax(method.to_string())),
    };

    let mut condition: Option<Condition> = None;
    // Connector joining the previous condition to the next finished leaf;
    // unused until the second leaf exists.
    let mut connector = Connector::And;
    let mut trailing_connector = false;

    let mut leaf = LeafState::default();
    let mut param_index = 0usize;

    let mut ordering = false;
    let mut sort: SortList = SmallVec::new();
    let mut sort_field: Option<String> = None;

    for token in iter {
        if ordering {
            match token {
                MethodToken::Field(name) => sort_field = Some(name.clone()),
                MethodToken::Direction(direction) => {
                    let field = sort_field
                        .take()
                        .ok_or_else(|| QuarryError::Syntax(method.to_string()))?;
                    sort.push(SortSpec {
                        field,
                        direction: *direction,
                    });
                }
                _ => return Err(QuarryError::Syntax(method.to_string())),
            }
            continue;
        }

        match token {
            MethodToken::Field(name) => {
                if leaf.field.is_some() {
                    // two field runs with no connector between them
                    return Err(QuarryError::Syntax(method.to_string()));
                }
                leaf.field = Some(name.clone());
            }
            MethodToken::Not => {
                if leaf.field.is_none() || leaf.negated {
                    return Err(QuarryError::Syntax(method.to_string()));
                }
                leaf.negated = true;
            }
            MethodToken::Op(op) => {
                if leaf.field.is_none() || leaf.op.is_some() {
                    return Err(QuarryError::Syntax(method.to_string()));
                }
                leaf.op = Some(*op);
            }
            MethodToken::Connector(next_connector) => {
                let finished = leaf.finish(method, &mut param_index)?;
                condition = Some(append(condition.take(), connector, finished));
                connector = *next_connector;
                trailing_connector = true;
            }
            MethodToken::OrderBy => {
                if leaf.field.is_some() {
                    let finished = leaf.finish(method, &mut param_index)?;
                    condition = Some(append(condition.take(), connector, finished));
                    trailing_connector = false;
                } else if trailing_connector {
                    return Err(QuarryError::Syntax(method.to_string()));
                }
                ordering = true;
            }
            MethodToken::Direction(_) | MethodToken::Find | MethodToken::Delete => {
                return Err(QuarryError::Syntax(method.to_string()));
            }
        }
        if leaf.field.is_some() {
            trailing_connector = false;
        }
    }

    if ordering {
        if let Some(field) = sort_field.take() {
            // a sort field with no explicit direction defaults ascending
            sort.push(SortSpec::asc(field));
        }
        if sort.is_empty() {
            return Err(QuarryError::Syntax(method.to_string()));
        }
    } else if leaf.field.is_some() {
        let finished = leaf.finish(method, &mut param_index)?;
        condition = Some(append(condition.take(), connector, finished));
    } else if trailing_connector {
        return Err(QuarryError::Syntax(method.to_string()));
    }

    Ok(MethodQuery {
        kind,
        condition,
        sort,
    })
}

#[derive(Default)]
struct LeafState {
    field: Option<String>,
    op: Option<Operator>,
    negated: bool,
}

impl LeafState {
    fn finish(&mut self, method: &str, param_index: &mut usize) -> QuarryResult<Condition> {
        let field = self
            .field
            .take()
            .ok_or_else(|| QuarryError::Syntax(method.to_string()))?;
        let op = self.op.take().unwrap_or(Operator::Equals);
        *param_index += 1;
        let leaf = Condition::leaf(field, op, ValueRef::parameter(format!("?{param_index}")))?;
        Ok(if std::mem::take(&mut self.negated) {
            leaf.negate()
        } else {
            leaf
        })
    }
}
