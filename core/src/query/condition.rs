use crate::error::{QuarryError, QuarryResult};
use crate::query::value::{Value, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Like,
    In,
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connector {
    And,
    Or,
}

/// The recursive filter tree. A `Group` is only ever materialized with two
/// or more children; a lone predicate stays a bare `Leaf`/`Not`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Leaf {
        field: String,
        op: Operator,
        value: ValueRef,
    },
    Not(Box<Condition>),
    Group {
        connector: Connector,
        children: Vec<Condition>,
    },
}

impl Condition {
    pub fn leaf(
        field: impl Into<String>,
        op: Operator,
        value: ValueRef,
    ) -> QuarryResult<Self> {
        let field = field.into();
        if field.is_empty() {
            return Err(QuarryError::InvalidArgument(
                "condition field name is empty".to_string(),
            ));
        }
        if op == Operator::Between {
            check_between_operand(&value)?;
        }
        Ok(Self::Leaf { field, op, value })
    }

    pub fn eq(field: impl Into<String>, value: ValueRef) -> QuarryResult<Self> {
        Self::leaf(field, Operator::Equals, value)
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn and(self, other: Self) -> Self {
        append(Some(self), Connector::And, other)
    }

    pub fn or(self, other: Self) -> Self {
        append(Some(self), Connector::Or, other)
    }

    /// Rewrites every leaf's field name, in tree order. Used to push logical
    /// names through a field resolver before a query reaches a backend.
    pub fn map_fields<F>(self, f: &F) -> Self
    where
        F: Fn(&str) -> String,
    {
        match self {
            Self::Leaf { field, op, value } => Self::Leaf {
                field: f(&field),
                op,
                value,
            },
            Self::Not(inner) => Self::Not(Box::new(inner.map_fields(f))),
            Self::Group {
                connector,
                children,
            } => Self::Group {
                connector,
                children: children.into_iter().map(|c| c.map_fields(f)).collect(),
            },
        }
    }

    /// Collects `(name, op)` for every placeholder leaf, in tree order.
    pub fn collect_parameters(&self, out: &mut Vec<ParamSpec>) {
        match self {
            Self::Leaf { op, value, .. } => {
                if let ValueRef::Parameter(name) = value {
                    out.push(ParamSpec {
                        name: name.clone(),
                        op: *op,
                    });
                }
            }
            Self::Not(inner) => inner.collect_parameters(out),
            Self::Group { children, .. } => {
                for child in children {
                    child.collect_parameters(out);
                }
            }
        }
    }

    /// Substitutes every placeholder leaf named `name` with the literal.
    /// Between leaves re-validate operand arity at substitution time.
    pub fn bind_parameter(self, name: &str, value: &Value) -> QuarryResult<Self> {
        match self {
            Self::Leaf {
                field,
                op,
                value: ValueRef::Parameter(param),
            } if param == name => {
                let bound = ValueRef::Literal(value.clone());
                if op == Operator::Between {
                    check_between_operand(&bound)?;
                }
                Ok(Self::Leaf {
                    field,
                    op,
                    value: bound,
                })
            }
            leaf @ Self::Leaf { .. } => Ok(leaf),
            Self::Not(inner) => Ok(Self::Not(Box::new(inner.bind_parameter(name, value)?))),
            Self::Group {
                connector,
                children,
            } => {
                let children = children
                    .into_iter()
                    .map(|c| c.bind_parameter(name, value))
                    .collect::<QuarryResult<Vec<_>>>()?;
                Ok(Self::Group {
                    connector,
                    children,
                })
            }
        }
    }
}

/// A declared placeholder: its name plus the operator of the leaf it sits
/// in, so positional callers know how many arguments the slot consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub op: Operator,
}

/// The precedence-climbing merge: folds one more predicate into an
/// incrementally built condition. Connectors evaluate strictly left to
/// right with no reordering; a connector change binds tighter than the one
/// before it, so it combines only with the last child of the current group.
pub fn append(existing: Option<Condition>, connector: Connector, next: Condition) -> Condition {
    match existing {
        None => next,
        Some(Condition::Group {
            connector: top,
            mut children,
        }) if top == connector => {
            children.push(next);
            Condition::Group {
                connector: top,
                children,
            }
        }
        Some(Condition::Group {
            connector: top,
            mut children,
        }) => {
            let last = children
                .pop()
                .expect("a materialized group holds at least two children");
            let merged = match last {
                Condition::Group {
                    connector: inner,
                    children: mut inner_children,
                } if inner == connector => {
                    inner_children.push(next);
                    Condition::Group {
                        connector: inner,
                        children: inner_children,
                    }
                }
                other => Condition::Group {
                    connector,
                    children: vec![other, next],
                },
            };
            children.push(merged);
            Condition::Group {
                connector: top,
                children,
            }
        }
        Some(single) => Condition::Group {
            connector,
            children: vec![single, next],
        },
    }
}

fn check_between_operand(value: &ValueRef) -> QuarryResult<()> {
    if let ValueRef::Literal(literal) = value {
        match literal {
            Value::Array(items) if items.len() == 2 => Ok(()),
            Value::Array(items) => Err(QuarryError::InvalidArgument(format!(
                "between expects exactly 2 values, got {}",
                items.len()
            ))),
            other => Err(QuarryError::InvalidArgument(format!(
                "between expects an array of 2 values, got {}",
                other.type_name()
            ))),
        }
    } else {
        // Placeholder operands are checked when bound.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(name: &str) -> Condition {
        Condition::eq(name, ValueRef::literal(1i64)).unwrap()
    }

    #[test]
    fn test_append_first_predicate_stays_bare() {
        let c = append(None, Connector::And, leaf("a"));
        assert_eq!(c, leaf("a"));
    }

    #[test]
    fn test_append_flattens_same_connector() {
        let c = append(None, Connector::And, leaf("a"));
        let c = append(Some(c), Connector::And, leaf("b"));
        let c = append(Some(c), Connector::And, leaf("c"));

        assert_eq!(
            c,
            Condition::Group {
                connector: Connector::And,
                children: vec![leaf("a"), leaf("b"), leaf("c")],
            }
        );
    }

    #[test]
    fn test_append_first_connector_wraps_both() {
        let c = append(Some(leaf("a")), Connector::Or, leaf("b"));
        assert_eq!(
            c,
            Condition::Group {
                connector: Connector::Or,
                children: vec![leaf("a"), leaf("b")],
            }
        );
    }

    #[test]
    fn test_connector_change_binds_to_last_child() {
        // a And b Or c And d  =>  Or[And[a, b], And[c, d]]
        let c = append(None, Connector::And, leaf("a"));
        let c = append(Some(c), Connector::And, leaf("b"));
        let c = append(Some(c), Connector::Or, leaf("c"));
        let c = append(Some(c), Connector::And, leaf("d"));

        assert_eq!(
            c,
            Condition::Group {
                connector: Connector::Or,
                children: vec![
                    Condition::Group {
                        connector: Connector::And,
                        children: vec![leaf("a"), leaf("b")],
                    },
                    Condition::Group {
                        connector: Connector::And,
                        children: vec![leaf("c"), leaf("d")],
                    },
                ],
            }
        );
    }

    #[test]
    fn test_connector_change_extends_last_subgroup() {
        // a Or b And c And d  =>  Or[a, And[b, c, d]]
        let c = append(None, Connector::Or, leaf("a"));
        let c = append(Some(c), Connector::Or, leaf("b"));
        let c = append(Some(c), Connector::And, leaf("c"));
        let c = append(Some(c), Connector::And, leaf("d"));

        assert_eq!(
            c,
            Condition::Group {
                connector: Connector::Or,
                children: vec![
                    leaf("a"),
                    Condition::Group {
                        connector: Connector::And,
                        children: vec![leaf("b"), leaf("c"), leaf("d")],
                    },
                ],
            }
        );
    }

    #[test]
    fn test_between_arity() {
        let two = ValueRef::Literal(Value::Array(vec![Value::Integer(1), Value::Integer(5)]));
        assert!(Condition::leaf("age", Operator::Between, two).is_ok());

        let one = ValueRef::Literal(Value::Array(vec![Value::Integer(1)]));
        assert!(matches!(
            Condition::leaf("age", Operator::Between, one),
            Err(QuarryError::InvalidArgument(_))
        ));

        let three = ValueRef::Literal(Value::Array(vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
        ]));
        assert!(matches!(
            Condition::leaf("age", Operator::Between, three),
            Err(QuarryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_between_placeholder_checked_at_bind() {
        let c = Condition::leaf("age", Operator::Between, ValueRef::parameter("range")).unwrap();

        let bad = c
            .clone()
            .bind_parameter("range", &Value::Array(vec![Value::Integer(1)]));
        assert!(matches!(bad, Err(QuarryError::InvalidArgument(_))));

        let good = c.bind_parameter(
            "range",
            &Value::Array(vec![Value::Integer(1), Value::Integer(9)]),
        );
        assert!(good.is_ok());
    }

    #[test]
    fn test_empty_field_rejected() {
        assert!(matches!(
            Condition::eq("", ValueRef::literal(1i64)),
            Err(QuarryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_map_fields_rewrites_leaves() {
        let c = leaf("a").and(leaf("b").negate());
        let mapped = c.map_fields(&|f: &str| format!("col_{f}"));

        let mut params = Vec::new();
        mapped.collect_parameters(&mut params);
        assert!(params.is_empty());

        assert_eq!(
            mapped,
            Condition::Group {
                connector: Connector::And,
                children: vec![
                    Condition::eq("col_a", ValueRef::literal(1i64)).unwrap(),
                    Condition::eq("col_b", ValueRef::literal(1i64)).unwrap().negate(),
                ],
            }
        );
    }
}
