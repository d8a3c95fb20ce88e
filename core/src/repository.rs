//! Repository method compilation and invocation. A method signature is
//! compiled once at startup into a query template plus return shape; each
//! call then only binds arguments, resolves fields and adapts the result.

use crate::adapt::{Arg, ReturnShape, ReturnValue, adapt, extract_specials};
use crate::derive::{self, MethodKind};
use crate::error::{QuarryError, QuarryResult};
use crate::exec::Executor;
use crate::prepare::PreparedQuery;
use crate::query::{Operator, Query, Value};
use crate::resolve::{self, FieldResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub shape: ReturnShape,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, shape: ReturnShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// A method resolved against its repository's entity: the compiled query
/// template (placeholders still open) and the declared return shape.
#[derive(Debug, Clone)]
pub struct CompiledMethod {
    name: String,
    shape: ReturnShape,
    template: Query,
}

impl CompiledMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    pub fn template(&self) -> &Query {
        &self.template
    }
}

/// Derives and validates a method once. Call at repository setup, keep the
/// result for the interface's lifetime.
pub fn compile(entity: &str, signature: &MethodSignature) -> QuarryResult<CompiledMethod> {
    let derived = derive::derive(&signature.name)?;

    if derived.kind == MethodKind::Delete && signature.shape == ReturnShape::Page {
        return Err(QuarryError::UnsupportedOperation(format!(
            "'{}' cannot produce a page",
            signature.name
        )));
    }

    let template = derived.into_query(entity)?;
    tracing::debug!(method = %signature.name, entity, "compiled repository method");

    Ok(CompiledMethod {
        name: signature.name.clone(),
        shape: signature.shape,
        template,
    })
}

/// Runs one invocation: scan arguments, bind the template, resolve fields,
/// execute, adapt. Each step's failure propagates immediately.
pub fn invoke(
    method: &CompiledMethod,
    args: Vec<Arg>,
    executor: &dyn Executor,
    resolver: &dyn FieldResolver,
) -> QuarryResult<ReturnValue> {
    let (values, specials) = extract_specials(args);

    let mut prepared = PreparedQuery::new(method.template.clone());
    bind_positional(&mut prepared, &method.template, values)?;
    let mut query = prepared.resolve()?;

    if let Query::Select(select) = &mut query {
        if let Some(pagination) = specials.pagination {
            select.skip = pagination.skip;
            select.limit = pagination.limit;
        }
        select.sort.extend(specials.sort);
    } else if specials.pagination.is_some() || !specials.sort.is_empty() {
        return Err(QuarryError::UnsupportedOperation(
            "pagination and sort carriers apply to find methods only".to_string(),
        ));
    }

    let query = resolve::apply(query, resolver);

    adapt(method.shape, &query, executor)
}

/// Binds `?1`, `?2`, … from the argument list in leaf order. A `between`
/// slot consumes two arguments and packs them into its pair operand.
/// Missing arguments are left unbound so the parameter layer reports them;
/// surplus arguments are an error here.
fn bind_positional(
    prepared: &mut PreparedQuery,
    template: &Query,
    values: Vec<Value>,
) -> QuarryResult<()> {
    let specs = template.parameter_specs();
    let mut values = values.into_iter();

    for spec in &specs {
        let value = match spec.op {
            Operator::Between => match (values.next(), values.next()) {
                (Some(low), Some(high)) => Value::Array(vec![low, high]),
                _ => break,
            },
            _ => match values.next() {
                Some(value) => value,
                None => break,
            },
        };
        prepared.bind(&spec.name, value)?;
    }

    if values.next().is_some() {
        return Err(QuarryError::InvalidArgument(
            "more arguments than query placeholders".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::Pagination;
    use crate::exec::{MemoryExecutor, Row};
    use crate::query::SortSpec;
    use crate::resolve::{MappedResolver, Passthrough};
    use pretty_assertions::assert_eq;

    fn person(name: &str, age: i64) -> Row {
        let mut row = Row::new();
        row.insert("name", Value::String(name.to_string()));
        row.insert("age", Value::Integer(age));
        row
    }

    fn seeded() -> MemoryExecutor {
        let executor = MemoryExecutor::new();
        executor.seed(
            "Person",
            vec![person("Ada", 36), person("Brian", 70), person("Cleo", 21)],
        );
        executor
    }

    #[test]
    fn test_find_by_age_greater_than() {
        let method = compile(
            "Person",
            &MethodSignature::new("findByAgeGreaterThan", ReturnShape::List),
        )
        .unwrap();

        let result = invoke(
            &method,
            vec![Arg::Value(Value::Integer(30))],
            &seeded(),
            &Passthrough,
        )
        .unwrap();

        match result {
            ReturnValue::List(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_between_consumes_two_arguments() {
        let method = compile(
            "Person",
            &MethodSignature::new("findByAgeBetween", ReturnShape::List),
        )
        .unwrap();

        let result = invoke(
            &method,
            vec![Arg::Value(Value::Integer(21)), Arg::Value(Value::Integer(40))],
            &seeded(),
            &Passthrough,
        )
        .unwrap();

        match result {
            ReturnValue::List(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_argument_surfaces_as_unbound() {
        let method = compile(
            "Person",
            &MethodSignature::new("findByNameAndAge", ReturnShape::List),
        )
        .unwrap();

        let result = invoke(
            &method,
            vec![Arg::Value(Value::String("Ada".into()))],
            &seeded(),
            &Passthrough,
        );
        assert!(matches!(result, Err(QuarryError::UnboundParameters(_))));
    }

    #[test]
    fn test_surplus_argument_rejected() {
        let method = compile(
            "Person",
            &MethodSignature::new("findByName", ReturnShape::List),
        )
        .unwrap();

        let result = invoke(
            &method,
            vec![
                Arg::Value(Value::String("Ada".into())),
                Arg::Value(Value::Integer(1)),
            ],
            &seeded(),
            &Passthrough,
        );
        assert!(matches!(result, Err(QuarryError::InvalidArgument(_))));
    }

    #[test]
    fn test_pagination_and_sort_carriers() {
        let method = compile(
            "Person",
            &MethodSignature::new("findByAgeGreaterThan", ReturnShape::Page),
        )
        .unwrap();

        let result = invoke(
            &method,
            vec![
                Arg::Value(Value::Integer(0)),
                Arg::Sort(vec![SortSpec::desc("age")]),
                Arg::Pagination(Pagination::new(1, 2)),
            ],
            &seeded(),
            &Passthrough,
        )
        .unwrap();

        match result {
            ReturnValue::Page(page) => {
                assert_eq!(page.skip, 1);
                assert_eq!(page.limit, 2);
                assert_eq!(page.content.len(), 2);
                assert_eq!(
                    page.content[0].get("name"),
                    Some(&Value::String("Ada".into()))
                );
            }
            other => panic!("expected page, got {other:?}"),
        }
    }

    #[test]
    fn test_field_resolution_applies_before_execution() {
        let executor = MemoryExecutor::new();
        let mut row = Row::new();
        row.insert("person_name", Value::String("Ada".into()));
        executor.seed("Person", vec![row]);

        let method = compile(
            "Person",
            &MethodSignature::new("findByName", ReturnShape::Optional),
        )
        .unwrap();

        let resolver = MappedResolver::new().map("Person", "name", "person_name");
        let result = invoke(
            &method,
            vec![Arg::Value(Value::String("Ada".into()))],
            &executor,
            &resolver,
        )
        .unwrap();

        assert!(matches!(result, ReturnValue::Single(Some(_))));
    }

    #[test]
    fn test_delete_method_executes_as_unit() {
        let executor = seeded();
        let method = compile(
            "Person",
            &MethodSignature::new("deleteByName", ReturnShape::Unit),
        )
        .unwrap();

        let result = invoke(
            &method,
            vec![Arg::Value(Value::String("Ada".into()))],
            &executor,
            &Passthrough,
        )
        .unwrap();
        assert!(matches!(result, ReturnValue::Unit));

        let remaining = compile(
            "Person",
            &MethodSignature::new("findByAgeGreaterThan", ReturnShape::List),
        )
        .unwrap();
        match invoke(
            &remaining,
            vec![Arg::Value(Value::Integer(0))],
            &executor,
            &Passthrough,
        )
        .unwrap()
        {
            ReturnValue::List(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_cannot_page() {
        let result = compile(
            "Person",
            &MethodSignature::new("deleteByName", ReturnShape::Page),
        );
        assert!(matches!(
            result,
            Err(QuarryError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_carriers_rejected_for_delete_methods() {
        let method = compile(
            "Person",
            &MethodSignature::new("deleteByName", ReturnShape::Unit),
        )
        .unwrap();

        let result = invoke(
            &method,
            vec![
                Arg::Value(Value::String("Ada".into())),
                Arg::Pagination(Pagination::new(0, 10)),
            ],
            &seeded(),
            &Passthrough,
        );
        assert!(matches!(
            result,
            Err(QuarryError::UnsupportedOperation(_))
        ));
    }
}
