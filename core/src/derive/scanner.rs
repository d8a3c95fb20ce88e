//! Method-name tokenizer. Splits a repository method name such as
//! `findByNameAndAgeGreaterThan` into typed tokens. Keyword matching is
//! case-sensitive on the capitalized form and scans the table top to
//! bottom, so the `…ThanEqual` keywords must stay above their bare `…Than`
//! prefixes.

use crate::error::{QuarryError, QuarryResult};
use crate::query::{Connector, Direction, Operator};
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodToken {
    Find,
    Delete,
    Field(String),
    Op(Operator),
    Connector(Connector),
    Not,
    OrderBy,
    Direction(Direction),
}

// Scan order is load-bearing; see the module docs.
static KEYWORDS: &[(&str, MethodToken)] = &[
    ("OrderBy", MethodToken::OrderBy),
    ("And", MethodToken::Connector(Connector::And)),
    ("Or", MethodToken::Connector(Connector::Or)),
    ("Not", MethodToken::Not),
    ("Equals", MethodToken::Op(Operator::Equals)),
    ("GreaterThanEqual", MethodToken::Op(Operator::GreaterThanEqual)),
    ("LessThanEqual", MethodToken::Op(Operator::LessThanEqual)),
    ("GreaterThan", MethodToken::Op(Operator::GreaterThan)),
    ("LessThan", MethodToken::Op(Operator::LessThan)),
    ("Between", MethodToken::Op(Operator::Between)),
    ("In", MethodToken::Op(Operator::In)),
    ("Like", MethodToken::Op(Operator::Like)),
    ("Asc", MethodToken::Direction(Direction::Asc)),
    ("Desc", MethodToken::Direction(Direction::Desc)),
];

lazy_static! {
    // Tokenizing is pure, so a lost insertion race just recomputes the
    // same value; entries are immutable once stored.
    static ref SCAN_CACHE: DashMap<String, Arc<[MethodToken]>> = DashMap::new();
}

/// Tokenizes a method name, memoizing successful scans process-wide.
pub fn scan(method: &str) -> QuarryResult<Arc<[MethodToken]>> {
    if let Some(hit) = SCAN_CACHE.get(method) {
        return Ok(Arc::clone(hit.value()));
    }

    let tokens: Arc<[MethodToken]> = scan_uncached(method)?.into();
    SCAN_CACHE.insert(method.to_string(), Arc::clone(&tokens));
    tracing::trace!(method, count = tokens.len(), "tokenized method name");
    Ok(tokens)
}

fn scan_uncached(method: &str) -> QuarryResult<Vec<MethodToken>> {
    let (head, rest) = if let Some(rest) = method.strip_prefix("findBy") {
        (MethodToken::Find, rest)
    } else if let Some(rest) = method.strip_prefix("deleteBy") {
        (MethodToken::Delete, rest)
    } else {
        return Err(QuarryError::Syntax(method.to_string()));
    };
    if rest.is_empty() {
        return Err(QuarryError::Syntax(method.to_string()));
    }

    let mut tokens = vec![head];
    let mut field = String::new();
    let mut i = 0;

    while i < rest.len() {
        if let Some((keyword, token)) = keyword_at(&rest[i..]) {
            flush_field(&mut field, &mut tokens);
            tokens.push(token.clone());
            i += keyword.len();
        } else {
            // Part of a field reference; keywords only start at capitals,
            // so the run extends until the next keyword match.
            let ch = rest[i..]
                .chars()
                .next()
                .expect("scan position is on a char boundary");
            field.push(ch);
            i += ch.len_utf8();
        }
    }
    flush_field(&mut field, &mut tokens);

    Ok(tokens)
}

fn keyword_at(rest: &str) -> Option<&'static (&'static str, MethodToken)> {
    KEYWORDS.iter().find(|(keyword, _)| rest.starts_with(keyword))
}

/// Emits the accumulated field run with its first character lower-cased;
/// the rest of the identifier is preserved verbatim.
fn flush_field(field: &mut String, tokens: &mut Vec<MethodToken>) {
    if field.is_empty() {
        return;
    }
    let mut chars = field.chars();
    let lowered: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => return,
    };
    tokens.push(MethodToken::Field(lowered));
    field.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_field_defaults() {
        let tokens = scan("findByName").unwrap();
        assert_eq!(
            tokens.as_ref(),
            &[MethodToken::Find, MethodToken::Field("name".into())]
        );
    }

    #[test]
    fn test_delete_prefix() {
        let tokens = scan("deleteByAge").unwrap();
        assert_eq!(
            tokens.as_ref(),
            &[MethodToken::Delete, MethodToken::Field("age".into())]
        );
    }

    #[test]
    fn test_than_equal_wins_over_than() {
        let tokens = scan("findByAgeGreaterThanEqual").unwrap();
        assert_eq!(
            tokens.as_ref(),
            &[
                MethodToken::Find,
                MethodToken::Field("age".into()),
                MethodToken::Op(Operator::GreaterThanEqual),
            ]
        );

        let tokens = scan("findBySalaryLessThanEqual").unwrap();
        assert_eq!(
            tokens.as_ref(),
            &[
                MethodToken::Find,
                MethodToken::Field("salary".into()),
                MethodToken::Op(Operator::LessThanEqual),
            ]
        );
    }

    #[test]
    fn test_order_by_wins_over_or() {
        let tokens = scan("findByNameOrderByAgeDesc").unwrap();
        assert_eq!(
            tokens.as_ref(),
            &[
                MethodToken::Find,
                MethodToken::Field("name".into()),
                MethodToken::OrderBy,
                MethodToken::Field("age".into()),
                MethodToken::Direction(Direction::Desc),
            ]
        );
    }

    #[test]
    fn test_connectors_and_not() {
        let tokens = scan("findByNameAndAgeNotGreaterThanOrCity").unwrap();
        assert_eq!(
            tokens.as_ref(),
            &[
                MethodToken::Find,
                MethodToken::Field("name".into()),
                MethodToken::Connector(Connector::And),
                MethodToken::Field("age".into()),
                MethodToken::Not,
                MethodToken::Op(Operator::GreaterThan),
                MethodToken::Connector(Connector::Or),
                MethodToken::Field("city".into()),
            ]
        );
    }

    #[test]
    fn test_field_casing_preserved_after_first_char() {
        let tokens = scan("findByFirstName").unwrap();
        assert_eq!(
            tokens.as_ref(),
            &[MethodToken::Find, MethodToken::Field("firstName".into())]
        );
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        assert!(matches!(scan("fetchByName"), Err(QuarryError::Syntax(_))));
        assert!(matches!(scan("findName"), Err(QuarryError::Syntax(_))));
    }

    #[test]
    fn test_bare_prefix_rejected() {
        assert!(matches!(scan("findBy"), Err(QuarryError::Syntax(_))));
        assert!(matches!(scan("deleteBy"), Err(QuarryError::Syntax(_))));
    }

    #[test]
    fn test_scan_is_idempotent_through_cache() {
        let first = scan("findByNameAndAgeGreaterThan").unwrap();
        let second = scan("findByNameAndAgeGreaterThan").unwrap();

        assert_eq!(first.as_ref(), second.as_ref());
        // Second lookup is served from the memo cache.
        assert!(Arc::ptr_eq(&first, &second));
    }
}
