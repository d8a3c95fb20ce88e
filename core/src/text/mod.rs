//! The textual query language: a SQL-flavored front end over the same
//! canonical model the method-name derivation produces.

pub mod error;
mod lexer;
mod parser;

pub use error::{ParseError, ParseResult};
pub use parser::Parser;

use crate::error::{QuarryError, QuarryResult};
use crate::prepare::PreparedQuery;
use crate::query::Query;

/// A parsed statement: fully literal queries are immediately executable,
/// anything holding `@name` placeholders comes back prepared.
#[derive(Debug)]
pub enum Statement {
    Query(Query),
    Prepared(PreparedQuery),
}

pub fn parse(input: &str) -> QuarryResult<Statement> {
    let parser = Parser::new(input).map_err(|e| syntax_error(input, &e))?;
    let query = parser.parse().map_err(|e| syntax_error(input, &e))?;
    tracing::debug!(entity = query.entity(), "parsed text query");

    if query.has_parameters() {
        Ok(Statement::Prepared(PreparedQuery::new(query)))
    } else {
        Ok(Statement::Query(query))
    }
}

fn syntax_error(input: &str, e: &ParseError) -> QuarryError {
    QuarryError::Syntax(format!("{input} ({e})"))
}

#[cfg(test)]
mod tests;
