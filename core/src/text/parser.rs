use super::error::{ParseError, ParseResult};
use super::lexer::{Lexer, Token};
use crate::query::{
    Condition, Connector, DeleteQuery, Direction, GetQuery, InsertQuery, Operator, Payload,
    PutQuery, Query, RemoveQuery, SelectQuery, SortList, SortSpec, UpdateQuery, Value, ValueRef,
    append,
};
use smallvec::SmallVec;
use std::time::Duration;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next()?;

        Ok(Self {
            lexer,
            current_token,
        })
    }

    pub fn parse(mut self) -> ParseResult<Query> {
        let query = match &self.current_token {
            Token::Select => Query::Select(self.parse_select()?),
            Token::Delete => Query::Delete(self.parse_delete()?),
            Token::Insert => Query::Insert(self.parse_insert()?),
            Token::Update => Query::Update(self.parse_update()?),
            Token::Get => Query::Get(self.parse_get()?),
            Token::Put => Query::Put(self.parse_put()?),
            Token::Remove => Query::Remove(self.parse_remove()?),
            _ => return Err(self.unexpected_token("statement")),
        };

        if self.current_token == Token::Semicolon {
            self.advance()?;
        }
        if self.current_token != Token::Eof {
            return Err(self.unexpected_token("end of query"));
        }

        Ok(query)
    }

    fn parse_select(&mut self) -> ParseResult<SelectQuery> {
        self.expect(Token::Select)?;

        let fields = self.parse_projection()?;

        self.expect(Token::From)?;
        let entity = self.parse_identifier()?;

        let condition = if self.current_token == Token::Where {
            self.advance()?;
            Some(self.parse_where()?)
        } else {
            None
        };

        let sort = if self.current_token == Token::Order {
            self.advance()?;
            self.expect(Token::By)?;
            self.parse_sort_list()?
        } else {
            SmallVec::new()
        };

        let mut skip = 0;
        let mut limit = 0;
        loop {
            match self.current_token {
                Token::Skip => {
                    self.advance()?;
                    skip = self.parse_bound()?;
                }
                Token::Limit => {
                    self.advance()?;
                    limit = self.parse_bound()?;
                }
                _ => break,
            }
        }

        Ok(SelectQuery {
            entity,
            fields,
            condition,
            sort,
            skip,
            limit,
        })
    }

    fn parse_projection(&mut self) -> ParseResult<Vec<String>> {
        if self.current_token == Token::Star {
            self.advance()?;
            return Ok(Vec::new());
        }

        let mut fields = vec![self.parse_identifier()?];
        while self.current_token == Token::Comma {
            self.advance()?;
            fields.push(self.parse_identifier()?);
        }
        Ok(fields)
    }

    fn parse_delete(&mut self) -> ParseResult<DeleteQuery> {
        self.expect(Token::Delete)?;

        let fields = if self.current_token == Token::From {
            Vec::new()
        } else {
            let mut fields = vec![self.parse_identifier()?];
            while self.current_token == Token::Comma {
                self.advance()?;
                fields.push(self.parse_identifier()?);
            }
            fields
        };

        self.expect(Token::From)?;
        let entity = self.parse_identifier()?;

        let condition = if self.current_token == Token::Where {
            self.advance()?;
            Some(self.parse_where()?)
        } else {
            None
        };

        Ok(DeleteQuery {
            entity,
            fields,
            condition,
        })
    }

    fn parse_insert(&mut self) -> ParseResult<InsertQuery> {
        self.expect(Token::Insert)?;
        let entity = self.parse_identifier()?;
        let payload = self.parse_payload()?;
        let ttl = self.parse_optional_ttl()?;

        Ok(InsertQuery {
            entity,
            payload,
            ttl,
        })
    }

    fn parse_update(&mut self) -> ParseResult<UpdateQuery> {
        self.expect(Token::Update)?;
        let entity = self.parse_identifier()?;
        let payload = self.parse_payload()?;

        Ok(UpdateQuery { entity, payload })
    }

    fn parse_get(&mut self) -> ParseResult<GetQuery> {
        self.expect(Token::Get)?;
        let keys = self.parse_value_list()?;
        self.expect(Token::From)?;
        let entity = self.parse_identifier()?;

        GetQuery::new(entity, keys).map_err(|e| ParseError::SyntaxError(e.to_string()))
    }

    fn parse_put(&mut self) -> ParseResult<PutQuery> {
        self.expect(Token::Put)?;
        self.expect(Token::LeftBrace)?;

        let key = self.parse_value()?;
        self.expect(Token::Comma)?;
        let value = self.parse_value()?;

        let ttl = if self.current_token == Token::Comma {
            self.advance()?;
            Some(self.parse_duration()?)
        } else {
            None
        };

        self.expect(Token::RightBrace)?;
        self.expect(Token::Into)?;
        let entity = self.parse_identifier()?;

        PutQuery::new(entity, key, value, ttl).map_err(|e| ParseError::SyntaxError(e.to_string()))
    }

    fn parse_remove(&mut self) -> ParseResult<RemoveQuery> {
        self.expect(Token::Remove)?;
        let keys = self.parse_value_list()?;
        self.expect(Token::From)?;
        let entity = self.parse_identifier()?;

        RemoveQuery::new(entity, keys).map_err(|e| ParseError::SyntaxError(e.to_string()))
    }

    /// `where` clause: predicates joined by `and`/`or`, merged left to
    /// right with the precedence-climbing rule. No parentheses; grouping
    /// falls out of connector changes alone.
    fn parse_where(&mut self) -> ParseResult<Condition> {
        let mut condition = self.parse_negatable_predicate()?;

        loop {
            let connector = match self.current_token {
                Token::And => Connector::And,
                Token::Or => Connector::Or,
                _ => break,
            };
            self.advance()?;
            let next = self.parse_negatable_predicate()?;
            condition = append(Some(condition), connector, next);
        }

        Ok(condition)
    }

    fn parse_negatable_predicate(&mut self) -> ParseResult<Condition> {
        if self.current_token == Token::Not {
            self.advance()?;
            // `not` binds to the immediately following predicate only
            let predicate = self.parse_predicate()?;
            return Ok(predicate.negate());
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> ParseResult<Condition> {
        let field = self.parse_identifier()?;

        let (op, value) = match &self.current_token {
            Token::Equal => {
                self.advance()?;
                (Operator::Equals, self.parse_value()?)
            }
            Token::Greater => {
                self.advance()?;
                (Operator::GreaterThan, self.parse_value()?)
            }
            Token::GreaterEqual => {
                self.advance()?;
                (Operator::GreaterThanEqual, self.parse_value()?)
            }
            Token::Less => {
                self.advance()?;
                (Operator::LessThan, self.parse_value()?)
            }
            Token::LessEqual => {
                self.advance()?;
                (Operator::LessThanEqual, self.parse_value()?)
            }
            Token::Like => {
                self.advance()?;
                (Operator::Like, self.parse_value()?)
            }
            Token::In => {
                self.advance()?;
                (Operator::In, self.parse_value()?)
            }
            Token::Between => {
                self.advance()?;
                (Operator::Between, self.parse_between_operand()?)
            }
            _ => return Err(self.unexpected_token("comparison operator")),
        };

        Condition::leaf(field, op, value).map_err(|e| ParseError::SyntaxError(e.to_string()))
    }

    /// `between a and b` with literal bounds collapses into one two-element
    /// array operand; a single placeholder (`between @range`) defers the
    /// arity check to bind time. Mixing a placeholder into a bound pair is
    /// rejected because one operand slot cannot hold both.
    fn parse_between_operand(&mut self) -> ParseResult<ValueRef> {
        let low = self.parse_value()?;

        if let ValueRef::Parameter(_) = low {
            if self.current_token != Token::And {
                return Ok(low);
            }
        }

        self.expect(Token::And)?;
        let high = self.parse_value()?;

        match (low, high) {
            (ValueRef::Literal(low), ValueRef::Literal(high)) => {
                Ok(ValueRef::Literal(Value::Array(vec![low, high])))
            }
            _ => Err(ParseError::SyntaxError(
                "between bounds must both be literals or a single placeholder".to_string(),
            )),
        }
    }

    fn parse_sort_list(&mut self) -> ParseResult<SortList> {
        let mut sort: SortList = SmallVec::new();
        sort.push(self.parse_sort_item()?);

        while self.current_token == Token::Comma {
            self.advance()?;
            sort.push(self.parse_sort_item()?);
        }
        Ok(sort)
    }

    fn parse_sort_item(&mut self) -> ParseResult<SortSpec> {
        let field = self.parse_identifier()?;
        let direction = match self.current_token {
            Token::Asc => {
                self.advance()?;
                Direction::Asc
            }
            Token::Desc => {
                self.advance()?;
                Direction::Desc
            }
            _ => Direction::Asc,
        };
        Ok(SortSpec { field, direction })
    }

    fn parse_bound(&mut self) -> ParseResult<i64> {
        if let Token::IntLiteral(n) = self.current_token {
            self.advance()?;
            Ok(n)
        } else {
            Err(self.unexpected_token("integer"))
        }
    }

    fn parse_payload(&mut self) -> ParseResult<Payload> {
        match self.current_token {
            Token::LeftParen => {
                self.advance()?;
                let mut assignments = vec![self.parse_assignment()?];
                while self.current_token == Token::Comma {
                    self.advance()?;
                    assignments.push(self.parse_assignment()?);
                }
                self.expect(Token::RightParen)?;
                Ok(Payload::Assignments(assignments))
            }
            Token::LeftBrace => {
                let json = self.lexer.read_json_block()?;
                self.advance()?;
                let document = Value::from_json(json);
                match document {
                    Value::Document(_) => Ok(Payload::Document(document)),
                    _ => Err(ParseError::SyntaxError(
                        "document payload must be a JSON object".to_string(),
                    )),
                }
            }
            _ => Err(self.unexpected_token("assignments or document payload")),
        }
    }

    fn parse_assignment(&mut self) -> ParseResult<(String, ValueRef)> {
        let field = self.parse_identifier()?;
        self.expect(Token::Equal)?;
        let value = self.parse_value()?;
        Ok((field, value))
    }

    fn parse_value_list(&mut self) -> ParseResult<Vec<ValueRef>> {
        let mut values = vec![self.parse_value()?];
        while self.current_token == Token::Comma {
            self.advance()?;
            values.push(self.parse_value()?);
        }
        Ok(values)
    }

    fn parse_value(&mut self) -> ParseResult<ValueRef> {
        match self.current_token.clone() {
            Token::IntLiteral(n) => {
                self.advance()?;
                Ok(ValueRef::Literal(Value::Integer(n)))
            }
            Token::DecimalLiteral(d) => {
                self.advance()?;
                Ok(ValueRef::Literal(Value::Decimal(d)))
            }
            Token::StringLiteral(s) => {
                self.advance()?;
                Ok(ValueRef::Literal(Value::String(s)))
            }
            Token::True => {
                self.advance()?;
                Ok(ValueRef::Literal(Value::Boolean(true)))
            }
            Token::False => {
                self.advance()?;
                Ok(ValueRef::Literal(Value::Boolean(false)))
            }
            Token::Null => {
                self.advance()?;
                Ok(ValueRef::Literal(Value::Null))
            }
            Token::Parameter(name) => {
                self.advance()?;
                Ok(ValueRef::Parameter(name))
            }
            Token::LeftBrace | Token::LeftBracket => {
                let json = self.lexer.read_json_block()?;
                self.advance()?;
                Ok(ValueRef::Literal(Value::from_json(json)))
            }
            Token::LeftParen => {
                self.advance()?;
                let mut items = vec![self.parse_literal()?];
                while self.current_token == Token::Comma {
                    self.advance()?;
                    items.push(self.parse_literal()?);
                }
                self.expect(Token::RightParen)?;
                Ok(ValueRef::Literal(Value::Array(items)))
            }
            _ => Err(self.unexpected_token("value")),
        }
    }

    fn parse_literal(&mut self) -> ParseResult<Value> {
        match self.parse_value()? {
            ValueRef::Literal(value) => Ok(value),
            ValueRef::Parameter(_) => Err(ParseError::SyntaxError(
                "placeholders are not allowed inside a literal list".to_string(),
            )),
        }
    }

    fn parse_optional_ttl(&mut self) -> ParseResult<Option<Duration>> {
        if matches!(self.current_token, Token::IntLiteral(_)) {
            Ok(Some(self.parse_duration()?))
        } else {
            Ok(None)
        }
    }

    fn parse_duration(&mut self) -> ParseResult<Duration> {
        let amount = match self.current_token {
            Token::IntLiteral(n) => {
                self.advance()?;
                n
            }
            _ => return Err(self.unexpected_token("duration amount")),
        };
        if amount <= 0 {
            return Err(ParseError::InvalidDuration(format!(
                "duration amount must be positive, got {amount}"
            )));
        }
        let amount = amount as u64;

        let duration = match self.current_token {
            Token::Day => Duration::from_secs(amount * 86_400),
            Token::Hour => Duration::from_secs(amount * 3_600),
            Token::Minute => Duration::from_secs(amount * 60),
            Token::Second => Duration::from_secs(amount),
            Token::Millisecond => Duration::from_millis(amount),
            Token::Nanosecond => Duration::from_nanos(amount),
            _ => return Err(self.unexpected_token("duration unit")),
        };
        self.advance()?;
        Ok(duration)
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        if let Token::Identifier(name) = &self.current_token {
            let name = name.clone();
            self.advance()?;
            Ok(name)
        } else {
            Err(self.unexpected_token("identifier"))
        }
    }

    fn advance(&mut self) -> ParseResult<()> {
        self.current_token = self.lexer.next()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if std::mem::discriminant(&self.current_token) == std::mem::discriminant(&expected) {
            self.advance()
        } else {
            Err(self.unexpected_token(&format!("{:?}", expected)))
        }
    }

    fn unexpected_token(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: format!("{:?} at position {}", self.current_token, self.lexer.token_start()),
        }
    }
}
