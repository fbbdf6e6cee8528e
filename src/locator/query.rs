use std::fmt;

use crate::error::{DriverError, Result};

/// The one locator strategy the device supports.
pub const XPATH_STRATEGY: &str = "xpath";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `/name`
    Child,
    /// `//name`
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Any,
    Tag(String),
}

impl NameTest {
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Tag(name) => name == tag,
        }
    }
}

/// Value an attribute-style predicate reads from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Attribute(String),
    /// `text()`; the device exposes text as the `text` attribute
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Exists(String),
    Equals(Operand, String),
    Contains(Operand, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[n]`, 1-based
    Position(usize),
    /// `[c1 and c2 ...]`
    All(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub name: NameTest,
    pub predicates: Vec<Predicate>,
}

/// A parsed structural path query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Starts with `.`: evaluated from a context element
    pub relative: bool,
    pub steps: Vec<Step>,
    source: String,
}

impl Query {
    /// Parse and validate. Fails with InvalidArgument on anything outside the
    /// supported subset; never touches the device.
    pub fn parse(selector: &str) -> Result<Query> {
        let mut parser = Parser::new(selector);
        let query = parser.query()?;
        Ok(query)
    }

    /// Validate strategy and selector together.
    pub fn for_strategy(strategy: &str, selector: &str) -> Result<Query> {
        if strategy != XPATH_STRATEGY {
            return Err(DriverError::InvalidArgument(format!(
                "locator strategy '{}' is not supported; only '{}' is",
                strategy, XPATH_STRATEGY
            )));
        }
        Query::parse(selector)
    }

    /// `//*[@attribute="value"]`
    pub fn attribute_equals(attribute: &str, value: &str) -> Query {
        Query {
            relative: false,
            steps: vec![Step {
                axis: Axis::Descendant,
                name: NameTest::Any,
                predicates: vec![Predicate::All(vec![Condition::Equals(
                    Operand::Attribute(attribute.to_string()),
                    value.to_string(),
                )])],
            }],
            source: format!("//*[@{}=\"{}\"]", attribute, value),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser { input, pos: 0 }
    }

    fn error(&self, message: &str) -> DriverError {
        DriverError::InvalidArgument(format!(
            "unsupported xpath '{}' at offset {}: {}",
            self.input, self.pos, message
        ))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        self.skip_ws();
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", token)))
        }
    }

    fn query(&mut self) -> Result<Query> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            return Err(self.error("empty selector"));
        }
        self.skip_ws();

        let relative = self.eat(".");
        let mut steps = Vec::new();
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                break;
            }
            let axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else {
                return Err(self.error("expected '/' or '//'"));
            };
            steps.push(self.step(axis)?);
        }

        if steps.is_empty() {
            return Err(self.error("no location steps"));
        }
        Ok(Query {
            relative,
            steps,
            source: trimmed.to_string(),
        })
    }

    fn step(&mut self, axis: Axis) -> Result<Step> {
        let name = if self.eat("*") {
            NameTest::Any
        } else {
            NameTest::Tag(self.ident().ok_or_else(|| self.error("expected a tag name or '*'"))?)
        };

        let mut predicates = Vec::new();
        loop {
            self.skip_ws();
            if !self.eat("[") {
                break;
            }
            predicates.push(self.predicate()?);
            self.expect("]")?;
        }
        Ok(Step {
            axis,
            name,
            predicates,
        })
    }

    fn ident(&mut self) -> Option<String> {
        let rest = self.rest();
        let mut end = 0;
        for (i, c) in rest.char_indices() {
            let ok = if i == 0 {
                c.is_alphabetic() || c == '_'
            } else {
                c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
            };
            if !ok {
                break;
            }
            end = i + c.len_utf8();
        }
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(rest[..end].to_string())
    }

    fn predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        if let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                let digits: String = self.rest().chars().take_while(|c| c.is_ascii_digit()).collect();
                self.pos += digits.len();
                let position = digits
                    .parse::<usize>()
                    .map_err(|_| self.error("bad position"))?;
                if position == 0 {
                    return Err(self.error("positions are 1-based"));
                }
                return Ok(Predicate::Position(position));
            }
        }

        let mut conditions = vec![self.condition()?];
        loop {
            self.skip_ws();
            if self.rest().starts_with(']') {
                break;
            }
            if !self.eat("and") {
                return Err(self.error("only 'and' may join conditions"));
            }
            conditions.push(self.condition()?);
        }
        Ok(Predicate::All(conditions))
    }

    fn condition(&mut self) -> Result<Condition> {
        self.skip_ws();
        if self.eat("contains(") {
            let operand = self.operand()?;
            self.expect(",")?;
            let value = self.string()?;
            self.expect(")")?;
            return Ok(Condition::Contains(operand, value));
        }

        let operand = self.operand()?;
        self.skip_ws();
        if self.eat("=") {
            let value = self.string()?;
            return Ok(Condition::Equals(operand, value));
        }
        match operand {
            Operand::Attribute(name) => Ok(Condition::Exists(name)),
            Operand::Text => Err(self.error("text() must be compared with '='")),
        }
    }

    fn operand(&mut self) -> Result<Operand> {
        self.skip_ws();
        if self.eat("@") {
            let name = self.ident().ok_or_else(|| self.error("expected an attribute name"))?;
            return Ok(Operand::Attribute(name));
        }
        if self.eat("text()") {
            return Ok(Operand::Text);
        }
        Err(self.error("expected '@attribute' or 'text()'"))
    }

    fn string(&mut self) -> Result<String> {
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        self.pos += 1;
        let rest = self.rest();
        let close = rest
            .find(quote)
            .ok_or_else(|| self.error("unterminated string"))?;
        let value = rest[..close].to_string();
        self.pos += close + 1;
        Ok(value)
    }
}
