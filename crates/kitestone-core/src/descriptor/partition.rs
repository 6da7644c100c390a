//! Partition strategies and their compact expression form.
//!
//! An expression lists partitioners in order, for example:
//!
//! ```text
//! [hash("id", "id_hash", 16), identity("data", "data"), year("ts", "year")]
//! ```

use std::fmt;

use crate::catalog::Column;
use crate::error::{DescriptorError, Error};
use crate::schema::convert::to_type_string;
use crate::schema::Schema;

/// How a partitioner derives its value from the source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Identity,
    Hash { buckets: u32 },
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl PartitionKind {
    fn function_name(self) -> &'static str {
        match self {
            PartitionKind::Identity => "identity",
            PartitionKind::Hash { .. } => "hash",
            PartitionKind::Year => "year",
            PartitionKind::Month => "month",
            PartitionKind::Day => "day",
            PartitionKind::Hour => "hour",
            PartitionKind::Minute => "minute",
        }
    }
}

/// One partition level: a source field, the partition name, and the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPartitioner {
    pub source: String,
    pub name: String,
    pub kind: PartitionKind,
}

/// Ordered sequence of partitioners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionStrategy {
    partitioners: Vec<FieldPartitioner>,
}

impl PartitionStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partitioners(&self) -> &[FieldPartitioner] {
        &self.partitioners
    }

    pub fn is_empty(&self) -> bool {
        self.partitioners.is_empty()
    }

    pub fn push(mut self, source: &str, name: &str, kind: PartitionKind) -> Self {
        self.partitioners.push(FieldPartitioner {
            source: source.to_string(),
            name: name.to_string(),
            kind,
        });
        self
    }

    pub fn identity(self, source: &str, name: &str) -> Self {
        self.push(source, name, PartitionKind::Identity)
    }

    pub fn hash(self, source: &str, name: &str, buckets: u32) -> Self {
        self.push(source, name, PartitionKind::Hash { buckets })
    }

    pub fn year(self, source: &str, name: &str) -> Self {
        self.push(source, name, PartitionKind::Year)
    }

    pub fn month(self, source: &str, name: &str) -> Self {
        self.push(source, name, PartitionKind::Month)
    }

    pub fn day(self, source: &str, name: &str) -> Self {
        self.push(source, name, PartitionKind::Day)
    }

    pub fn hour(self, source: &str, name: &str) -> Self {
        self.push(source, name, PartitionKind::Hour)
    }

    pub fn minute(self, source: &str, name: &str) -> Self {
        self.push(source, name, PartitionKind::Minute)
    }

    /// Identity partitioners over existing partition key columns, used when a
    /// table carries partition keys but no stored expression.
    pub fn from_partition_columns(columns: &[Column]) -> Self {
        columns
            .iter()
            .fold(Self::new(), |strategy, c| strategy.identity(&c.name, &c.name))
    }

    /// Check partitioners against the schema they partition.
    pub fn validate(&self, schema: &Schema) -> Result<(), DescriptorError> {
        let mut names = std::collections::HashSet::new();
        for p in &self.partitioners {
            if schema.field(&p.source).is_none() {
                return Err(DescriptorError::UnknownPartitionSource {
                    partition: p.name.clone(),
                    source_field: p.source.clone(),
                });
            }
            if p.kind == (PartitionKind::Hash { buckets: 0 }) {
                return Err(DescriptorError::InvalidBucketCount {
                    partition: p.name.clone(),
                });
            }
            if !names.insert(p.name.as_str()) {
                return Err(DescriptorError::DuplicatePartitionName(p.name.clone()));
            }
        }
        Ok(())
    }

    /// Catalog partition key columns for this strategy.
    pub fn partition_columns(&self, schema: &Schema) -> Result<Vec<Column>, Error> {
        let mut columns = Vec::with_capacity(self.partitioners.len());
        for p in &self.partitioners {
            let data_type = match p.kind {
                PartitionKind::Identity => {
                    let field = schema.field(&p.source).ok_or_else(|| {
                        DescriptorError::UnknownPartitionSource {
                            partition: p.name.clone(),
                            source_field: p.source.clone(),
                        }
                    })?;
                    // Partition values are never null.
                    match field.schema.non_null_branches().as_slice() {
                        [single] => to_type_string(single, &p.source)?,
                        _ => to_type_string(&field.schema, &p.source)?,
                    }
                }
                _ => "int".to_string(),
            };
            columns.push(
                Column::new(&p.name, data_type)
                    .with_comment(format!("partition column derived from '{}'", p.source)),
            );
        }
        Ok(columns)
    }

    pub fn to_expression(&self) -> String {
        self.to_string()
    }

    pub fn parse_expression(expression: &str) -> Result<Self, DescriptorError> {
        let invalid = |reason: String| DescriptorError::InvalidPartitionExpression {
            expression: expression.to_string(),
            reason,
        };
        let tokens = tokenize(expression).map_err(invalid)?;
        let mut pos = 0;
        let strategy = parse_list(&tokens, &mut pos).map_err(invalid)?;
        if pos != tokens.len() {
            return Err(invalid("trailing input".to_string()));
        }
        Ok(strategy)
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, p) in self.partitioners.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}({}, {}",
                p.kind.function_name(),
                quote(&p.source),
                quote(&p.name)
            )?;
            if let PartitionKind::Hash { buckets } = p.kind {
                write!(f, ", {buckets}")?;
            }
            f.write_str(")")?;
        }
        f.write_str("]")
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Number(u32),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {}
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            '"' => {
                let mut s = String::new();
                i += 1;
                while i < len && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                        if i >= len {
                            break;
                        }
                    }
                    s.push(chars[i]);
                    i += 1;
                }
                if i >= len {
                    return Err("unterminated string".to_string());
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < len && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let n = digits
                    .parse()
                    .map_err(|_| format!("number out of range: {digits}"))?;
                tokens.push(Token::Number(n));
                continue;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < len && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
        i += 1;
    }

    Ok(tokens)
}

fn parse_list(tokens: &[Token], pos: &mut usize) -> Result<PartitionStrategy, String> {
    expect(tokens, pos, &Token::LBracket)?;
    let mut strategy = PartitionStrategy::new();
    if tokens.get(*pos) == Some(&Token::RBracket) {
        *pos += 1;
        return Ok(strategy);
    }
    loop {
        strategy.partitioners.push(parse_partitioner(tokens, pos)?);
        match tokens.get(*pos) {
            Some(Token::Comma) => *pos += 1,
            Some(Token::RBracket) => {
                *pos += 1;
                return Ok(strategy);
            }
            other => return Err(format!("expected ',' or ']', found {other:?}")),
        }
    }
}

fn parse_partitioner(tokens: &[Token], pos: &mut usize) -> Result<FieldPartitioner, String> {
    let function = match tokens.get(*pos) {
        Some(Token::Ident(name)) => name.to_ascii_lowercase(),
        other => return Err(format!("expected a partition function, found {other:?}")),
    };
    *pos += 1;
    expect(tokens, pos, &Token::LParen)?;
    let source = string_arg(tokens, pos)?;
    expect(tokens, pos, &Token::Comma)?;
    let name = string_arg(tokens, pos)?;

    let kind = match function.as_str() {
        "identity" => PartitionKind::Identity,
        "hash" => {
            expect(tokens, pos, &Token::Comma)?;
            let buckets = match tokens.get(*pos) {
                Some(Token::Number(n)) if *n > 0 => *n,
                other => return Err(format!("expected a positive bucket count, found {other:?}")),
            };
            *pos += 1;
            PartitionKind::Hash { buckets }
        }
        "year" => PartitionKind::Year,
        "month" => PartitionKind::Month,
        "day" => PartitionKind::Day,
        "hour" => PartitionKind::Hour,
        "minute" => PartitionKind::Minute,
        other => return Err(format!("unknown partition function '{other}'")),
    };
    expect(tokens, pos, &Token::RParen)?;
    Ok(FieldPartitioner { source, name, kind })
}

fn string_arg(tokens: &[Token], pos: &mut usize) -> Result<String, String> {
    match tokens.get(*pos) {
        Some(Token::Str(s)) => {
            *pos += 1;
            Ok(s.clone())
        }
        other => Err(format!("expected a quoted name, found {other:?}")),
    }
}

fn expect(tokens: &[Token], pos: &mut usize, expected: &Token) -> Result<(), String> {
    match tokens.get(*pos) {
        Some(t) if t == expected => {
            *pos += 1;
            Ok(())
        }
        other => Err(format!("expected {expected:?}, found {other:?}")),
    }
}
