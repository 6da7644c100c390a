//! Catalog column type strings.
//!
//! The grammar is Hive's (`bigint`, `array<string>`, `map<string,int>`,
//! `struct<a:int,b:string>`, `uniontype<int,string>`, `varchar(10)`) plus a
//! `nullable<T>` wrapper. Parsing is case-insensitive for type names and
//! tolerates whitespace; rendering is canonical: lowercase, no whitespace.

use std::fmt;

/// Parsed form of a catalog type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    /// A primitive name with optional parameters, e.g. `varchar(10)`.
    Primitive { name: String, params: Vec<String> },
    Array(Box<TypeNode>),
    Map(Box<TypeNode>, Box<TypeNode>),
    Struct(Vec<(String, TypeNode)>),
    Union(Vec<TypeNode>),
    Nullable(Box<TypeNode>),
}

impl TypeNode {
    pub fn primitive(name: &str) -> TypeNode {
        TypeNode::Primitive {
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    /// Replace primitive synonyms with the names [`Display`](fmt::Display)
    /// would produce for the same type, e.g. `long` becomes `bigint`.
    pub fn canonicalize(self) -> TypeNode {
        match self {
            TypeNode::Primitive { name, params } => {
                let name = match name.as_str() {
                    "long" => "bigint".to_string(),
                    "integer" => "int".to_string(),
                    _ => name,
                };
                TypeNode::Primitive { name, params }
            }
            TypeNode::Array(items) => TypeNode::Array(Box::new(items.canonicalize())),
            TypeNode::Map(key, value) => {
                TypeNode::Map(Box::new(key.canonicalize()), Box::new(value.canonicalize()))
            }
            TypeNode::Struct(fields) => TypeNode::Struct(
                fields
                    .into_iter()
                    .map(|(name, node)| (name, node.canonicalize()))
                    .collect(),
            ),
            TypeNode::Union(branches) => {
                TypeNode::Union(branches.into_iter().map(TypeNode::canonicalize).collect())
            }
            TypeNode::Nullable(inner) => TypeNode::Nullable(Box::new(inner.canonicalize())),
        }
    }
}

/// Canonical rendering of a type string, or `None` if it does not parse.
pub fn canonical(input: &str) -> Option<String> {
    parse(input).ok().map(|node| node.canonicalize().to_string())
}

/// Whether two type strings name the same catalog type once spelling
/// differences (case, whitespace, synonyms) are removed.
pub fn same_type(a: &str, b: &str) -> bool {
    a == b || matches!((canonical(a), canonical(b)), (Some(a), Some(b)) if a == b)
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Primitive { name, params } => {
                f.write_str(name)?;
                if !params.is_empty() {
                    write!(f, "({})", params.join(","))?;
                }
                Ok(())
            }
            TypeNode::Array(items) => write!(f, "array<{items}>"),
            TypeNode::Map(key, value) => write!(f, "map<{key},{value}>"),
            TypeNode::Struct(fields) => {
                f.write_str("struct<")?;
                for (i, (name, node)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if is_plain_identifier(name) {
                        write!(f, "{name}:{node}")?;
                    } else {
                        write!(f, "`{}`:{node}", name.replace('`', "``"))?;
                    }
                }
                f.write_str(">")
            }
            TypeNode::Union(branches) => {
                f.write_str("uniontype<")?;
                for (i, node) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{node}")?;
                }
                f.write_str(">")
            }
            TypeNode::Nullable(inner) => write!(f, "nullable<{inner}>"),
        }
    }
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Quoted(String),
    Open,
    Close,
    LParen,
    RParen,
    Comma,
    Colon,
}

/// Split a type string into tokens.
///
/// Backtick-quoted struct field names may contain any character; a doubled
/// backtick inside stands for one backtick.
fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '<' => tokens.push(Token::Open),
            '>' => tokens.push(Token::Close),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            ':' => tokens.push(Token::Colon),
            '`' => {
                let mut name = String::new();
                i += 1;
                loop {
                    if i >= len {
                        return Err("unterminated quoted name".to_string());
                    }
                    if chars[i] == '`' {
                        if i + 1 < len && chars[i + 1] == '`' {
                            name.push('`');
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    name.push(chars[i]);
                    i += 1;
                }
                tokens.push(Token::Quoted(name));
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let start = i;
                while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
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

/// Parse a catalog type string.
///
/// Returns a human-readable reason on failure; callers attach the column name.
pub fn parse(input: &str) -> Result<TypeNode, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty type".to_string());
    }
    let mut pos = 0;
    let node = parse_type(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(format!("trailing input after '{node}'"));
    }
    Ok(node)
}

fn parse_type(tokens: &[Token], pos: &mut usize) -> Result<TypeNode, String> {
    let name = match tokens.get(*pos) {
        Some(Token::Ident(name)) => name.to_ascii_lowercase(),
        Some(other) => return Err(format!("expected a type name, found {other:?}")),
        None => return Err("unexpected end of type".to_string()),
    };
    *pos += 1;

    match name.as_str() {
        "array" => {
            expect(tokens, pos, &Token::Open)?;
            let items = parse_type(tokens, pos)?;
            expect(tokens, pos, &Token::Close)?;
            Ok(TypeNode::Array(Box::new(items)))
        }
        "map" => {
            expect(tokens, pos, &Token::Open)?;
            let key = parse_type(tokens, pos)?;
            expect(tokens, pos, &Token::Comma)?;
            let value = parse_type(tokens, pos)?;
            expect(tokens, pos, &Token::Close)?;
            Ok(TypeNode::Map(Box::new(key), Box::new(value)))
        }
        "nullable" => {
            expect(tokens, pos, &Token::Open)?;
            let inner = parse_type(tokens, pos)?;
            expect(tokens, pos, &Token::Close)?;
            Ok(TypeNode::Nullable(Box::new(inner)))
        }
        "uniontype" => {
            expect(tokens, pos, &Token::Open)?;
            let mut branches = vec![parse_type(tokens, pos)?];
            while tokens.get(*pos) == Some(&Token::Comma) {
                *pos += 1;
                branches.push(parse_type(tokens, pos)?);
            }
            expect(tokens, pos, &Token::Close)?;
            Ok(TypeNode::Union(branches))
        }
        "struct" => {
            expect(tokens, pos, &Token::Open)?;
            let mut fields = Vec::new();
            loop {
                let field_name = match tokens.get(*pos) {
                    Some(Token::Ident(n)) | Some(Token::Quoted(n)) => n.clone(),
                    Some(Token::Close) if fields.is_empty() => {
                        return Err("struct must have at least one field".to_string());
                    }
                    other => return Err(format!("expected a field name, found {other:?}")),
                };
                *pos += 1;
                expect(tokens, pos, &Token::Colon)?;
                fields.push((field_name, parse_type(tokens, pos)?));
                match tokens.get(*pos) {
                    Some(Token::Comma) => *pos += 1,
                    Some(Token::Close) => {
                        *pos += 1;
                        break;
                    }
                    other => return Err(format!("expected ',' or '>', found {other:?}")),
                }
            }
            Ok(TypeNode::Struct(fields))
        }
        _ => {
            let mut params = Vec::new();
            if tokens.get(*pos) == Some(&Token::LParen) {
                *pos += 1;
                loop {
                    match tokens.get(*pos) {
                        Some(Token::Ident(p)) => params.push(p.clone()),
                        other => return Err(format!("expected a type parameter, found {other:?}")),
                    }
                    *pos += 1;
                    match tokens.get(*pos) {
                        Some(Token::Comma) => *pos += 1,
                        Some(Token::RParen) => {
                            *pos += 1;
                            break;
                        }
                        other => return Err(format!("expected ',' or ')', found {other:?}")),
                    }
                }
            }
            Ok(TypeNode::Primitive { name, params })
        }
    }
}

fn expect(tokens: &[Token], pos: &mut usize, expected: &Token) -> Result<(), String> {
    match tokens.get(*pos) {
        Some(t) if t == expected => {
            *pos += 1;
            Ok(())
        }
        Some(other) => Err(format!("expected {expected:?}, found {other:?}")),
        None => Err(format!("expected {expected:?}, found end of type")),
    }
}
