//! Recovery of stringified literal values.
//!
//! Facts and class parameters sometimes reach the dashboard as the textual
//! repr of a structured value, e.g. `"{'up': ['eth0'], 'mtu': 1500}"`.
//! [`parse_python`] turns such text back into a [`Literal`]. Only literal
//! syntax is accepted; names, calls (other than `set()`) and operators are
//! rejected and the input is returned unchanged.
//!
//! Supported: `None`, `True`, `False`, integers (decimal, `0x`, `0o`, `0b`,
//! `_` separators, one unary sign), floats, `'`/`"`/triple-quoted strings
//! with `r`/`u`/`b` prefixes and adjacent-literal concatenation, lists,
//! tuples, dicts and sets. Complex numbers, `\N{...}` escapes, integers
//! outside the `i64` range and containers nested deeper than [`MAX_DEPTH`]
//! are not.

use std::fmt;

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    /// Entries in source order, keys unique.
    Dict(Vec<(Literal, Literal)>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected {found:?} at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("invalid string literal starting at offset {0}")]
    InvalidString(usize),

    #[error("{0:?} is not a literal")]
    NotALiteral(String),

    #[error("unhashable {0} used as a dict key or set member")]
    Unhashable(&'static str),

    #[error("cannot concatenate str and bytes literals")]
    MixedStringKinds,

    #[error("containers nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

/// Deepest container nesting accepted by the parser.
pub const MAX_DEPTH: usize = 200;

type ParseResult<T> = Result<T, LiteralError>;

/// Parse `value` as a literal, or return it unchanged as [`Literal::Str`].
pub fn parse_python(value: &str) -> Literal {
    parse_literal(value).unwrap_or_else(|_| Literal::Str(value.to_string()))
}

/// Parse `input` as a single literal expression.
pub fn parse_literal(input: &str) -> ParseResult<Literal> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression_list()?;
    parser.skip_trivia();
    match parser.peek() {
        None => Ok(value),
        Some(_) => Err(parser.unexpected()),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Open `[`, `(` and `{` enclosing the cursor.
    depth: usize,
}

struct StringPrefix {
    len: usize,
    raw: bool,
    bytes: bool,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, want: char) -> bool {
        if self.peek() == Some(want) {
            self.pos += want.len_utf8();
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> LiteralError {
        match self.peek() {
            Some(found) => LiteralError::Unexpected {
                found,
                offset: self.pos,
            },
            None => LiteralError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, want: char) -> ParseResult<()> {
        self.skip_trivia();
        if self.eat(want) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Whitespace, comments and backslash line continuations.
    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else if rest.starts_with("\\\n") {
                self.pos += 2;
            } else if rest.starts_with('#') {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else {
                return;
            }
        }
    }

    /// `a, b, c` at the top level is a tuple.
    fn expression_list(&mut self) -> ParseResult<Literal> {
        let first = self.value()?;
        self.skip_trivia();
        if !self.eat(',') {
            return Ok(first);
        }
        let mut items = vec![first];
        loop {
            self.skip_trivia();
            if self.peek().is_none() {
                break;
            }
            items.push(self.value()?);
            self.skip_trivia();
            if !self.eat(',') {
                break;
            }
        }
        Ok(Literal::Tuple(items))
    }

    fn value(&mut self) -> ParseResult<Literal> {
        self.skip_trivia();
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some(open @ ('[' | '(' | '{')) => {
                if self.depth >= MAX_DEPTH {
                    return Err(LiteralError::TooDeep);
                }
                self.depth += 1;
                let container = self.container(open);
                self.depth -= 1;
                container
            }
            Some('+' | '-') => self.signed(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(false),
            Some('\'' | '"') => self.strings(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                if self.string_prefix().is_some() {
                    self.strings()
                } else {
                    self.word()
                }
            }
            Some(_) => Err(self.unexpected()),
        }
    }

    fn container(&mut self, open: char) -> ParseResult<Literal> {
        match open {
            '[' => {
                self.bump();
                let (items, _) = self.elements(']')?;
                Ok(Literal::List(items))
            }
            '(' => {
                self.bump();
                let (mut items, comma) = self.elements(')')?;
                if items.len() == 1 && !comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Literal::Tuple(items))
                }
            }
            _ => self.braced(),
        }
    }

    /// Comma-separated values up to `close`; reports whether a comma was seen.
    fn elements(&mut self, close: char) -> ParseResult<(Vec<Literal>, bool)> {
        let mut items = Vec::new();
        let mut comma = false;
        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok((items, comma));
            }
            items.push(self.value()?);
            self.skip_trivia();
            if self.eat(',') {
                comma = true;
            } else if self.eat(close) {
                return Ok((items, comma));
            } else {
                return Err(self.unexpected());
            }
        }
    }

    fn braced(&mut self) -> ParseResult<Literal> {
        self.bump();
        self.skip_trivia();
        if self.eat('}') {
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.value()?;
        self.skip_trivia();
        if self.eat(':') {
            let mut entries = Vec::new();
            let value = self.value()?;
            insert_entry(&mut entries, first, value)?;
            loop {
                self.skip_trivia();
                if self.eat('}') {
                    break;
                }
                if !self.eat(',') {
                    return Err(self.unexpected());
                }
                self.skip_trivia();
                if self.eat('}') {
                    break;
                }
                let key = self.value()?;
                self.expect(':')?;
                let value = self.value()?;
                insert_entry(&mut entries, key, value)?;
            }
            return Ok(Literal::Dict(entries));
        }

        let mut members = Vec::new();
        insert_member(&mut members, first)?;
        loop {
            self.skip_trivia();
            if self.eat('}') {
                break;
            }
            if !self.eat(',') {
                return Err(self.unexpected());
            }
            self.skip_trivia();
            if self.eat('}') {
                break;
            }
            let member = self.value()?;
            insert_member(&mut members, member)?;
        }
        Ok(Literal::Set(members))
    }

    fn signed(&mut self) -> ParseResult<Literal> {
        let negative = self.bump() == Some('-');
        self.skip_trivia();
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(negative),
            _ => Err(self.unexpected()),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn number(&mut self, negative: bool) -> ParseResult<Literal> {
        let start = self.pos;
        let rest = self.rest().as_bytes();
        let radix = match (rest.first(), rest.get(1)) {
            (Some(b'0'), Some(b'x' | b'X')) => Some(16),
            (Some(b'0'), Some(b'o' | b'O')) => Some(8),
            (Some(b'0'), Some(b'b' | b'B')) => Some(2),
            _ => None,
        };

        let literal = if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let digits = digits.strip_prefix('_').unwrap_or(digits);
            let token = &self.src[start..self.pos];
            if !separators_ok(digits) {
                return Err(LiteralError::InvalidNumber(token.to_string()));
            }
            let magnitude = i128::from_str_radix(&digits.replace('_', ""), radix)
                .map_err(|_| LiteralError::InvalidNumber(token.to_string()))?;
            int_literal(magnitude, negative, token)?
        } else {
            let int_part = self.take_while(|c| c.is_ascii_digit() || c == '_');
            let mut is_float = false;
            let mut fraction = "";
            if self.eat('.') {
                is_float = true;
                fraction = self.take_while(|c| c.is_ascii_digit() || c == '_');
            }
            let mut exponent = "";
            if matches!(self.peek(), Some('e' | 'E')) {
                is_float = true;
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                exponent = self.take_while(|c| c.is_ascii_digit() || c == '_');
                if exponent.is_empty() {
                    return Err(LiteralError::InvalidNumber(self.src[start..self.pos].to_string()));
                }
            }
            let token = &self.src[start..self.pos];
            let well_formed = (!int_part.is_empty() || !fraction.is_empty())
                && separators_ok(int_part)
                && separators_ok(fraction)
                && separators_ok(exponent);
            if !well_formed {
                return Err(LiteralError::InvalidNumber(token.to_string()));
            }

            let cleaned = token.replace('_', "");
            if is_float {
                let value: f64 = cleaned
                    .parse()
                    .map_err(|_| LiteralError::InvalidNumber(token.to_string()))?;
                Literal::Float(if negative { -value } else { value })
            } else {
                if cleaned.len() > 1 && cleaned.starts_with('0') && cleaned.bytes().any(|b| b != b'0') {
                    return Err(LiteralError::InvalidNumber(token.to_string()));
                }
                let magnitude: i128 = cleaned
                    .parse()
                    .map_err(|_| LiteralError::InvalidNumber(token.to_string()))?;
                int_literal(magnitude, negative, token)?
            }
        };

        // `1j`, `1abc`, `0x1.5`
        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
            return Err(LiteralError::InvalidNumber(self.src[start..self.pos].to_string()));
        }
        Ok(literal)
    }

    /// Detect `r'`, `b"`, `'`, ... at the cursor without consuming it.
    fn string_prefix(&self) -> Option<StringPrefix> {
        let rest = self.rest();
        let letters = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        if letters > 2 || !matches!(rest.as_bytes().get(letters), Some(b'\'' | b'"')) {
            return None;
        }
        let prefix = rest[..letters].to_ascii_lowercase();
        let (raw, bytes) = match prefix.as_str() {
            "" | "u" => (false, false),
            "r" => (true, false),
            "b" => (false, true),
            "br" | "rb" => (true, true),
            _ => return None,
        };
        Some(StringPrefix {
            len: letters,
            raw,
            bytes,
        })
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> ParseResult<Literal> {
        let mut acc: Option<Literal> = None;
        loop {
            self.skip_trivia();
            let Some(prefix) = self.string_prefix() else {
                break;
            };
            let piece = self.string(prefix)?;
            acc = Some(match (acc, piece) {
                (None, piece) => piece,
                (Some(Literal::Str(mut a)), Literal::Str(b)) => {
                    a.push_str(&b);
                    Literal::Str(a)
                }
                (Some(Literal::Bytes(mut a)), Literal::Bytes(b)) => {
                    a.extend(b);
                    Literal::Bytes(a)
                }
                _ => return Err(LiteralError::MixedStringKinds),
            });
        }
        acc.ok_or_else(|| self.unexpected())
    }

    fn string(&mut self, prefix: StringPrefix) -> ParseResult<Literal> {
        let start = self.pos;
        let invalid = || LiteralError::InvalidString(start);
        self.pos += prefix.len;

        let quote = self.bump().ok_or_else(invalid)?;
        let triple: String = [quote; 3].iter().collect();
        let is_triple = self.rest().starts_with(&triple[1..]);
        if is_triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(invalid)?;
            if c == quote {
                if !is_triple {
                    break;
                }
                if self.rest().starts_with(&triple[1..]) {
                    self.pos += 2;
                    break;
                }
                out.push(c);
                continue;
            }
            if c == '\n' && !is_triple {
                return Err(invalid());
            }
            if c == '\\' {
                let e = self.bump().ok_or_else(invalid)?;
                if prefix.bytes && !e.is_ascii() {
                    return Err(invalid());
                }
                if prefix.raw {
                    out.push('\\');
                    out.push(e);
                } else {
                    self.escape(e, prefix.bytes, &mut out).map_err(|_| invalid())?;
                }
                continue;
            }
            if prefix.bytes && !c.is_ascii() {
                return Err(invalid());
            }
            out.push(c);
        }

        if prefix.bytes {
            // Every char is below U+0100 here.
            Ok(Literal::Bytes(out.chars().map(|c| c as u32 as u8).collect()))
        } else {
            Ok(Literal::Str(out))
        }
    }

    fn escape(&mut self, e: char, bytes: bool, out: &mut String) -> Result<(), ()> {
        let simple = match e {
            '\n' => return Ok(()),
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0b',
            '0'..='7' => {
                let mut code = e.to_digit(8).ok_or(())?;
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                if bytes && code > 0xff {
                    return Err(());
                }
                char::from_u32(code).ok_or(())?
            }
            'x' => self.hex_escape(2)?,
            'u' if !bytes => self.hex_escape(4)?,
            'U' if !bytes => self.hex_escape(8)?,
            'N' if !bytes => return Err(()),
            other if bytes && !other.is_ascii() => return Err(()),
            other => {
                out.push('\\');
                other
            }
        };
        out.push(simple);
        Ok(())
    }

    fn hex_escape(&mut self, width: usize) -> Result<char, ()> {
        let digits = self.rest().get(..width).ok_or(())?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(());
        }
        let code = u32::from_str_radix(digits, 16).map_err(|_| ())?;
        self.pos += width;
        char::from_u32(code).ok_or(())
    }

    fn word(&mut self) -> ParseResult<Literal> {
        let word = self.take_while(|c| c.is_alphanumeric() || c == '_');
        match word {
            "None" => Ok(Literal::None),
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "set" => {
                self.expect('(')?;
                self.expect(')')?;
                Ok(Literal::Set(Vec::new()))
            }
            other => Err(LiteralError::NotALiteral(other.to_string())),
        }
    }
}

/// `_` may only sit between two digits.
fn separators_ok(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_'
            || (i > 0
                && i + 1 < bytes.len()
                && bytes[i - 1].is_ascii_alphanumeric()
                && bytes[i + 1].is_ascii_alphanumeric())
    })
}

fn int_literal(magnitude: i128, negative: bool, token: &str) -> ParseResult<Literal> {
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value)
        .map(Literal::Int)
        .map_err(|_| LiteralError::InvalidNumber(token.to_string()))
}

fn check_hashable(lit: &Literal) -> ParseResult<()> {
    match lit {
        Literal::List(_) => Err(LiteralError::Unhashable("list")),
        Literal::Dict(_) => Err(LiteralError::Unhashable("dict")),
        Literal::Set(_) => Err(LiteralError::Unhashable("set")),
        Literal::Tuple(items) => items.iter().try_for_each(check_hashable),
        _ => Ok(()),
    }
}

fn insert_entry(
    entries: &mut Vec<(Literal, Literal)>,
    key: Literal,
    value: Literal,
) -> ParseResult<()> {
    check_hashable(&key)?;
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
    Ok(())
}

fn insert_member(members: &mut Vec<Literal>, member: Literal) -> ParseResult<()> {
    check_hashable(&member)?;
    if !members.contains(&member) {
        members.push(member);
    }
    Ok(())
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Literal]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, chars: impl Iterator<Item = char> + Clone) -> fmt::Result {
    let quote = if chars.clone().any(|c| c == '\'') && !chars.clone().any(|c| c == '"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{quote}")?;
    for c in chars {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

/// Source-literal form: `None`, `True`, `'text'`, `(1,)`, `{'a': 1}`.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Str(s) => write_quoted(f, s.chars()),
            Literal::Bytes(b) => {
                f.write_str("b")?;
                write_quoted(f, b.iter().map(|&b| b as char))
            }
            Literal::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Literal::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Literal::Set(items) if items.is_empty() => f.write_str("set()"),
            Literal::Set(items) => {
                f.write_str("{")?;
                write_joined(f, items)?;
                f.write_str("}")
            }
            Literal::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::None => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(n) => Value::from(n),
            Literal::Float(x) => Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null),
            Literal::Str(s) => Value::String(s),
            Literal::Bytes(b) => Value::String(String::from_utf8_lossy(&b).into_owned()),
            Literal::List(items) | Literal::Tuple(items) | Literal::Set(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            Literal::Dict(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    let key = match k {
                        Literal::Str(s) => s,
                        other => other.to_string(),
                    };
                    map.insert(key, Value::from(v));
                }
                Value::Object(map)
            }
        }
    }
}
