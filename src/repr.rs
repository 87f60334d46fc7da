//! Circuit representation strings.
//!
//! ```text
//! circuit  := series EOF
//! series   := parallel ( '+' parallel )*
//! parallel := factor ( '|' factor )*
//! factor   := NAME | '(' series ')'
//! NAME     := [A-Za-z_][A-Za-z0-9_]*
//! ```
//!
//! `|` binds tighter than `+`: `R0+R1|C1` is `R0` in series with `R1 ∥ C1`.
//! Whitespace is ignored. Every name is a leaf standing for exactly one
//! element and may appear only once. Parentheses nest at most
//! [`MAX_DEPTH`] levels.

use std::collections::HashMap;
use std::fmt::Display;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Plus,
    Pipe,
    LParen,
    RParen,
    Eof,
}

/// A token and the 1-based column it starts at
#[derive(Debug, Clone)]
struct SpannedToken {
    token: Token,
    column: usize,
}

fn tokenize(input: &str) -> Result<Vec<SpannedToken>> {
    let mut out = vec![];
    let mut chars = input.chars().peekable();
    let mut column = 1;

    while let Some(c) = chars.next() {
        let start = column;
        column += 1;
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '|' => Token::Pipe,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if is_name_start(c) => {
                let mut name = String::from(c);
                while let Some(&c) = chars.peek() {
                    if !is_name_char(c) {break;}
                    name.push(c);
                    chars.next();
                    column += 1;
                }
                Token::Name(name)
            }
            c => return Err(Error::repr(start, format!("unexpected character '{c}'"))),
        };
        out.push(SpannedToken { token, column: start });
    }

    out.push(SpannedToken { token: Token::Eof, column });
    Ok(out)
}


fn is_name_start(c: char) -> bool {c.is_ascii_alphabetic() || c == '_'}
fn is_name_char(c: char) -> bool {c.is_ascii_alphanumeric() || c == '_'}

/// Whether `name` can be referenced from a representation string
pub fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}


/// A leaf of a parsed representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub name: String,
    /// 1-based column of the name in the source string
    pub position: usize,
}

/// A series/parallel composition tree over leaves of type `L`.
///
/// Groups always hold at least two children; the child order is the
/// source order and is the order impedances are summed in.
#[derive(Debug, Clone, PartialEq)]
pub enum Topology<L> {
    Leaf(L),
    Series(Vec<Topology<L>>),
    Parallel(Vec<Topology<L>>),
}

impl<L> Topology<L> {
    /// Leaves in left-to-right order
    pub fn leaves(&self) -> Vec<&L> {
        let mut out = vec![];
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a L>) {
        match self {
            Topology::Leaf(l) => out.push(l),
            Topology::Series(cs) | Topology::Parallel(cs) => {
                for c in cs {c.collect_leaves(out);}
            }
        }
    }

    /// Rebuild the same shape with every leaf mapped, stopping at the first error
    pub fn try_map<M, E>(&self, f: &mut impl FnMut(&L) -> std::result::Result<M, E>) -> std::result::Result<Topology<M>, E> {
        Ok(match self {
            Topology::Leaf(l) => Topology::Leaf(f(l)?),
            Topology::Series(cs) => Topology::Series(cs.iter().map(|c| c.try_map(&mut *f)).collect::<std::result::Result<_, _>>()?),
            Topology::Parallel(cs) => Topology::Parallel(cs.iter().map(|c| c.try_map(&mut *f)).collect::<std::result::Result<_, _>>()?),
        })
    }
}

impl<L: Display> Display for Topology<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::Leaf(l) => write!(f, "{l}"),
            Topology::Series(cs) => {
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {write!(f, "+")?;}
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Topology::Parallel(cs) => {
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {write!(f, "|")?;}
                    match c {
                        Topology::Series(_) => write!(f, "({c})")?,
                        _ => write!(f, "{c}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl Display for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}


/// Deepest parenthesis nesting accepted; the parser recurses once per level
pub const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &SpannedToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> SpannedToken {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {self.pos += 1;}
        t
    }

    fn series(&mut self) -> Result<Topology<Leaf>> {
        let mut items = vec![self.parallel()?];
        while self.peek().token == Token::Plus {
            self.advance();
            items.push(self.parallel()?);
        }
        Ok(group(items, true))
    }

    fn parallel(&mut self) -> Result<Topology<Leaf>> {
        let mut items = vec![self.factor()?];
        while self.peek().token == Token::Pipe {
            self.advance();
            items.push(self.factor()?);
        }
        Ok(group(items, false))
    }

    fn factor(&mut self) -> Result<Topology<Leaf>> {
        let SpannedToken { token, column } = self.advance();
        match token {
            Token::Name(name) => Ok(Topology::Leaf(Leaf { name, position: column })),
            Token::LParen => {
                if self.depth >= MAX_DEPTH {
                    return Err(Error::repr(column, format!("nesting deeper than {MAX_DEPTH} levels")));
                }
                self.depth += 1;
                let inner = self.series()?;
                self.depth -= 1;
                let close = self.advance();
                if close.token != Token::RParen {
                    return Err(Error::repr(close.column, format!("expected ')' to close '(' at column {column}")));
                }
                Ok(inner)
            }
            Token::Eof => Err(Error::repr(column, "unexpected end of representation")),
            t => Err(Error::repr(column, format!("expected element name or '(', found {}", describe(&t)))),
        }
    }
}

/// Collapse single-child groups and flatten same-kind nesting, so `(R1+R2)+R3`
/// and `R1+R2+R3` produce the same tree.
fn group(mut items: Vec<Topology<Leaf>>, series: bool) -> Topology<Leaf> {
    if items.len() == 1 {
        if let Some(item) = items.pop() {return item;}
    }
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Topology::Series(cs) if series => flat.extend(cs),
            Topology::Parallel(cs) if !series => flat.extend(cs),
            other => flat.push(other),
        }
    }
    if series {Topology::Series(flat)} else {Topology::Parallel(flat)}
}

fn describe(t: &Token) -> String {
    match t {
        Token::Name(n) => format!("name '{n}'"),
        Token::Plus => "'+'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Eof => "end of representation".to_string(),
    }
}


/// Parse a representation string into a topology tree.
///
/// Fails with [`Error::InvalidRepresentation`] on syntax errors and on
/// a name used more than once.
pub fn parse(input: &str) -> Result<Topology<Leaf>> {
    let mut parser = Parser { tokens: tokenize(input)?, pos: 0, depth: 0 };
    let tree = parser.series()?;

    let rest = parser.advance();
    if rest.token != Token::Eof {
        return Err(Error::repr(rest.column, format!("unexpected {} after complete expression", describe(&rest.token))));
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for leaf in tree.leaves() {
        if let Some(first) = seen.insert(&leaf.name, leaf.position) {
            return Err(Error::repr(leaf.position, format!("'{}' already used at column {first}", leaf.name)));
        }
    }

    Ok(tree)
}
