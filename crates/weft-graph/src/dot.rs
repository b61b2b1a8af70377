//! DOT-subset parsing and canonical rendering.
//!
//! The accepted language is a small slice of DOT:
//! - one top-level `digraph`, optionally `strict`, optionally named;
//! - node statements `id [attrs]` and edge statements `a -> b [attrs]`,
//!   separated by `;` (the separator is optional per statement);
//! - identifiers are `[A-Za-z_][A-Za-z0-9_]*` or double-quoted strings;
//! - `//` and `/* */` comments are stripped before parsing;
//! - recognized attributes: `label` on edges, `data` on nodes (parsed as
//!   JSON when it looks like JSON, kept as an opaque string otherwise).
//!   Unknown attributes are ignored.

use weft_types::{GuardLabel, Payload, StateName};

use crate::error::GraphError;
use crate::machine::{Machine, MachineBuilder};

/// Parses a DOT-subset description into a validated [`Machine`].
pub(crate) fn parse(source: &str) -> Result<Machine, GraphError> {
    let stripped = strip_comments(source);
    if stripped.trim().is_empty() {
        return Err(GraphError::EmptyGraph);
    }
    check_quote_balance(&stripped)?;

    let tokens = tokenize(&stripped)?;
    Parser::new(tokens).parse_graph()
}

/// Renders a machine in canonical form.
///
/// Statements are emitted one per line, `;`-terminated: first every state
/// in declaration order (with its `data` attribute when present), then
/// every transition in declaration order (with its `label` when guarded).
pub(crate) fn render(machine: &Machine) -> String {
    let mut out = String::from("strict digraph {\n");

    for state in machine.states() {
        out.push_str("    ");
        out.push_str(&render_id(state.as_str()));
        if let Some(data) = machine.state_data(state) {
            out.push_str(" [data=");
            out.push_str(&render_data(data));
            out.push(']');
        }
        out.push_str(";\n");
    }

    for transition in machine.transitions() {
        out.push_str("    ");
        out.push_str(&render_id(transition.source.as_str()));
        out.push_str(" -> ");
        out.push_str(&render_id(transition.target.as_str()));
        if !transition.guard.as_str().is_empty() {
            out.push_str(" [label=");
            out.push_str(&quote(transition.guard.as_str()));
            out.push(']');
        }
        out.push_str(";\n");
    }

    out.push_str("}\n");
    out
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Quoted(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Equals,
    Arrow,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

/// Removes `// ...` and `/* ... */` comments, preserving quoted strings
/// and line structure (so diagnostics keep meaningful line numbers).
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_quote = false;

    while let Some(c) = chars.next() {
        if in_quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_quote = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Rejects descriptions with an unterminated double-quoted string.
///
/// Escapes are consumed pairwise, so a `\\` before a `"` leaves the quote
/// as a real delimiter (a lone look-behind would misread it).
fn check_quote_balance(source: &str) -> Result<(), GraphError> {
    let mut chars = source.chars();
    let mut in_quote = false;
    while let Some(c) = chars.next() {
        if in_quote {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_quote = false,
                _ => {}
            }
        } else if c == '"' {
            in_quote = true;
        }
    }
    if in_quote {
        Err(GraphError::UnbalancedQuote)
    } else {
        Ok(())
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, GraphError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '{' => {
                chars.next();
                tokens.push(Token {
                    tok: Tok::LBrace,
                    line,
                });
            }
            '}' => {
                chars.next();
                tokens.push(Token {
                    tok: Tok::RBrace,
                    line,
                });
            }
            '[' => {
                chars.next();
                tokens.push(Token {
                    tok: Tok::LBracket,
                    line,
                });
            }
            ']' => {
                chars.next();
                tokens.push(Token {
                    tok: Tok::RBracket,
                    line,
                });
            }
            ';' => {
                chars.next();
                tokens.push(Token {
                    tok: Tok::Semi,
                    line,
                });
            }
            ',' => {
                chars.next();
                tokens.push(Token {
                    tok: Tok::Comma,
                    line,
                });
            }
            '=' => {
                chars.next();
                tokens.push(Token {
                    tok: Tok::Equals,
                    line,
                });
            }
            '-' => {
                chars.next();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token {
                        tok: Tok::Arrow,
                        line,
                    });
                } else {
                    return Err(GraphError::Syntax {
                        line,
                        message: "expected '->'".to_string(),
                    });
                }
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                if escaped == '\n' {
                                    line += 1;
                                }
                                value.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\n' => {
                            line += 1;
                            value.push(c);
                        }
                        _ => value.push(c),
                    }
                }
                if !closed {
                    return Err(GraphError::UnbalancedQuote);
                }
                tokens.push(Token {
                    tok: Tok::Quoted(value),
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    tok: Tok::Ident(ident),
                    line,
                });
            }
            other => {
                return Err(GraphError::Syntax {
                    line,
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(1, |t| t.line)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        self.pos += 1;
        tok
    }

    fn syntax(&self, message: impl Into<String>) -> GraphError {
        GraphError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    /// Consumes an identifier or quoted string.
    fn name(&mut self, what: &str) -> Result<String, GraphError> {
        match self.bump() {
            Some(Tok::Ident(s) | Tok::Quoted(s)) => Ok(s),
            _ => Err(self.syntax(format!("expected {what}"))),
        }
    }

    fn parse_graph(mut self) -> Result<Machine, GraphError> {
        // Optional `strict` keyword.
        if matches!(self.peek(), Some(Tok::Ident(kw)) if kw == "strict") {
            self.bump();
        }

        match self.bump() {
            Some(Tok::Ident(kw)) if kw == "digraph" => {}
            _ => return Err(self.syntax("expected 'digraph'")),
        }

        // Optional graph name.
        if matches!(self.peek(), Some(Tok::Ident(_) | Tok::Quoted(_))) {
            self.bump();
        }

        if self.bump() != Some(Tok::LBrace) {
            return Err(self.syntax("expected '{'"));
        }

        let mut builder = Machine::builder();

        loop {
            match self.peek() {
                Some(Tok::RBrace) => {
                    self.bump();
                    break;
                }
                Some(Tok::Semi) => {
                    self.bump();
                }
                Some(Tok::Ident(_) | Tok::Quoted(_)) => {
                    builder = self.parse_statement(builder)?;
                }
                Some(_) => return Err(self.syntax("expected statement or '}'")),
                None => return Err(self.syntax("unexpected end of graph description")),
            }
        }

        if self.peek().is_some() {
            return Err(self.syntax("unexpected content after closing '}'"));
        }

        builder.build()
    }

    /// One node or edge statement, starting at its leading identifier.
    fn parse_statement(&mut self, mut builder: MachineBuilder) -> Result<MachineBuilder, GraphError> {
        let first = self.name("state name")?;
        if first.is_empty() {
            return Err(GraphError::EmptyStateName);
        }

        if self.peek() == Some(&Tok::Arrow) {
            self.bump();
            let target = self.name("transition target")?;
            if target.is_empty() {
                return Err(GraphError::EmptyStateName);
            }
            let attrs = self.parse_attributes()?;
            let guard = attrs
                .into_iter()
                .find(|(key, _)| key == "label")
                .map_or_else(GuardLabel::unconditional, |(_, value)| {
                    GuardLabel::new(value)
                });
            builder = builder.guarded(
                StateName::new(first),
                StateName::new(target),
                guard,
            );
        } else {
            let attrs = self.parse_attributes()?;
            let name = StateName::new(first);
            builder = builder.state(name.clone());
            if let Some((_, value)) = attrs.into_iter().find(|(key, _)| key == "data") {
                builder = builder.state_data(name, parse_data_value(&value));
            }
        }

        // The statement separator is optional before '}' or the next
        // statement; consume one when present.
        if self.peek() == Some(&Tok::Semi) {
            self.bump();
        }

        Ok(builder)
    }

    /// Optional bracketed attribute list; returns `(key, value)` pairs.
    fn parse_attributes(&mut self) -> Result<Vec<(String, String)>, GraphError> {
        if self.peek() != Some(&Tok::LBracket) {
            return Ok(Vec::new());
        }
        self.bump();

        let mut attrs = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::RBracket) => {
                    self.bump();
                    break;
                }
                Some(Tok::Comma) => {
                    self.bump();
                }
                Some(Tok::Ident(_) | Tok::Quoted(_)) => {
                    let key = self.name("attribute name")?;
                    if self.bump() != Some(Tok::Equals) {
                        return Err(self.syntax("expected '=' in attribute"));
                    }
                    let value = self.name("attribute value")?;
                    attrs.push((key, value));
                }
                _ => return Err(self.syntax("expected attribute or ']'")),
            }
        }
        Ok(attrs)
    }
}

/// Interprets a `data` attribute: JSON when it parses (after normalizing
/// the single-quoted object notation the original descriptions use),
/// an opaque string otherwise.
fn parse_data_value(raw: &str) -> Payload {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        let normalized = trimmed.replace('\'', "\"");
        if let Ok(value) = serde_json::from_str::<Payload>(&normalized) {
            return value;
        }
    }
    Payload::String(raw.to_string())
}

// ============================================================================
// Rendering helpers
// ============================================================================

fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn render_id(s: &str) -> String {
    if is_plain_ident(s) {
        s.to_string()
    } else {
        quote(s)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn render_data(data: &Payload) -> String {
    match data {
        Payload::String(s) => quote(s),
        other => quote(&other.to_string()),
    }
}
