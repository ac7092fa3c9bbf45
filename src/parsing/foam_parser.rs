use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::warn;

use crate::error::{FoamError, Result};
use crate::types::foam_value::{FoamDict, FoamValue};

/// Contents of the `FoamFile { ... }` block every solver dictionary starts with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FoamHeader {
    pub version: String,
    pub format: String,
    pub class: String,
    pub location: Option<String>,
    pub object: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFoamFile {
    pub header: Option<FoamHeader>,
    /// Every top-level entry except the header, in file order.
    pub values: FoamDict,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Word(String),
    Directive(String, String),
    Open(char),
    Close(char),
    Semicolon,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

// Raw value pieces collected between a keyword and its `;`.
#[derive(Debug, Clone)]
enum Item {
    Word(String),
    Paren(Vec<Item>),
    Bracket(Vec<String>),
    Block(FoamDict),
}

// Quoted strings are matched first so comment markers inside them survive.
fn comment_regex() -> &'static Regex {
    static COMMENTS: OnceLock<Regex> = OnceLock::new();
    COMMENTS.get_or_init(|| {
        Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"|/\*.*?\*/|//[^\n]*"#).unwrap()
    })
}

/// Removes `//` and `/* */` comments, keeping line breaks so error lines stay accurate.
fn strip_comments(content: &str) -> String {
    comment_regex()
        .replace_all(content, |caps: &Captures| {
            let matched = &caps[0];
            if matched.starts_with('"') {
                matched.to_string()
            } else {
                "\n".repeat(matched.matches('\n').count())
            }
        })
        .into_owned()
}

fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

fn tokenize(source_name: &str, content: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = content.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '{' | '(' | '[' => {
                tokens.push(Token { kind: TokenKind::Open(c), line });
                i += 1;
            }
            '}' | ')' | ']' => {
                tokens.push(Token { kind: TokenKind::Close(c), line });
                i += 1;
            }
            ';' => {
                tokens.push(Token { kind: TokenKind::Semicolon, line });
                i += 1;
            }
            '"' => {
                let start_line = line;
                let mut text = String::from('"');
                i += 1;
                let mut closed = false;
                while i < chars.len() {
                    let ch = chars[i];
                    text.push(ch);
                    i += 1;
                    if ch == '\n' {
                        line += 1;
                    } else if ch == '\\' && i < chars.len() {
                        text.push(chars[i]);
                        i += 1;
                    } else if ch == '"' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(FoamError::Parse {
                        source_name: source_name.to_string(),
                        line: start_line,
                        message: "unterminated string".to_string(),
                    });
                }
                tokens.push(Token { kind: TokenKind::Word(text), line: start_line });
            }
            '#' => {
                let mut name = String::new();
                i += 1;
                while i < chars.len() && chars[i].is_alphanumeric() {
                    name.push(chars[i]);
                    i += 1;
                }
                let mut rest = String::new();
                while i < chars.len() && chars[i] != '\n' {
                    rest.push(chars[i]);
                    i += 1;
                }
                let argument = rest.trim().trim_end_matches(';').trim();
                tokens.push(Token {
                    kind: TokenKind::Directive(name, unquote(argument)),
                    line,
                });
            }
            _ => {
                // Keywords such as div(phi,U) carry balanced parentheses.
                let mut word = String::new();
                let mut depth = 0usize;
                while i < chars.len() {
                    let ch = chars[i];
                    if ch.is_whitespace() || matches!(ch, '{' | '}' | '[' | ']' | ';' | '"') {
                        break;
                    }
                    if ch == '(' {
                        depth += 1;
                    } else if ch == ')' {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    word.push(ch);
                    i += 1;
                }
                tokens.push(Token { kind: TokenKind::Word(word), line });
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    source_name: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, line: usize, message: impl Into<String>) -> FoamError {
        FoamError::Parse {
            source_name: self.source_name.to_string(),
            line,
            message: message.into(),
        }
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Parses entries until EOF (top level) or the `}` closing a block opened at `opened_at`.
    fn parse_dict_body(&mut self, opened_at: Option<usize>) -> Result<FoamDict> {
        let mut body = FoamDict::new();
        loop {
            let Some(token) = self.next() else {
                return match opened_at {
                    Some(line) => Err(self.error(line, "unterminated block, missing '}'")),
                    None => Ok(body),
                };
            };
            match token.kind {
                TokenKind::Close('}') if opened_at.is_some() => return Ok(body),
                TokenKind::Close(c) => {
                    return Err(self.error(token.line, format!("unexpected '{}'", c)));
                }
                TokenKind::Semicolon => continue,
                TokenKind::Directive(name, argument) => {
                    body.insert(format!("#{}", name), FoamValue::Token(argument));
                }
                TokenKind::Open(c) => {
                    return Err(self.error(token.line, format!("expected a keyword, found '{}'", c)));
                }
                TokenKind::Word(key) => {
                    let value = match self.peek().map(|t| t.kind.clone()) {
                        Some(TokenKind::Open('{')) => {
                            let open = self.next().map_or(token.line, |t| t.line);
                            FoamValue::Dict(self.parse_dict_body(Some(open))?)
                        }
                        _ => self.parse_value(&key, token.line)?,
                    };
                    if body.contains_key(&key) {
                        warn!(source = self.source_name, key = %key, "duplicate keyword, keeping the last value");
                    }
                    body.insert(key, value);
                }
            }
        }
    }

    fn parse_value(&mut self, key: &str, key_line: usize) -> Result<FoamValue> {
        let mut items = Vec::new();
        loop {
            let Some(token) = self.next() else {
                return Err(self.error(self.last_line(), format!("missing ';' after '{}'", key)));
            };
            match token.kind {
                TokenKind::Semicolon => break,
                TokenKind::Word(word) => items.push(Item::Word(word)),
                TokenKind::Open(c) => items.push(self.parse_group(c, token.line)?),
                TokenKind::Close(c) => {
                    return Err(self.error(token.line, format!("unexpected '{}' in value of '{}'", c, key)));
                }
                TokenKind::Directive(name, _) => {
                    return Err(self.error(
                        token.line,
                        format!("directive #{} inside the value of '{}' (line {})", name, key, key_line),
                    ));
                }
            }
        }
        Ok(items_to_value(items))
    }

    fn parse_group(&mut self, open: char, line: usize) -> Result<Item> {
        match open {
            '{' => Ok(Item::Block(self.parse_dict_body(Some(line))?)),
            '[' => {
                let mut words = Vec::new();
                loop {
                    match self.next().map(|t| t.kind) {
                        Some(TokenKind::Word(word)) => words.push(word),
                        Some(TokenKind::Close(']')) => return Ok(Item::Bracket(words)),
                        _ => return Err(self.error(line, "unterminated '[' group")),
                    }
                }
            }
            _ => {
                let mut items = Vec::new();
                loop {
                    let Some(token) = self.next() else {
                        return Err(self.error(line, "unterminated list, missing ')'"));
                    };
                    match token.kind {
                        TokenKind::Close(')') => return Ok(Item::Paren(items)),
                        TokenKind::Close(c) => {
                            return Err(self.error(token.line, format!("unexpected '{}' inside list", c)));
                        }
                        TokenKind::Word(word) => items.push(Item::Word(word)),
                        TokenKind::Open(c) => items.push(self.parse_group(c, token.line)?),
                        TokenKind::Semicolon => continue,
                        TokenKind::Directive(name, _) => {
                            return Err(self.error(token.line, format!("directive #{} inside list", name)));
                        }
                    }
                }
            }
        }
    }
}

fn item_text(item: &Item) -> String {
    match item {
        Item::Word(word) => word.clone(),
        Item::Paren(items) => {
            let parts: Vec<String> = items.iter().map(item_text).collect();
            format!("({})", parts.join(" "))
        }
        Item::Bracket(words) => format!("[{}]", words.join(" ")),
        Item::Block(dict) => FoamValue::Dict(dict.clone()).inline_text(),
    }
}

fn item_to_value(item: Item) -> FoamValue {
    match item {
        Item::Word(word) => FoamValue::Token(word),
        Item::Paren(items) => FoamValue::List(items.into_iter().map(item_to_value).collect()),
        Item::Bracket(words) => FoamValue::Dimensions(words),
        Item::Block(dict) => FoamValue::Dict(dict),
    }
}

fn items_to_value(mut items: Vec<Item>) -> FoamValue {
    if items.len() == 1 {
        if let Some(item) = items.pop() {
            return item_to_value(item);
        }
    }
    let parts: Vec<String> = items.iter().map(item_text).collect();
    FoamValue::Token(parts.join(" "))
}

fn header_field(block: &FoamDict, key: &str) -> Option<String> {
    block.get(key).map(|v| unquote(&v.inline_text()))
}

/// Parses the text of a solver dictionary.
///
/// Unknown keywords are kept verbatim; only structural problems (unbalanced
/// blocks or lists, a value without its `;`) are rejected.
pub fn parse_foam_text(source_name: &str, content: &str) -> Result<ParsedFoamFile> {
    let stripped = strip_comments(content);
    let tokens = tokenize(source_name, &stripped)?;
    let mut parser = Parser { source_name, tokens, pos: 0 };
    let mut values = parser.parse_dict_body(None)?;

    let header = match values.shift_remove("FoamFile") {
        Some(FoamValue::Dict(block)) => Some(FoamHeader {
            version: header_field(&block, "version").unwrap_or_else(|| "2.0".to_string()),
            format: header_field(&block, "format").unwrap_or_else(|| "ascii".to_string()),
            class: header_field(&block, "class").unwrap_or_default(),
            location: header_field(&block, "location"),
            object: header_field(&block, "object").unwrap_or_default(),
        }),
        Some(_) => {
            return Err(FoamError::Parse {
                source_name: source_name.to_string(),
                line: 1,
                message: "FoamFile header must be a block".to_string(),
            })
        }
        None => None,
    };

    Ok(ParsedFoamFile { header, values })
}

/// Parses the text of a single value, as it would appear between a key and its `;`.
pub fn parse_foam_value(source_name: &str, text: &str) -> Result<FoamValue> {
    let mut parser = Parser {
        source_name,
        tokens: tokenize(source_name, &strip_comments(text))?,
        pos: 0,
    };
    parser.tokens.push(Token { kind: TokenKind::Semicolon, line: parser.last_line() });
    let value = parser.parse_value("value", 1)?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error(parser.last_line(), "unexpected text after the value"));
    }
    Ok(value)
}
