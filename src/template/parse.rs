//! Template lexing and parsing.
//!
//! Single pass over the source: literal text is copied into `Node::Text`,
//! each `{{ ... }}` action is parsed into a `Pipeline`. Function arity is
//! checked here so a malformed route template is rejected at config load.

use serde_json::Number;

use super::funcs::Func;
use super::TemplateError;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const RIGHT_TRIM_DELIM: &str = "-}}";

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
}

#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone)]
pub(crate) enum Command {
    Operand(Operand),
    Call { func: Func, args: Vec<Operand> },
}

#[derive(Debug, Clone)]
pub(crate) enum Operand {
    Dot,
    Field(Vec<String>),
    Str(String),
    Number(Number),
    Bool(bool),
    Nil,
    Sub(Box<Pipeline>),
}

/// A word inside a command, before we know whether it is a call.
enum Word {
    Func(Func),
    Operand(Operand),
}

pub(crate) fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    Parser {
        src,
        pos: 0,
        nodes: Vec::new(),
        trim_next_text: false,
    }
    .run()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    nodes: Vec<Node>,
    trim_next_text: bool,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Vec<Node>, TemplateError> {
        let src = self.src;
        loop {
            let rest = &src[self.pos..];
            let Some(idx) = rest.find(LEFT_DELIM) else {
                self.push_text(rest, false);
                break;
            };
            self.pos += idx + LEFT_DELIM.len();
            let trim_left = self.eat_left_trim();
            self.push_text(&rest[..idx], trim_left);

            self.skip_ws();
            if self.rest().starts_with("/*") {
                self.skip_comment()?;
                continue;
            }

            let pipeline = self.parse_pipeline(false)?;
            self.expect_close()?;
            self.nodes.push(Node::Action(pipeline));
        }
        Ok(self.nodes)
    }

    fn rest(&self) -> &'a str {
        let src: &'a str = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn push_text(&mut self, text: &str, trim_end: bool) {
        let mut text = text;
        if std::mem::take(&mut self.trim_next_text) {
            text = text.trim_start();
        }
        if trim_end {
            text = text.trim_end();
        }
        if !text.is_empty() {
            self.nodes.push(Node::Text(text.to_string()));
        }
    }

    /// `{{-` only trims when followed by whitespace, so `{{-3}}` stays a number.
    fn eat_left_trim(&mut self) -> bool {
        let mut chars = self.rest().chars();
        if chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn skip_comment(&mut self) -> Result<(), TemplateError> {
        let start = self.pos;
        let end = self
            .rest()
            .find("*/")
            .ok_or_else(|| TemplateError::parse(start, "unclosed comment"))?;
        self.pos += end + 2;
        self.expect_close()
    }

    fn expect_close(&mut self) -> Result<(), TemplateError> {
        self.skip_ws();
        let rest = self.rest();
        if self.at_right_trim() {
            self.pos += RIGHT_TRIM_DELIM.len();
            self.trim_next_text = true;
            Ok(())
        } else if rest.starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
            Ok(())
        } else if rest.is_empty() {
            Err(TemplateError::parse(self.pos, "unclosed action"))
        } else {
            Err(TemplateError::parse(self.pos, format!("unexpected {:?} in action", first_char(rest))))
        }
    }

    fn at_command_end(&self) -> bool {
        let rest = self.rest();
        rest.starts_with('|')
            || rest.starts_with(')')
            || rest.starts_with(RIGHT_DELIM)
            || self.at_right_trim()
    }

    /// `-}}` only trims after whitespace, so `{{3-}}` is a syntax error.
    fn at_right_trim(&self) -> bool {
        self.rest().starts_with(RIGHT_TRIM_DELIM)
            && self.src[..self.pos].chars().next_back().is_some_and(char::is_whitespace)
    }

    fn parse_pipeline(&mut self, in_parens: bool) -> Result<Pipeline, TemplateError> {
        let mut commands = Vec::new();
        loop {
            let piped = !commands.is_empty();
            commands.push(self.parse_command(piped)?);
            self.skip_ws();
            if self.peek() == Some('|') {
                self.pos += 1;
                continue;
            }
            break;
        }

        if in_parens {
            if self.peek() != Some(')') {
                return Err(TemplateError::parse(self.pos, "unclosed left paren"));
            }
            self.pos += 1;
        }
        Ok(Pipeline { commands })
    }

    fn parse_command(&mut self, piped: bool) -> Result<Command, TemplateError> {
        let start = self.pos;
        let mut words = Vec::new();
        loop {
            self.skip_ws();
            if self.rest().is_empty() {
                return Err(TemplateError::parse(self.pos, "unclosed action"));
            }
            if self.at_command_end() {
                break;
            }
            words.push(self.parse_word()?);
        }

        let mut words = words.into_iter();
        match words.next() {
            None => Err(TemplateError::parse(start, "missing value for command")),
            Some(Word::Operand(op)) => {
                if words.next().is_some() || piped {
                    return Err(TemplateError::parse(start, "can't give argument to non-function"));
                }
                Ok(Command::Operand(op))
            }
            Some(Word::Func(func)) => {
                let mut args = Vec::new();
                for word in words {
                    match word {
                        Word::Operand(op) => args.push(op),
                        Word::Func(f) => {
                            return Err(TemplateError::parse(
                                start,
                                format!("function {} used as argument; wrap it in parentheses", f.name()),
                            ))
                        }
                    }
                }
                let argc = args.len() + usize::from(piped);
                if !func.accepts(argc) {
                    return Err(TemplateError::parse(
                        start,
                        format!("wrong number of args for {}: got {}", func.name(), argc),
                    ));
                }
                Ok(Command::Call { func, args })
            }
        }
    }

    fn parse_word(&mut self) -> Result<Word, TemplateError> {
        let start = self.pos;
        let rest = self.rest();
        let mut chars = rest.chars();
        let c = chars.next().ok_or_else(|| TemplateError::parse(start, "unclosed action"))?;
        let next = chars.next();

        match c {
            '(' => {
                self.pos += 1;
                let pipeline = self.parse_pipeline(true)?;
                Ok(Word::Operand(Operand::Sub(Box::new(pipeline))))
            }
            '.' if next.is_some_and(is_ident_char) => Ok(Word::Operand(Operand::Field(self.parse_field_chain()?))),
            '.' => {
                self.pos += 1;
                Ok(Word::Operand(Operand::Dot))
            }
            '"' => Ok(Word::Operand(Operand::Str(self.parse_quoted()?))),
            '`' => Ok(Word::Operand(Operand::Str(self.parse_raw()?))),
            c if c.is_ascii_digit() => Ok(Word::Operand(Operand::Number(self.parse_number()?))),
            '-' | '+' if next.is_some_and(|n| n.is_ascii_digit()) => {
                Ok(Word::Operand(Operand::Number(self.parse_number()?)))
            }
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.take_ident();
                match ident {
                    "true" => Ok(Word::Operand(Operand::Bool(true))),
                    "false" => Ok(Word::Operand(Operand::Bool(false))),
                    "nil" => Ok(Word::Operand(Operand::Nil)),
                    name => Func::lookup(name)
                        .map(Word::Func)
                        .ok_or_else(|| TemplateError::parse(start, format!("function {name:?} not defined"))),
                }
            }
            other => Err(TemplateError::parse(start, format!("unexpected {other:?} in command"))),
        }
    }

    fn take_ident(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_ident_char(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn parse_field_chain(&mut self) -> Result<Vec<String>, TemplateError> {
        let mut path = Vec::new();
        while self.peek() == Some('.') {
            self.pos += 1;
            let ident = self.take_ident();
            if ident.is_empty() {
                return Err(TemplateError::parse(self.pos, "bad field name"));
            }
            path.push(ident.to_string());
        }
        Ok(path)
    }

    /// Double-quoted string with Go escapes: `\a \b \f \n \r \t \v \\ \"`,
    /// `\xHH`, `\ooo`, `\uHHHH` and `\UHHHHHHHH`. Byte escapes must add up
    /// to valid UTF-8.
    fn parse_quoted(&mut self) -> Result<String, TemplateError> {
        let start = self.pos;
        let unterminated = || TemplateError::parse(start, "unterminated quoted string");
        let mut out = Vec::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return String::from_utf8(out)
                        .map_err(|_| TemplateError::parse(start, "invalid UTF-8 in quoted string"));
                }
                '\\' => {
                    let (_, esc) = chars.next().ok_or_else(unterminated)?;
                    let bad_escape = || TemplateError::parse(start, format!("invalid escape sequence \\{esc}"));
                    match esc {
                        'a' => out.push(0x07),
                        'b' => out.push(0x08),
                        'f' => out.push(0x0c),
                        'n' => out.push(b'\n'),
                        'r' => out.push(b'\r'),
                        't' => out.push(b'\t'),
                        'v' => out.push(0x0b),
                        '\\' | '"' => out.push(esc as u8),
                        'x' => {
                            let byte = take_digits(&mut chars, 2, 16).ok_or_else(bad_escape)?;
                            out.push(byte as u8);
                        }
                        '0'..='7' => {
                            let high = esc.to_digit(8).unwrap_or_default();
                            let low = take_digits(&mut chars, 2, 8).ok_or_else(bad_escape)?;
                            let byte = u8::try_from(high * 64 + low).map_err(|_| bad_escape())?;
                            out.push(byte);
                        }
                        'u' | 'U' => {
                            let width = if esc == 'u' { 4 } else { 8 };
                            let ch = take_digits(&mut chars, width, 16)
                                .and_then(char::from_u32)
                                .ok_or_else(bad_escape)?;
                            out.extend_from_slice(ch.encode_utf8(&mut [0; 4]).as_bytes());
                        }
                        _ => return Err(bad_escape()),
                    }
                }
                '\n' => break,
                c => out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
            }
        }
        Err(unterminated())
    }

    fn parse_raw(&mut self) -> Result<String, TemplateError> {
        let start = self.pos;
        let body = &self.rest()[1..];
        let end = body
            .find('`')
            .ok_or_else(|| TemplateError::parse(start, "unterminated raw quoted string"))?;
        self.pos += end + 2;
        Ok(body[..end].to_string())
    }

    fn parse_number(&mut self) -> Result<Number, TemplateError> {
        let start = self.pos;
        let rest = self.rest();
        let len = rest
            .char_indices()
            .skip(1)
            .find(|&(i, c)| {
                let prev = rest.as_bytes()[i - 1];
                !(c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || ((c == '-' || c == '+') && (prev == b'e' || prev == b'E')))
            })
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let literal = &rest[..len];
        self.pos += len;

        if let Ok(n) = literal.parse::<i64>() {
            return Ok(Number::from(n));
        }
        literal
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .ok_or_else(|| TemplateError::parse(start, format!("bad number syntax: {literal:?}")))
    }
}

/// Read exactly `count` digits in `radix` from an escape sequence.
fn take_digits(chars: &mut impl Iterator<Item = (usize, char)>, count: usize, radix: u32) -> Option<u32> {
    (0..count).try_fold(0u32, |acc, _| {
        let (_, c) = chars.next()?;
        Some(acc * radix + c.to_digit(radix)?)
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn first_char(s: &str) -> char {
    s.chars().next().unwrap_or_default()
}
