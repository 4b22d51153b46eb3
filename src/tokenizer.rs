//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about grammar beyond recognising keywords,
//! punctuation, names, numbers and string literals. Two-character
//! punctuators are matched before single-character ones to avoid ambiguity.

use std::fmt;

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Name,
  Num,
  Str,
  Semi,
  Comma,
  LParen,
  RParen,
  LBrace,
  RBrace,
  Assign,
  Add,
  Sub,
  Mul,
  Lt,
  Le,
  Ne,
  EqEq,
  Ge,
  Gt,
  Int,
  If,
  Return,
  While,
  Eof,
}

impl TokenKind {
  /// Keyword kind for `text`, if it is one.
  fn keyword(text: &str) -> Option<Self> {
    match text {
      "int" => Some(Self::Int),
      "if" => Some(Self::If),
      "return" => Some(Self::Return),
      "while" => Some(Self::While),
      _ => None,
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      Self::Name => "name",
      Self::Num => "number",
      Self::Str => "string",
      Self::Semi => "\";\"",
      Self::Comma => "\",\"",
      Self::LParen => "\"(\"",
      Self::RParen => "\")\"",
      Self::LBrace => "\"{\"",
      Self::RBrace => "\"}\"",
      Self::Assign => "\"=\"",
      Self::Add => "\"+\"",
      Self::Sub => "\"-\"",
      Self::Mul => "\"*\"",
      Self::Lt => "\"<\"",
      Self::Le => "\"<=\"",
      Self::Ne => "\"!=\"",
      Self::EqEq => "\"==\"",
      Self::Ge => "\">=\"",
      Self::Gt => "\">\"",
      Self::Int => "\"int\"",
      Self::If => "\"if\"",
      Self::Return => "\"return\"",
      Self::While => "\"while\"",
      Self::Eof => "EOF",
    };
    f.write_str(text)
  }
}

/// A lexeme plus the position of its first character (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub lexeme: String,
  pub value: Option<i64>,
  pub line: usize,
  pub column: usize,
}

impl Token {
  pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
    Self {
      kind,
      lexeme: lexeme.into(),
      value: None,
      line,
      column,
    }
  }

  pub fn number(value: i64, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
    Self {
      value: Some(value),
      ..Self::new(TokenKind::Num, lexeme, line, column)
    }
  }
}

const TWO_CHAR_PUNCTUATORS: [(&str, TokenKind); 4] = [
  ("<=", TokenKind::Le),
  ("==", TokenKind::EqEq),
  ("!=", TokenKind::Ne),
  (">=", TokenKind::Ge),
];

fn single_char_punctuator(c: u8) -> Option<TokenKind> {
  let kind = match c {
    b'+' => TokenKind::Add,
    b'-' => TokenKind::Sub,
    b'*' => TokenKind::Mul,
    b'=' => TokenKind::Assign,
    b'<' => TokenKind::Lt,
    b'>' => TokenKind::Gt,
    b'(' => TokenKind::LParen,
    b')' => TokenKind::RParen,
    b'{' => TokenKind::LBrace,
    b'}' => TokenKind::RBrace,
    b';' => TokenKind::Semi,
    b',' => TokenKind::Comma,
    _ => return None,
  };
  Some(kind)
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;
  let mut line = 1;
  let mut line_start = 0;

  while i < bytes.len() {
    let c = bytes[i];
    let column = i - line_start + 1;

    if (0x01..=0x20).contains(&c) {
      i += 1;
      if c == b'\n' {
        line += 1;
        line_start = i;
      }
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      // Literals must fit the 32-bit target word.
      let value = text
        .parse::<i32>()
        .map_err(|err| CompileError::at(input, line, column, format!("invalid number: {err}")))?;
      tokens.push(Token::number(i64::from(value), text, line, column));
      continue;
    }

    if c.is_ascii_alphabetic() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
      }
      let text = &input[start..i];
      let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Name);
      tokens.push(Token::new(kind, text, line, column));
      continue;
    }

    if c == b'"' {
      let start = i + 1;
      let Some(len) = input[start..].find(['"', '\n']).filter(|&len| bytes[start + len] == b'"') else {
        return Err(CompileError::at(input, line, column, "unterminated string literal"));
      };
      tokens.push(Token::new(TokenKind::Str, &input[start..start + len], line, column));
      i = start + len + 1;
      continue;
    }

    if let Some((op, kind)) = TWO_CHAR_PUNCTUATORS
      .into_iter()
      .find(|(op, _)| input[i..].starts_with(op))
    {
      tokens.push(Token::new(kind, op, line, column));
      i += op.len();
      continue;
    }

    if let Some(kind) = single_char_punctuator(c) {
      tokens.push(Token::new(kind, &input[i..i + 1], line, column));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::at(
      input,
      line,
      column,
      format!("unrecognized character '{invalid_char}'"),
    ));
  }

  let column = bytes.len() - line_start + 1;
  tokens.push(Token::new(TokenKind::Eof, "", line, column));
  Ok(tokens)
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    _ => token.lexeme.clone(),
  }
}

/// One row per token: index, kind, lexeme, value and position.
pub fn dump_tokens(tokens: &[Token]) -> String {
  let mut out = String::new();
  for (index, token) in tokens.iter().enumerate() {
    let value = token.value.map(|v| v.to_string()).unwrap_or_default();
    out.push_str(&format!(
      "[{index:3}] {:>10} {:>12} {value:>6} ({}, {})\n",
      token.kind.to_string(),
      describe_token(token),
      token.line,
      token.column
    ));
  }
  out
}
