//! Shared error utilities used across the compilation pipeline.
//!
//! Every stage returns a `CompileResult`; the first failure stops the whole
//! compilation. Lexical diagnostics point at the offending character with a
//! caret, the rest name the construct and its `line:column`.

use std::io;
use std::path::PathBuf;

use snafu::Snafu;

use crate::tokenizer::TokenKind;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{source_line}\n{marker} {message} at ({line}, {column})"))]
  Lex {
    source_line: String,
    marker: String,
    message: String,
    line: usize,
    column: usize,
  },

  #[snafu(display(
    "syntax error in {rule}: found {found} \"{lexeme}\" but expecting {} at ({line}, {column})",
    expected_list(expected)
  ))]
  Syntax {
    rule: &'static str,
    expected: Vec<TokenKind>,
    found: TokenKind,
    lexeme: String,
    line: usize,
    column: usize,
  },

  #[snafu(display("cannot find \"{name}\" in function \"{function}\" at ({line}, {column})"))]
  UnresolvedSymbol {
    function: String,
    name: String,
    line: usize,
    column: usize,
  },

  #[snafu(display("cannot find function \"{name}\" at ({line}, {column})"))]
  UnknownFunction {
    name: String,
    line: usize,
    column: usize,
  },

  #[snafu(display("function \"{name}\" is defined twice at ({line}, {column})"))]
  DuplicateFunction {
    name: String,
    line: usize,
    column: usize,
  },

  #[snafu(display(
    "\"{name}\" is declared twice in function \"{function}\" at ({line}, {column})"
  ))]
  DuplicateSymbol {
    function: String,
    name: String,
    line: usize,
    column: usize,
  },

  #[snafu(display("cannot read input {}: {source}", path.display()))]
  UnreadableInput { path: PathBuf, source: io::Error },

  #[snafu(display("cannot write output {}: {source}", path.display()))]
  WriteOutput { path: PathBuf, source: io::Error },
}

impl CompileError {
  /// Construct a lexical error anchored at a 1-based `line`/`column` of `source`.
  pub fn at(source: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
    let text = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
    let source_line = format!("'{text}'");
    // `column` counts bytes; the caret has to count characters.
    let safe_loc = column.saturating_sub(1).min(text.len());
    let char_offset = text.get(..safe_loc).map_or(safe_loc, |head| head.chars().count());
    let marker = format!("{}^", " ".repeat(char_offset + 1)); // account for opening quote
    Self::Lex {
      source_line,
      marker,
      message: message.into(),
      line,
      column,
    }
  }
}

fn expected_list(kinds: &[TokenKind]) -> String {
  let names: Vec<String> = kinds.iter().map(|kind| kind.to_string()).collect();
  format!("{{{}}}", names.join(", "))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caret_counts_characters() {
    // '%' starts at byte 10 but is the ninth character.
    let err = CompileError::at("x = \"\u{e9}\" % 1;", 1, 10, "unrecognized character '%'");
    match err {
      CompileError::Lex {
        source_line, marker, ..
      } => {
        assert_eq!(source_line, "'x = \"\u{e9}\" % 1;'");
        assert_eq!(marker, format!("{}^", " ".repeat(9)));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn caret_clamps_to_line_end() {
    let err = CompileError::at("ab\ncd", 2, 40, "unterminated string literal");
    assert!(err.to_string().starts_with("'cd'\n   ^ unterminated"));
  }
}
