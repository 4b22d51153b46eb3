//! Output buffers for the generated assembly.
//!
//! Code and data grow independently while the generator runs. The finished
//! text always places the data section first: code refers to string labels
//! that must already be defined when the assembler reaches them.

use std::fmt;
use std::fs;
use std::path::Path;

use snafu::ResultExt;

use crate::error::{CompileResult, WriteOutputSnafu};

/// A generated jump or data label such as `L30`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label(String);

impl Label {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Hands out `L10`, `L20`, `L30`, ... for the lifetime of one compilation.
#[derive(Debug, Clone)]
pub struct LabelAllocator {
  next: u32,
}

impl LabelAllocator {
  const STEP: u32 = 10;

  pub fn new() -> Self {
    Self { next: Self::STEP }
  }

  pub fn fresh(&mut self) -> Label {
    let label = Label(format!("L{}", self.next));
    self.next += Self::STEP;
    label
  }
}

impl Default for LabelAllocator {
  fn default() -> Self {
    Self::new()
  }
}

#[derive(Debug, Default)]
pub struct Emitter {
  code: String,
  data: String,
}

impl Emitter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start each section with its assembler directive.
  pub fn directives(&mut self) {
    self.code_line("\t.TEXT");
    self.data_line("\t.DATA");
  }

  pub fn code_line(&mut self, line: &str) {
    self.code.push_str(line);
    self.code.push('\n');
  }

  pub fn data_line(&mut self, line: &str) {
    self.data.push_str(line);
    self.data.push('\n');
  }

  /// Emit one instruction as `\tOPCODE\toperands`.
  pub fn instr(&mut self, opcode: &str, operands: &str) {
    if operands.is_empty() {
      self.code_line(&format!("\t{opcode}"));
    } else {
      self.code_line(&format!("\t{opcode}\t{operands}"));
    }
  }

  pub fn code_label(&mut self, label: &str) {
    self.code_line(&format!("{label}:"));
  }

  /// Place a NUL-terminated string in the data section under `label`.
  pub fn asciz(&mut self, label: &Label, text: &str) {
    // String literals never contain a quote; a backslash must not escape ours.
    let text = text.replace('\\', "\\\\");
    self.data_line(&format!("{label}:"));
    self.data_line(&format!("\t.ASCIZ\t\"{text}\""));
  }

  /// Append pre-written text (e.g. runtime support routines) to the code section.
  pub fn code_text(&mut self, text: &str) {
    self.code.push_str(text);
    if !text.ends_with('\n') {
      self.code.push('\n');
    }
  }

  pub fn finish(self) -> Assembly {
    Assembly {
      data: self.data,
      code: self.code,
    }
  }
}

/// The finished artifact: a data section followed by a code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
  data: String,
  code: String,
}

impl Assembly {
  pub fn data(&self) -> &str {
    &self.data
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn text(&self) -> String {
    let mut text = String::with_capacity(self.data.len() + self.code.len());
    text.push_str(&self.data);
    text.push_str(&self.code);
    text
  }

  pub fn save(&self, path: &Path) -> CompileResult<()> {
    fs::write(path, self.text()).context(WriteOutputSnafu { path })
  }
}

impl fmt::Display for Assembly {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.data)?;
    f.write_str(&self.code)
  }
}
