//! Stack-frame layout: where each parameter and local lives relative to FP.
//!
//! After the prolog has pushed `{FP, LR}` and copied SP into FP, the frame
//! looks like this (one word per slot, addresses growing upwards):
//!
//! ```text
//!   FP + 12   second argument
//!   FP +  8   first argument
//!   FP +  4   saved LR
//!   FP +  0   saved FP
//!   FP -  4   first local
//!   FP -  8   second local
//! ```
//!
//! Arguments are pushed right-to-left by the caller, so the first declared
//! parameter always sits nearest the frame base.

use std::collections::HashMap;

use log::trace;

use crate::ast::{Function, Name};
use crate::error::{CompileError, CompileResult};
use crate::ty::{Type, WORD_SIZE};

/// Offset of the first parameter: just above the saved FP and LR.
pub const FIRST_PARAM_OFFSET: i64 = 2 * WORD_SIZE;

/// Built-in console routines provided by the runtime: `(name, parameters)`.
pub const INTRINSICS: [(&str, &[&str]); 3] = [("says", &["x"]), ("sayn", &["x"]), ("sayl", &[])];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Function,
  Parameter,
  Variable,
  End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
  pub name: String,
  pub ty: Type,
  pub role: Role,
  pub offset: i64,
}

/// The rows of one function: a `Function` marker, its parameters, its
/// locals and an `End` marker, plus an index from symbol name to row.
#[derive(Debug, Clone)]
pub struct Frame {
  rows: Vec<Row>,
  index: HashMap<String, usize>,
}

impl Frame {
  fn new(name: &str) -> Self {
    Self {
      rows: vec![Row {
        name: name.to_string(),
        ty: Type::Fun,
        role: Role::Function,
        offset: 0,
      }],
      index: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.rows[0].name
  }

  /// Append a symbol row; returns false if the name is already taken.
  fn push(&mut self, name: &str, role: Role, offset: i64) -> bool {
    if self.index.contains_key(name) {
      return false;
    }
    self.index.insert(name.to_string(), self.rows.len());
    self.rows.push(Row {
      name: name.to_string(),
      ty: Type::Int,
      role,
      offset,
    });
    true
  }

  fn close(&mut self) {
    let name = self.name().to_string();
    self.rows.push(Row {
      name,
      ty: Type::End,
      role: Role::End,
      offset: 0,
    });
  }

  pub fn rows(&self) -> &[Row] {
    &self.rows
  }

  pub fn lookup(&self, name: &str) -> Option<&Row> {
    self.index.get(name).map(|&idx| &self.rows[idx])
  }

  pub fn param_count(&self) -> usize {
    self.count(Role::Parameter)
  }

  pub fn local_count(&self) -> usize {
    self.count(Role::Variable)
  }

  /// Bytes the prolog reserves below FP for locals.
  pub fn locals_size(&self) -> i64 {
    self
      .rows
      .iter()
      .filter(|row| row.role == Role::Variable)
      .map(|row| row.ty.size())
      .sum()
  }

  fn count(&self, role: Role) -> usize {
    self.rows.iter().filter(|row| row.role == role).count()
  }
}

/// Frame layouts for every function seen so far in one compilation.
#[derive(Debug, Clone, Default)]
pub struct FrameLayout {
  frames: HashMap<String, Frame>,
  order: Vec<String>,
}

impl FrameLayout {
  pub fn new() -> Self {
    Self::default()
  }

  /// A layout with the console intrinsics already registered.
  pub fn with_intrinsics() -> Self {
    let mut layout = Self::new();
    for (name, params) in INTRINSICS {
      let mut frame = Frame::new(name);
      for (i, param) in params.iter().enumerate() {
        frame.push(param, Role::Parameter, param_offset(i));
      }
      frame.close();
      layout.insert(frame);
    }
    layout
  }

  /// Lay out `function`'s parameters and locals.
  pub fn build(&mut self, function: &Function) -> CompileResult<&Frame> {
    let fname = &function.name;
    if self.frames.contains_key(fname.as_str()) {
      return Err(CompileError::DuplicateFunction {
        name: fname.text.clone(),
        line: fname.line,
        column: fname.column,
      });
    }

    let mut frame = Frame::new(fname.as_str());
    for (i, param) in function.params.iter().enumerate() {
      push_symbol(&mut frame, &param.name, Role::Parameter, param_offset(i))?;
    }
    for (i, var) in function.body.vars.iter().enumerate() {
      push_symbol(&mut frame, &var.name, Role::Variable, local_offset(i))?;
    }
    frame.close();

    for row in frame.rows() {
      trace!("layout {}: {:?} {} at {}", fname.text, row.role, row.name, row.offset);
    }
    Ok(self.insert(frame))
  }

  fn insert(&mut self, frame: Frame) -> &Frame {
    let name = frame.name().to_string();
    self.order.push(name.clone());
    self.frames.entry(name).or_insert(frame)
  }

  pub fn frame(&self, function: &str) -> Option<&Frame> {
    self.frames.get(function)
  }

  /// The frame for the function called `name`.
  pub fn find_function(&self, name: &Name) -> CompileResult<&Frame> {
    self.frame(name.as_str()).ok_or_else(|| CompileError::UnknownFunction {
      name: name.text.clone(),
      line: name.line,
      column: name.column,
    })
  }

  /// The parameter or local called `name` inside `function`.
  pub fn find_var_par(&self, function: &str, name: &Name) -> CompileResult<&Row> {
    let Some(frame) = self.frame(function) else {
      return Err(CompileError::UnknownFunction {
        name: function.to_string(),
        line: name.line,
        column: name.column,
      });
    };
    frame.lookup(name.as_str()).ok_or_else(|| CompileError::UnresolvedSymbol {
      function: function.to_string(),
      name: name.text.clone(),
      line: name.line,
      column: name.column,
    })
  }

  /// Every row of every frame, in the order the frames were built.
  pub fn rows(&self) -> impl Iterator<Item = &Row> {
    self
      .order
      .iter()
      .filter_map(|name| self.frames.get(name))
      .flat_map(|frame| frame.rows())
  }

  pub fn dump(&self) -> String {
    let mut out = String::new();
    for (i, row) in self.rows().enumerate() {
      out.push_str(&format!(
        "[{i:3}] {:<10} {:<10} {:?} {}\n",
        format!("{:?}", row.role),
        row.name,
        row.ty,
        row.offset
      ));
    }
    out
  }
}

fn push_symbol(frame: &mut Frame, name: &Name, role: Role, offset: i64) -> CompileResult<()> {
  if frame.push(name.as_str(), role, offset) {
    Ok(())
  } else {
    Err(CompileError::DuplicateSymbol {
      function: frame.name().to_string(),
      name: name.text.clone(),
      line: name.line,
      column: name.column,
    })
  }
}

fn param_offset(index: usize) -> i64 {
  FIRST_PARAM_OFFSET + index as i64 * WORD_SIZE
}

fn local_offset(index: usize) -> i64 {
  -(index as i64 + 1) * WORD_SIZE
}
