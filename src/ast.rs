//! Syntax tree produced by the parser.
//!
//! Each syntactic category is its own type; ordered children (functions,
//! parameters, variables, statements, arguments) live in `Vec`s so that
//! declaration order is kept exactly as written.

use crate::tokenizer::TokenKind;

/// An identifier together with where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
  pub text: String,
  pub line: usize,
  pub column: usize,
}

impl Name {
  pub fn new(text: impl Into<String>, line: usize, column: usize) -> Self {
    Self {
      text: text.into(),
      line,
      column,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.text
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub functions: Vec<Function>,
}

impl Program {
  pub fn find_function(&self, name: &str) -> Option<&Function> {
    self.functions.iter().find(|f| f.name.as_str() == name)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub name: Name,
  pub params: Vec<Parameter>,
  pub body: Body,
}

impl Function {
  /// Does the body end with a `return`? Only the last statement is checked.
  pub fn ends_with_return(&self) -> bool {
    matches!(self.body.stmts.last(), Some(Stmt::Return(_)))
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
  pub name: Name,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
  pub name: Name,
}

/// Function body: local declarations first, then at least one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
  pub vars: Vec<Variable>,
  pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
  pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  If { cond: Expr, block: Block },
  Assign { target: Name, value: AssignValue },
  Return(Expr),
  While { cond: Expr, block: Block },
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignValue {
  Expr(Expr),
  Call(Call),
}

/// `Operand (BinaryOp Operand)?` - at most one operator, no nesting.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
  pub lhs: Operand,
  pub rhs: Option<(BinaryOp, Operand)>,
}

impl Expr {
  pub fn operand(lhs: Operand) -> Self {
    Self { lhs, rhs: None }
  }

  pub fn binary(lhs: Operand, op: BinaryOp, rhs: Operand) -> Self {
    Self {
      lhs,
      rhs: Some((op, rhs)),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
  Name(Name),
  Number(i64),
}

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Lt,
  Le,
  Ne,
  Eq,
  Ge,
  Gt,
}

impl BinaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Lt => "<",
      Self::Le => "<=",
      Self::Ne => "!=",
      Self::Eq => "==",
      Self::Ge => ">=",
      Self::Gt => ">",
    }
  }

  pub fn from_token(kind: TokenKind) -> Option<Self> {
    let op = match kind {
      TokenKind::Add => Self::Add,
      TokenKind::Sub => Self::Sub,
      TokenKind::Mul => Self::Mul,
      TokenKind::Lt => Self::Lt,
      TokenKind::Le => Self::Le,
      TokenKind::Ne => Self::Ne,
      TokenKind::EqEq => Self::Eq,
      TokenKind::Ge => Self::Ge,
      TokenKind::Gt => Self::Gt,
      _ => return None,
    };
    Some(op)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
  pub callee: Name,
  pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
  Name(Name),
  Number(i64),
  Str(String),
}

/// Render the tree one node per line, children indented under their parent.
pub fn dump(program: &Program) -> String {
  let mut printer = TreePrinter::default();
  printer.program(program);
  printer.out
}

#[derive(Default)]
struct TreePrinter {
  out: String,
  depth: usize,
}

impl TreePrinter {
  const INDENT: usize = 3;

  fn line(&mut self, text: &str) {
    self.out.push_str(&" ".repeat(self.depth * Self::INDENT));
    self.out.push_str(text);
    self.out.push('\n');
  }

  fn open(&mut self, node: &str) {
    self.line(node);
    self.depth += 1;
  }

  fn close(&mut self) {
    self.depth -= 1;
  }

  fn program(&mut self, program: &Program) {
    self.open("Prog");
    for function in &program.functions {
      self.function(function);
    }
    self.close();
  }

  fn function(&mut self, function: &Function) {
    self.open("Fun");
    self.line(&format!("nam = {}", function.name.text));
    self.line("typ = int");
    for param in &function.params {
      self.declaration("Par", &param.name);
    }

    self.open("Body");
    if !function.body.vars.is_empty() {
      self.open("Vars");
      for var in &function.body.vars {
        self.declaration("Var", &var.name);
      }
      self.close();
    }
    self.stmts(&function.body.stmts);
    self.close();
    self.close();
  }

  fn declaration(&mut self, node: &str, name: &Name) {
    self.open(node);
    self.line(&format!("nam = {}", name.text));
    self.line("typ = int");
    self.close();
  }

  fn stmts(&mut self, stmts: &[Stmt]) {
    for stmt in stmts {
      match stmt {
        Stmt::If { cond, block } => self.guarded("If", cond, block),
        Stmt::While { cond, block } => self.guarded("While", cond, block),
        Stmt::Assign { target, value } => {
          self.open("Asg");
          self.line(&format!("nam = {}", target.text));
          match value {
            AssignValue::Expr(expr) => self.expr(expr),
            AssignValue::Call(call) => self.call(call),
          }
          self.close();
        }
        Stmt::Return(expr) => {
          self.open("Ret");
          self.expr(expr);
          self.close();
        }
      }
    }
  }

  fn guarded(&mut self, node: &str, cond: &Expr, block: &Block) {
    self.open(node);
    self.expr(cond);
    self.open("Block");
    self.stmts(&block.stmts);
    self.close();
    self.close();
  }

  fn expr(&mut self, expr: &Expr) {
    self.open("Exp");
    self.operand(&expr.lhs);
    if let Some((op, rhs)) = &expr.rhs {
      self.line(&format!("Bop = {}", op.symbol()));
      self.operand(rhs);
    }
    self.close();
  }

  fn operand(&mut self, operand: &Operand) {
    match operand {
      Operand::Name(name) => self.line(&format!("nam = {}", name.text)),
      Operand::Number(value) => self.line(&format!("num = {value}")),
    }
  }

  fn call(&mut self, call: &Call) {
    self.open("Call");
    self.line(&format!("nam = {}", call.callee.text));
    self.open("Args");
    for arg in &call.args {
      self.open("Arg");
      match arg {
        Argument::Name(name) => self.line(&format!("nam = {}", name.text)),
        Argument::Number(value) => self.line(&format!("num = {value}")),
        Argument::Str(text) => self.line(&format!("str = \"{text}\"")),
      }
      self.close();
    }
    self.close();
    self.close();
  }
}
