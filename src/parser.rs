//! Recursive-descent parser producing the program AST.
//!
//! One function per grammar rule, one token of lookahead. The only place we
//! look further ahead is a statement's `Name "=" Name "("` prefix, where a
//! peek at the token after the name tells a call apart from an expression.
//! Nothing is ever backtracked: a rule either matches its prefix or the
//! whole parse fails with a syntax error.

use log::debug;

use crate::ast::{
  Argument, AssignValue, BinaryOp, Block, Body, Call, Expr, Function, Name, Operand, Parameter,
  Program, Stmt, Variable,
};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token};

/// Parse a whole program from the token stream.
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens);
  stream.rewind();
  parse_program(&mut stream)
}

// Program = Function+
fn parse_program(stream: &mut TokenStream) -> CompileResult<Program> {
  let mut functions = vec![parse_function(stream)?];
  while !stream.is_eof() {
    functions.push(parse_function(stream)?);
  }
  Ok(Program { functions })
}

// Function = "int" Name "(" Parameters ")" Body
fn parse_function(stream: &mut TokenStream) -> CompileResult<Function> {
  stream.must("Function", &[TokenKind::Int])?;
  let name = parse_name(stream, "Function")?;
  stream.must("Function", &[TokenKind::LParen])?;
  let params = parse_params(stream)?;
  stream.must("Function", &[TokenKind::RParen])?;
  let body = parse_body(stream)?;

  debug!(
    "parsed function {} ({} params, {} locals, {} statements)",
    name.text,
    params.len(),
    body.vars.len(),
    body.stmts.len()
  );
  Ok(Function { name, params, body })
}

// Parameters = (Parameter ("," Parameter)*)?
fn parse_params(stream: &mut TokenStream) -> CompileResult<Vec<Parameter>> {
  let mut params = Vec::new();
  if stream.at(TokenKind::RParen) {
    return Ok(params);
  }

  params.push(parse_param(stream)?);
  while stream.at(TokenKind::Comma) {
    stream.advance();
    params.push(parse_param(stream)?);
  }
  Ok(params)
}

// Parameter = "int" Name
fn parse_param(stream: &mut TokenStream) -> CompileResult<Parameter> {
  stream.must("Parameter", &[TokenKind::Int])?;
  let name = parse_name(stream, "Parameter")?;
  Ok(Parameter { name })
}

// Body = "{" Variable* Statement+ "}"
fn parse_body(stream: &mut TokenStream) -> CompileResult<Body> {
  stream.must("Body", &[TokenKind::LBrace])?;
  let mut vars = Vec::new();
  while stream.at(TokenKind::Int) {
    vars.push(parse_var(stream)?);
  }
  let stmts = parse_stmts(stream)?;
  stream.must("Body", &[TokenKind::RBrace])?;
  Ok(Body { vars, stmts })
}

// Variable = "int" Name ";"
fn parse_var(stream: &mut TokenStream) -> CompileResult<Variable> {
  stream.must("Variable", &[TokenKind::Int])?;
  let name = parse_name(stream, "Variable")?;
  stream.must("Variable", &[TokenKind::Semi])?;
  Ok(Variable { name })
}

// Statement+, terminated by the closing brace of the enclosing Body/Block.
fn parse_stmts(stream: &mut TokenStream) -> CompileResult<Vec<Stmt>> {
  let mut stmts = vec![parse_stmt(stream)?];
  while !stream.at(TokenKind::RBrace) {
    stmts.push(parse_stmt(stream)?);
  }
  Ok(stmts)
}

// Statement = If | Assign | Return | While
fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let kind = stream.current().kind;
  match kind {
    TokenKind::If => parse_if(stream),
    TokenKind::Name => parse_assign(stream),
    TokenKind::Return => parse_return(stream),
    TokenKind::While => parse_while(stream),
    _ => Err(stream.unexpected(
      "Statement",
      &[TokenKind::If, TokenKind::Name, TokenKind::Return, TokenKind::While],
    )),
  }
}

// If = "if" "(" Expression ")" Block
fn parse_if(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.must("If", &[TokenKind::If])?;
  stream.must("If", &[TokenKind::LParen])?;
  let cond = parse_expr(stream)?;
  stream.must("If", &[TokenKind::RParen])?;
  let block = parse_block(stream)?;
  Ok(Stmt::If { cond, block })
}

// Assign = Name "=" (Expression | Call) ";"
fn parse_assign(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let target = parse_name(stream, "Assign")?;
  stream.must("Assign", &[TokenKind::Assign])?;
  let value = if stream.at(TokenKind::Name) && stream.peek().kind == TokenKind::LParen {
    AssignValue::Call(parse_call(stream)?)
  } else {
    AssignValue::Expr(parse_expr(stream)?)
  };
  stream.must("Assign", &[TokenKind::Semi])?;
  Ok(Stmt::Assign { target, value })
}

// Return = "return" Expression ";"
fn parse_return(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.must("Return", &[TokenKind::Return])?;
  let expr = parse_expr(stream)?;
  stream.must("Return", &[TokenKind::Semi])?;
  Ok(Stmt::Return(expr))
}

// While = "while" "(" Expression ")" Block
fn parse_while(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.must("While", &[TokenKind::While])?;
  stream.must("While", &[TokenKind::LParen])?;
  let cond = parse_expr(stream)?;
  stream.must("While", &[TokenKind::RParen])?;
  let block = parse_block(stream)?;
  Ok(Stmt::While { cond, block })
}

// Block = "{" Statement+ "}"
fn parse_block(stream: &mut TokenStream) -> CompileResult<Block> {
  stream.must("Block", &[TokenKind::LBrace])?;
  let stmts = parse_stmts(stream)?;
  stream.must("Block", &[TokenKind::RBrace])?;
  Ok(Block { stmts })
}

// Expression = Operand (BinaryOp Operand)?
fn parse_expr(stream: &mut TokenStream) -> CompileResult<Expr> {
  let lhs = parse_operand(stream)?;
  let Some(op) = BinaryOp::from_token(stream.current().kind) else {
    return Ok(Expr::operand(lhs));
  };
  stream.advance();
  let rhs = parse_operand(stream)?;
  Ok(Expr::binary(lhs, op, rhs))
}

// Operand = Name | Number
fn parse_operand(stream: &mut TokenStream) -> CompileResult<Operand> {
  let token = stream.must("Expression", &[TokenKind::Name, TokenKind::Num])?;
  match token.kind {
    TokenKind::Num => Ok(Operand::Number(number_value(&token)?)),
    _ => Ok(Operand::Name(Name::new(token.lexeme, token.line, token.column))),
  }
}

// Call = Name "(" Arguments ")"
fn parse_call(stream: &mut TokenStream) -> CompileResult<Call> {
  let callee = parse_name(stream, "Call")?;
  stream.must("Call", &[TokenKind::LParen])?;
  let args = parse_args(stream)?;
  stream.must("Call", &[TokenKind::RParen])?;
  Ok(Call { callee, args })
}

// Arguments = (Argument ("," Argument)*)?
fn parse_args(stream: &mut TokenStream) -> CompileResult<Vec<Argument>> {
  let mut args = Vec::new();
  if stream.at(TokenKind::RParen) {
    return Ok(args);
  }

  args.push(parse_arg(stream)?);
  while stream.at(TokenKind::Comma) {
    stream.advance();
    args.push(parse_arg(stream)?);
  }
  Ok(args)
}

// Argument = Name | Number | String
fn parse_arg(stream: &mut TokenStream) -> CompileResult<Argument> {
  let token = stream.must(
    "Argument",
    &[TokenKind::Name, TokenKind::Num, TokenKind::Str],
  )?;
  match token.kind {
    TokenKind::Num => Ok(Argument::Number(number_value(&token)?)),
    TokenKind::Str => Ok(Argument::Str(token.lexeme)),
    _ => Ok(Argument::Name(Name::new(token.lexeme, token.line, token.column))),
  }
}

fn parse_name(stream: &mut TokenStream, rule: &'static str) -> CompileResult<Name> {
  let token = stream.must(rule, &[TokenKind::Name])?;
  Ok(Name::new(token.lexeme, token.line, token.column))
}

fn number_value(token: &Token) -> CompileResult<i64> {
  token.value.ok_or_else(|| CompileError::Syntax {
    rule: "Number",
    expected: vec![TokenKind::Num],
    found: token.kind,
    lexeme: token.lexeme.clone(),
    line: token.line,
    column: token.column,
  })
}

/// Cursor over the token vector.
///
/// Reading past the end yields the trailing `Eof` token, so callers never
/// have to handle a missing token separately.
pub struct TokenStream {
  tokens: Vec<Token>,
  pos: usize,
  eof: Token,
}

impl TokenStream {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  pub fn new(tokens: Vec<Token>) -> Self {
    let eof = match tokens.last() {
      Some(last) if last.kind == TokenKind::Eof => last.clone(),
      Some(last) => Token::new(TokenKind::Eof, "", last.line, last.column + last.lexeme.len()),
      None => Token::new(TokenKind::Eof, "", 1, 1),
    };
    Self { tokens, pos: 0, eof }
  }

  pub fn rewind(&mut self) {
    self.pos = 0;
  }

  pub fn current(&self) -> &Token {
    self.tokens.get(self.pos).unwrap_or(&self.eof)
  }

  /// The token after the current one; does not move the cursor.
  pub fn peek(&self) -> &Token {
    self.tokens.get(self.pos + 1).unwrap_or(&self.eof)
  }

  pub fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  pub fn at(&self, kind: TokenKind) -> bool {
    self.current().kind == kind
  }

  pub fn is_eof(&self) -> bool {
    self.at(TokenKind::Eof)
  }

  /// Consume and return the current token if its kind is one of `expected`.
  pub fn must(&mut self, rule: &'static str, expected: &[TokenKind]) -> CompileResult<Token> {
    if expected.contains(&self.current().kind) {
      let token = self.current().clone();
      self.advance();
      Ok(token)
    } else {
      Err(self.unexpected(rule, expected))
    }
  }

  fn unexpected(&self, rule: &'static str, expected: &[TokenKind]) -> CompileError {
    let token = self.current();
    CompileError::Syntax {
      rule,
      expected: expected.to_vec(),
      found: token.kind,
      lexeme: describe_token(token),
      line: token.line,
      column: token.column,
    }
  }
}
