//! Code generation: lower the parsed AST into ARM-style assembly text.
//!
//! Values flow through two working registers: every expression leaves its
//! result in `R0`, using `R1` for the right operand of a binary operator.
//! Parameters and locals live in the stack frame and are addressed as
//! `[FP, #offset]` using the offsets computed by [`FrameLayout`].

use log::{debug, trace, warn};

use crate::ast::{
  Argument, AssignValue, BinaryOp, Block, Call, Expr, Function, Name, Operand, Program, Stmt,
};
use crate::config::Options;
use crate::emit::{Assembly, Emitter, LabelAllocator};
use crate::error::CompileResult;
use crate::layout::FrameLayout;
use crate::ty::WORD_SIZE;

/// Emit assembly for a whole program.
pub fn generate(program: &Program, options: &Options) -> CompileResult<Assembly> {
  let mut cg = CodeGenerator::new(program);
  if options.directives {
    cg.emit.directives();
  }

  for function in &program.functions {
    cg.gen_function(function)?;
  }

  if let Some(runtime) = &options.runtime {
    cg.emit.code_text(runtime);
  }
  Ok(cg.emit.finish())
}

/// State for one code-generation pass. Nothing here outlives the pass.
struct CodeGenerator<'a> {
  program: &'a Program,
  layout: FrameLayout,
  labels: LabelAllocator,
  emit: Emitter,
}

impl<'a> CodeGenerator<'a> {
  fn new(program: &'a Program) -> Self {
    Self {
      program,
      layout: FrameLayout::with_intrinsics(),
      labels: LabelAllocator::new(),
      emit: Emitter::new(),
    }
  }

  fn gen_function(&mut self, function: &Function) -> CompileResult<()> {
    let fname = function.name.as_str();
    let locals_size = self.layout.build(function)?.locals_size();
    debug!("generating {fname} ({locals_size} bytes of locals)");

    self.emit.code_label(fname);
    self.prolog(locals_size);
    for stmt in &function.body.stmts {
      self.gen_stmt(fname, stmt)?;
    }

    if !function.ends_with_return() {
      warn!("function {fname} does not end with a return; no epilog emitted for that path");
    }
    Ok(())
  }

  fn prolog(&mut self, locals_size: i64) {
    self.emit.instr("PUSH", "{FP, LR}");
    self.emit.instr("MOV", "FP, SP");
    if locals_size > 0 {
      self.emit.instr("SUB", &format!("SP, SP, #{locals_size}"));
    }
  }

  fn epilog(&mut self) {
    self.emit.instr("MOV", "SP, FP");
    self.emit.instr("POP", "{FP, LR}");
    self.emit.instr("BX", "LR");
  }

  fn gen_stmt(&mut self, fname: &str, stmt: &Stmt) -> CompileResult<()> {
    match stmt {
      Stmt::If { cond, block } => self.gen_if(fname, cond, block),
      Stmt::Assign { target, value } => {
        match value {
          AssignValue::Expr(expr) => self.gen_expr(fname, expr)?,
          AssignValue::Call(call) => self.gen_call(fname, call)?,
        }
        let offset = self.offset(fname, target)?;
        self.emit.instr("STR", &format!("R0, [FP, #{offset}]"));
        Ok(())
      }
      Stmt::Return(expr) => {
        self.gen_expr(fname, expr)?;
        self.epilog();
        Ok(())
      }
      Stmt::While { cond, block } => self.gen_while(fname, cond, block),
    }
  }

  fn gen_block(&mut self, fname: &str, block: &Block) -> CompileResult<()> {
    for stmt in &block.stmts {
      self.gen_stmt(fname, stmt)?;
    }
    Ok(())
  }

  fn gen_if(&mut self, fname: &str, cond: &Expr, block: &Block) -> CompileResult<()> {
    let exit = self.labels.fresh();
    self.gen_expr(fname, cond)?;
    self.emit.instr("CMP", "R0, #0");
    self.emit.instr("BEQ", exit.as_str());
    self.gen_block(fname, block)?;
    self.emit.code_label(exit.as_str());
    Ok(())
  }

  fn gen_while(&mut self, fname: &str, cond: &Expr, block: &Block) -> CompileResult<()> {
    let start = self.labels.fresh();
    let exit = self.labels.fresh();
    self.emit.code_label(start.as_str());
    self.gen_expr(fname, cond)?;
    self.emit.instr("CMP", "R0, #0");
    self.emit.instr("BEQ", exit.as_str());
    self.gen_block(fname, block)?;
    self.emit.instr("B", start.as_str());
    self.emit.code_label(exit.as_str());
    Ok(())
  }

  /// Leave the value of `expr` in R0.
  fn gen_expr(&mut self, fname: &str, expr: &Expr) -> CompileResult<()> {
    self.load_operand(fname, "R0", &expr.lhs)?;
    if let Some((op, rhs)) = &expr.rhs {
      self.load_operand(fname, "R1", rhs)?;
      self.gen_binop(*op);
    }
    Ok(())
  }

  fn load_operand(&mut self, fname: &str, reg: &str, operand: &Operand) -> CompileResult<()> {
    match operand {
      Operand::Number(value) => self.emit.instr("LDR", &format!("{reg}, ={value}")),
      Operand::Name(name) => {
        let offset = self.offset(fname, name)?;
        self.emit.instr("LDR", &format!("{reg}, [FP, #{offset}]"));
      }
    }
    Ok(())
  }

  fn gen_binop(&mut self, op: BinaryOp) {
    let (opcode, compare) = match op {
      BinaryOp::Add => ("ADD", false),
      BinaryOp::Sub => ("SUB", false),
      BinaryOp::Mul => ("MUL", false),
      BinaryOp::Lt => ("BLT", true),
      BinaryOp::Le => ("BLE", true),
      BinaryOp::Eq => ("BEQ", true),
      BinaryOp::Ne => ("BNE", true),
      BinaryOp::Ge => ("BGE", true),
      BinaryOp::Gt => ("BGT", true),
    };
    if compare {
      self.gen_compare(op, opcode);
    } else {
      self.emit.instr(opcode, "R0, R0, R1");
    }
  }

  /// R0 = 1 if the comparison holds, else 0.
  fn gen_compare(&mut self, op: BinaryOp, branch: &str) {
    self.emit.instr("CMP", "R0, R1");
    let truth = self.labels.fresh();
    let exit = self.labels.fresh();
    trace!("comparison {op:?} uses {truth} / {exit}");
    self.emit.instr(branch, truth.as_str());
    self.emit.instr("LDR", "R0, =0");
    self.emit.instr("B", exit.as_str());
    self.emit.code_label(truth.as_str());
    self.emit.instr("LDR", "R0, =1");
    self.emit.code_label(exit.as_str());
  }

  /// Push arguments right-to-left, branch-and-link, then pop them again.
  fn gen_call(&mut self, fname: &str, call: &Call) -> CompileResult<()> {
    let callee = &call.callee;
    match self.layout.find_function(callee) {
      Ok(frame) => trace!("call {} ({} params)", callee.text, frame.param_count()),
      // Functions defined further down have no frame yet.
      Err(_) if self.program.find_function(callee.as_str()).is_some() => {
        trace!("forward call {}", callee.text)
      }
      Err(err) => return Err(err),
    }

    for arg in call.args.iter().rev() {
      match arg {
        Argument::Name(name) => {
          let offset = self.offset(fname, name)?;
          self.emit.instr("LDR", &format!("R0, [FP, #{offset}]"));
        }
        Argument::Number(value) => self.emit.instr("MOV", &format!("R0, #{value}")),
        Argument::Str(text) => {
          let label = self.labels.fresh();
          self.emit.asciz(&label, text);
          self.emit.instr("LDR", &format!("R0, ={label}"));
        }
      }
      self.emit.instr("PUSH", "{R0}");
    }

    self.emit.instr("BL", callee.as_str());

    let arg_bytes = call.args.len() as i64 * WORD_SIZE;
    if arg_bytes > 0 {
      self.emit.instr("ADD", &format!("SP, SP, #{arg_bytes}"));
    }
    Ok(())
  }

  fn offset(&self, fname: &str, name: &Name) -> CompileResult<i64> {
    Ok(self.layout.find_var_par(fname, name)?.offset)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CompileError;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  fn code(src: &str) -> Vec<String> {
    let program = parse(tokenize(src).unwrap()).unwrap();
    let asm = generate(&program, &Options::bare()).unwrap();
    asm.code().lines().map(str::to_string).collect()
  }

  fn lines(expected: &[&str]) -> Vec<String> {
    expected.iter().map(|line| line.to_string()).collect()
  }

  #[test]
  fn add2_body() {
    assert_eq!(
      code("int add2(int a, int b) { return a + b; }"),
      lines(&[
        "add2:",
        "\tPUSH\t{FP, LR}",
        "\tMOV\tFP, SP",
        "\tLDR\tR0, [FP, #8]",
        "\tLDR\tR1, [FP, #12]",
        "\tADD\tR0, R0, R1",
        "\tMOV\tSP, FP",
        "\tPOP\t{FP, LR}",
        "\tBX\tLR",
      ])
    );
  }

  #[test]
  fn locals_reserve_stack() {
    let out = code("int main() { int x; int y; x = 5; return x; }");
    assert_eq!(out[3], "\tSUB\tSP, SP, #8");
    assert_eq!(out[4], "\tLDR\tR0, =5");
    assert_eq!(out[5], "\tSTR\tR0, [FP, #-4]");
  }

  #[test]
  fn comparison_materializes_boolean() {
    let out = code("int f(int a) { return a <= 3; }");
    assert_eq!(
      out[3..11].to_vec(),
      lines(&[
        "\tLDR\tR0, [FP, #8]",
        "\tLDR\tR1, =3",
        "\tCMP\tR0, R1",
        "\tBLE\tL10",
        "\tLDR\tR0, =0",
        "\tB\tL20",
        "L10:",
        "\tLDR\tR0, =1",
      ])
    );
    assert_eq!(out[11], "L20:");
  }

  #[test]
  fn if_branches_past_block() {
    let out = code("int main() { int x; x = 5; if (x < 10) { x = x + 1; } return x; }");
    let text = out.join("\n");
    // exit label is allocated before the comparison's pair
    assert!(text.contains("\tBLT\tL20\n\tLDR\tR0, =0\n\tB\tL30\nL20:\n\tLDR\tR0, =1\nL30:"));
    assert!(text.contains("L30:\n\tCMP\tR0, #0\n\tBEQ\tL10\n"));
    assert!(text.contains("\tADD\tR0, R0, R1\n\tSTR\tR0, [FP, #-4]\nL10:\n"));
  }

  #[test]
  fn while_loops_back() {
    let out = code("int main() { int i; i = 3; while (i) { i = i - 1; } return i; }");
    let text = out.join("\n");
    assert!(text.contains("L10:\n\tLDR\tR0, [FP, #-4]\n\tCMP\tR0, #0\n\tBEQ\tL20\n"));
    assert!(text.contains("\tSUB\tR0, R0, R1\n\tSTR\tR0, [FP, #-4]\n\tB\tL10\nL20:\n"));
  }

  #[test]
  fn call_pushes_right_to_left() {
    let src = "int add2(int a, int b) { return a + b; } \
               int main() { int x; int y; x = 1; y = add2(x, 3); return y; }";
    let text = code(src).join("\n");
    assert!(text.contains(
      "\tMOV\tR0, #3\n\tPUSH\t{R0}\n\tLDR\tR0, [FP, #-4]\n\tPUSH\t{R0}\n\tBL\tadd2\n\tADD\tSP, SP, #8\n\tSTR\tR0, [FP, #-8]"
    ));
  }

  #[test]
  fn string_argument_goes_to_data() {
    let src = r#"int main() { int r; r = says("hi"); r = sayl(); return 0; }"#;
    let program = parse(tokenize(src).unwrap()).unwrap();
    let asm = generate(&program, &Options::bare()).unwrap();
    assert_eq!(asm.data(), "L10:\n\t.ASCIZ\t\"hi\"\n");
    assert!(asm.code().contains("\tLDR\tR0, =L10\n\tPUSH\t{R0}\n\tBL\tsays\n\tADD\tSP, SP, #4\n"));
    // zero-argument call leaves the stack alone
    assert!(asm.code().contains("\tBL\tsayl\n\tSTR\tR0, [FP, #-4]\n"));
  }

  #[test]
  fn forward_calls_resolve() {
    let src = "int main() { int r; r = later(1); return r; } int later(int a) { return a; }";
    assert!(code(src).contains(&"\tBL\tlater".to_string()));
  }

  #[test]
  fn unknown_callee_fails() {
    let src = "int main() { int r; r = nowhere(1); return r; }";
    let program = parse(tokenize(src).unwrap()).unwrap();
    let err = generate(&program, &Options::bare()).unwrap_err();
    assert!(matches!(err, CompileError::UnknownFunction { ref name, .. } if name == "nowhere"));
  }

  #[test]
  fn unknown_callee_points_at_call() {
    let src = "int main() {\n  int r;\n  r = sayx(1);\n  return r;\n}";
    let program = parse(tokenize(src).unwrap()).unwrap();
    let err = generate(&program, &Options::bare()).unwrap_err();
    assert_eq!(err.to_string(), "cannot find function \"sayx\" at (3, 7)");
  }

  #[test]
  fn arithmetic_and_comparison_lowering() {
    let out = code("int f(int a) { a = a * 2; return a >= 1; }").join("\n");
    assert!(out.contains("\tMUL\tR0, R0, R1\n\tSTR\tR0, [FP, #8]"));
    assert!(out.contains("\tCMP\tR0, R1\n\tBGE\tL10\n"));
  }

  #[test]
  fn unresolved_symbol_fails() {
    let program = parse(tokenize("int main() { return y; }").unwrap()).unwrap();
    let err = generate(&program, &Options::bare()).unwrap_err();
    match err {
      CompileError::UnresolvedSymbol { function, name, line, column } => {
        assert_eq!(function, "main");
        assert_eq!(name, "y");
        assert_eq!((line, column), (1, 21));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn missing_return_emits_no_epilog() {
    let out = code("int main() { int x; x = 1; }");
    assert!(!out.iter().any(|line| line.contains("BX")));
  }

  #[test]
  fn directives_and_runtime() {
    let program = parse(tokenize("int main() { return 0; }").unwrap()).unwrap();
    let options = Options {
      directives: true,
      runtime: Some("sayl:\n\tBX\tLR\n".to_string()),
    };
    let asm = generate(&program, &options).unwrap();
    assert_eq!(asm.data(), "\t.DATA\n");
    assert!(asm.code().starts_with("\t.TEXT\nmain:\n"));
    assert!(asm.code().ends_with("sayl:\n\tBX\tLR\n"));
  }

  #[test]
  fn labels_never_repeat() {
    let src = "int main() { int a; a = 1; if (a < 2) { a = 2; } while (a != 0) { a = a - 1; } \
               if (a == 0) { a = says(\"done\"); } return a > 1; }";
    let program = parse(tokenize(src).unwrap()).unwrap();
    let text = generate(&program, &Options::bare()).unwrap().text();
    let defs: Vec<&str> = text.lines().filter(|l| l.starts_with('L') && l.ends_with(':')).collect();
    let mut unique = defs.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(defs.len(), unique.len());
    assert_eq!(defs.len(), 13);
  }
}
