use subc::layout::{FrameLayout, Role};
use subc::tokenizer::{TokenKind, tokenize};
use subc::{CompileError, Options, compile, parser};

const ADD2: &str = "int add2(int a, int b) { return a + b; }";

const PROGRAM: &str = r#"
int add2(int a, int b) {
  return a + b;
}

int main() {
  int x;
  int y;
  x = 5;
  if (x < 10) {
    x = x + 1;
  }
  y = add2(x, 3);
  while (y > 0) {
    y = y - 1;
  }
  x = says("done");
  x = sayl();
  return 0;
}
"#;

fn bare(source: &str) -> String {
  compile(source, &Options::bare()).unwrap().text()
}

#[test]
fn scenario_add2() {
  assert_eq!(
    bare(ADD2),
    "add2:\n\tPUSH\t{FP, LR}\n\tMOV\tFP, SP\n\tLDR\tR0, [FP, #8]\n\tLDR\tR1, [FP, #12]\n\
     \tADD\tR0, R0, R1\n\tMOV\tSP, FP\n\tPOP\t{FP, LR}\n\tBX\tLR\n"
  );
}

#[test]
fn scenario_if_layout() {
  let src = "int main() { int x; x = 5; if (x < 10) { x = x + 1; } }";
  let program = parser::parse(tokenize(src).unwrap()).unwrap();
  let mut layout = FrameLayout::new();
  let frame = layout.build(&program.functions[0]).unwrap();
  let vars: Vec<_> = frame
    .rows()
    .iter()
    .filter(|row| row.role == Role::Variable)
    .map(|row| (row.name.as_str(), row.offset))
    .collect();
  assert_eq!(vars, vec![("x", -4)]);

  let text = bare(src);
  assert!(text.contains("\tCMP\tR0, R1\n\tBLT\tL20\n"));
  assert!(text.contains("\tBEQ\tL10\n"));
  assert!(text.trim_end().ends_with("L10:"));
}

#[test]
fn scenario_call_order() {
  let text = bare(PROGRAM);
  let push3 = text.find("\tMOV\tR0, #3").unwrap();
  let push_x = text.find("\tLDR\tR0, [FP, #-4]\n\tPUSH\t{R0}\n\tBL\tadd2").unwrap();
  let call = text.find("\tBL\tadd2").unwrap();
  assert!(push3 < push_x && push_x < call);
  assert!(text[call..].starts_with("\tBL\tadd2\n\tADD\tSP, SP, #8\n"));
}

#[test]
fn data_section_comes_first() {
  let asm = compile(PROGRAM, &Options::default()).unwrap();
  let text = asm.text();
  assert!(text.starts_with("\t.DATA\n"));
  let data_at = text.find(".ASCIZ\t\"done\"").unwrap();
  let code_at = text.find("\t.TEXT").unwrap();
  assert!(data_at < code_at);
}

#[test]
fn output_is_deterministic() {
  assert_eq!(bare(PROGRAM), bare(PROGRAM));
}

#[test]
fn function_count_matches_source() {
  let program = parser::parse(tokenize(PROGRAM).unwrap()).unwrap();
  assert_eq!(program.functions.len(), 2);
}

#[test]
fn left_operand_loads_first() {
  let text = bare("int f(int a, int b) { return b != a; }");
  let left = text.find("\tLDR\tR0, [FP, #12]").unwrap();
  let right = text.find("\tLDR\tR1, [FP, #8]").unwrap();
  assert!(left < right);
}

#[test]
fn syntax_error_is_reported_not_fatal() {
  let err = compile("int main() {\n  x = 1\n}", &Options::default()).unwrap_err();
  match &err {
    CompileError::Syntax {
      found, line, column, ..
    } => {
      assert_eq!(*found, TokenKind::RBrace);
      assert_eq!((*line, *column), (3, 1));
    }
    other => panic!("unexpected error: {other}"),
  }
  let message = err.to_string();
  assert!(message.contains("Assign"));
  assert!(message.contains("(3, 1)"));
}

#[test]
fn lexical_error_points_at_character() {
  let err = compile("int main() { return 1 % 2; }", &Options::default()).unwrap_err();
  let message = err.to_string();
  assert!(message.contains("unrecognized character '%'"));
  assert!(message.contains(&format!("{}^", " ".repeat(23))));
}

#[test]
fn duplicate_names_are_rejected() {
  assert!(matches!(
    compile("int f() { return 0; } int f() { return 1; }", &Options::default()),
    Err(CompileError::DuplicateFunction { .. })
  ));
  assert!(matches!(
    compile("int main() { int x; int x; return x; }", &Options::default()),
    Err(CompileError::DuplicateSymbol { .. })
  ));
}

#[test]
fn zero_params_zero_locals() {
  let text = bare("int main() { return 7; }");
  assert_eq!(
    text,
    "main:\n\tPUSH\t{FP, LR}\n\tMOV\tFP, SP\n\tLDR\tR0, =7\n\tMOV\tSP, FP\n\tPOP\t{FP, LR}\n\tBX\tLR\n"
  );
}

#[test]
fn oversized_literal_is_rejected() {
  let err = compile("int main() { return 5000000000; }", &Options::bare()).unwrap_err();
  match err {
    CompileError::Lex { line, column, .. } => assert_eq!((line, column), (1, 21)),
    other => panic!("unexpected error: {other}"),
  }
  assert!(bare("int main() { return 2147483647; }").contains("\tLDR\tR0, =2147483647\n"));
}

#[test]
fn trailing_backslash_keeps_string_terminated() {
  let asm = compile(r#"int main() { int r; r = says("a\"); return 0; }"#, &Options::bare()).unwrap();
  assert_eq!(asm.data(), "L10:\n\t.ASCIZ\t\"a\\\\\"\n");
}
