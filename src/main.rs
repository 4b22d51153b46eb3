use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::info;
use snafu::ResultExt;

use subc::error::UnreadableInputSnafu;
use subc::layout::FrameLayout;
use subc::{CompileResult, Options, ast, codegen, parser, tokenizer};

#[derive(Parser, Debug)]
#[command(author, version, about = "Compile a SubC program to assembly")]
struct Cli {
  /// Source file to compile
  input: PathBuf,
  /// Output assembly file (defaults to the input with a `.s` extension)
  #[arg(short, long)]
  output: Option<PathBuf>,
  /// Assembly file holding the runtime routines, appended after the generated code
  #[arg(long)]
  runtime: Option<PathBuf>,
  /// Leave out the `.DATA` / `.TEXT` section directives
  #[arg(long)]
  no_directives: bool,
  /// Print the token stream to stderr
  #[arg(long)]
  dump_tokens: bool,
  /// Print every function's frame layout to stderr
  #[arg(long)]
  dump_layout: bool,
  /// Print the syntax tree to stderr
  #[arg(long)]
  dump_ast: bool,
}

fn main() {
  env_logger::init();
  let cli = Cli::parse();

  if let Err(err) = run(&cli) {
    eprintln!("error: {err}");
    process::exit(1);
  }
}

fn run(cli: &Cli) -> CompileResult<()> {
  let source = fs::read_to_string(&cli.input).context(UnreadableInputSnafu { path: &cli.input })?;
  let runtime = match &cli.runtime {
    Some(path) => Some(fs::read_to_string(path).context(UnreadableInputSnafu { path })?),
    None => None,
  };
  let options = Options {
    directives: !cli.no_directives,
    runtime,
  };

  let tokens = tokenizer::tokenize(&source)?;
  if cli.dump_tokens {
    eprint!("{}", tokenizer::dump_tokens(&tokens));
  }

  let program = parser::parse(tokens)?;
  if cli.dump_ast {
    eprint!("{}", ast::dump(&program));
  }
  if cli.dump_layout {
    let mut layout = FrameLayout::with_intrinsics();
    for function in &program.functions {
      layout.build(function)?;
    }
    eprint!("{}", layout.dump());
  }

  let asm = codegen::generate(&program, &options)?;
  let output = cli
    .output
    .clone()
    .unwrap_or_else(|| cli.input.with_extension("s"));
  asm.save(&output)?;
  info!("wrote {}", output.display());
  Ok(())
}
