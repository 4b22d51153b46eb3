/// Knobs for one compilation.
#[derive(Debug, Clone)]
pub struct Options {
  /// Emit `.DATA` / `.TEXT` at the top of their sections.
  pub directives: bool,
  /// Support routines (the console intrinsics) appended after the generated code.
  pub runtime: Option<String>,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      directives: true,
      runtime: None,
    }
  }
}

impl Options {
  /// Bare output: no directives, no runtime. Handy when comparing instruction streams.
  pub fn bare() -> Self {
    Self {
      directives: false,
      runtime: None,
    }
  }
}
