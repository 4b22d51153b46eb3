/// Bytes per stack slot on the 32-bit target.
pub const WORD_SIZE: i64 = 4;

/// Type tag carried by each frame-layout row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
  Int,
  Fun,
  End,
}

impl Type {
  /// Stack bytes occupied by a value of this type; marker rows take none.
  pub fn size(&self) -> i64 {
    match self {
      Type::Int => WORD_SIZE,
      Type::Fun | Type::End => 0,
    }
  }
}
