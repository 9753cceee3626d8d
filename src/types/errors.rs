use std::fmt;

//------------ WireError -----------------------------------------------------

/// Possible errors while decoding a serialized structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireError {
    /// The input ended before the declared structure was complete.
    Truncated,
    /// A declared buffer or level table does not match the shape implied by
    /// the declared size. The input was produced by a different variant, a
    /// different bound, or is corrupt.
    LengthMismatch,
    /// Bytes were left over after the structure was fully decoded.
    TrailingBytes,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            WireError::Truncated => {
                write!(f, "Error: Input ended in the middle of a structure.")
            }
            WireError::LengthMismatch => {
                write!(
                    f,
                    "Error: Declared buffer shape does not match the \
                    declared size."
                )
            }
            WireError::TrailingBytes => {
                write!(f, "Error: Trailing bytes after decoded structure.")
            }
        }
    }
}

impl std::error::Error for WireError {}
