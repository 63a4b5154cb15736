//! Error type for the high-level reading API.

use std::fmt;

use h5lite_format::error::FormatError;

/// Errors surfaced by [`crate::File`], [`crate::Group`], and
/// [`crate::Variable`].
#[derive(Debug)]
pub enum Error {
    /// The underlying bytes are malformed HDF5.
    Format(FormatError),
    /// Filesystem access failed.
    Io(std::io::Error),
    /// A typed accessor was called on an incompatible element type.
    TypeMismatch {
        /// The type family the accessor expected.
        expected: &'static str,
        /// The element type actually present.
        actual: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(e) => write!(f, "format error: {e}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Format(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::TypeMismatch { .. } => None,
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Error {
        Error::Format(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}
