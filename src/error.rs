use std::fmt;

/// Errors returned by the shape-checked entry points of the kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input data is unusable (empty batch, non-finite parameters, ...).
    InvalidData(String),
    /// A hyperparameter or model description is out of range.
    InvalidConfig(String),
    /// A dimension does not match what the model (or a buffer) expects.
    ShapeMismatch {
        /// What was being checked, e.g. "batch input width".
        what: &'static str,
        got: usize,
        expected: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[inline]
    pub(crate) fn shape(what: &'static str, got: usize, expected: usize) -> Self {
        Error::ShapeMismatch {
            what,
            got,
            expected,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got}, expected {expected}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message_names_the_dimension() {
        let err = Error::shape("batch input width", 3, 2);
        assert_eq!(
            err.to_string(),
            "shape mismatch for batch input width: got 3, expected 2"
        );
    }
}
