use thiserror::Error;

/// Error type used throughout the Stratum crates.
///
/// The actual error information lives in a boxed [`ErrorKind`], keeping the
/// `Result` payload a single pointer wide on the happy path.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Creates a storage-format error for the named format element.
    ///
    /// This covers everything that renders a chunk unreadable: truncated
    /// bytes, out-of-range dictionary codes, page ordering violations,
    /// presence/value count mismatches.
    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// Creates an error for an invalid caller-supplied argument or
    /// configuration value (e.g. a zero batch capacity).
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` if this error denotes corrupt or malformed storage.
    pub fn is_format_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidFormat { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        let err = Error::invalid_format("page header", "truncated");
        assert!(err.is_format_error());
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));

        let err = Error::invalid_arg("batch_capacity", "must be non-zero");
        assert!(!err.is_format_error());

        let err: Error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err.kind(), ErrorKind::Io { .. }));
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = Error::invalid_format("dictionary page", "declared 10 entries, found 7");
        let text = err.to_string();
        assert!(text.contains("dictionary page"));
        assert!(text.contains("declared 10 entries"));
    }
}
