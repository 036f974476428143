use thiserror::Error;

/// Errors raised while parsing JSON text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum JsonError {
    /// Malformed input. `at` is the character offset where parsing stopped
    /// and `text` is the input that was being scanned.
    #[error("JSON syntax error at {at}: {message}")]
    Syntax {
        message: String,
        at: usize,
        text: String,
    },
}

impl JsonError {
    /// Character offset at which the error was detected.
    pub fn position(&self) -> usize {
        match self {
            JsonError::Syntax { at, .. } => *at,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            JsonError::Syntax { message, .. } => message,
        }
    }
}

/// Errors raised while reading the PHP serialize format.
///
/// Offsets are byte offsets into the serialized input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PhpError {
    #[error("unknown or unhandled type tag {tag:?} at offset {offset}")]
    UnknownTag { tag: char, offset: usize },

    #[error("string length mismatch at offset {offset}: declared {declared} bytes")]
    LengthMismatch { declared: usize, offset: usize },

    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("expected {expected:?} at offset {offset}, found {found:?}")]
    Expected {
        expected: &'static str,
        found: String,
        offset: usize,
    },

    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("array key at offset {offset} must be an integer or string, found tag {tag:?}")]
    InvalidKey { tag: char, offset: usize },

    #[error("arrays nested too deeply at offset {offset}")]
    TooDeep { offset: usize },

    #[error("trailing data at offset {offset}")]
    TrailingData { offset: usize },
}

/// Errors surfaced by the codec registry and the codecs behind it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// No codec is registered under the requested format name.
    #[error("unknown serialization format \"{0}\"")]
    UnknownFormat(String),

    #[error(transparent)]
    Json(#[from] JsonError),

    #[error(transparent)]
    Php(#[from] PhpError),
}

impl CodecError {
    /// `true` for caller configuration mistakes rather than bad data.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CodecError::UnknownFormat(_))
    }

    /// `true` when the input text itself was malformed.
    pub fn is_format(&self) -> bool {
        matches!(self, CodecError::Json(_) | CodecError::Php(_))
    }
}

pub type JsonResult<T> = Result<T, JsonError>;
pub type PhpResult<T> = Result<T, PhpError>;
pub type CodecResult<T> = Result<T, CodecError>;
